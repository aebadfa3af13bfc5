//! Subcommands and the option groups they share.

pub mod resolve;
pub mod sync;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use filesync_core::{HostSettings, RawConfig};
use filesync_host::{GitHubHost, RepositoryHost};

/// How to reach GitHub.
#[derive(Args, Debug, Default)]
pub struct HostArgs {
    /// Access token. Falls back to `GITHUB_TOKEN`.
    #[arg(long, env = "INPUT_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// REST API base URL.
    #[arg(long, env = "GITHUB_API_URL")]
    pub api_url: Option<String>,

    /// Per-request timeout in seconds.
    #[arg(long = "request-timeout", env = "INPUT_REQUEST_TIMEOUT", value_name = "SECS")]
    pub request_timeout_secs: Option<u64>,
}

/// Which repositories receive the files.
#[derive(Args, Debug, Default)]
pub struct DestinationArgs {
    /// Newline-separated `org/name` list.
    #[arg(long, env = "INPUT_DESTINATION_REPOS")]
    pub destination_repos: Option<String>,

    /// Newline-separated `org/pattern` list; patterns match the start of the
    /// repository name, case-insensitively.
    #[arg(long, env = "INPUT_DESTINATION_REPOS_REGEX")]
    pub destination_repos_regex: Option<String>,

    /// Newline-separated `org/name` list never synced to.
    #[arg(long, env = "INPUT_DESTINATION_REPOS_EXCLUDE")]
    pub destination_repos_exclude: Option<String>,

    /// Used as the only destination when no other is given. Falls back to
    /// `GITHUB_REPOSITORY`.
    #[arg(long, env = "INPUT_CURRENT_REPOSITORY")]
    pub current_repository: Option<String>,
}

impl HostArgs {
    fn apply(self, raw: &mut RawConfig) {
        raw.token = self.token.or_else(|| env_fallback("GITHUB_TOKEN"));
        raw.api_url = self.api_url;
        raw.request_timeout_secs = self.request_timeout_secs;
    }
}

impl DestinationArgs {
    fn apply(self, raw: &mut RawConfig) {
        raw.destination_repos = self.destination_repos;
        raw.destination_repos_regex = self.destination_repos_regex;
        raw.destination_repos_exclude = self.destination_repos_exclude;
        raw.current_repository = self
            .current_repository
            .or_else(|| env_fallback("GITHUB_REPOSITORY"));
    }
}

fn env_fallback(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

pub(crate) fn github_host(settings: &HostSettings) -> Arc<dyn RepositoryHost> {
    Arc::new(GitHubHost::from_settings(settings))
}

pub(crate) fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")
}
