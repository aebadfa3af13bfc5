//! Run configuration.
//!
//! The binary collects every option as a raw string into [`RawConfig`]
//! (flags, falling back to `INPUT_*` environment variables). That struct is
//! validated exactly once by [`SyncConfig::from_raw`]; the resulting
//! [`SyncConfig`] is immutable for the rest of the run.

use std::collections::BTreeSet;
use std::time::Duration;

use tracing::warn;

use crate::error::ConfigError;
use crate::spec::{parse_delete_specs, parse_file_specs, parse_list};
use crate::types::{FileDeleteSpec, FileTransferSpec, RepoId, RepoPatternSpec};

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_WORK_BRANCH: &str = "file-sync";
pub const DEFAULT_COMMIT_MESSAGE: &str = "Updated by file-sync";
pub const DEFAULT_PULL_REQUEST_TITLE: &str = "file-sync";
pub const DEFAULT_CONCURRENCY: usize = 4;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Unvalidated option values, exactly as they arrived.
#[derive(Debug, Clone, Default)]
pub struct RawConfig {
    pub token: Option<String>,
    pub source_repo: Option<String>,
    pub source_branch: Option<String>,
    pub files: Option<String>,
    pub delete_files: Option<String>,
    pub destination_repos: Option<String>,
    pub destination_repos_regex: Option<String>,
    pub destination_repos_exclude: Option<String>,
    pub current_repository: Option<String>,
    pub pull_request_branch: Option<String>,
    pub target_branch: Option<String>,
    pub commit_message: Option<String>,
    pub pull_request_title: Option<String>,
    pub pull_request_draft: Option<String>,
    pub dry_run: Option<String>,
    pub api_url: Option<String>,
    pub concurrency: Option<usize>,
    pub request_timeout_secs: Option<u64>,
}

/// The three inputs of destination resolution, already parsed.
#[derive(Debug, Clone, Default)]
pub struct DestinationInputs {
    pub explicit: Vec<RepoId>,
    pub patterns: Vec<RepoPatternSpec>,
    pub exclude: BTreeSet<String>,
}

impl DestinationInputs {
    /// Parse the explicit, pattern, and exclude lists.
    pub fn from_lists(
        explicit: &[String],
        patterns: &[String],
        exclude: &[String],
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            explicit: explicit
                .iter()
                .map(|name| RepoId::parse(name))
                .collect::<Result<_, _>>()?,
            patterns: patterns
                .iter()
                .map(|pattern| RepoPatternSpec::parse(pattern))
                .collect::<Result<_, _>>()?,
            exclude: exclude.iter().cloned().collect(),
        })
    }

    /// Destination inputs of a raw configuration.
    ///
    /// When neither explicit destinations nor patterns are given, the current
    /// repository (if any) becomes the only destination. Nothing at all is
    /// [`ConfigError::NoDestinations`].
    pub fn from_raw(raw: &RawConfig) -> Result<Self, ConfigError> {
        let mut explicit = parse_list(raw.destination_repos.as_deref());
        let patterns = parse_list(raw.destination_repos_regex.as_deref());
        if explicit.is_empty() && patterns.is_empty() {
            if let Some(current) = non_empty(raw.current_repository.clone()) {
                explicit.push(current);
            }
        }
        let exclude = parse_list(raw.destination_repos_exclude.as_deref());

        let inputs = Self::from_lists(&explicit, &patterns, &exclude)?;
        if inputs.is_empty() {
            return Err(ConfigError::NoDestinations);
        }
        Ok(inputs)
    }

    pub fn is_empty(&self) -> bool {
        self.explicit.is_empty() && self.patterns.is_empty()
    }
}

/// Pull-request parameters shared by every destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestOptions {
    pub title: String,
    pub draft: bool,
}

/// How to reach the repository host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostSettings {
    pub token: Option<String>,
    pub api_url: String,
    pub request_timeout: Duration,
}

impl HostSettings {
    pub fn from_raw(raw: &RawConfig) -> Result<Self, ConfigError> {
        let token = non_empty(raw.token.clone());
        if token.is_none() {
            warn!("no access token configured; requests will be anonymous");
        }
        let timeout_secs = raw
            .request_timeout_secs
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(ConfigError::NotPositive {
                key: "request timeout",
            });
        }
        Ok(Self {
            token,
            api_url: non_empty(raw.api_url.clone()).unwrap_or_else(|| DEFAULT_API_URL.to_owned()),
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

/// Validated configuration for one run.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub host: HostSettings,
    pub source_repo: RepoId,
    /// `None` means the source repository's default branch.
    pub source_branch: Option<String>,
    pub files: Vec<FileTransferSpec>,
    pub delete_files: Vec<FileDeleteSpec>,
    pub destinations: DestinationInputs,
    /// Head branch of the pull request; changes are staged here.
    pub work_branch: String,
    /// `None` means each destination's default branch.
    pub target_branch: Option<String>,
    pub commit_message: String,
    pub pull_request: PullRequestOptions,
    pub dry_run: bool,
    pub concurrency: usize,
}

impl SyncConfig {
    /// Validate raw option values. Destinations follow
    /// [`DestinationInputs::from_raw`].
    pub fn from_raw(raw: RawConfig) -> Result<Self, ConfigError> {
        let destinations = DestinationInputs::from_raw(&raw)?;
        let host = HostSettings::from_raw(&raw)?;

        let source_repo = non_empty(raw.source_repo)
            .ok_or(ConfigError::Missing { key: "source repository" })
            .and_then(|repo| RepoId::parse(&repo))?;

        let concurrency = raw.concurrency.unwrap_or(DEFAULT_CONCURRENCY);
        if concurrency == 0 {
            return Err(ConfigError::NotPositive { key: "concurrency" });
        }

        Ok(Self {
            host,
            source_repo,
            source_branch: non_empty(raw.source_branch),
            files: parse_file_specs(raw.files.as_deref().unwrap_or_default()),
            delete_files: parse_delete_specs(raw.delete_files.as_deref().unwrap_or_default()),
            destinations,
            work_branch: non_empty(raw.pull_request_branch)
                .unwrap_or_else(|| DEFAULT_WORK_BRANCH.to_owned()),
            target_branch: non_empty(raw.target_branch),
            commit_message: non_empty(raw.commit_message)
                .unwrap_or_else(|| DEFAULT_COMMIT_MESSAGE.to_owned()),
            pull_request: PullRequestOptions {
                title: non_empty(raw.pull_request_title)
                    .unwrap_or_else(|| DEFAULT_PULL_REQUEST_TITLE.to_owned()),
                draft: parse_truthy(raw.pull_request_draft.as_deref()),
            },
            dry_run: parse_truthy(raw.dry_run.as_deref()),
            concurrency,
        })
    }
}

/// `true`, `1`, `yes` and `on` (any case, surrounding whitespace ignored) are
/// true. Everything else, including absence, is false.
pub fn parse_truthy(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("true" | "1" | "yes" | "on")
    )
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> RawConfig {
        RawConfig {
            source_repo: Some("org/template".into()),
            destination_repos: Some("org/service-a\n".into()),
            ..RawConfig::default()
        }
    }

    #[test]
    fn defaults_are_applied() {
        let config = SyncConfig::from_raw(minimal()).expect("config");
        assert_eq!(config.work_branch, DEFAULT_WORK_BRANCH);
        assert_eq!(config.commit_message, DEFAULT_COMMIT_MESSAGE);
        assert_eq!(config.pull_request.title, DEFAULT_PULL_REQUEST_TITLE);
        assert!(!config.pull_request.draft);
        assert!(!config.dry_run);
        assert_eq!(config.host.api_url, DEFAULT_API_URL);
        assert_eq!(config.concurrency, DEFAULT_CONCURRENCY);
        assert_eq!(config.host.request_timeout, Duration::from_secs(30));
        assert!(config.host.token.is_none());
        assert!(config.target_branch.is_none());
        assert!(config.source_branch.is_none());
    }

    #[test]
    fn blank_target_branch_means_destination_default() {
        let raw = RawConfig {
            target_branch: Some("   ".into()),
            ..minimal()
        };
        let config = SyncConfig::from_raw(raw).expect("config");
        assert!(config.target_branch.is_none());
    }

    #[test]
    fn missing_source_repo_is_fatal() {
        let raw = RawConfig {
            source_repo: None,
            ..minimal()
        };
        let err = SyncConfig::from_raw(raw).unwrap_err();
        assert!(matches!(err, ConfigError::Missing { .. }), "got: {err}");
    }

    #[test]
    fn current_repository_is_the_fallback_destination() {
        let raw = RawConfig {
            destination_repos: Some(String::new()),
            destination_repos_regex: Some(String::new()),
            current_repository: Some("org/foo1".into()),
            ..minimal()
        };
        let config = SyncConfig::from_raw(raw).expect("config");
        assert_eq!(config.destinations.explicit, vec![RepoId::from("org/foo1")]);
    }

    #[test]
    fn current_repository_is_ignored_when_destinations_given() {
        let raw = RawConfig {
            current_repository: Some("org/foo1".into()),
            ..minimal()
        };
        let config = SyncConfig::from_raw(raw).expect("config");
        assert_eq!(
            config.destinations.explicit,
            vec![RepoId::from("org/service-a")]
        );
    }

    #[test]
    fn no_destinations_is_fatal() {
        let raw = RawConfig {
            destination_repos: None,
            ..minimal()
        };
        let err = SyncConfig::from_raw(raw).unwrap_err();
        assert!(matches!(err, ConfigError::NoDestinations), "got: {err}");
    }

    #[test]
    fn malformed_pattern_is_fatal() {
        let raw = RawConfig {
            destination_repos_regex: Some("no-slash-here\n".into()),
            ..minimal()
        };
        let err = SyncConfig::from_raw(raw).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }), "got: {err}");
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let raw = RawConfig {
            concurrency: Some(0),
            ..minimal()
        };
        assert!(matches!(
            SyncConfig::from_raw(raw).unwrap_err(),
            ConfigError::NotPositive { key: "concurrency" }
        ));
    }

    #[test]
    fn truthy_strings() {
        for value in ["true", "TRUE", " yes ", "1", "on"] {
            assert!(parse_truthy(Some(value)), "{value} should be truthy");
        }
        for value in ["false", "", "0", "no", "maybe"] {
            assert!(!parse_truthy(Some(value)), "{value} should be falsey");
        }
        assert!(!parse_truthy(None));
    }
}
