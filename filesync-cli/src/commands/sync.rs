//! `filesync sync` — push files to every destination and open pull requests.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::SecondsFormat;
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};
use tokio::sync::broadcast;

use filesync_core::{RawConfig, SyncConfig};
use filesync_sync::{
    pipeline, DestinationReport, DestinationStatus, FileOutcome, PullRequestOutcome, RunReport,
};

use super::{github_host, runtime, DestinationArgs, HostArgs};

/// Arguments for `filesync sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Source repository, `org/name`.
    #[arg(long, env = "INPUT_SOURCE_REPO")]
    pub source_repo: Option<String>,

    /// Branch to read from; the source repository's default when empty.
    #[arg(long, env = "INPUT_SOURCE_REPO_BRANCH")]
    pub source_branch: Option<String>,

    /// Newline-separated files to sync, `path` or `source=destination`.
    #[arg(long, env = "INPUT_FILES")]
    pub files: Option<String>,

    /// Newline-separated files to delete from every destination.
    #[arg(long, env = "INPUT_DELETE_FILES")]
    pub delete_files: Option<String>,

    #[command(flatten)]
    pub destinations: DestinationArgs,

    /// Branch changes are committed to and the pull request is opened from.
    #[arg(long, env = "INPUT_PULL_REQUEST_BRANCH")]
    pub pull_request_branch: Option<String>,

    /// Base branch for comparisons and the pull request; the destination's
    /// default branch when empty.
    #[arg(long, env = "INPUT_TARGET_BRANCH")]
    pub target_branch: Option<String>,

    #[arg(long, env = "INPUT_COMMIT_MESSAGE")]
    pub commit_message: Option<String>,

    #[arg(long, env = "INPUT_PULL_REQUEST_TITLE")]
    pub pull_request_title: Option<String>,

    /// Open pull requests as drafts (`true`, `1`, `yes`, `on`).
    #[arg(long, env = "INPUT_PULL_REQUEST_DRAFT", value_name = "BOOL",
          num_args = 0..=1, default_missing_value = "true")]
    pub pull_request_draft: Option<String>,

    /// Read everything, change nothing, report what would happen.
    #[arg(long, env = "INPUT_DRY_RUN", value_name = "BOOL",
          num_args = 0..=1, default_missing_value = "true")]
    pub dry_run: Option<String>,

    /// Destinations processed in parallel.
    #[arg(long, env = "INPUT_CONCURRENCY")]
    pub concurrency: Option<usize>,

    #[command(flatten)]
    pub host: HostArgs,

    /// Print the run report as JSON.
    #[arg(long)]
    pub json: bool,
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        let json = self.json;
        let config = SyncConfig::from_raw(self.into_raw()).context("invalid configuration")?;
        let host = github_host(&config.host);
        let config = Arc::new(config);

        let report = runtime()?.block_on(async move {
            let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);
            let signal = tokio::spawn(async move {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => {
                        tracing::warn!("received ctrl-c, finishing in-flight destinations");
                        let _ = shutdown_tx.send(());
                    }
                    Err(err) => tracing::warn!("ctrl-c handler failed: {err}"),
                }
            });
            let result = pipeline::run(host, config, shutdown_rx).await;
            signal.abort();
            result
        });
        let report = report.context("sync failed")?;

        if json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize run report")?
            );
        } else {
            print_report(&report);
        }

        if report.was_cancelled() {
            bail!("sync cancelled before every destination was processed");
        }
        Ok(())
    }

    fn into_raw(self) -> RawConfig {
        let mut raw = RawConfig {
            source_repo: self.source_repo,
            source_branch: self.source_branch,
            files: self.files,
            delete_files: self.delete_files,
            pull_request_branch: self.pull_request_branch,
            target_branch: self.target_branch,
            commit_message: self.commit_message,
            pull_request_title: self.pull_request_title,
            pull_request_draft: self.pull_request_draft,
            dry_run: self.dry_run,
            concurrency: self.concurrency,
            ..RawConfig::default()
        };
        self.destinations.apply(&mut raw);
        self.host.apply(&mut raw);
        raw
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Tabled)]
struct DestinationRow {
    #[tabled(rename = "repository")]
    repository: String,
    #[tabled(rename = "status")]
    status: String,
    #[tabled(rename = "base")]
    base: String,
    #[tabled(rename = "changed")]
    changed: usize,
    #[tabled(rename = "failed")]
    failed: usize,
    #[tabled(rename = "pull request")]
    pull_request: String,
}

fn print_report(report: &RunReport) {
    let prefix = if report.dry_run { "[dry-run] " } else { "" };
    println!(
        "{prefix}filesync v{} | {}@{} | {} destinations | started {} | {} ms",
        env!("CARGO_PKG_VERSION"),
        report.source_repo,
        report.source_branch,
        report.destinations.len(),
        report.started_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        report.duration_ms(),
    );

    if report.destinations.is_empty() {
        println!("No destination repositories matched.");
        return;
    }

    let rows: Vec<DestinationRow> = report.destinations.iter().map(row).collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    for dest in &report.destinations {
        let notable: Vec<_> = dest
            .outcomes()
            .filter(|r| r.outcome.is_change() || r.outcome.is_failure())
            .collect();
        if notable.is_empty() {
            continue;
        }
        println!("{}", dest.repo.to_string().bold());
        for r in notable {
            match &r.outcome {
                FileOutcome::Failed { branch, reason } => println!(
                    "  {}  {}@{}  {}",
                    outcome_mark(&r.outcome),
                    r.path,
                    branch,
                    reason.bright_black()
                ),
                other => println!("  {}  {}", outcome_mark(other), r.path),
            }
        }
    }
}

fn row(dest: &DestinationReport) -> DestinationRow {
    DestinationRow {
        repository: dest.repo.to_string(),
        status: status_label(&dest.status),
        base: dest.base_branch.clone().unwrap_or_else(|| "-".to_string()),
        changed: dest.changed(),
        failed: dest.failed(),
        pull_request: dest
            .pull_request
            .as_ref()
            .map(pull_request_label)
            .unwrap_or_else(|| "-".to_string()),
    }
}

fn status_label(status: &DestinationStatus) -> String {
    match status {
        DestinationStatus::Completed => "done".green().to_string(),
        DestinationStatus::Skipped { reason } => format!("{} ({reason})", "skipped".yellow()),
        DestinationStatus::Cancelled => "cancelled".red().to_string(),
    }
}

fn pull_request_label(outcome: &PullRequestOutcome) -> String {
    match outcome {
        PullRequestOutcome::Opened { url, .. } => url.clone(),
        PullRequestOutcome::WouldOpen => "would open".to_string(),
        PullRequestOutcome::NotOpened { .. } => "not opened".bright_black().to_string(),
    }
}

fn outcome_mark(outcome: &FileOutcome) -> String {
    match outcome {
        FileOutcome::Created => "+".green().to_string(),
        FileOutcome::Updated => "✎".green().to_string(),
        FileOutcome::Deleted => "-".green().to_string(),
        FileOutcome::WouldCreate | FileOutcome::WouldUpdate | FileOutcome::WouldDelete => {
            "~".cyan().to_string()
        }
        FileOutcome::Failed { .. } => "✗".red().to_string(),
        FileOutcome::UpToDate { .. } | FileOutcome::Absent => "·".to_string(),
    }
}
