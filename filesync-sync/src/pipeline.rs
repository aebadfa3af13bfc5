//! Whole-run orchestration: fetch sources, resolve destinations, fan out.
//!
//! The host is blocking, so every host-facing step runs on
//! `spawn_blocking`. Destinations are processed by a pool bounded by a
//! semaphore. A shutdown signal stops new destinations from starting;
//! destinations already in flight finish their current work. A worker that
//! panics costs only its own destination.

use std::any::Any;
use std::collections::BTreeSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, info_span, warn};

use filesync_core::{FileDeleteSpec, RepoId, SourceFile, SyncConfig};
use filesync_host::RepositoryHost;

use crate::engine::{EngineSettings, SyncEngine};
use crate::error::SyncError;
use crate::report::{DestinationReport, DestinationStatus, RunReport};
use crate::resolver::resolve_destinations;
use crate::source::{fetch_sources, SourceSnapshot};

/// Run a full sync.
///
/// Fatal errors (unreadable source, failed discovery) return `Err` before
/// any destination is touched. Everything after that is captured in the
/// returned report, including destinations that were cancelled.
pub async fn run(
    host: Arc<dyn RepositoryHost>,
    config: Arc<SyncConfig>,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<RunReport, SyncError> {
    let started_at = Utc::now();

    let (snapshot, destinations) = {
        let host = host.clone();
        let config = config.clone();
        blocking("prepare", move || prepare(host.as_ref(), &config)).await?
    };
    info!(
        source = %config.source_repo,
        branch = %snapshot.branch,
        files = snapshot.files.len(),
        deletions = config.delete_files.len(),
        destinations = destinations.len(),
        dry_run = config.dry_run,
        "starting sync"
    );

    let source_branch = snapshot.branch;
    let files: Arc<[SourceFile]> = snapshot.files.into();
    let deletions: Arc<[FileDeleteSpec]> = config.delete_files.clone().into();
    let settings = Arc::new(EngineSettings::from(config.as_ref()));

    let semaphore = Arc::new(Semaphore::new(config.concurrency));
    let mut join_set = JoinSet::new();
    let mut reports = Vec::with_capacity(destinations.len());
    let mut dispatched = Vec::with_capacity(destinations.len());
    let mut pending = destinations.into_iter();

    while let Some(repo) = pending.next() {
        let permit = tokio::select! {
            biased;
            _ = cancelled(&mut shutdown) => {
                warn!("shutdown requested; remaining destinations will not be started");
                reports.push(DestinationReport::cancelled(&repo));
                reports.extend(pending.by_ref().map(|repo| DestinationReport::cancelled(&repo)));
                break;
            }
            permit = semaphore.clone().acquire_owned() => permit
                .map_err(|err| SyncError::Worker(format!("worker pool closed: {err}")))?,
        };

        dispatched.push(repo.clone());
        let host = host.clone();
        let files = files.clone();
        let deletions = deletions.clone();
        let settings = settings.clone();
        join_set.spawn_blocking(move || {
            let _permit = permit;
            let attempt = panic::catch_unwind(AssertUnwindSafe(|| {
                sync_destination(host.as_ref(), &repo, &settings, &files, &deletions)
            }));
            attempt.unwrap_or_else(|payload| {
                let reason = format!("worker panicked: {}", panic_message(payload.as_ref()));
                error!(repo = %repo, "{reason}");
                DestinationReport::skipped(&repo, reason)
            })
        });
    }

    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok(report) => reports.push(report),
            Err(err) => error!(error = %err, "destination worker did not finish"),
        }
    }
    let reported: BTreeSet<RepoId> = reports.iter().map(|r| r.repo.clone()).collect();
    for repo in dispatched.iter().filter(|repo| !reported.contains(*repo)) {
        reports.push(DestinationReport::skipped(repo, "worker did not finish"));
    }
    reports.sort_by(|a, b| a.repo.cmp(&b.repo));

    let report = RunReport {
        source_repo: config.source_repo.clone(),
        source_branch,
        dry_run: config.dry_run,
        started_at,
        finished_at: Utc::now(),
        destinations: reports,
    };
    info!(
        destinations = report.destinations.len(),
        cancelled = report.was_cancelled(),
        duration_ms = report.duration_ms(),
        "sync finished"
    );
    Ok(report)
}

fn prepare(
    host: &dyn RepositoryHost,
    config: &SyncConfig,
) -> Result<(SourceSnapshot, Vec<RepoId>), SyncError> {
    let snapshot = fetch_sources(
        host,
        &config.source_repo,
        config.source_branch.as_deref(),
        &config.files,
    )?;
    let destinations = resolve_destinations(host, &config.destinations)?;
    Ok((snapshot, destinations))
}

/// Sync one destination from start to finish. Never fails; problems end up
/// in the report.
pub fn sync_destination(
    host: &dyn RepositoryHost,
    repo: &RepoId,
    settings: &EngineSettings,
    files: &[SourceFile],
    deletions: &[FileDeleteSpec],
) -> DestinationReport {
    let span = info_span!("destination", repo = %repo);
    let _enter = span.enter();

    let engine = match SyncEngine::open(host, repo, settings) {
        Ok(engine) => engine,
        Err(err) => {
            warn!(error = %err, "skipping destination");
            return DestinationReport::skipped(repo, err.to_string());
        }
    };

    let file_reports = engine.sync_files(files);
    let deletion_reports = engine.delete_files(deletions);
    let pull_request = engine.open_pull_request();

    DestinationReport {
        repo: repo.clone(),
        status: DestinationStatus::Completed,
        base_branch: Some(engine.target().base_branch.clone()),
        files: file_reports,
        deletions: deletion_reports,
        pull_request: Some(pull_request),
    }
}

async fn blocking<T, F>(label: &'static str, work: F) -> Result<T, SyncError>
where
    F: FnOnce() -> Result<T, SyncError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| SyncError::Worker(format!("{label} join error: {err}")))?
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

/// Resolves once a shutdown has been signalled. A closed channel means no
/// signal can arrive, so it never resolves.
async fn cancelled(shutdown: &mut broadcast::Receiver<()>) {
    match shutdown.recv().await {
        Ok(()) | Err(RecvError::Lagged(_)) => {}
        Err(RecvError::Closed) => std::future::pending::<()>().await,
    }
}
