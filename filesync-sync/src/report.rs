//! Outcome types returned by the engine and the pipeline.

use chrono::{DateTime, Utc};
use serde::Serialize;

use filesync_core::RepoId;

/// Outcome of syncing or deleting one file in one destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    /// Content identity already matches on `branch`; nothing written.
    UpToDate { branch: String },
    Created,
    Updated,
    Deleted,
    /// Delete requested but the file is not there.
    Absent,
    WouldCreate,
    WouldUpdate,
    WouldDelete,
    /// The host call against `branch` failed.
    Failed { branch: String, reason: String },
}

impl FileOutcome {
    pub fn is_change(&self) -> bool {
        matches!(
            self,
            FileOutcome::Created
                | FileOutcome::Updated
                | FileOutcome::Deleted
                | FileOutcome::WouldCreate
                | FileOutcome::WouldUpdate
                | FileOutcome::WouldDelete
        )
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, FileOutcome::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReport {
    pub path: String,
    #[serde(flatten)]
    pub outcome: FileOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PullRequestOutcome {
    Opened { number: u64, url: String },
    WouldOpen,
    /// The host declined (already open, nothing to merge, ...).
    NotOpened { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DestinationStatus {
    Completed,
    Skipped { reason: String },
    Cancelled,
}

/// Everything that happened to one destination repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DestinationReport {
    pub repo: RepoId,
    #[serde(flatten)]
    pub status: DestinationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_branch: Option<String>,
    pub files: Vec<FileReport>,
    pub deletions: Vec<FileReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pull_request: Option<PullRequestOutcome>,
}

impl DestinationReport {
    pub fn skipped(repo: &RepoId, reason: impl Into<String>) -> Self {
        Self::empty(repo, DestinationStatus::Skipped {
            reason: reason.into(),
        })
    }

    pub fn cancelled(repo: &RepoId) -> Self {
        Self::empty(repo, DestinationStatus::Cancelled)
    }

    fn empty(repo: &RepoId, status: DestinationStatus) -> Self {
        Self {
            repo: repo.clone(),
            status,
            base_branch: None,
            files: Vec::new(),
            deletions: Vec::new(),
            pull_request: None,
        }
    }

    /// File and deletion outcomes, in that order.
    pub fn outcomes(&self) -> impl Iterator<Item = &FileReport> {
        self.files.iter().chain(self.deletions.iter())
    }

    pub fn changed(&self) -> usize {
        self.outcomes().filter(|r| r.outcome.is_change()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes().filter(|r| r.outcome.is_failure()).count()
    }
}

/// Summary of one run across every destination.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub source_repo: RepoId,
    pub source_branch: String,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Sorted by repository identifier.
    pub destinations: Vec<DestinationReport>,
}

impl RunReport {
    pub fn was_cancelled(&self) -> bool {
        self.destinations
            .iter()
            .any(|d| d.status == DestinationStatus::Cancelled)
    }

    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(path: &str, outcome: FileOutcome) -> FileReport {
        FileReport {
            path: path.to_owned(),
            outcome,
        }
    }

    #[test]
    fn counters_cover_files_and_deletions() {
        let mut dest = DestinationReport::skipped(&RepoId::from("org/a"), "x");
        dest.status = DestinationStatus::Completed;
        dest.files = vec![
            report("a", FileOutcome::Created),
            report("b", FileOutcome::UpToDate { branch: "main".into() }),
            report(
                "c",
                FileOutcome::Failed {
                    branch: "file-sync".into(),
                    reason: "409".into(),
                },
            ),
        ];
        dest.deletions = vec![report("d", FileOutcome::Deleted), report("e", FileOutcome::Absent)];
        assert_eq!(dest.changed(), 2);
        assert_eq!(dest.failed(), 1);
    }

    #[test]
    fn file_report_serializes_flat() {
        let json = serde_json::to_value(report("ci.yml", FileOutcome::UpToDate {
            branch: "main".into(),
        }))
        .expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({"path": "ci.yml", "status": "up_to_date", "branch": "main"})
        );
    }
}
