//! Per-destination sync engine.
//!
//! For each file the engine walks the same steps:
//!
//! 1. compare with the base branch; identical content means nothing to do
//! 2. make sure the work branch exists (cut from the base tip once)
//! 3. compare with the work branch; identical content means already staged
//! 4. create or update on the work branch, conditional on the identity read
//!    in step 3
//!
//! Deletions follow the same order. A failure in any step is logged and
//! reported for that file only; the engine moves on to the next one. The
//! pull request is attempted once, after every file.

use std::cell::Cell;

use tracing::{debug, info, warn};

use filesync_core::{FileDeleteSpec, PullRequestOptions, RepoId, SourceFile, SyncConfig};
use filesync_host::{
    DeleteContent, Lookup, NewPullRequest, PutContent, RemoteFile, RepositoryHost,
};

use crate::error::{host_err, SyncError};
use crate::report::{FileOutcome, FileReport, PullRequestOutcome};

// ---------------------------------------------------------------------------
// Settings and target
// ---------------------------------------------------------------------------

/// Per-run settings every destination shares.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub work_branch: String,
    /// Overrides each destination's default branch when set.
    pub base_branch: Option<String>,
    pub commit_message: String,
    pub pull_request: PullRequestOptions,
    pub dry_run: bool,
}

impl From<&SyncConfig> for EngineSettings {
    fn from(config: &SyncConfig) -> Self {
        Self {
            work_branch: config.work_branch.clone(),
            base_branch: config.target_branch.clone(),
            commit_message: config.commit_message.clone(),
            pull_request: config.pull_request.clone(),
            dry_run: config.dry_run,
        }
    }
}

/// A destination repository and the two branches the engine works between.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncTarget {
    pub repo: RepoId,
    pub base_branch: String,
    pub work_branch: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorkBranch {
    Unknown,
    Exists,
    /// Dry run only: the branch would have been created.
    Planned,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Syncs files into one destination repository.
///
/// Not shared between threads; each worker opens its own engine.
pub struct SyncEngine<'h> {
    host: &'h dyn RepositoryHost,
    target: SyncTarget,
    settings: &'h EngineSettings,
    work_branch: Cell<WorkBranch>,
}

impl<'h> SyncEngine<'h> {
    /// Look up `repo` and settle its base branch.
    ///
    /// Fails with [`SyncError::DestinationNotFound`] or [`SyncError::Host`];
    /// callers skip the destination either way.
    pub fn open(
        host: &'h dyn RepositoryHost,
        repo: &RepoId,
        settings: &'h EngineSettings,
    ) -> Result<Self, SyncError> {
        let info = match host.find_repository(repo) {
            Ok(Lookup::Found(info)) => info,
            Ok(Lookup::NotFound) => {
                return Err(SyncError::DestinationNotFound { repo: repo.clone() })
            }
            Err(source) => return Err(host_err(repo, source)),
        };
        if info.archived {
            debug!(repo = %repo, "destination is archived; writes will likely be rejected");
        }

        let base_branch = settings
            .base_branch
            .clone()
            .unwrap_or(info.default_branch);
        Ok(Self {
            host,
            target: SyncTarget {
                repo: repo.clone(),
                base_branch,
                work_branch: settings.work_branch.clone(),
            },
            settings,
            work_branch: Cell::new(WorkBranch::Unknown),
        })
    }

    pub fn target(&self) -> &SyncTarget {
        &self.target
    }

    fn repo(&self) -> &RepoId {
        &self.target.repo
    }

    fn base(&self) -> &str {
        &self.target.base_branch
    }

    /// Branch writes go to. In a dry run where the work branch does not
    /// exist yet this is the base branch, since the work branch would be a
    /// copy of it.
    fn staging_ref(&self) -> &str {
        match self.work_branch.get() {
            WorkBranch::Planned => &self.target.base_branch,
            WorkBranch::Unknown | WorkBranch::Exists => &self.target.work_branch,
        }
    }

    // -- files --------------------------------------------------------------

    pub fn sync_files(&self, files: &[SourceFile]) -> Vec<FileReport> {
        files
            .iter()
            .map(|file| FileReport {
                path: file.destination_path().to_owned(),
                outcome: self.sync_file(file),
            })
            .collect()
    }

    pub fn sync_file(&self, file: &SourceFile) -> FileOutcome {
        let path = file.destination_path();

        if self.matches_at(file, self.base()) {
            debug!(repo = %self.repo(), path, branch = self.base(), "up to date");
            return FileOutcome::UpToDate {
                branch: self.base().to_owned(),
            };
        }

        if let Err(err) = self.ensure_work_branch() {
            return self.failed(path, &self.target.work_branch, err);
        }

        let staging = self.staging_ref();
        let current = match self.read(path, staging) {
            Ok(current) => current,
            Err(err) => return self.failed(path, staging, err),
        };
        if let Some(existing) = &current {
            if existing.identity == file.content_hash {
                debug!(repo = %self.repo(), path, branch = staging, "already staged");
                return FileOutcome::UpToDate {
                    branch: staging.to_owned(),
                };
            }
        }

        self.write(file, current.as_ref())
    }

    /// Identity comparison against `git_ref`. Absence and lookup failures
    /// both count as "not up to date".
    fn matches_at(&self, file: &SourceFile, git_ref: &str) -> bool {
        match self.read(file.destination_path(), git_ref) {
            Ok(Some(existing)) => existing.identity == file.content_hash,
            Ok(None) => false,
            Err(err) => {
                warn!(
                    repo = %self.repo(),
                    path = file.destination_path(),
                    branch = git_ref,
                    error = %err,
                    "comparison failed; treating as out of date"
                );
                false
            }
        }
    }

    fn write(&self, file: &SourceFile, current: Option<&RemoteFile>) -> FileOutcome {
        let path = file.destination_path();
        let branch = self.target.work_branch.as_str();

        if self.settings.dry_run {
            info!(repo = %self.repo(), path, branch, "[dry-run] would write");
            return match current {
                Some(_) => FileOutcome::WouldUpdate,
                None => FileOutcome::WouldCreate,
            };
        }

        let request = PutContent {
            path,
            bytes: &file.payload,
            message: &self.settings.commit_message,
            branch,
            expected: current.map(|existing| &existing.identity),
        };
        match self.host.put_content(self.repo(), request) {
            Ok(()) => {
                let action = if current.is_some() { "updated" } else { "created" };
                info!(repo = %self.repo(), path, branch, "{action}");
                match current {
                    Some(_) => FileOutcome::Updated,
                    None => FileOutcome::Created,
                }
            }
            Err(source) => self.failed(path, branch, host_err(self.repo(), source)),
        }
    }

    // -- deletions ----------------------------------------------------------

    pub fn delete_files(&self, deletions: &[FileDeleteSpec]) -> Vec<FileReport> {
        deletions
            .iter()
            .map(|spec| FileReport {
                path: spec.destination_path.clone(),
                outcome: self.delete_file(spec),
            })
            .collect()
    }

    pub fn delete_file(&self, spec: &FileDeleteSpec) -> FileOutcome {
        let path = spec.destination_path.as_str();

        match self.read(path, self.base()) {
            Ok(Some(_)) => {}
            Ok(None) => {
                debug!(repo = %self.repo(), path, branch = self.base(), "nothing to delete");
                return FileOutcome::Absent;
            }
            Err(err) => return self.failed(path, self.base(), err),
        }

        if let Err(err) = self.ensure_work_branch() {
            return self.failed(path, &self.target.work_branch, err);
        }

        let staging = self.staging_ref();
        let existing = match self.read(path, staging) {
            Ok(Some(existing)) => existing,
            Ok(None) => {
                debug!(repo = %self.repo(), path, branch = staging, "already deleted");
                return FileOutcome::Absent;
            }
            Err(err) => return self.failed(path, staging, err),
        };

        let branch = self.target.work_branch.as_str();
        if self.settings.dry_run {
            info!(repo = %self.repo(), path, branch, "[dry-run] would delete");
            return FileOutcome::WouldDelete;
        }

        let request = DeleteContent {
            path,
            message: &self.settings.commit_message,
            branch,
            expected: &existing.identity,
        };
        match self.host.delete_content(self.repo(), request) {
            Ok(()) => {
                info!(repo = %self.repo(), path, branch, "deleted");
                FileOutcome::Deleted
            }
            Err(source) => self.failed(path, branch, host_err(self.repo(), source)),
        }
    }

    // -- pull request -------------------------------------------------------

    /// Open the pull request from the work branch into the base branch.
    ///
    /// The host declining (one already open, nothing to merge) is an
    /// expected outcome and never an error of the run.
    pub fn open_pull_request(&self) -> PullRequestOutcome {
        let options = &self.settings.pull_request;
        if self.settings.dry_run {
            info!(
                repo = %self.repo(),
                head = %self.target.work_branch,
                base = self.base(),
                "[dry-run] would open pull request"
            );
            return PullRequestOutcome::WouldOpen;
        }

        let request = NewPullRequest {
            title: &options.title,
            head: &self.target.work_branch,
            base: self.base(),
            draft: options.draft,
        };
        match self.host.create_pull_request(self.repo(), request) {
            Ok(pr) => {
                info!(repo = %self.repo(), number = pr.number, url = %pr.url, "opened pull request");
                PullRequestOutcome::Opened {
                    number: pr.number,
                    url: pr.url,
                }
            }
            Err(err) => {
                warn!(
                    repo = %self.repo(),
                    head = %self.target.work_branch,
                    base = self.base(),
                    error = %err,
                    "pull request not opened"
                );
                PullRequestOutcome::NotOpened {
                    reason: err.to_string(),
                }
            }
        }
    }

    // -- helpers ------------------------------------------------------------

    fn read(&self, path: &str, git_ref: &str) -> Result<Option<RemoteFile>, SyncError> {
        self.host
            .get_content(self.repo(), path, git_ref)
            .map(Lookup::found)
            .map_err(|source| host_err(self.repo(), source))
    }

    /// Create the work branch from the base tip unless it exists. Checked
    /// once per engine.
    fn ensure_work_branch(&self) -> Result<(), SyncError> {
        if self.work_branch.get() != WorkBranch::Unknown {
            return Ok(());
        }
        let repo = self.repo();
        let work = self.target.work_branch.as_str();

        match self.host.get_branch(repo, work) {
            Ok(Lookup::Found(_)) => {
                self.work_branch.set(WorkBranch::Exists);
                return Ok(());
            }
            Ok(Lookup::NotFound) => {}
            Err(err) => {
                warn!(repo = %repo, branch = work, error = %err, "branch lookup failed; trying to create it");
            }
        }

        let tip = match self.host.get_branch(repo, self.base()) {
            Ok(Lookup::Found(tip)) => tip,
            Ok(Lookup::NotFound) => {
                return Err(SyncError::BaseBranchMissing {
                    repo: repo.clone(),
                    branch: self.base().to_owned(),
                })
            }
            Err(source) => return Err(host_err(repo, source)),
        };

        if self.settings.dry_run {
            info!(repo = %repo, branch = work, from = self.base(), "[dry-run] would create branch");
            self.work_branch.set(WorkBranch::Planned);
            return Ok(());
        }

        self.host
            .create_branch(repo, work, &tip.commit_sha)
            .map_err(|source| host_err(repo, source))?;
        info!(repo = %repo, branch = work, from = self.base(), "created branch");
        self.work_branch.set(WorkBranch::Exists);
        Ok(())
    }

    fn failed(&self, path: &str, branch: &str, err: SyncError) -> FileOutcome {
        warn!(
            repo = %self.repo(),
            path,
            branch,
            error = %err,
            "file not synced"
        );
        FileOutcome::Failed {
            branch: branch.to_owned(),
            reason: err.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
