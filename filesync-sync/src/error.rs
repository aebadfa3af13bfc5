//! Error types for filesync-sync.

use thiserror::Error;

use filesync_core::{ConfigError, RepoId};
use filesync_host::HostError;

/// All errors that can arise from a sync run.
///
/// Configuration, source, discovery, and worker errors are fatal and end the
/// run. The destination-scoped variants are caught by the engine and turned
/// into report entries.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("source repository {repo} not found")]
    SourceRepositoryNotFound { repo: RepoId },

    #[error("source file {path} not found in {repo} on branch {branch}")]
    SourceFileNotFound {
        repo: RepoId,
        path: String,
        branch: String,
    },

    #[error("failed to read source repository {repo}: {source}")]
    SourceFetch {
        repo: RepoId,
        #[source]
        source: HostError,
    },

    /// Listing an organization failed for a reason other than "not found".
    #[error("repository discovery failed for {org}: {source}")]
    Discovery {
        org: String,
        #[source]
        source: HostError,
    },

    #[error("destination repository {repo} not found")]
    DestinationNotFound { repo: RepoId },

    #[error("base branch {branch} not found in {repo}")]
    BaseBranchMissing { repo: RepoId, branch: String },

    #[error("{repo}: {source}")]
    Host {
        repo: RepoId,
        #[source]
        source: HostError,
    },

    #[error("worker failed: {0}")]
    Worker(String),
}

impl SyncError {
    /// Whether this error ends the whole run rather than one unit of work.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            SyncError::DestinationNotFound { .. }
                | SyncError::BaseBranchMissing { .. }
                | SyncError::Host { .. }
        )
    }
}

/// Convenience constructor for [`SyncError::Host`].
pub(crate) fn host_err(repo: &RepoId, source: HostError) -> SyncError {
    SyncError::Host {
        repo: repo.clone(),
        source,
    }
}
