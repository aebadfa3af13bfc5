//! # filesync-host
//!
//! The Repository Host capability: every remote operation the sync needs,
//! as an explicit request/response trait.
//!
//! Lookups answer with [`Lookup::Found`] or [`Lookup::NotFound`] inside
//! `Ok`; only genuine failures (timeouts, rejected requests, transport
//! problems) are `Err(HostError)`. Call sites branch on data instead of
//! catching errors for control flow.
//!
//! - [`github::GitHubHost`] — GitHub REST API over a blocking `ureq` agent
//! - `memory::InMemoryHost` — in-memory host (feature `testing`)

pub mod error;
pub mod github;
#[cfg(feature = "testing")]
pub mod memory;

use filesync_core::{ContentIdentity, RepoId};

pub use error::{HostError, Operation};
pub use github::GitHubHost;

pub type HostResult<T> = Result<T, HostError>;

// ---------------------------------------------------------------------------
// Tagged lookup result
// ---------------------------------------------------------------------------

/// Outcome of a lookup that succeeded at the transport level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
}

impl<T> Lookup<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(value) => Some(value),
            Lookup::NotFound => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Repository metadata returned by [`RepositoryHost::find_repository`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryInfo {
    pub id: RepoId,
    pub default_branch: String,
    pub archived: bool,
}

/// One entry of an organization listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositorySummary {
    /// Short name, without the `org/` prefix.
    pub name: String,
    pub archived: bool,
}

/// A branch and the commit at its tip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchRef {
    pub name: String,
    pub commit_sha: String,
}

/// File content at a ref.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub identity: ContentIdentity,
    pub bytes: Vec<u8>,
}

/// Create or update a file on a branch.
///
/// `expected` is `None` for a create; for an update it must be the identity
/// currently on the branch, or the host rejects the write.
#[derive(Debug, Clone, Copy)]
pub struct PutContent<'a> {
    pub path: &'a str,
    pub bytes: &'a [u8],
    pub message: &'a str,
    pub branch: &'a str,
    pub expected: Option<&'a ContentIdentity>,
}

/// Delete a file on a branch, conditional on its current identity.
#[derive(Debug, Clone, Copy)]
pub struct DeleteContent<'a> {
    pub path: &'a str,
    pub message: &'a str,
    pub branch: &'a str,
    pub expected: &'a ContentIdentity,
}

#[derive(Debug, Clone, Copy)]
pub struct NewPullRequest<'a> {
    pub title: &'a str,
    pub head: &'a str,
    pub base: &'a str,
    pub draft: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    pub number: u64,
    pub url: String,
}

// ---------------------------------------------------------------------------
// Capability
// ---------------------------------------------------------------------------

/// Remote version-control platform operations.
///
/// Every call is a bounded, synchronous request/response. Implementations
/// must be shareable across worker threads.
pub trait RepositoryHost: Send + Sync {
    fn find_repository(&self, repo: &RepoId) -> HostResult<Lookup<RepositoryInfo>>;

    fn get_branch(&self, repo: &RepoId, branch: &str) -> HostResult<Lookup<BranchRef>>;

    fn create_branch(&self, repo: &RepoId, branch: &str, from_commit_sha: &str) -> HostResult<()>;

    fn get_content(&self, repo: &RepoId, path: &str, git_ref: &str) -> HostResult<Lookup<RemoteFile>>;

    fn put_content(&self, repo: &RepoId, request: PutContent<'_>) -> HostResult<()>;

    fn delete_content(&self, repo: &RepoId, request: DeleteContent<'_>) -> HostResult<()>;

    fn create_pull_request(&self, repo: &RepoId, request: NewPullRequest<'_>)
        -> HostResult<PullRequest>;

    /// All repositories of an organization (or user). `NotFound` when the
    /// owner does not exist.
    fn list_repositories(&self, org: &str) -> HostResult<Lookup<Vec<RepositorySummary>>>;
}
