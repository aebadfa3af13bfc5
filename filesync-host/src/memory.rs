//! In-memory [`RepositoryHost`] for tests.
//!
//! Behaves like the GitHub host where the sync depends on it: identity
//! preconditions on update/delete, branch creation from an existing commit,
//! duplicate and empty pull requests rejected. Every call is recorded, and
//! any operation can be made to fail for a given repository (or organization,
//! for listings), optionally only on one branch or ref.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use sha2::{Digest, Sha256};

use filesync_core::{ContentIdentity, RepoId};

use crate::error::{HostError, Operation};
use crate::{
    BranchRef, DeleteContent, HostResult, Lookup, NewPullRequest, PullRequest, PutContent,
    RemoteFile, RepositoryHost, RepositoryInfo, RepositorySummary,
};

/// Identity the in-memory host assigns to `bytes` (SHA-256, hex).
pub fn identity_of(bytes: &[u8]) -> ContentIdentity {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    ContentIdentity(hex::encode(hasher.finalize()))
}

/// One recorded host call. `target` is the path, branch, or org involved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostCall {
    pub operation: Operation,
    pub scope: String,
    pub target: String,
}

/// A pull request opened against the in-memory host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemPullRequest {
    pub number: u64,
    pub title: String,
    pub head: String,
    pub base: String,
    pub draft: bool,
}

#[derive(Debug, Clone, Default)]
struct MemBranch {
    commit_sha: String,
    files: BTreeMap<String, Vec<u8>>,
}

#[derive(Debug, Clone)]
struct MemRepo {
    default_branch: String,
    archived: bool,
    branches: BTreeMap<String, MemBranch>,
    pulls: Vec<MemPullRequest>,
}

#[derive(Debug, Default)]
struct State {
    repos: BTreeMap<RepoId, MemRepo>,
    calls: Vec<HostCall>,
    failures: HashSet<(String, Operation)>,
    failures_at: HashSet<(String, Operation, String)>,
    commits: u64,
}

impl State {
    fn next_commit(&mut self) -> String {
        self.commits += 1;
        format!("commit-{:04}", self.commits)
    }

    /// Record a call. `at` is the branch or ref the call reads or writes.
    fn record(
        &mut self,
        operation: Operation,
        scope: &str,
        target: &str,
        at: &str,
    ) -> HostResult<()> {
        self.calls.push(HostCall {
            operation,
            scope: scope.to_owned(),
            target: target.to_owned(),
        });
        let scope = scope.to_owned();
        if self.failures.contains(&(scope.clone(), operation))
            || self.failures_at.contains(&(scope, operation, at.to_owned()))
        {
            return Err(status(operation, 500, "injected failure"));
        }
        Ok(())
    }

    fn branch(&self, repo: &RepoId, branch: &str) -> Option<&MemBranch> {
        self.repos.get(repo)?.branches.get(branch)
    }
}

/// In-memory repository host.
#[derive(Debug, Default)]
pub struct InMemoryHost {
    state: Mutex<State>,
}

impl InMemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // -- setup --------------------------------------------------------------

    /// Add an active repository whose default branch exists and is empty.
    pub fn with_repo(self, repo: &str, default_branch: &str) -> Self {
        self.insert_repo(repo, default_branch, false);
        self
    }

    pub fn with_archived_repo(self, repo: &str, default_branch: &str) -> Self {
        self.insert_repo(repo, default_branch, true);
        self
    }

    /// Commit `content` at `path` on `branch`, creating the branch if needed.
    pub fn with_file(self, repo: &str, branch: &str, path: &str, content: &[u8]) -> Self {
        self.write_file(repo, branch, path, content);
        self
    }

    /// Cut `branch` from the tip of `from`.
    pub fn with_branch(self, repo: &str, branch: &str, from: &str) -> Self {
        {
            let mut state = self.lock();
            if let Some(entry) = state.repos.get_mut(&RepoId::from(repo)) {
                let copy = entry.branches.get(from).cloned().unwrap_or_default();
                entry.branches.insert(branch.to_owned(), copy);
            }
        }
        self
    }

    /// Make every `operation` scoped to `scope` (a repo id, or an org for
    /// listings) fail with HTTP 500.
    pub fn failing(self, scope: &str, operation: Operation) -> Self {
        self.lock().failures.insert((scope.to_owned(), operation));
        self
    }

    /// Like [`failing`](Self::failing), but only for calls on branch or ref
    /// `at`: the branch for branch and write operations, the ref for
    /// content reads, the head branch for pull requests.
    pub fn failing_at(self, scope: &str, operation: Operation, at: &str) -> Self {
        self.lock()
            .failures_at
            .insert((scope.to_owned(), operation, at.to_owned()));
        self
    }

    pub fn write_file(&self, repo: &str, branch: &str, path: &str, content: &[u8]) {
        let mut state = self.lock();
        let commit = state.next_commit();
        if let Some(entry) = state.repos.get_mut(&RepoId::from(repo)) {
            let target = entry.branches.entry(branch.to_owned()).or_default();
            target.files.insert(path.to_owned(), content.to_vec());
            target.commit_sha = commit;
        }
    }

    fn insert_repo(&self, repo: &str, default_branch: &str, archived: bool) {
        let mut state = self.lock();
        let commit = state.next_commit();
        let mut branches = BTreeMap::new();
        branches.insert(
            default_branch.to_owned(),
            MemBranch {
                commit_sha: commit,
                files: BTreeMap::new(),
            },
        );
        state.repos.insert(
            RepoId::from(repo),
            MemRepo {
                default_branch: default_branch.to_owned(),
                archived,
                branches,
                pulls: Vec::new(),
            },
        );
    }

    // -- inspection ---------------------------------------------------------

    pub fn calls(&self) -> Vec<HostCall> {
        self.lock().calls.clone()
    }

    /// Number of `operation` calls made against `scope`.
    pub fn count(&self, scope: &str, operation: Operation) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.operation == operation && call.scope == scope)
            .count()
    }

    pub fn file(&self, repo: &str, branch: &str, path: &str) -> Option<Vec<u8>> {
        self.lock()
            .branch(&RepoId::from(repo), branch)?
            .files
            .get(path)
            .cloned()
    }

    pub fn branch_exists(&self, repo: &str, branch: &str) -> bool {
        self.lock().branch(&RepoId::from(repo), branch).is_some()
    }

    pub fn pull_requests(&self, repo: &str) -> Vec<MemPullRequest> {
        self.lock()
            .repos
            .get(&RepoId::from(repo))
            .map(|entry| entry.pulls.clone())
            .unwrap_or_default()
    }
}

impl RepositoryHost for InMemoryHost {
    fn find_repository(&self, repo: &RepoId) -> HostResult<Lookup<RepositoryInfo>> {
        let mut state = self.lock();
        state.record(Operation::FindRepository, repo.as_str(), "", "")?;
        Ok(match state.repos.get(repo) {
            Some(entry) => Lookup::Found(RepositoryInfo {
                id: repo.clone(),
                default_branch: entry.default_branch.clone(),
                archived: entry.archived,
            }),
            None => Lookup::NotFound,
        })
    }

    fn get_branch(&self, repo: &RepoId, branch: &str) -> HostResult<Lookup<BranchRef>> {
        let mut state = self.lock();
        state.record(Operation::GetBranch, repo.as_str(), branch, branch)?;
        Ok(match state.branch(repo, branch) {
            Some(found) => Lookup::Found(BranchRef {
                name: branch.to_owned(),
                commit_sha: found.commit_sha.clone(),
            }),
            None => Lookup::NotFound,
        })
    }

    fn create_branch(&self, repo: &RepoId, branch: &str, from_commit_sha: &str) -> HostResult<()> {
        let op = Operation::CreateBranch;
        let mut state = self.lock();
        state.record(op, repo.as_str(), branch, branch)?;
        let entry = state
            .repos
            .get_mut(repo)
            .ok_or_else(|| status(op, 404, "Not Found"))?;
        if entry.branches.contains_key(branch) {
            return Err(status(op, 422, "Reference already exists"));
        }
        let source = entry
            .branches
            .values()
            .find(|candidate| candidate.commit_sha == from_commit_sha)
            .cloned()
            .ok_or_else(|| status(op, 422, "Object does not exist"))?;
        entry.branches.insert(branch.to_owned(), source);
        Ok(())
    }

    fn get_content(&self, repo: &RepoId, path: &str, git_ref: &str) -> HostResult<Lookup<RemoteFile>> {
        let mut state = self.lock();
        state.record(Operation::GetContent, repo.as_str(), path, git_ref)?;
        Ok(
            match state.branch(repo, git_ref).and_then(|b| b.files.get(path)) {
                Some(bytes) => Lookup::Found(RemoteFile {
                    identity: identity_of(bytes),
                    bytes: bytes.clone(),
                }),
                None => Lookup::NotFound,
            },
        )
    }

    fn put_content(&self, repo: &RepoId, request: PutContent<'_>) -> HostResult<()> {
        let op = Operation::PutContent;
        let mut state = self.lock();
        state.record(op, repo.as_str(), request.path, request.branch)?;
        let commit = state.next_commit();
        let branch = state
            .repos
            .get_mut(repo)
            .and_then(|entry| entry.branches.get_mut(request.branch))
            .ok_or_else(|| status(op, 404, "Branch not found"))?;

        match (branch.files.get(request.path), request.expected) {
            (Some(_), None) => return Err(status(op, 422, "\"sha\" wasn't supplied")),
            (Some(current), Some(expected)) if identity_of(current) != *expected => {
                return Err(status(op, 409, "sha does not match"));
            }
            (None, Some(_)) => return Err(status(op, 422, "file does not exist")),
            _ => {}
        }
        branch
            .files
            .insert(request.path.to_owned(), request.bytes.to_vec());
        branch.commit_sha = commit;
        Ok(())
    }

    fn delete_content(&self, repo: &RepoId, request: DeleteContent<'_>) -> HostResult<()> {
        let op = Operation::DeleteContent;
        let mut state = self.lock();
        state.record(op, repo.as_str(), request.path, request.branch)?;
        let commit = state.next_commit();
        let branch = state
            .repos
            .get_mut(repo)
            .and_then(|entry| entry.branches.get_mut(request.branch))
            .ok_or_else(|| status(op, 404, "Branch not found"))?;

        let current = branch
            .files
            .get(request.path)
            .ok_or_else(|| status(op, 404, "Not Found"))?;
        if identity_of(current) != *request.expected {
            return Err(status(op, 409, "sha does not match"));
        }
        branch.files.remove(request.path);
        branch.commit_sha = commit;
        Ok(())
    }

    fn create_pull_request(
        &self,
        repo: &RepoId,
        request: NewPullRequest<'_>,
    ) -> HostResult<PullRequest> {
        let op = Operation::CreatePullRequest;
        let mut state = self.lock();
        state.record(op, repo.as_str(), request.head, request.head)?;
        let entry = state
            .repos
            .get_mut(repo)
            .ok_or_else(|| status(op, 404, "Not Found"))?;

        let (Some(head), Some(base)) = (
            entry.branches.get(request.head),
            entry.branches.get(request.base),
        ) else {
            return Err(status(op, 422, "Validation Failed: head or base invalid"));
        };
        if head.files == base.files {
            return Err(status(
                op,
                422,
                &format!("No commits between {} and {}", request.base, request.head),
            ));
        }
        if entry
            .pulls
            .iter()
            .any(|pr| pr.head == request.head && pr.base == request.base)
        {
            return Err(status(op, 422, "A pull request already exists"));
        }

        let number = entry.pulls.len() as u64 + 1;
        entry.pulls.push(MemPullRequest {
            number,
            title: request.title.to_owned(),
            head: request.head.to_owned(),
            base: request.base.to_owned(),
            draft: request.draft,
        });
        Ok(PullRequest {
            number,
            url: format!("https://github.test/{repo}/pull/{number}"),
        })
    }

    fn list_repositories(&self, org: &str) -> HostResult<Lookup<Vec<RepositorySummary>>> {
        let mut state = self.lock();
        state.record(Operation::ListRepositories, org, org, org)?;
        let repos: Vec<RepositorySummary> = state
            .repos
            .iter()
            .filter(|(id, _)| id.owner() == org)
            .map(|(id, entry)| RepositorySummary {
                name: id.name().to_owned(),
                archived: entry.archived,
            })
            .collect();
        if repos.is_empty() {
            return Ok(Lookup::NotFound);
        }
        Ok(Lookup::Found(repos))
    }
}

fn status(operation: Operation, status: u16, message: &str) -> HostError {
    HostError::Status {
        operation,
        status,
        message: message.to_owned(),
    }
}
