//! Reading the files to distribute from the source repository.

use tracing::{debug, info};

use filesync_core::{FileTransferSpec, RepoId, SourceFile};
use filesync_host::{Lookup, RepositoryHost};

use crate::error::SyncError;

/// Files read from the source, plus the branch they were read at.
#[derive(Debug, Clone)]
pub struct SourceSnapshot {
    pub branch: String,
    pub files: Vec<SourceFile>,
}

/// Read every spec from `repo` at `branch` (or its default branch).
///
/// All-or-nothing: a file that is missing or cannot be read ends the run
/// before any destination is touched.
pub fn fetch_sources(
    host: &dyn RepositoryHost,
    repo: &RepoId,
    branch: Option<&str>,
    specs: &[FileTransferSpec],
) -> Result<SourceSnapshot, SyncError> {
    let fetch_err = |source| SyncError::SourceFetch {
        repo: repo.clone(),
        source,
    };

    let branch = match branch {
        Some(branch) => branch.to_owned(),
        None => match host.find_repository(repo).map_err(fetch_err)? {
            Lookup::Found(info) => info.default_branch,
            Lookup::NotFound => {
                return Err(SyncError::SourceRepositoryNotFound { repo: repo.clone() })
            }
        },
    };
    debug!(repo = %repo, branch = %branch, files = specs.len(), "reading source files");

    let mut files = Vec::with_capacity(specs.len());
    for spec in specs {
        let remote = host
            .get_content(repo, &spec.source_path, &branch)
            .map_err(fetch_err)?
            .found()
            .ok_or_else(|| SyncError::SourceFileNotFound {
                repo: repo.clone(),
                path: spec.source_path.clone(),
                branch: branch.clone(),
            })?;
        info!(
            path = %spec.source_path,
            identity = %remote.identity,
            bytes = remote.bytes.len(),
            "loaded source file"
        );
        files.push(SourceFile {
            spec: spec.clone(),
            content_hash: remote.identity,
            payload: remote.bytes,
        });
    }

    Ok(SourceSnapshot { branch, files })
}
