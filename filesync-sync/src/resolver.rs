//! Destination resolution: explicit list ∪ pattern matches − excludes.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};

use filesync_core::{DestinationInputs, RepoId, RepoPatternSpec};
use filesync_host::{Lookup, RepositoryHost, RepositorySummary};

use crate::error::SyncError;

/// Compute the destination set, sorted and free of duplicates.
///
/// Each organization named by a pattern is listed once. Archived
/// repositories never match a pattern, but an explicit entry is kept as
/// given. An organization that does not exist contributes nothing; any
/// other listing failure aborts resolution.
pub fn resolve_destinations(
    host: &dyn RepositoryHost,
    inputs: &DestinationInputs,
) -> Result<Vec<RepoId>, SyncError> {
    let mut selected: BTreeSet<RepoId> = inputs.explicit.iter().cloned().collect();
    selected.extend(discover(host, &inputs.patterns)?);

    let before = selected.len();
    selected.retain(|repo| !inputs.exclude.contains(repo.as_str()));
    if before != selected.len() {
        debug!(excluded = before - selected.len(), "applied destination excludes");
    }

    info!(count = selected.len(), "resolved destination repositories");
    Ok(selected.into_iter().collect())
}

/// Repositories matched by any pattern.
pub fn discover(
    host: &dyn RepositoryHost,
    patterns: &[RepoPatternSpec],
) -> Result<BTreeSet<RepoId>, SyncError> {
    let mut by_org: BTreeMap<&str, Vec<&RepoPatternSpec>> = BTreeMap::new();
    for pattern in patterns {
        by_org.entry(pattern.org_name.as_str()).or_default().push(pattern);
    }

    let mut found = BTreeSet::new();
    for (org, org_patterns) in by_org {
        let listing = match host.list_repositories(org) {
            Ok(Lookup::Found(listing)) => listing,
            Ok(Lookup::NotFound) => {
                debug!(org, "organization not found; its patterns match nothing");
                continue;
            }
            Err(source) => {
                return Err(SyncError::Discovery {
                    org: org.to_owned(),
                    source,
                })
            }
        };
        debug!(org, repositories = listing.len(), "listed organization");
        found.extend(matching(org, &listing, &org_patterns));
    }
    Ok(found)
}

fn matching(org: &str, listing: &[RepositorySummary], patterns: &[&RepoPatternSpec]) -> Vec<RepoId> {
    listing
        .iter()
        .filter(|repo| !repo.archived)
        .filter(|repo| patterns.iter().any(|p| p.matches(&repo.name)))
        .map(|repo| RepoId::from_parts(org, &repo.name))
        .collect()
}
