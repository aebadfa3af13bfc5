//! Domain types shared by every filesync crate.
//!
//! Repository identifiers and content identities are newtypes over `String`
//! so the two can never be swapped at a call site.

use std::fmt;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A repository identifier in `org/name` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RepoId(pub String);

impl RepoId {
    /// Validate `input` as `org/name`: exactly one `/`, both sides non-empty.
    pub fn parse(input: &str) -> Result<Self, ConfigError> {
        let trimmed = input.trim();
        match trimmed.split_once('/') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
                Ok(Self(trimmed.to_owned()))
            }
            _ => Err(ConfigError::InvalidRepository {
                input: input.to_owned(),
            }),
        }
    }

    /// Build an identifier from its two halves.
    pub fn from_parts(owner: &str, name: &str) -> Self {
        Self(format!("{owner}/{name}"))
    }

    /// The organization (or user) half.
    pub fn owner(&self) -> &str {
        self.0.split_once('/').map_or(self.0.as_str(), |(owner, _)| owner)
    }

    /// The short repository name.
    pub fn name(&self) -> &str {
        self.0.split_once('/').map_or(self.0.as_str(), |(_, name)| name)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for RepoId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Opaque content-identity token reported by the host (a blob SHA on GitHub).
///
/// Two files with equal identity have equal content. The identity of the
/// current remote file is also the precondition for updates and deletes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentIdentity(pub String);

impl fmt::Display for ContentIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for ContentIdentity {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for ContentIdentity {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ---------------------------------------------------------------------------
// File specs
// ---------------------------------------------------------------------------

/// A file to copy from the source repository into every destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTransferSpec {
    pub source_path: String,
    /// Defaults to `source_path` when the input line has no `=`.
    pub destination_path: String,
}

/// A file to remove from every destination. Only `destination_path` is acted on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDeleteSpec {
    pub source_path: String,
    pub destination_path: String,
}

/// A [`FileTransferSpec`] after its content was read from the source repository.
///
/// Built once by the fetch step and shared read-only with every destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub spec: FileTransferSpec,
    pub content_hash: ContentIdentity,
    pub payload: Vec<u8>,
}

impl SourceFile {
    pub fn destination_path(&self) -> &str {
        &self.spec.destination_path
    }
}

// ---------------------------------------------------------------------------
// Repository patterns
// ---------------------------------------------------------------------------

/// An `org/pattern` destination filter.
///
/// The pattern is case-insensitive and anchored at the start of the short
/// repository name only: `test-.*` matches `test-repo-1` and also
/// `Test-repo-1-old`. Callers wanting an exact match write `^...$`.
#[derive(Debug, Clone)]
pub struct RepoPatternSpec {
    pub org_name: String,
    pub name_pattern: Regex,
    raw: String,
}

impl RepoPatternSpec {
    /// Parse `org/pattern`. Zero or several `/`, or an empty side, is an error.
    pub fn parse(input: &str) -> Result<Self, ConfigError> {
        let raw = input.trim();
        let Some((org, pattern)) = raw.split_once('/') else {
            return Err(ConfigError::InvalidPattern {
                input: raw.to_owned(),
                reason: "expected org/pattern",
            });
        };
        if pattern.contains('/') {
            return Err(ConfigError::InvalidPattern {
                input: raw.to_owned(),
                reason: "more than one '/'",
            });
        }
        if org.is_empty() || pattern.is_empty() {
            return Err(ConfigError::InvalidPattern {
                input: raw.to_owned(),
                reason: "organization and pattern must both be non-empty",
            });
        }

        let name_pattern = RegexBuilder::new(&format!("^(?:{pattern})"))
            .case_insensitive(true)
            .build()
            .map_err(|source| ConfigError::InvalidRegex {
                input: raw.to_owned(),
                source,
            })?;

        Ok(Self {
            org_name: org.to_owned(),
            name_pattern,
            raw: raw.to_owned(),
        })
    }

    /// Whether a short repository name (no `org/` prefix) matches.
    pub fn matches(&self, repo_name: &str) -> bool {
        self.name_pattern.is_match(repo_name)
    }
}

impl fmt::Display for RepoPatternSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
