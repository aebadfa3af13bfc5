//! Error types for filesync-host.

use std::fmt;

use thiserror::Error;

/// The host operation an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    FindRepository,
    GetBranch,
    CreateBranch,
    GetContent,
    PutContent,
    DeleteContent,
    CreatePullRequest,
    ListRepositories,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::FindRepository => "find repository",
            Operation::GetBranch => "get branch",
            Operation::CreateBranch => "create branch",
            Operation::GetContent => "get content",
            Operation::PutContent => "put content",
            Operation::DeleteContent => "delete content",
            Operation::CreatePullRequest => "create pull request",
            Operation::ListRepositories => "list repositories",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed host call other than "not found".
///
/// Not-found is never an error: lookups return [`Lookup::NotFound`].
///
/// [`Lookup::NotFound`]: crate::Lookup::NotFound
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HostError {
    /// The request did not complete within the configured timeout.
    #[error("{operation} timed out")]
    Timeout { operation: Operation },

    /// The host answered with a non-success status.
    #[error("{operation} failed with HTTP {status}: {message}")]
    Status {
        operation: Operation,
        status: u16,
        message: String,
    },

    /// Connection, DNS, or TLS failure.
    #[error("{operation} transport error: {message}")]
    Transport {
        operation: Operation,
        message: String,
    },

    /// The host answered but the body was not what the operation expects.
    #[error("{operation} returned an unexpected response: {message}")]
    Decode {
        operation: Operation,
        message: String,
    },
}

impl HostError {
    pub fn operation(&self) -> Operation {
        match self {
            HostError::Timeout { operation }
            | HostError::Status { operation, .. }
            | HostError::Transport { operation, .. }
            | HostError::Decode { operation, .. } => *operation,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, HostError::Timeout { .. })
    }
}

pub(crate) fn decode_err(operation: Operation, message: impl Into<String>) -> HostError {
    HostError::Decode {
        operation,
        message: message.into(),
    }
}
