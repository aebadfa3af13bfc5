//! Error types for filesync-core.

use thiserror::Error;

/// All errors that can arise while turning raw inputs into a [`SyncConfig`].
///
/// Every variant is fatal: the run aborts before any host interaction.
///
/// [`SyncConfig`]: crate::config::SyncConfig
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required option was empty or absent.
    #[error("missing required configuration: {key}")]
    Missing { key: &'static str },

    /// A repository pattern was not of the form `org/pattern`.
    #[error("invalid repository pattern '{input}': {reason}")]
    InvalidPattern { input: String, reason: &'static str },

    /// The pattern half of `org/pattern` did not compile.
    #[error("invalid regular expression in '{input}': {source}")]
    InvalidRegex {
        input: String,
        #[source]
        source: regex::Error,
    },

    /// A repository identifier was not of the form `org/name`.
    #[error("invalid repository identifier '{input}': expected org/name")]
    InvalidRepository { input: String },

    /// A numeric option was zero.
    #[error("{key} must be greater than zero")]
    NotPositive { key: &'static str },

    /// Neither explicit repositories, patterns, nor a current repository were given.
    #[error("no destination repositories configured")]
    NoDestinations,
}
