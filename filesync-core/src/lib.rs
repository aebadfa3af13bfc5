//! filesync core library — domain types, input parsers, configuration.
//!
//! - [`types`] — repository identifiers, content identities, file specs
//! - [`spec`] — line parsers for file, delete, and name lists
//! - [`config`] — [`RawConfig`] → validated [`SyncConfig`]
//! - [`error`] — [`ConfigError`]

pub mod config;
pub mod error;
pub mod spec;
pub mod types;

pub use config::{DestinationInputs, HostSettings, PullRequestOptions, RawConfig, SyncConfig};
pub use error::ConfigError;
pub use spec::{parse_delete_specs, parse_file_specs, parse_list};
pub use types::{
    ContentIdentity, FileDeleteSpec, FileTransferSpec, RepoId, RepoPatternSpec, SourceFile,
};
