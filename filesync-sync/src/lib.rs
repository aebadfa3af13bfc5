//! # filesync-sync
//!
//! Distributes files from a source repository into many destination
//! repositories through pull requests.
//!
//! - [`source`] — read the files to distribute
//! - [`resolver`] — work out which repositories receive them
//! - [`engine`] — per-destination compare / branch / write / delete / PR
//! - [`pipeline`] — the whole run, with a bounded worker pool and shutdown
//! - [`report`] — outcomes for callers to render

pub mod engine;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod resolver;
pub mod source;

pub use engine::{EngineSettings, SyncEngine, SyncTarget};
pub use error::SyncError;
pub use report::{
    DestinationReport, DestinationStatus, FileOutcome, FileReport, PullRequestOutcome, RunReport,
};
pub use resolver::resolve_destinations;
pub use source::{fetch_sources, SourceSnapshot};
