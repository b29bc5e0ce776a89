//! # cmsync-sync
//!
//! One synchronization pass: fetch each named config object and write every
//! entry as a file.
//!
//! Call [`run_once`] with any [`DataSource`](cmsync_core::DataSource) and
//! [`Sink`](cmsync_core::Sink); use [`FsSink`] for the real filesystem.

pub mod error;
pub mod pipeline;
pub mod writer;

pub use error::SyncError;
pub use pipeline::{run, run_once, PassSummary};
pub use writer::{FsSink, WrittenFile};
