//! Error types for cmsync-sync.

use std::path::PathBuf;

use thiserror::Error;

use cmsync_core::{ObjectName, SourceError};

/// All errors that can abort a pass. Every variant is fatal.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Fetching a config object failed (not found, unreachable, undecodable).
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Creating or writing a target file failed, with annotated path.
    #[error("I/O error at {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An entry key that cannot be used as a plain file name.
    #[error("config object {object} has entry key {key:?} that is not a plain file name")]
    InvalidKey { object: ObjectName, key: String },
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
