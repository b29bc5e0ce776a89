use std::path::PathBuf;

use thiserror::Error;

/// Error surface for the scheduling loop and its runtime.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("I/O error at {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Config(#[from] cmsync_core::ConfigError),

    /// A pass failed; fatal for the loop.
    #[error(transparent)]
    Sync(#[from] cmsync_sync::SyncError),

    #[error("runtime error: {0}")]
    Runtime(String),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DaemonError {
    DaemonError::Io {
        path: path.into(),
        source,
    }
}
