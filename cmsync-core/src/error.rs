//! Error types for cmsync-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::{Namespace, ObjectName};

/// Failures reported by a [`DataSource`](crate::source::DataSource).
#[derive(Debug, Error)]
pub enum SourceError {
    /// The named object does not exist in the namespace.
    #[error("config object {namespace}/{name} not found")]
    NotFound {
        namespace: Namespace,
        name: ObjectName,
    },

    /// The data source could not be reached or refused the query.
    #[error("transport error: {0}")]
    Transport(String),

    /// The data source answered, but the payload could not be decoded.
    #[error("failed to decode {namespace}/{name}: {message}")]
    Decode {
        namespace: Namespace,
        name: ObjectName,
        message: String,
    },
}

impl SourceError {
    pub fn not_found(namespace: &Namespace, name: &ObjectName) -> Self {
        Self::NotFound {
            namespace: namespace.clone(),
            name: name.clone(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Invalid run configuration, detected before the first pass.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("namespace must not be empty")]
    EmptyNamespace,

    #[error("config object name at position {position} is empty")]
    EmptyObjectName { position: usize },

    #[error("--loop requires a non-zero --interval")]
    LoopWithoutInterval,

    /// The write path could not be inspected (usually: it does not exist).
    #[error("cannot use write path {path}")]
    WriteDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("write path {path} is not a directory")]
    NotADirectory { path: PathBuf },
}
