use std::path::PathBuf;

use thiserror::Error;

/// Failures while locating the API server and its credentials.
#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("I/O error at {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// kubeconfig YAML could not be parsed.
    #[error("failed to parse kubeconfig at {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("kubeconfig has no context named '{0}'")]
    UnknownContext(String),

    #[error("kubeconfig has no current-context and none was requested")]
    NoContext,

    #[error("kubeconfig context '{context}' refers to missing {kind} '{name}'")]
    DanglingReference {
        context: String,
        kind: &'static str,
        name: String,
    },

    #[error("cluster '{cluster}' has invalid certificate-authority-data")]
    CertificateData {
        cluster: String,
        #[source]
        source: base64::DecodeError,
    },

    #[error("invalid API server URL '{server}'")]
    InvalidServer {
        server: String,
        #[source]
        source: url::ParseError,
    },

    #[error("API server URL '{0}' cannot carry a path")]
    OpaqueServer(String),

    #[error("cluster CA bundle contains no certificates")]
    EmptyCaBundle,

    #[error("cannot load cluster CA certificate")]
    Tls {
        #[source]
        source: native_tls::Error,
    },

    #[error("no API server configured: pass --server or --kubeconfig, or run in-cluster")]
    NoServer,
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> CredentialsError {
    CredentialsError::Io {
        path: path.into(),
        source,
    }
}
