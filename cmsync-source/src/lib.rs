//! # cmsync-source
//!
//! The production [`DataSource`](cmsync_core::DataSource): ConfigMaps read
//! from a Kubernetes API server over HTTP, plus the credential lookup that
//! finds the server and bearer token.

pub mod api;
pub mod credentials;
pub mod error;
pub mod kubeconfig;

pub use api::ApiSource;
pub use credentials::{resolve, CredentialOptions, Credentials, Environment};
pub use error::CredentialsError;
pub use kubeconfig::Kubeconfig;
