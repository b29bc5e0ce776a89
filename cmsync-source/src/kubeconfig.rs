//! Minimal kubeconfig reader.
//!
//! Only the pieces needed to reach the API server are modelled: cluster
//! `server` and CA, user `token` / `tokenFile`, and the context that ties
//! them together. Unknown fields are ignored. Relative file references are
//! resolved against the kubeconfig's own directory.

use std::path::{Path, PathBuf};

use base64::Engine as _;
use serde::Deserialize;

use crate::error::{io_err, CredentialsError};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Kubeconfig {
    #[serde(rename = "current-context", default)]
    pub current_context: Option<String>,
    #[serde(default)]
    pub clusters: Vec<NamedCluster>,
    #[serde(default)]
    pub users: Vec<NamedUser>,
    #[serde(default)]
    pub contexts: Vec<NamedContext>,
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedCluster {
    pub name: String,
    pub cluster: Cluster,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Cluster {
    pub server: String,
    /// PEM bundle file for the cluster CA.
    #[serde(rename = "certificate-authority", default)]
    pub certificate_authority: Option<PathBuf>,
    /// Base64 of the PEM bundle; wins over `certificate-authority`.
    #[serde(rename = "certificate-authority-data", default)]
    pub certificate_authority_data: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedUser {
    pub name: String,
    #[serde(default)]
    pub user: User,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct User {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(rename = "tokenFile", default)]
    pub token_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedContext {
    pub name: String,
    pub context: Context,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Context {
    pub cluster: String,
    #[serde(default)]
    pub user: Option<String>,
}

/// Server URL, optional token and optional CA bundle selected from a
/// kubeconfig context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextTarget {
    pub server: String,
    pub token: Option<String>,
    pub ca_pem: Option<Vec<u8>>,
}

impl Kubeconfig {
    /// Read and parse the kubeconfig at `path`.
    pub fn load(path: &Path) -> Result<Self, CredentialsError> {
        let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
        Self::parse(&contents, path)
    }

    pub(crate) fn parse(contents: &str, path: &Path) -> Result<Self, CredentialsError> {
        let mut config: Self =
            serde_yaml::from_str(contents).map_err(|source| CredentialsError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    fn resolve_path(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Resolve `context` (or the current context) into a server and token.
    ///
    /// A `tokenFile` is read at resolution time; an inline `token` wins over it.
    pub fn target(&self, context: Option<&str>) -> Result<ContextTarget, CredentialsError> {
        let wanted = match context.or(self.current_context.as_deref()) {
            Some(name) if !name.is_empty() => name,
            _ => return Err(CredentialsError::NoContext),
        };
        let ctx = self
            .contexts
            .iter()
            .find(|c| c.name == wanted)
            .ok_or_else(|| CredentialsError::UnknownContext(wanted.to_string()))?;

        let cluster = self
            .clusters
            .iter()
            .find(|c| c.name == ctx.context.cluster)
            .ok_or_else(|| CredentialsError::DanglingReference {
                context: wanted.to_string(),
                kind: "cluster",
                name: ctx.context.cluster.clone(),
            })?;

        let token = match ctx.context.user.as_deref() {
            None => None,
            Some(user_name) => {
                let user = self
                    .users
                    .iter()
                    .find(|u| u.name == user_name)
                    .ok_or_else(|| CredentialsError::DanglingReference {
                        context: wanted.to_string(),
                        kind: "user",
                        name: user_name.to_string(),
                    })?;
                match (&user.user.token, &user.user.token_file) {
                    (Some(token), _) => Some(token.trim().to_string()),
                    (None, Some(file)) => Some(read_token(&self.resolve_path(file))?),
                    (None, None) => None,
                }
            }
        };

        let ca_pem = match (
            &cluster.cluster.certificate_authority_data,
            &cluster.cluster.certificate_authority,
        ) {
            (Some(data), _) => Some(
                base64::engine::general_purpose::STANDARD
                    .decode(data.trim())
                    .map_err(|source| CredentialsError::CertificateData {
                        cluster: cluster.name.clone(),
                        source,
                    })?,
            ),
            (None, Some(file)) => {
                let path = self.resolve_path(file);
                Some(std::fs::read(&path).map_err(|e| io_err(&path, e))?)
            }
            (None, None) => None,
        };

        Ok(ContextTarget {
            server: cluster.cluster.server.trim_end_matches('/').to_string(),
            token,
            ca_pem,
        })
    }
}

pub(crate) fn read_token(path: &Path) -> Result<String, CredentialsError> {
    std::fs::read_to_string(path)
        .map(|t| t.trim().to_string())
        .map_err(|e| io_err(path, e))
}
