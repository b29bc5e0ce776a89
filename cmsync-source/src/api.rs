//! Blocking ConfigMap reader for the Kubernetes core/v1 API.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use cmsync_core::{DataSource, NamedObject, Namespace, ObjectName, SourceError};

use crate::credentials::Credentials;
use crate::error::CredentialsError;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// The subset of a ConfigMap body that gets materialized.
///
/// `binaryData` is not read.
#[derive(Debug, Deserialize)]
struct ConfigMapBody {
    #[serde(default)]
    data: Option<BTreeMap<String, String>>,
}

/// [`DataSource`] that GETs `/api/v1/namespaces/{ns}/configmaps/{name}`.
pub struct ApiSource {
    agent: ureq::Agent,
    base: Url,
    token: Option<String>,
}

impl ApiSource {
    /// Build the HTTP agent. A CA bundle in `credentials` is trusted on top of
    /// the platform store.
    pub fn new(credentials: Credentials, timeout: Duration) -> Result<Self, CredentialsError> {
        let base = Url::parse(&credentials.server).map_err(|source| {
            CredentialsError::InvalidServer {
                server: credentials.server.clone(),
                source,
            }
        })?;
        if base.cannot_be_a_base() {
            return Err(CredentialsError::OpaqueServer(credentials.server));
        }

        let mut builder = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("cmsync/", env!("CARGO_PKG_VERSION")));
        if let Some(pem) = credentials.ca_pem.as_deref() {
            builder = builder.tls_connector(Arc::new(tls_connector(pem)?));
        }

        Ok(Self {
            agent: builder.build(),
            base,
            token: credentials.token,
        })
    }

    pub fn server(&self) -> &str {
        self.base.as_str()
    }

    fn url(&self, namespace: &Namespace, name: &ObjectName) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend([
                "api",
                "v1",
                "namespaces",
                namespace.0.as_str(),
                "configmaps",
                name.0.as_str(),
            ]);
        }
        url
    }
}

fn tls_connector(pem: &[u8]) -> Result<native_tls::TlsConnector, CredentialsError> {
    let certificates = native_tls::Certificate::stack_from_pem(pem)
        .map_err(|source| CredentialsError::Tls { source })?;
    if certificates.is_empty() {
        return Err(CredentialsError::EmptyCaBundle);
    }
    let mut builder = native_tls::TlsConnector::builder();
    for certificate in certificates {
        builder.add_root_certificate(certificate);
    }
    builder
        .build()
        .map_err(|source| CredentialsError::Tls { source })
}

impl DataSource for ApiSource {
    fn fetch(&self, namespace: &Namespace, name: &ObjectName) -> Result<NamedObject, SourceError> {
        let url = self.url(namespace, name);
        let mut request = self
            .agent
            .request_url("GET", &url)
            .set("Accept", "application/json");
        if let Some(token) = self.token.as_deref() {
            request = request.set("Authorization", &format!("Bearer {token}"));
        }

        let response = match request.call() {
            Ok(response) => response,
            Err(ureq::Error::Status(404, _)) => {
                return Err(SourceError::not_found(namespace, name));
            }
            Err(ureq::Error::Status(code, response)) => {
                let body = response.into_string().unwrap_or_default();
                return Err(SourceError::Transport(format!(
                    "GET {url} returned HTTP {code}: {}",
                    body.trim()
                )));
            }
            Err(ureq::Error::Transport(err)) => {
                return Err(SourceError::Transport(format!("GET {url}: {err}")));
            }
        };

        let body = response
            .into_string()
            .map_err(|err| SourceError::Transport(format!("reading body of {url}: {err}")))?;
        let decoded: ConfigMapBody =
            serde_json::from_str(&body).map_err(|err| SourceError::Decode {
                namespace: namespace.clone(),
                name: name.clone(),
                message: err.to_string(),
            })?;

        let entries = decoded.data.unwrap_or_default();
        tracing::debug!(
            namespace = %namespace,
            name = %name,
            entries = entries.len(),
            "fetched config map",
        );
        Ok(NamedObject::new(namespace.clone(), name.clone(), entries))
    }
}
