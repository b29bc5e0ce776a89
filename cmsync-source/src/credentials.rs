//! Locate the API server and bearer token.
//!
//! Lookup order:
//! 1. `--kubeconfig <path>`
//! 2. the first entry of `$KUBECONFIG`
//! 3. the in-cluster service account (`KUBERNETES_SERVICE_HOST`/`_PORT`)
//! 4. `~/.kube/config`
//!
//! `--server` replaces whatever server the lookup produced and keeps its
//! token and CA; when no source is found at all it is used bare (e.g.
//! `kubectl proxy`).

use std::path::{Path, PathBuf};

use crate::error::CredentialsError;
use crate::kubeconfig::{read_token, Kubeconfig};

pub const SERVICE_ACCOUNT_TOKEN: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";
pub const SERVICE_ACCOUNT_CA: &str = "/var/run/secrets/kubernetes.io/serviceaccount/ca.crt";

/// Everything needed to talk to the API server.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub server: String,
    pub token: Option<String>,
    /// PEM bundle to trust in addition to the platform store.
    pub ca_pem: Option<Vec<u8>>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("server", &self.server)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("ca_pem", &self.ca_pem.as_ref().map(Vec::len))
            .finish()
    }
}

/// Flags that influence the lookup.
#[derive(Debug, Clone, Default)]
pub struct CredentialOptions {
    pub kubeconfig: Option<PathBuf>,
    pub context: Option<String>,
    pub server: Option<String>,
}

/// Process environment inputs, captured once so the lookup is testable.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    pub kubeconfig_var: Option<String>,
    pub service_host: Option<String>,
    pub service_port: Option<String>,
    pub token_path: PathBuf,
    pub ca_path: PathBuf,
    pub home: Option<PathBuf>,
}

impl Environment {
    pub fn from_process() -> Self {
        Self {
            kubeconfig_var: std::env::var("KUBECONFIG").ok(),
            service_host: std::env::var("KUBERNETES_SERVICE_HOST").ok(),
            service_port: std::env::var("KUBERNETES_SERVICE_PORT").ok(),
            token_path: PathBuf::from(SERVICE_ACCOUNT_TOKEN),
            ca_path: PathBuf::from(SERVICE_ACCOUNT_CA),
            home: dirs::home_dir(),
        }
    }

    fn kubeconfig_from_var(&self) -> Option<PathBuf> {
        let raw = self.kubeconfig_var.as_deref()?;
        std::env::split_paths(raw).find(|p| !p.as_os_str().is_empty())
    }

    fn in_cluster(&self) -> Option<(String, String)> {
        match (self.service_host.as_deref(), self.service_port.as_deref()) {
            (Some(host), Some(port)) if !host.is_empty() && !port.is_empty() => {
                Some((host.to_string(), port.to_string()))
            }
            _ => None,
        }
    }

    fn default_kubeconfig(&self) -> Option<PathBuf> {
        self.home
            .as_ref()
            .map(|home| home.join(".kube").join("config"))
            .filter(|path| path.is_file())
    }
}

/// Resolve credentials from the process environment.
pub fn resolve(options: &CredentialOptions) -> Result<Credentials, CredentialsError> {
    resolve_with(options, &Environment::from_process())
}

/// Resolve credentials against an explicit environment.
pub fn resolve_with(
    options: &CredentialOptions,
    env: &Environment,
) -> Result<Credentials, CredentialsError> {
    let found = lookup(options, env)?;
    match (found, options.server.as_deref()) {
        (Some(creds), None) => Ok(creds),
        (Some(creds), Some(server)) => Ok(Credentials {
            server: normalize_server(server),
            ..creds
        }),
        (None, Some(server)) => Ok(Credentials {
            server: normalize_server(server),
            token: None,
            ca_pem: None,
        }),
        (None, None) => Err(CredentialsError::NoServer),
    }
}

fn lookup(
    options: &CredentialOptions,
    env: &Environment,
) -> Result<Option<Credentials>, CredentialsError> {
    if let Some(path) = options.kubeconfig.as_deref() {
        return from_kubeconfig(path, options.context.as_deref()).map(Some);
    }
    if let Some(path) = env.kubeconfig_from_var() {
        return from_kubeconfig(&path, options.context.as_deref()).map(Some);
    }
    if let Some((host, port)) = env.in_cluster() {
        tracing::debug!(host = %host, port = %port, "using in-cluster service account");
        let token = read_token(&env.token_path)?;
        let ca_pem = match std::fs::read(&env.ca_path) {
            Ok(pem) => Some(pem),
            Err(err) => {
                tracing::warn!(
                    path = %env.ca_path.display(),
                    error = %err,
                    "no service account CA; trusting the platform store only",
                );
                None
            }
        };
        return Ok(Some(Credentials {
            server: in_cluster_server(&host, &port),
            token: Some(token),
            ca_pem,
        }));
    }
    if let Some(path) = env.default_kubeconfig() {
        return from_kubeconfig(&path, options.context.as_deref()).map(Some);
    }
    Ok(None)
}

fn from_kubeconfig(path: &Path, context: Option<&str>) -> Result<Credentials, CredentialsError> {
    tracing::debug!(path = %path.display(), "loading kubeconfig");
    let target = Kubeconfig::load(path)?.target(context)?;
    Ok(Credentials {
        server: target.server,
        token: target.token,
        ca_pem: target.ca_pem,
    })
}

fn in_cluster_server(host: &str, port: &str) -> String {
    if host.contains(':') {
        format!("https://[{host}]:{port}")
    } else {
        format!("https://{host}:{port}")
    }
}

fn normalize_server(server: &str) -> String {
    server.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const KUBECONFIG: &str = r#"
current-context: local
clusters:
  - name: local
    cluster:
      server: https://127.0.0.1:6443
      certificate-authority-data: Y2x1c3Rlci1jYQ==
contexts:
  - name: local
    context:
      cluster: local
      user: admin
users:
  - name: admin
    user:
      token: admin-token
"#;

    fn write_kubeconfig(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("config");
        std::fs::write(&path, KUBECONFIG).unwrap();
        path
    }

    #[test]
    fn explicit_kubeconfig_wins_over_in_cluster() {
        let tmp = TempDir::new().unwrap();
        let options = CredentialOptions {
            kubeconfig: Some(write_kubeconfig(&tmp)),
            ..Default::default()
        };
        let env = Environment {
            service_host: Some("10.0.0.1".into()),
            service_port: Some("443".into()),
            ..Default::default()
        };
        let creds = resolve_with(&options, &env).unwrap();
        assert_eq!(creds.server, "https://127.0.0.1:6443");
        assert_eq!(creds.token.as_deref(), Some("admin-token"));
        assert_eq!(creds.ca_pem.as_deref(), Some(&b"cluster-ca"[..]));
    }

    #[test]
    fn kubeconfig_env_var_uses_first_entry() {
        let tmp = TempDir::new().unwrap();
        let path = write_kubeconfig(&tmp);
        let joined = std::env::join_paths([path.clone(), tmp.path().join("other")]).unwrap();
        let env = Environment {
            kubeconfig_var: Some(joined.to_string_lossy().into_owned()),
            ..Default::default()
        };
        let creds = resolve_with(&CredentialOptions::default(), &env).unwrap();
        assert_eq!(creds.server, "https://127.0.0.1:6443");
    }

    #[test]
    fn in_cluster_reads_service_account_token() {
        let tmp = TempDir::new().unwrap();
        let token_path = tmp.path().join("token");
        std::fs::write(&token_path, "sa-token\n").unwrap();
        let ca_path = tmp.path().join("ca.crt");
        std::fs::write(&ca_path, "in-cluster-ca").unwrap();
        let env = Environment {
            service_host: Some("10.96.0.1".into()),
            service_port: Some("443".into()),
            token_path,
            ca_path,
            ..Default::default()
        };
        let creds = resolve_with(&CredentialOptions::default(), &env).unwrap();
        assert_eq!(creds.server, "https://10.96.0.1:443");
        assert_eq!(creds.token.as_deref(), Some("sa-token"));
        assert_eq!(creds.ca_pem.as_deref(), Some(&b"in-cluster-ca"[..]));
    }

    #[test]
    fn in_cluster_without_ca_file_still_resolves() {
        let tmp = TempDir::new().unwrap();
        let token_path = tmp.path().join("token");
        std::fs::write(&token_path, "sa-token").unwrap();
        let env = Environment {
            service_host: Some("10.96.0.1".into()),
            service_port: Some("443".into()),
            token_path,
            ca_path: tmp.path().join("missing.crt"),
            ..Default::default()
        };
        let creds = resolve_with(&CredentialOptions::default(), &env).unwrap();
        assert_eq!(creds.ca_pem, None);
    }

    #[test]
    fn in_cluster_ipv6_host_is_bracketed() {
        assert_eq!(in_cluster_server("fd00::1", "443"), "https://[fd00::1]:443");
    }

    #[test]
    fn home_kubeconfig_is_the_fallback() {
        let home = TempDir::new().unwrap();
        let kube_dir = home.path().join(".kube");
        std::fs::create_dir_all(&kube_dir).unwrap();
        std::fs::write(kube_dir.join("config"), KUBECONFIG).unwrap();
        let env = Environment {
            home: Some(home.path().to_path_buf()),
            ..Default::default()
        };
        let creds = resolve_with(&CredentialOptions::default(), &env).unwrap();
        assert_eq!(creds.token.as_deref(), Some("admin-token"));
    }

    #[test]
    fn server_override_keeps_token() {
        let tmp = TempDir::new().unwrap();
        let options = CredentialOptions {
            kubeconfig: Some(write_kubeconfig(&tmp)),
            server: Some("http://127.0.0.1:8001/".into()),
            ..Default::default()
        };
        let creds = resolve_with(&options, &Environment::default()).unwrap();
        assert_eq!(creds.server, "http://127.0.0.1:8001");
        assert_eq!(creds.token.as_deref(), Some("admin-token"));
        assert!(creds.ca_pem.is_some());
    }

    #[test]
    fn bare_server_has_no_token() {
        let options = CredentialOptions {
            server: Some("http://127.0.0.1:8001".into()),
            ..Default::default()
        };
        let creds = resolve_with(&options, &Environment::default()).unwrap();
        assert_eq!(creds.token, None);
    }

    #[test]
    fn nothing_configured_is_an_error() {
        let err = resolve_with(&CredentialOptions::default(), &Environment::default()).unwrap_err();
        assert!(matches!(err, CredentialsError::NoServer));
    }

    #[test]
    fn debug_output_redacts_token() {
        let creds = Credentials {
            server: "https://k".into(),
            token: Some("secret".into()),
            ca_pem: None,
        };
        let rendered = format!("{creds:?}");
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
