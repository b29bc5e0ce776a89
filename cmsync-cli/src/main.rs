//! cmsync: copy Kubernetes ConfigMaps into a directory as plain files.
//!
//! # Usage
//!
//! ```text
//! cmsync --configmaps <name>... --namespace <ns> --write-path <dir>
//!        [--loop --interval <duration>]
//!        [--kubeconfig <path>] [--context <name>] [--server <url>]
//!        [--request-timeout <duration>] [--log-format text|json]
//! ```

mod duration;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use cmsync_core::{Namespace, ObjectName, RunConfig};
use cmsync_daemon::{init_tracing, start_blocking, sync_pass, LogFormat, LoopOutcome};
use cmsync_source::{resolve, ApiSource, CredentialOptions};
use cmsync_sync::FsSink;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "cmsync",
    version,
    about = "Copy Kubernetes ConfigMaps into a directory as plain files",
    long_about = None,
)]
struct Cli {
    /// ConfigMaps to copy, in order. On a shared key the later map wins.
    #[arg(long = "configmaps", value_name = "NAME", required = true, num_args = 1..)]
    configmaps: Vec<String>,

    /// Namespace the ConfigMaps live in.
    #[arg(long)]
    namespace: String,

    /// Existing directory every entry is written into.
    #[arg(long = "write-path", value_name = "DIR")]
    write_path: PathBuf,

    /// Keep copying every --interval until stopped.
    #[arg(long = "loop", requires = "interval")]
    loop_mode: bool,

    /// Time between copies, e.g. `30s`, `5m`, `1h30m`.
    #[arg(long, value_parser = duration::parse)]
    interval: Option<Duration>,

    /// Path to a kubeconfig file.
    #[arg(long, value_name = "PATH")]
    kubeconfig: Option<PathBuf>,

    /// kubeconfig context to use instead of the current one.
    #[arg(long)]
    context: Option<String>,

    /// API server URL, e.g. `http://127.0.0.1:8001` for `kubectl proxy`.
    #[arg(long, value_name = "URL")]
    server: Option<String>,

    /// Timeout for each API request.
    #[arg(long, value_parser = duration::parse, default_value = "30s")]
    request_timeout: Duration,

    /// Log line format.
    #[arg(long, default_value = "text")]
    log_format: LogFormatArg,
}

impl Cli {
    fn run_config(&self) -> RunConfig {
        RunConfig::new(
            self.configmaps
                .iter()
                .map(|name| ObjectName::from(name.as_str()))
                .collect(),
            Namespace::from(self.namespace.as_str()),
            self.write_path.clone(),
            self.loop_mode,
            self.interval,
        )
    }

    fn run(self) -> Result<()> {
        let config = self.run_config();
        config.validate().context("invalid configuration")?;

        let credentials = resolve(&CredentialOptions {
            kubeconfig: self.kubeconfig.clone(),
            context: self.context.clone(),
            server: self.server.clone(),
        })
        .context("cannot build API client")?;

        let source = ApiSource::new(credentials, self.request_timeout)
            .context("cannot build API client")?;
        tracing::info!(
            server = source.server(),
            namespace = %config.namespace,
            configmaps = config.names.len(),
            write_path = %config.write_dir.display(),
            loop_mode = config.loop_mode,
            interval = ?config.interval,
            "starting",
        );

        let pass = sync_pass(source, FsSink, config.clone());
        match start_blocking(config, pass).context("error copying config maps")? {
            LoopOutcome::Completed { .. } => {}
            LoopOutcome::Cancelled { passes } => {
                tracing::info!(passes, "stopped");
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Log format argument
// ---------------------------------------------------------------------------

/// Thin wrapper so clap can parse [`LogFormat`] from CLI args.
#[derive(Debug, Clone, Default)]
pub struct LogFormatArg(pub LogFormat);

impl FromStr for LogFormatArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self(LogFormat::Text)),
            "json" => Ok(Self(LogFormat::Json)),
            other => Err(format!("unknown log format '{other}'; expected: text, json")),
        }
    }
}

impl fmt::Display for LogFormatArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            LogFormat::Text => write!(f, "text"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format.0);
    cli.run()
}
