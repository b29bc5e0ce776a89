//! Domain types for ConfigMap materialization.
//!
//! All path fields use `PathBuf`; never `&str` or `String` for filesystem paths.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed namespace on the cluster control plane.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace(pub String);

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for Namespace {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Namespace {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// A strongly-typed name of a config object inside a namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectName(pub String);

impl fmt::Display for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ObjectName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ObjectName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// Entry key → entry value. Iteration is ordered by key, which fixes the
/// per-object write order.
pub type Entries = BTreeMap<String, String>;

/// A config object as read from the data source at fetch time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedObject {
    pub namespace: Namespace,
    pub name: ObjectName,
    pub entries: Entries,
}

impl NamedObject {
    pub fn new(namespace: Namespace, name: ObjectName, entries: Entries) -> Self {
        Self {
            namespace,
            name,
            entries,
        }
    }

    /// Build an object from `(key, value)` pairs.
    pub fn with_entries<K, V>(
        namespace: impl Into<Namespace>,
        name: impl Into<ObjectName>,
        entries: impl IntoIterator<Item = (K, V)>,
    ) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            entries: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Per-process run configuration, built once from parsed flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Delay between ticks. Zero means "run once, immediately".
    pub interval: Duration,
    /// Objects to fetch, in the order they are processed.
    pub names: Vec<ObjectName>,
    pub namespace: Namespace,
    /// Directory every entry is written into.
    pub write_dir: PathBuf,
    /// Keep scheduling passes until cancelled.
    pub loop_mode: bool,
}

impl RunConfig {
    pub fn new(
        names: Vec<ObjectName>,
        namespace: Namespace,
        write_dir: PathBuf,
        loop_mode: bool,
        interval: Option<Duration>,
    ) -> Self {
        Self {
            interval: interval.unwrap_or(Duration::ZERO),
            names,
            namespace,
            write_dir,
            loop_mode,
        }
    }

    /// Check the configuration before the first pass runs.
    ///
    /// The write directory must already exist; it is never created.
    /// Whether it is writable is left to the first create, which reports the
    /// real I/O error.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.namespace.0.trim().is_empty() {
            return Err(ConfigError::EmptyNamespace);
        }
        if let Some(position) = self.names.iter().position(|n| n.0.trim().is_empty()) {
            return Err(ConfigError::EmptyObjectName { position });
        }
        if self.loop_mode && self.interval.is_zero() {
            return Err(ConfigError::LoopWithoutInterval);
        }
        let meta = std::fs::metadata(&self.write_dir).map_err(|source| ConfigError::WriteDir {
            path: self.write_dir.clone(),
            source,
        })?;
        if !meta.is_dir() {
            return Err(ConfigError::NotADirectory {
                path: self.write_dir.clone(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
