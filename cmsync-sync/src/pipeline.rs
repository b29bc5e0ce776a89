//! Shared sync pass entrypoint used by the CLI and the scheduling loop.

use std::path::Path;
use std::time::Instant;

use cmsync_core::{DataSource, Namespace, ObjectName, RunConfig, Sink};

use crate::error::SyncError;
use crate::writer::{target_path, write_entry, WrittenFile};

/// Outcome of one successful pass.
#[derive(Debug, Clone)]
pub struct PassSummary {
    pub namespace: String,
    pub objects: Vec<String>,
    pub files: Vec<WrittenFile>,
    /// Wall-clock time from the first fetch to the last write.
    pub duration_ms: u128,
}

impl PassSummary {
    pub fn written(&self) -> usize {
        self.files.len()
    }
}

/// Run one pass for a run configuration.
pub fn run<D, S>(source: &D, sink: &mut S, config: &RunConfig) -> Result<PassSummary, SyncError>
where
    D: DataSource + ?Sized,
    S: Sink,
{
    run_once(
        source,
        sink,
        &config.names,
        &config.namespace,
        &config.write_dir,
    )
}

/// Fetch every object in `names` and write each of its entries to
/// `<write_dir>/<key>`.
///
/// Objects are processed in the given order and each object is fully
/// fetched before any of its entries is written. The first error aborts the
/// pass; files written for earlier objects stay on disk. When two objects
/// share a key, the later object's value is the one left behind.
pub fn run_once<D, S>(
    source: &D,
    sink: &mut S,
    names: &[ObjectName],
    namespace: &Namespace,
    write_dir: &Path,
) -> Result<PassSummary, SyncError>
where
    D: DataSource + ?Sized,
    S: Sink,
{
    let started = Instant::now();
    let mut objects = Vec::with_capacity(names.len());
    let mut files = Vec::new();

    for name in names {
        let object = source.fetch(namespace, name)?;
        tracing::debug!(
            "fetched {}/{} ({} entries)",
            namespace,
            name,
            object.entries.len()
        );

        for (key, value) in &object.entries {
            let path = target_path(write_dir, name, key)?;
            files.push(write_entry(sink, &path, value)?);
        }
        objects.push(name.0.clone());
    }

    tracing::info!(
        "copied {} config objects ({} files) into {}",
        objects.len(),
        files.len(),
        write_dir.display()
    );

    Ok(PassSummary {
        namespace: namespace.0.clone(),
        objects,
        files,
        duration_ms: started.elapsed().as_millis(),
    })
}
