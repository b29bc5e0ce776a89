use std::time::Duration;

use tokio::sync::broadcast;

use cmsync_core::{DataSource, RunConfig, Sink};
use cmsync_sync::{pipeline, PassSummary, SyncError};

use crate::error::{io_err, DaemonError};

/// How the scheduling loop ended, with the number of passes that completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopOutcome {
    /// Single-pass mode finished its pass.
    Completed { passes: usize },
    /// Shutdown was requested while waiting for the next tick.
    Cancelled { passes: usize },
}

impl LoopOutcome {
    pub fn passes(&self) -> usize {
        match self {
            LoopOutcome::Completed { passes } | LoopOutcome::Cancelled { passes } => *passes,
        }
    }
}

/// Bundle a data source, a sink and the run configuration into the pass
/// function the loop calls on every tick.
pub fn sync_pass<D, S>(
    source: D,
    mut sink: S,
    config: RunConfig,
) -> impl FnMut() -> Result<PassSummary, SyncError> + Send + 'static
where
    D: DataSource + Send + 'static,
    S: Sink + Send + 'static,
{
    move || pipeline::run(&source, &mut sink, &config)
}

/// Validate `config`, then drive the loop on a fresh multi-thread runtime
/// until it completes, is cancelled by SIGINT/SIGTERM, or a pass fails.
pub fn start_blocking<F>(config: RunConfig, pass: F) -> Result<LoopOutcome, DaemonError>
where
    F: FnMut() -> Result<PassSummary, SyncError> + Send + 'static,
{
    config.validate()?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;

    runtime.block_on(async move {
        let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(16);

        let signal_handle = {
            let shutdown = shutdown_tx.clone();
            tokio::spawn(async move {
                match wait_for_signal().await {
                    Ok(signal) => {
                        tracing::info!(signal, "stop requested, finishing current pass");
                        let _ = shutdown.send(());
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "signal handler failed; only a pass error will stop the loop");
                    }
                }
            })
        };

        let outcome = run(&config, shutdown_rx, pass).await;
        signal_handle.abort();
        drop(shutdown_tx);
        outcome
    })
}

/// Run the scheduling loop.
///
/// Each iteration waits for the interval (zero before the only pass in
/// single-pass mode) or for `shutdown`, whichever is ready first;
/// `shutdown` wins a tie. A closed `shutdown` channel counts as a stop
/// request. The pass runs on the blocking pool and is never interrupted: a
/// stop request that arrives mid-pass is honoured before the next tick.
///
/// A failed pass ends the loop with [`DaemonError::Sync`]; reporting it is
/// left to the caller.
pub async fn run<F>(
    config: &RunConfig,
    mut shutdown: broadcast::Receiver<()>,
    pass: F,
) -> Result<LoopOutcome, DaemonError>
where
    F: FnMut() -> Result<PassSummary, SyncError> + Send + 'static,
{
    let mut pass = pass;
    let mut passes = 0usize;
    let mut delay = if config.loop_mode {
        config.interval
    } else {
        Duration::ZERO
    };

    loop {
        tokio::select! {
            biased;
            _ = shutdown.recv() => {
                tracing::info!(passes, "stop requested, exiting");
                return Ok(LoopOutcome::Cancelled { passes });
            }
            _ = tokio::time::sleep(delay) => {}
        }

        let (returned, result) = tokio::task::spawn_blocking(move || {
            let result = pass();
            (pass, result)
        })
        .await
        .map_err(|err| DaemonError::Runtime(format!("sync task join error: {err}")))?;
        pass = returned;

        let summary = result?;
        passes += 1;
        tracing::info!(
            pass = passes,
            namespace = %summary.namespace,
            objects = summary.objects.len(),
            files = summary.written(),
            duration_ms = summary.duration_ms,
            "config maps copied",
        );

        if !config.loop_mode {
            tracing::info!("no loop requested, exiting");
            return Ok(LoopOutcome::Completed { passes });
        }
        delay = config.interval;
    }
}

#[cfg(unix)]
async fn wait_for_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result.map(|()| "SIGINT"),
        _ = terminate.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await.map(|()| "ctrl-c")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use cmsync_core::{MemorySink, MemorySource, NamedObject, Namespace, ObjectName, SourceError};
    use tokio_test::{assert_err, assert_ok};

    fn summary() -> PassSummary {
        PassSummary {
            namespace: "default".into(),
            objects: Vec::new(),
            files: Vec::new(),
            duration_ms: 0,
        }
    }

    fn config(loop_mode: bool, interval: Duration) -> RunConfig {
        RunConfig::new(
            vec![ObjectName::from("foo")],
            Namespace::from("default"),
            PathBuf::from("/foo"),
            loop_mode,
            Some(interval),
        )
    }

    fn counting_pass(
        count: Arc<AtomicUsize>,
    ) -> impl FnMut() -> Result<PassSummary, SyncError> + Send + 'static {
        move || {
            count.fetch_add(1, Ordering::SeqCst);
            Ok(summary())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn single_pass_runs_once_without_waiting_for_interval() {
        let (_tx, rx) = broadcast::channel(1);
        let count = Arc::new(AtomicUsize::new(0));
        let started = tokio::time::Instant::now();

        let outcome = run(
            &config(false, Duration::from_secs(3600)),
            rx,
            counting_pass(count.clone()),
        )
        .await;

        assert_eq!(assert_ok!(outcome), LoopOutcome::Completed { passes: 1 });
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(started.elapsed() < Duration::from_secs(3600));
    }

    #[tokio::test(start_paused = true)]
    async fn loop_stops_after_cancellation_raised_on_third_pass() {
        let (tx, rx) = broadcast::channel(1);
        let count = Arc::new(AtomicUsize::new(0));
        let pass = {
            let count = count.clone();
            move || {
                if count.fetch_add(1, Ordering::SeqCst) + 1 == 3 {
                    let _ = tx.send(());
                }
                Ok(summary())
            }
        };

        let outcome = run(&config(true, Duration::from_secs(1)), rx, pass).await;

        assert_eq!(assert_ok!(outcome), LoopOutcome::Cancelled { passes: 3 });
        assert_eq!(count.load(Ordering::SeqCst), 3, "no fourth pass");
    }

    #[tokio::test(start_paused = true)]
    async fn loop_waits_interval_between_passes() {
        let (tx, rx) = broadcast::channel(1);
        let count = Arc::new(AtomicUsize::new(0));

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(25)).await;
            let _ = tx.send(());
        });

        let outcome = run(
            &config(true, Duration::from_secs(10)),
            rx,
            counting_pass(count.clone()),
        )
        .await;

        assert_eq!(assert_ok!(outcome), LoopOutcome::Cancelled { passes: 2 });
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn pending_cancellation_beats_ready_timer() {
        let (tx, rx) = broadcast::channel(1);
        tx.send(()).expect("send");
        let count = Arc::new(AtomicUsize::new(0));

        let outcome = run(
            &config(false, Duration::ZERO),
            rx,
            counting_pass(count.clone()),
        )
        .await;

        assert_eq!(assert_ok!(outcome), LoopOutcome::Cancelled { passes: 0 });
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn closed_shutdown_channel_stops_the_loop() {
        let (tx, rx) = broadcast::channel::<()>(1);
        drop(tx);
        let count = Arc::new(AtomicUsize::new(0));

        let outcome = run(
            &config(true, Duration::from_secs(1)),
            rx,
            counting_pass(count.clone()),
        )
        .await;

        assert_eq!(assert_ok!(outcome).passes(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_pass_is_fatal() {
        let (_tx, rx) = broadcast::channel(1);
        let count = Arc::new(AtomicUsize::new(0));
        let pass = {
            let count = count.clone();
            move || {
                if count.fetch_add(1, Ordering::SeqCst) + 1 == 2 {
                    return Err(SyncError::Source(SourceError::Transport(
                        "connection refused".into(),
                    )));
                }
                Ok(summary())
            }
        };

        let outcome = run(&config(true, Duration::from_secs(1)), rx, pass).await;

        let err = assert_err!(outcome);
        assert!(matches!(err, DaemonError::Sync(_)), "got: {err}");
        assert_eq!(count.load(Ordering::SeqCst), 2, "no pass after the failure");
    }

    #[tokio::test(start_paused = true)]
    async fn sync_pass_refetches_every_tick() {
        let source = MemorySource::new();
        source.insert(NamedObject::with_entries("default", "foo", [("foo", "foo")]));
        let sink = MemorySink::new();
        let cfg = config(true, Duration::from_secs(1));
        let (tx, rx) = broadcast::channel(1);

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(3500)).await;
            let _ = tx.send(());
        });

        let outcome = run(
            &cfg,
            rx,
            sync_pass(source.clone(), sink.clone(), cfg.clone()),
        )
        .await;

        assert_eq!(assert_ok!(outcome).passes(), 3);
        assert_eq!(source.fetched().len(), 3);
        assert_eq!(sink.files().len(), 3);
        assert_eq!(
            sink.contents().get(&PathBuf::from("/foo/foo")),
            Some(&"foo".to_string())
        );
    }
}
