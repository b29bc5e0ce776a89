//! Scheduling loop: run one pass, or keep running passes on an interval until
//! a shutdown signal arrives.

mod error;
pub mod logging;
mod runtime;

pub use error::DaemonError;
pub use logging::{init_tracing, LogFormat};
pub use runtime::{run, start_blocking, sync_pass, LoopOutcome};
