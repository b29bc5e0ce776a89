//! cmsync core library: domain types, data source and sink contracts, errors.
//!
//! - [`types`]: newtypes, [`NamedObject`], [`RunConfig`]
//! - [`source`]: the [`DataSource`] read contract
//! - [`sink`]: the [`Sink`] / [`FileHandle`] write contract
//! - [`memory`]: in-memory substitutes for both contracts
//! - [`error`]: [`SourceError`], [`ConfigError`]

pub mod error;
pub mod memory;
pub mod sink;
pub mod source;
pub mod types;

pub use error::{ConfigError, SourceError};
pub use memory::{MemoryFile, MemorySink, MemorySource};
pub use sink::{FileHandle, Sink};
pub use source::DataSource;
pub use types::{Entries, NamedObject, Namespace, ObjectName, RunConfig};
