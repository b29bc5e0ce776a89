//! Read side of a pass: fetch one config object by namespace and name.

use crate::error::SourceError;
use crate::types::{NamedObject, Namespace, ObjectName};

/// Anything that can hand out a fresh snapshot of a named config object.
///
/// Calls are blocking. Implementations must not retry on their own; the
/// caller treats every error as fatal for the current pass.
pub trait DataSource {
    fn fetch(&self, namespace: &Namespace, name: &ObjectName) -> Result<NamedObject, SourceError>;
}

impl<T: DataSource + ?Sized> DataSource for &T {
    fn fetch(&self, namespace: &Namespace, name: &ObjectName) -> Result<NamedObject, SourceError> {
        (**self).fetch(namespace, name)
    }
}

impl<T: DataSource + ?Sized> DataSource for Box<T> {
    fn fetch(&self, namespace: &Namespace, name: &ObjectName) -> Result<NamedObject, SourceError> {
        (**self).fetch(namespace, name)
    }
}
