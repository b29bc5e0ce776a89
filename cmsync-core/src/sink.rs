//! Write side of a pass: create a file at a path and write its content.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

/// A writable handle for exactly one target file.
///
/// The whole content goes through a single call; the handle is dropped
/// before the next entry is processed.
pub trait FileHandle {
    /// Write `content` in full and return the number of bytes written.
    fn write_content(&mut self, content: &str) -> io::Result<usize>;
}

impl FileHandle for File {
    fn write_content(&mut self, content: &str) -> io::Result<usize> {
        self.write_all(content.as_bytes())?;
        Ok(content.len())
    }
}

/// Creates (or truncates) target files.
pub trait Sink {
    type Handle: FileHandle;

    fn create(&mut self, path: &Path) -> io::Result<Self::Handle>;
}

impl<S: Sink + ?Sized> Sink for &mut S {
    type Handle = S::Handle;

    fn create(&mut self, path: &Path) -> io::Result<Self::Handle> {
        (**self).create(path)
    }
}
