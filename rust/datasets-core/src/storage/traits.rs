// rust/datasets-core/src/storage/traits.rs

//! Storage backend traits.

use std::io::{Read, Seek, Write};
use std::path::Path;

use crate::error::Result;

/// Metadata about a stored object.
#[derive(Debug, Clone)]
pub struct ObjectMeta {
    /// Size of the object in bytes.
    pub size: u64,
}

/// A handle for reading from storage.
pub trait StorageReader: Read + Seek + Send {
    /// Reads the whole object into memory.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    fn read_all(&mut self) -> Result<Vec<u8>>;
}

/// A handle for writing to storage.
pub trait StorageWriter: Write + Send {
    /// Flushes and persists everything written so far.
    ///
    /// Must be called to complete the write; the writer is consumed.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing or syncing fails.
    fn finish(self: Box<Self>) -> Result<()>;
}

/// The operations the save and load protocols need from a filesystem.
///
/// This trait is object-safe and is shared as `Arc<dyn StorageBackend>`.
pub trait StorageBackend: Send + Sync {
    /// Retrieves metadata for an object.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the object doesn't exist.
    fn metadata(&self, path: &Path) -> Result<ObjectMeta>;

    /// Opens an object for reading.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the object doesn't exist.
    fn open_read(&self, path: &Path) -> Result<Box<dyn StorageReader>>;

    /// Opens an object for writing, truncating any existing object.
    ///
    /// Parent directories are created if they don't exist.
    fn open_write(&self, path: &Path) -> Result<Box<dyn StorageWriter>>;

    /// Deletes a file or a directory tree.
    fn delete(&self, path: &Path) -> Result<()>;

    /// Lists the entry names directly inside a directory, sorted.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the directory doesn't exist and a storage
    /// error if the path is not a directory.
    fn list(&self, dir: &Path) -> Result<Vec<String>>;

    /// Renames an object, replacing the destination if it exists.
    fn rename(&self, from: &Path, to: &Path) -> Result<()>;

    /// Creates a directory and all parent directories.
    fn create_dir_all(&self, path: &Path) -> Result<()>;
}
