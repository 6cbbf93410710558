//! Key-value byte storage used to persist favorites.

/// File-backed store rooted at a directory.
pub mod file;
/// In-process store.
pub mod memory;

use std::{io, path::PathBuf, sync::Arc};

use thiserror::Error;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Failures raised by storage backends.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading a stored value failed.
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        /// Location that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// Writing a value failed.
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        /// Location that was being written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// Minimal byte-oriented key-value store.
pub trait KeyValueStore {
    /// Fetch the bytes stored under `key`, or `None` when nothing is stored.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for &T {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        (**self).set(key, value)
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        (**self).set(key, value)
    }
}
