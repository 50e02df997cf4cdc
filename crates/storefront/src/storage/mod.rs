//! Durable key-value storage shared by every tab session.
//!
//! This is the storefront's stand-in for browser-local storage:
//!
//! - [`DurableStore`] is the raw backend (string keys to string values).
//!   [`MemoryStore`] keeps values for the lifetime of the process,
//!   [`FileStore`] keeps them in a JSON file so carts survive restarts.
//! - [`LocalStorage`] wraps a backend with a change-notification bus. Every
//!   write that changes a value is announced to all *other* tab sessions
//!   through their [`StorageSubscription`].
//!
//! Writes replace the whole value under a key; there is no partial update.

mod file;
mod local;
mod memory;

use std::path::PathBuf;

use thiserror::Error;

pub use file::FileStore;
pub use local::{LocalStorage, Notification, Origin, StorageEvent, StorageSubscription, TabId};
pub use memory::MemoryStore;

/// Errors raised by a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing file failed.
    #[error("storage I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The backing file does not hold a key-value JSON object.
    #[error("storage file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The key-value map could not be encoded.
    #[error("failed to encode storage: {0}")]
    Encode(#[source] serde_json::Error),
}

/// A synchronous string key-value store.
///
/// Implementations must be safe to share between tab sessions. Each call is
/// complete when it returns; there is no buffering.
pub trait DurableStore: Send + Sync {
    /// Value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete `key`. Deleting a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// All stored keys, sorted.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    fn keys(&self) -> Result<Vec<String>, StorageError>;
}
