//! Key-value [stores](store) holding Zarr metadata and chunks.
//!
//! A store is a system that can be used to store and retrieve data from a Zarr hierarchy, e.g. a filesystem, an object store bucket or memory.
//! Stores are addressed with [`StoreKey`]s and are accessed through [`ReadableStorageTraits`] and [`WritableStorageTraits`].
//!
//! Remote stores can fail for reasons unrelated to the data they hold (timeouts, dropped connections, throttling).
//! Such failures are reported as [`StorageError`]s for which [`StorageError::is_transient`] is true.

pub mod store;
mod store_key;

use std::sync::Arc;

use thiserror::Error;

pub use store_key::{StoreKey, StoreKeyError, StoreKeys};

/// Bytes stored under a key.
pub type Bytes = Vec<u8>;

/// An alias for bytes which may or may not be available.
///
/// When a value is read from a store, it returns `MaybeBytes` which is [`None`] if the key is not available.
pub type MaybeBytes = Option<Bytes>;

/// [`Arc`] wrapped readable storage.
pub type ReadableStorage = Arc<dyn ReadableStorageTraits>;

/// [`Arc`] wrapped writable storage.
pub type WritableStorage = Arc<dyn WritableStorageTraits>;

/// Readable storage traits.
pub trait ReadableStorageTraits: Send + Sync {
    /// Retrieve the value (bytes) associated with a given [`StoreKey`].
    ///
    /// Returns [`None`] if the key is not found.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the store key does not exist or there is an error with the underlying store.
    fn get(&self, key: &StoreKey) -> Result<MaybeBytes, StorageError>;

    /// Return the size in bytes of the value at `key`.
    ///
    /// Returns [`None`] if the key is not found.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if there is an underlying storage error.
    fn size_key(&self, key: &StoreKey) -> Result<Option<u64>, StorageError>;
}

/// Writable storage traits.
pub trait WritableStorageTraits: Send + Sync {
    /// Store bytes at a [`StoreKey`].
    ///
    /// # Errors
    /// Returns a [`StorageError`] on failure to store.
    fn set(&self, key: &StoreKey, value: &[u8]) -> Result<(), StorageError>;

    /// Erase a [`StoreKey`].
    ///
    /// Returns true if the key exists and was erased, or false if the key does not exist.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if there is an underlying storage error.
    fn erase(&self, key: &StoreKey) -> Result<bool, StorageError>;
}

/// A trait combining [`ReadableStorageTraits`] and [`WritableStorageTraits`].
pub trait ReadableWritableStorageTraits: ReadableStorageTraits + WritableStorageTraits {}

impl<T> ReadableWritableStorageTraits for T where T: ReadableStorageTraits + WritableStorageTraits {}

/// A storage error.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A write operation was attempted on a read only store.
    #[error("a write operation was attempted on a read only store")]
    ReadOnly,
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    /// A transient failure of the storage service, such as a timeout or throttled request.
    #[error("transient storage failure: {0}")]
    Transient(String),
    /// An invalid store key.
    #[error("invalid store key {0}")]
    InvalidStoreKey(#[from] StoreKeyError),
    /// Any other error.
    #[error("{0}")]
    Other(String),
}

impl StorageError {
    /// Returns true if the error is a transient failure of the environment rather than a property of the stored data.
    ///
    /// Transient errors are [`StorageError::Transient`] and IO errors of kind
    /// [`TimedOut`](std::io::ErrorKind::TimedOut),
    /// [`Interrupted`](std::io::ErrorKind::Interrupted),
    /// [`WouldBlock`](std::io::ErrorKind::WouldBlock),
    /// [`ConnectionReset`](std::io::ErrorKind::ConnectionReset),
    /// [`ConnectionAborted`](std::io::ErrorKind::ConnectionAborted),
    /// [`ConnectionRefused`](std::io::ErrorKind::ConnectionRefused),
    /// [`NotConnected`](std::io::ErrorKind::NotConnected), or
    /// [`BrokenPipe`](std::io::ErrorKind::BrokenPipe).
    #[must_use]
    pub fn is_transient(&self) -> bool {
        use std::io::ErrorKind;
        match self {
            Self::Transient(_) => true,
            Self::IOError(err) => matches!(
                err.kind(),
                ErrorKind::TimedOut
                    | ErrorKind::Interrupted
                    | ErrorKind::WouldBlock
                    | ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionAborted
                    | ErrorKind::ConnectionRefused
                    | ErrorKind::NotConnected
                    | ErrorKind::BrokenPipe
            ),
            Self::ReadOnly | Self::InvalidStoreKey(_) | Self::Other(_) => false,
        }
    }
}

impl From<&str> for StorageError {
    fn from(err: &str) -> Self {
        Self::Other(err.to_string())
    }
}

impl From<String> for StorageError {
    fn from(err: String) -> Self {
        Self::Other(err)
    }
}
