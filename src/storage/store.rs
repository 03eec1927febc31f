//! Zarr stores.
//!
//! Includes a [`MemoryStore`] and a [`FilesystemStore`].

mod filesystem_store;
mod memory_store;

pub use filesystem_store::{FilesystemStore, FilesystemStoreCreateError};
pub use memory_store::MemoryStore;
