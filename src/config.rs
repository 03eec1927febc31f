//! Global configuration options.

use std::sync::{OnceLock, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Global configuration options for the `ome_zarr_tiles` crate.
///
/// Retrieve the global [`Config`] with [`global_config`] and modify it with [`global_config_mut`].
///
/// Global options are only consulted when [`ChunkLoaderOptions`](crate::chunk_loader::ChunkLoaderOptions) are created.
/// Changing them afterwards does not affect existing loaders.
///
/// ## Log Chunk Loading
///  > default: [`false`]
///
/// If enabled, [`ChunkLoader`](crate::chunk_loader::ChunkLoader)s write a diagnostic line before each chunk request and after it completes.
/// Completion lines report the number of elements fetched and the elapsed time, or that the chunk is missing and zeros are returned.
#[derive(Debug)]
pub struct Config {
    log_chunk_loading: bool,
}

#[allow(clippy::derivable_impls)]
impl Default for Config {
    fn default() -> Self {
        Config {
            log_chunk_loading: false,
        }
    }
}

impl Config {
    /// Get the [log chunk loading](#log-chunk-loading) configuration.
    #[must_use]
    pub fn log_chunk_loading(&self) -> bool {
        self.log_chunk_loading
    }

    /// Set the [log chunk loading](#log-chunk-loading) configuration.
    pub fn set_log_chunk_loading(&mut self, log_chunk_loading: bool) {
        self.log_chunk_loading = log_chunk_loading;
    }
}

static CONFIG: OnceLock<RwLock<Config>> = OnceLock::new();

/// Returns a reference to the global configuration.
///
/// # Panics
/// This function panics if the underlying lock has been poisoned and might panic if the global config is already held by the current thread.
pub fn global_config() -> RwLockReadGuard<'static, Config> {
    CONFIG
        .get_or_init(|| RwLock::new(Config::default()))
        .read()
        .unwrap()
}

/// Returns a mutable reference to the global configuration.
///
/// # Panics
/// This function panics if the underlying lock has been poisoned and might panic if the global config is already held by the current thread.
pub fn global_config_mut() -> RwLockWriteGuard<'static, Config> {
    CONFIG
        .get_or_init(|| RwLock::new(Config::default()))
        .write()
        .unwrap()
}
