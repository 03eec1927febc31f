use std::{
    io::Write,
    sync::{Arc, Mutex},
};

use crate::{axes::AxisLayout, config::global_config};

/// A shared writer for chunk loading diagnostics.
pub type LogHandle = Arc<Mutex<dyn Write + Send + Sync>>;

/// Options for a [`ChunkLoader`](super::ChunkLoader).
///
/// ### Example (log to stdout with a timestamp)
/// ```rust
/// # use std::sync::{Arc, Mutex};
/// # use ome_zarr_tiles::{axes::AxisLayout, chunk_loader::ChunkLoaderOptions};
/// let options = ChunkLoaderOptions::new(0, 2)
///     .with_axis_layout(AxisLayout::SpatialChannelTime3)
///     .with_log_handle(Arc::new(Mutex::new(std::io::stdout())), || {
///         chrono::Utc::now().format("[%T%.3f] ").to_string()
///     });
/// assert!(options.log_chunk_loading());
/// ```
///
/// Loading chunks with the above options prints outputs like:
/// ```text
/// [10:02:41.113] image/0 [3, 1, 0, 0, 2] ...
/// [10:02:41.120] image/0 [3, 1, 0, 0, 2] fetched 262144 elements in 7 ms
/// [10:02:41.121] image/0 [4, 1, 0, 0, 2] ...
/// [10:02:41.121] image/0 [4, 1, 0, 0, 2] is missing, returning zeros
/// ```
#[derive(Clone)]
pub struct ChunkLoaderOptions {
    channel: u64,
    time: u64,
    axis_layout: Option<AxisLayout>,
    log_chunk_loading: bool,
    log_handle: Option<LogHandle>,
    prefix_func: fn() -> String,
}

impl core::fmt::Debug for ChunkLoaderOptions {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ChunkLoaderOptions")
            .field("channel", &self.channel)
            .field("time", &self.time)
            .field("axis_layout", &self.axis_layout)
            .field("log_chunk_loading", &self.log_chunk_loading)
            .field("log_handle", &self.log_handle.as_ref().map(|_| "..."))
            .finish_non_exhaustive()
    }
}

impl Default for ChunkLoaderOptions {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl ChunkLoaderOptions {
    /// Create options for loading chunks at a fixed `channel` and `time` chunk index.
    ///
    /// Logging defaults to the [global configuration](crate::config::Config#log-chunk-loading).
    #[must_use]
    pub fn new(channel: u64, time: u64) -> Self {
        Self {
            channel,
            time,
            axis_layout: None,
            log_chunk_loading: global_config().log_chunk_loading(),
            log_handle: None,
            prefix_func: String::new,
        }
    }

    /// Set the axis layout of the dataset.
    ///
    /// If unset, the layout is guessed with [`AxisLayout::from_dimensionality`].
    #[must_use]
    pub fn with_axis_layout(mut self, axis_layout: AxisLayout) -> Self {
        self.axis_layout = Some(axis_layout);
        self
    }

    /// Enable or disable chunk loading diagnostics.
    ///
    /// Diagnostics are the only record of storage failures that are absorbed as zero-filled cells.
    /// With diagnostics disabled, a transient failure is not reported anywhere.
    #[must_use]
    pub fn with_log_chunk_loading(mut self, log_chunk_loading: bool) -> Self {
        self.log_chunk_loading = log_chunk_loading;
        self
    }

    /// Write chunk loading diagnostics to `handle`, each line starting with the output of `prefix_func`.
    ///
    /// This also enables chunk loading diagnostics.
    /// Without a handle, diagnostics are written to stderr.
    #[must_use]
    pub fn with_log_handle(mut self, handle: LogHandle, prefix_func: fn() -> String) -> Self {
        self.log_chunk_loading = true;
        self.log_handle = Some(handle);
        self.prefix_func = prefix_func;
        self
    }

    /// The channel chunk index.
    #[must_use]
    pub const fn channel(&self) -> u64 {
        self.channel
    }

    /// The time chunk index.
    #[must_use]
    pub const fn time(&self) -> u64 {
        self.time
    }

    /// The axis layout, if set.
    #[must_use]
    pub const fn axis_layout(&self) -> Option<AxisLayout> {
        self.axis_layout
    }

    /// Returns true if chunk loading diagnostics are enabled.
    #[must_use]
    pub const fn log_chunk_loading(&self) -> bool {
        self.log_chunk_loading
    }

    /// Write a diagnostic line.
    ///
    /// Write failures and poisoned handles are ignored, diagnostics never fail a load.
    pub(super) fn log(&self, message: core::fmt::Arguments<'_>) {
        match &self.log_handle {
            Some(handle) => {
                if let Ok(mut handle) = handle.lock() {
                    let _ = writeln!(handle, "{}{message}", (self.prefix_func)());
                }
            }
            None => eprintln!("{}{message}", (self.prefix_func)()),
        }
    }
}
