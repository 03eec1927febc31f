//! Fault-tolerant loading of [OME-Zarr](https://ngff.openmicroscopy.org) chunks for tiled image caches.
//!
//! A tiled image cache addresses cells over the spatial axes it manages, whereas a chunked OME-Zarr array indexes its chunks over every axis of the dataset.
//! This crate bridges the two:
//!  - [`AxisLayout`](axes::AxisLayout) classifies the axes of a dataset (2-D, or spatial axes plus channel and/or time),
//!  - [`map_to_chunk_index`](chunk_index::map_to_chunk_index) turns a cell position into a chunk index by inserting a fixed channel and time,
//!  - [`ChunkLoader`](chunk_loader::ChunkLoader) fetches the chunk from a [dataset reader](dataset) and materializes a [`CellArray`](array_creator::CellArray).
//!    Chunks that are missing, or that could not be fetched due to a transient storage failure, become zero-filled cells.
//!
//! ## Example
//! ```rust
//! # use std::sync::Arc;
//! use ome_zarr_tiles::{
//!     axes::AxisLayout,
//!     chunk_loader::{ChunkLoader, ChunkLoaderOptions},
//!     dataset::ZarrV2DatasetReader,
//!     storage::{store::MemoryStore, StoreKey, WritableStorageTraits},
//! };
//!
//! let store = Arc::new(MemoryStore::new());
//! store.set(
//!     &StoreKey::new("image/0/.zarray")?,
//!     br#"{"zarr_format": 2, "shape": [1, 2, 4, 4], "chunks": [1, 1, 2, 2], "dtype": "|u1",
//!         "compressor": null, "fill_value": 0, "order": "C", "filters": null}"#,
//! )?;
//! let reader = Arc::new(ZarrV2DatasetReader::new(store));
//!
//! // t, c, y, x dataset at channel 1, time 0
//! let options = ChunkLoaderOptions::new(1, 0).with_axis_layout(AxisLayout::SpatialChannelTime2);
//! let loader = ChunkLoader::new(reader, "image/0", options)?;
//! let cell = loader.load(&[1, 0, 0])?;
//! assert_eq!(cell.shape(), &[2, 2, 1]);
//! assert!(cell.is_all_zero());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Crate Features
//! #### Default
//!  - `ndarray`: [`ndarray`] utility functions for [`CellArray`](array_creator::CellArray).
//!
//! ## Licence
//! `ome_zarr_tiles` is licensed under either of
//!  - the Apache License, Version 2.0 [LICENSE-APACHE](./LICENCE-APACHE) or <http://www.apache.org/licenses/LICENSE-2.0> or
//!  - the MIT license [LICENSE-MIT](./LICENCE-MIT) or <http://opensource.org/licenses/MIT>, at your option.

#![warn(unused_variables)]
#![warn(dead_code)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![deny(clippy::missing_panics_doc)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod array_creator;
pub mod axes;
pub mod cell_grid;
pub mod chunk_index;
pub mod chunk_loader;
pub mod config;
pub mod dataset;
pub mod multiscales;
pub mod storage;
