//! Chunked datasets: attributes and chunk retrieval.
//!
//! A [dataset reader](DatasetReaderTraits) is the storage backend of a [`ChunkLoader`](crate::chunk_loader::ChunkLoader).
//! It provides the [`DatasetAttributes`] of a dataset and retrieves individual chunks by their chunk index.
//!
//! All shapes and indices in this module are ordered fastest-varying axis first.
//! This is the reverse of the order used in Zarr metadata.
//! For example, a Zarr array with shape `[t, c, z, y, x]` has [`dimensions`](DatasetAttributes::dimensions) `[x, y, z, c, t]`.
//!
//! [`ZarrV2DatasetReader`] reads uncompressed Zarr V2 arrays from any [readable store](crate::storage::ReadableStorageTraits).

mod data_type;
mod zarr_v2;

use std::sync::Arc;

use thiserror::Error;

pub use data_type::{
    data_type_from_v2_dtype, DataType, Endianness, UnsupportedDataTypeError, NATIVE_ENDIAN,
};
pub use zarr_v2::{encode_chunk_key, ArrayMetadataV2, ChunkKeySeparator, ZarrV2DatasetReader};

use crate::storage::StorageError;

/// [`Arc`] wrapped dataset reader.
pub type DatasetReader = Arc<dyn DatasetReaderTraits>;

/// Dataset reader traits.
///
/// Implementations must be safe for concurrent use, since chunks of one dataset are typically loaded from many threads at once.
pub trait DatasetReaderTraits: Send + Sync {
    /// Read the attributes of the dataset at `path`.
    ///
    /// # Errors
    /// Returns a [`DatasetReadError`] if the attributes are missing, invalid, or describe an unsupported dataset.
    fn dataset_attributes(&self, path: &str) -> Result<DatasetAttributes, DatasetReadError>;

    /// Read the chunk at `chunk_index` of the dataset at `path` with `attributes`.
    ///
    /// Returns [`None`] if the chunk does not exist.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the chunk could not be retrieved or is inconsistent with `attributes`.
    /// Failures of the environment (e.g. a timeout) are reported with errors for which [`StorageError::is_transient`] is true.
    fn read_chunk(
        &self,
        path: &str,
        attributes: &DatasetAttributes,
        chunk_index: &[u64],
    ) -> Result<Option<ChunkData>, StorageError>;
}

/// The attributes of a chunked dataset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatasetAttributes {
    dimensions: Vec<u64>,
    chunk_shape: Vec<u64>,
    data_type: DataType,
    chunk_size_bytes: u64,
    endianness: Option<Endianness>,
    separator: ChunkKeySeparator,
}

impl DatasetAttributes {
    /// Create new dataset attributes.
    ///
    /// `dimensions` and `chunk_shape` are ordered fastest-varying axis first.
    ///
    /// # Errors
    /// Returns [`DatasetReadError::InvalidChunkShape`] if `chunk_shape` does not match the dimensionality of `dimensions`, has a zero extent, or the size of a chunk in bytes is not addressable.
    pub fn new(
        dimensions: Vec<u64>,
        chunk_shape: Vec<u64>,
        data_type: DataType,
    ) -> Result<Self, DatasetReadError> {
        if dimensions.len() != chunk_shape.len() || chunk_shape.contains(&0) {
            return Err(DatasetReadError::InvalidChunkShape(dimensions, chunk_shape));
        }
        let chunk_size_bytes = chunk_shape
            .iter()
            .try_fold(data_type.size() as u64, |size, extent| size.checked_mul(*extent))
            .filter(|size| usize::try_from(*size).is_ok());
        let Some(chunk_size_bytes) = chunk_size_bytes else {
            return Err(DatasetReadError::InvalidChunkShape(dimensions, chunk_shape));
        };
        Ok(Self {
            dimensions,
            chunk_shape,
            data_type,
            chunk_size_bytes,
            endianness: None,
            separator: ChunkKeySeparator::Dot,
        })
    }

    /// Set the endianness of stored chunk elements. [`None`] means native.
    #[must_use]
    pub fn with_endianness(mut self, endianness: Option<Endianness>) -> Self {
        self.endianness = endianness;
        self
    }

    /// Set the separator placed between chunk indices in chunk keys.
    #[must_use]
    pub fn with_separator(mut self, separator: ChunkKeySeparator) -> Self {
        self.separator = separator;
        self
    }

    /// The extent of each axis, fastest-varying first.
    #[must_use]
    pub fn dimensions(&self) -> &[u64] {
        &self.dimensions
    }

    /// The number of axes.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.dimensions.len()
    }

    /// The shape of a chunk, fastest-varying first.
    #[must_use]
    pub fn chunk_shape(&self) -> &[u64] {
        &self.chunk_shape
    }

    /// The element data type.
    #[must_use]
    pub const fn data_type(&self) -> DataType {
        self.data_type
    }

    /// The endianness of stored elements, [`None`] for single byte data types.
    #[must_use]
    pub const fn endianness(&self) -> Option<Endianness> {
        self.endianness
    }

    /// The chunk key separator.
    #[must_use]
    pub const fn separator(&self) -> ChunkKeySeparator {
        self.separator
    }

    /// The number of chunks along each axis.
    #[must_use]
    pub fn chunk_grid_shape(&self) -> Vec<u64> {
        std::iter::zip(&self.dimensions, &self.chunk_shape)
            .map(|(d, c)| d.div_ceil(*c))
            .collect()
    }

    /// The number of bytes of an encoded chunk.
    #[must_use]
    pub const fn chunk_size_bytes(&self) -> u64 {
        self.chunk_size_bytes
    }
}

/// A decoded chunk.
///
/// Elements are in native endianness and laid out with the first axis varying fastest.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkData {
    shape: Vec<u64>,
    bytes: Vec<u8>,
}

impl ChunkData {
    /// Create a new chunk from its shape and native-endian bytes.
    #[must_use]
    pub fn new(shape: Vec<u64>, bytes: Vec<u8>) -> Self {
        Self { shape, bytes }
    }

    /// The chunk shape, fastest-varying first.
    #[must_use]
    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    /// The chunk bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The number of elements in the chunk.
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        self.shape.iter().product()
    }
}

/// A dataset attributes read error.
#[derive(Debug, Error)]
pub enum DatasetReadError {
    /// The dataset metadata does not exist.
    #[error("dataset metadata is missing at {0}")]
    MissingMetadata(String),
    /// A storage error.
    #[error(transparent)]
    StorageError(#[from] StorageError),
    /// An error deserializing the metadata.
    #[error(transparent)]
    MetadataDeserializationError(#[from] serde_json::Error),
    /// Invalid zarr format.
    #[error("invalid zarr format {0}, expected 2")]
    InvalidZarrFormat(u64),
    /// Unsupported data type.
    #[error(transparent)]
    UnsupportedDataType(#[from] UnsupportedDataTypeError),
    /// Compressed chunks are not supported.
    #[error("compressor {0} is not supported, chunks must be uncompressed")]
    UnsupportedCompressor(String),
    /// Filters are not supported.
    #[error("filters are not supported")]
    UnsupportedFilters,
    /// Only C (row-major) ordered chunks are supported.
    #[error("chunk memory order {0} is not supported, expected C")]
    UnsupportedOrder(String),
    /// The chunk shape is incompatible with the dataset dimensions.
    #[error("chunk shape {1:?} is incompatible with dataset dimensions {0:?}")]
    InvalidChunkShape(Vec<u64>, Vec<u64>),
}
