//! Reading uncompressed Zarr V2 arrays.

use std::sync::Arc;

use derive_more::Display;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::storage::{ReadableStorageTraits, StorageError, StoreKey};

use super::{
    data_type_from_v2_dtype, ChunkData, DatasetAttributes, DatasetReadError, DatasetReaderTraits,
};

/// A chunk key separator.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Display, Serialize, Deserialize)]
pub enum ChunkKeySeparator {
    /// The slash '/' character.
    #[display("/")]
    #[serde(rename = "/")]
    Slash,
    /// The dot '.' character.
    #[display(".")]
    #[serde(rename = ".")]
    Dot,
}

/// Zarr array metadata (storage specification v2).
///
/// An example `JSON` document for an uncompressed Zarr V2 array:
/// ```json
/// {
///     "chunks": [1, 1, 64, 256, 256],
///     "compressor": null,
///     "dtype": "<u2",
///     "fill_value": 0,
///     "filters": null,
///     "order": "C",
///     "shape": [2, 3, 100, 1024, 1024],
///     "zarr_format": 2,
///     "dimension_separator": "/"
/// }
/// ```
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct ArrayMetadataV2 {
    /// An integer defining the version of the storage specification to which the array adheres. Must be `2`.
    pub zarr_format: u64,
    /// The length of each dimension of the array, slowest-varying first.
    pub shape: Vec<u64>,
    /// The length of each dimension of a chunk of the array, slowest-varying first.
    pub chunks: Vec<u64>,
    /// The data type of the array, e.g. `<u2`.
    pub dtype: String,
    /// The primary compression codec, or null if no compressor is to be used.
    pub compressor: Option<serde_json::Value>,
    /// The default value for uninitialized portions of the array.
    #[serde(default)]
    pub fill_value: serde_json::Value,
    /// Either “C” or “F”, defining the layout of bytes within each chunk of the array.
    #[serde(default = "order_default_zarr_v2")]
    pub order: String,
    /// Filter codec configurations, or null if no filters are to be applied.
    #[serde(default)]
    pub filters: Option<Vec<serde_json::Value>>,
    /// The separator placed between the dimensions of a chunk key.
    #[serde(default = "chunk_key_separator_default_zarr_v2")]
    pub dimension_separator: ChunkKeySeparator,
}

fn order_default_zarr_v2() -> String {
    "C".to_string()
}

const fn chunk_key_separator_default_zarr_v2() -> ChunkKeySeparator {
    ChunkKeySeparator::Dot
}

impl ArrayMetadataV2 {
    /// Convert the metadata to [`DatasetAttributes`].
    ///
    /// # Errors
    /// Returns a [`DatasetReadError`] if the array is compressed, filtered, not C ordered, has an unsupported data type, or has an invalid chunk shape.
    pub fn to_dataset_attributes(&self) -> Result<DatasetAttributes, DatasetReadError> {
        if self.zarr_format != 2 {
            return Err(DatasetReadError::InvalidZarrFormat(self.zarr_format));
        }
        if let Some(compressor) = &self.compressor {
            let id = compressor
                .get("id")
                .and_then(serde_json::Value::as_str)
                .map_or_else(|| compressor.to_string(), str::to_string);
            return Err(DatasetReadError::UnsupportedCompressor(id));
        }
        if self.filters.as_ref().is_some_and(|filters| !filters.is_empty()) {
            return Err(DatasetReadError::UnsupportedFilters);
        }
        if self.order != "C" {
            return Err(DatasetReadError::UnsupportedOrder(self.order.clone()));
        }
        let (data_type, endianness) = data_type_from_v2_dtype(&self.dtype)?;
        let dimensions = self.shape.iter().rev().copied().collect();
        let chunk_shape = self.chunks.iter().rev().copied().collect();
        Ok(DatasetAttributes::new(dimensions, chunk_shape, data_type)?
            .with_endianness(endianness)
            .with_separator(self.dimension_separator))
    }
}

/// Encode a chunk index (fastest-varying first) as a Zarr V2 chunk key relative to the array.
///
/// Zarr V2 keys list indices slowest-varying first, e.g. chunk index `[3, 2, 1]` is `1.2.3` with the `.` separator.
#[must_use]
pub fn encode_chunk_key(chunk_index: &[u64], separator: ChunkKeySeparator) -> String {
    if chunk_index.is_empty() {
        return "0".to_string();
    }
    chunk_index
        .iter()
        .rev()
        .join(&separator.to_string())
}

/// A dataset reader for uncompressed Zarr V2 arrays.
#[derive(Debug)]
pub struct ZarrV2DatasetReader<TStorage: ?Sized> {
    storage: Arc<TStorage>,
}

impl<TStorage: ?Sized> ZarrV2DatasetReader<TStorage> {
    /// Create a new Zarr V2 dataset reader over `storage`.
    #[must_use]
    pub fn new(storage: Arc<TStorage>) -> Self {
        Self { storage }
    }

    /// The underlying storage.
    #[must_use]
    pub fn storage(&self) -> &Arc<TStorage> {
        &self.storage
    }
}

impl<TStorage: ?Sized + ReadableStorageTraits> DatasetReaderTraits
    for ZarrV2DatasetReader<TStorage>
{
    fn dataset_attributes(&self, path: &str) -> Result<DatasetAttributes, DatasetReadError> {
        let key = StoreKey::under_node(path, ".zarray").map_err(StorageError::from)?;
        let metadata = self
            .storage
            .get(&key)?
            .ok_or_else(|| DatasetReadError::MissingMetadata(path.to_string()))?;
        let metadata: ArrayMetadataV2 = serde_json::from_slice(&metadata)?;
        metadata.to_dataset_attributes()
    }

    fn read_chunk(
        &self,
        path: &str,
        attributes: &DatasetAttributes,
        chunk_index: &[u64],
    ) -> Result<Option<ChunkData>, StorageError> {
        if chunk_index.len() != attributes.dimensionality() {
            return Err(StorageError::Other(format!(
                "chunk index {chunk_index:?} is incompatible with a {}-dimensional dataset",
                attributes.dimensionality()
            )));
        }
        let key = StoreKey::under_node(
            path,
            &encode_chunk_key(chunk_index, attributes.separator()),
        )?;
        let Some(mut bytes) = self.storage.get(&key)? else {
            return Ok(None);
        };

        let expected = attributes.chunk_size_bytes();
        if bytes.len() as u64 != expected {
            return Err(StorageError::Other(format!(
                "chunk {key} has {} bytes, expected {expected}",
                bytes.len()
            )));
        }
        if attributes.endianness().is_some_and(|e| !e.is_native()) {
            let element_size = attributes.data_type().size();
            bytes
                .chunks_exact_mut(element_size)
                .for_each(<[u8]>::reverse);
        }
        Ok(Some(ChunkData::new(attributes.chunk_shape().to_vec(), bytes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dataset::{DataType, Endianness},
        storage::{store::MemoryStore, WritableStorageTraits},
    };
    use std::error::Error;

    const ZARRAY: &str = r#"{
        "zarr_format": 2,
        "shape": [2, 3, 5],
        "chunks": [1, 2, 4],
        "dtype": ">u2",
        "compressor": null,
        "fill_value": 0,
        "order": "C",
        "filters": null,
        "dimension_separator": "/"
    }"#;

    #[test]
    fn zarr_v2_metadata() -> Result<(), Box<dyn Error>> {
        let metadata: ArrayMetadataV2 = serde_json::from_str(ZARRAY)?;
        let attributes = metadata.to_dataset_attributes()?;
        assert_eq!(attributes.dimensions(), &[5, 3, 2]);
        assert_eq!(attributes.chunk_shape(), &[4, 2, 1]);
        assert_eq!(attributes.data_type(), DataType::UInt16);
        assert_eq!(attributes.endianness(), Some(Endianness::Big));
        assert_eq!(attributes.separator(), ChunkKeySeparator::Slash);
        Ok(())
    }

    #[test]
    fn zarr_v2_metadata_unsupported() {
        let with = |field: &str, value: &str| -> ArrayMetadataV2 {
            let mut metadata: serde_json::Value = serde_json::from_str(ZARRAY).unwrap();
            metadata[field] = serde_json::from_str(value).unwrap();
            serde_json::from_value(metadata).unwrap()
        };
        assert!(matches!(
            with("compressor", r#"{"id": "blosc", "clevel": 5}"#).to_dataset_attributes(),
            Err(DatasetReadError::UnsupportedCompressor(id)) if id == "blosc"
        ));
        assert!(matches!(
            with("filters", r#"[{"id": "delta"}]"#).to_dataset_attributes(),
            Err(DatasetReadError::UnsupportedFilters)
        ));
        assert!(with("filters", "[]").to_dataset_attributes().is_ok());
        assert!(matches!(
            with("order", r#""F""#).to_dataset_attributes(),
            Err(DatasetReadError::UnsupportedOrder(_))
        ));
        assert!(matches!(
            with("dtype", r#""|b1""#).to_dataset_attributes(),
            Err(DatasetReadError::UnsupportedDataType(_))
        ));
        assert!(matches!(
            with("zarr_format", "3").to_dataset_attributes(),
            Err(DatasetReadError::InvalidZarrFormat(3))
        ));
        assert!(matches!(
            with("chunks", "[1, 2]").to_dataset_attributes(),
            Err(DatasetReadError::InvalidChunkShape(..))
        ));
        assert!(matches!(
            with("chunks", "[4611686018427387904, 2, 4]").to_dataset_attributes(),
            Err(DatasetReadError::InvalidChunkShape(..))
        ));
    }

    #[test]
    fn zarr_v2_chunk_key() {
        assert_eq!(encode_chunk_key(&[3, 2, 1], ChunkKeySeparator::Dot), "1.2.3");
        assert_eq!(encode_chunk_key(&[3, 2, 1], ChunkKeySeparator::Slash), "1/2/3");
        assert_eq!(encode_chunk_key(&[], ChunkKeySeparator::Dot), "0");
    }

    #[test]
    fn zarr_v2_read_chunk() -> Result<(), Box<dyn Error>> {
        let store = Arc::new(MemoryStore::new());
        store.set(&StoreKey::new("a/.zarray")?, ZARRAY.as_bytes())?;
        let chunk: Vec<u8> = (0u16..8).flat_map(u16::to_be_bytes).collect();
        store.set(&StoreKey::new("a/1/1/0")?, &chunk)?;

        let reader = ZarrV2DatasetReader::new(store.clone());
        let attributes = reader.dataset_attributes("/a")?;
        let chunk = reader.read_chunk("/a", &attributes, &[0, 1, 1])?.unwrap();
        assert_eq!(chunk.shape(), &[4, 2, 1]);
        let elements: Vec<u16> = chunk
            .bytes()
            .chunks_exact(2)
            .map(|b| u16::from_ne_bytes([b[0], b[1]]))
            .collect();
        assert_eq!(elements, (0u16..8).collect::<Vec<_>>());

        assert_eq!(reader.read_chunk("/a", &attributes, &[1, 1, 1])?, None);
        assert!(reader.read_chunk("/a", &attributes, &[0, 1]).is_err());

        store.set(&StoreKey::new("a/1/1/1")?, &[0, 1, 2])?;
        let err = reader.read_chunk("/a", &attributes, &[1, 1, 1]).unwrap_err();
        assert!(!err.is_transient());
        Ok(())
    }

    #[test]
    fn zarr_v2_missing_metadata() {
        let reader = ZarrV2DatasetReader::new(Arc::new(MemoryStore::new()));
        assert!(matches!(
            reader.dataset_attributes("missing"),
            Err(DatasetReadError::MissingMetadata(path)) if path == "missing"
        ));
    }
}
