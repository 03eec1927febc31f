//! Materializing cells of an image cache from chunks.
//!
//! An [`ArrayMaterializer`] turns a retrieved [`ChunkData`], or the knowledge that a chunk is absent, into the array type consumed by an image cache.
//! [`ArrayCreator`] is the default materializer, producing [`CellArray`]s shaped by a [`CellGrid`].

mod cell_array;

pub use cell_array::{CellArray, CellData, CellElement};

use thiserror::Error;

use crate::{
    cell_grid::{CellGrid, CellPositionError},
    dataset::{ChunkData, DataType},
};

/// Array materializer traits.
///
/// Implementations must be safe for concurrent use.
pub trait ArrayMaterializer: Send + Sync {
    /// The materialized array type.
    type Array;

    /// Create a zero-filled array for the cell at `position`.
    ///
    /// # Errors
    /// Returns an [`ArrayCreateError`] if `position` is not a valid cell position.
    fn create_empty(&self, position: &[u64]) -> Result<Self::Array, ArrayCreateError>;

    /// Create an array for the cell at `position` from the elements of `chunk`.
    ///
    /// # Errors
    /// Returns an [`ArrayCreateError`] if `position` is not a valid cell position or `chunk` is incompatible with the cell.
    fn create_from_chunk(
        &self,
        chunk: &ChunkData,
        position: &[u64],
    ) -> Result<Self::Array, ArrayCreateError>;
}

/// An array creation error.
#[derive(Debug, Error)]
pub enum ArrayCreateError {
    /// The cell position is not in the cell grid.
    #[error(transparent)]
    CellPositionError(#[from] CellPositionError),
    /// The chunk is smaller than the cell or has an incompatible dimensionality.
    #[error("chunk with shape {_0:?} cannot fill a cell with shape {_1:?}")]
    IncompatibleChunkShape(Vec<u64>, Vec<u64>),
    /// The number of chunk bytes does not match the chunk shape.
    #[error("got chunk with {_0} bytes, expected {_1}")]
    InvalidChunkSize(usize, u64),
}

/// Creates [`CellArray`]s for the cells of a [`CellGrid`].
///
/// Chunks are cropped to the cell shape.
/// This is necessary at the upper border of a dataset, where Zarr stores full chunks but the cells of the grid are clipped.
#[derive(Clone, Debug)]
pub struct ArrayCreator {
    grid: CellGrid,
    data_type: DataType,
}

impl ArrayCreator {
    /// Create a new array creator for cells of `grid` with elements of `data_type`.
    #[must_use]
    pub fn new(grid: CellGrid, data_type: DataType) -> Self {
        Self { grid, data_type }
    }

    /// The cell grid.
    #[must_use]
    pub const fn grid(&self) -> &CellGrid {
        &self.grid
    }

    /// The element data type.
    #[must_use]
    pub const fn data_type(&self) -> DataType {
        self.data_type
    }
}

impl ArrayMaterializer for ArrayCreator {
    type Array = CellArray;

    fn create_empty(&self, position: &[u64]) -> Result<CellArray, ArrayCreateError> {
        let cell_shape = self.grid.cell_shape(position)?;
        Ok(CellArray::zeros(cell_shape, self.data_type))
    }

    fn create_from_chunk(
        &self,
        chunk: &ChunkData,
        position: &[u64],
    ) -> Result<CellArray, ArrayCreateError> {
        let cell_shape = self.grid.cell_shape(position)?;
        let element_size = self.data_type.size();
        let expected = chunk
            .shape()
            .iter()
            .try_fold(element_size as u64, |size, extent| size.checked_mul(*extent))
            .ok_or_else(|| {
                ArrayCreateError::IncompatibleChunkShape(chunk.shape().to_vec(), cell_shape.clone())
            })?;
        if chunk.bytes().len() as u64 != expected {
            return Err(ArrayCreateError::InvalidChunkSize(
                chunk.bytes().len(),
                expected,
            ));
        }
        let bytes = crop_chunk(chunk, &cell_shape, element_size)?;
        let data = CellData::from_ne_bytes(self.data_type, &bytes);
        CellArray::new(cell_shape, data)
            .ok_or_else(|| ArrayCreateError::InvalidChunkSize(bytes.len(), expected))
    }
}

/// Copy the leading `cell_shape` region of `chunk` (offset zero along every axis).
///
/// Axes of the cell beyond the dimensionality of the chunk must have extent one.
fn crop_chunk(
    chunk: &ChunkData,
    cell_shape: &[u64],
    element_size: usize,
) -> Result<Vec<u8>, ArrayCreateError> {
    let chunk_shape = chunk.shape();
    let incompatible = || {
        ArrayCreateError::IncompatibleChunkShape(chunk_shape.to_vec(), cell_shape.to_vec())
    };
    let fits = cell_shape
        .iter()
        .enumerate()
        .all(|(i, c)| *c <= chunk_shape.get(i).copied().unwrap_or(1));
    if !fits || cell_shape.is_empty() {
        return Err(incompatible());
    }

    let common = cell_shape.len().min(chunk_shape.len());
    if cell_shape[..common] == chunk_shape[..common]
        && chunk_shape[common..].iter().all(|c| *c == 1)
    {
        return Ok(chunk.bytes().to_vec());
    }

    // Chunk strides in elements, fastest-varying axis first
    let strides: Vec<u64> = chunk_shape
        .iter()
        .scan(1u64, |stride, extent| {
            let current = *stride;
            *stride *= extent;
            Some(current)
        })
        .collect();
    let row_bytes = usize::try_from(cell_shape[0]).map_err(|_| incompatible())? * element_size;
    let num_rows: u64 = cell_shape[1..].iter().product();
    let mut out = Vec::with_capacity(row_bytes * usize::try_from(num_rows).unwrap_or(0));
    let mut index = vec![0u64; cell_shape.len()];
    for _ in 0..num_rows {
        let offset: u64 = std::iter::zip(&index, &strides).map(|(i, s)| i * s).sum();
        let start = usize::try_from(offset).map_err(|_| incompatible())? * element_size;
        out.extend_from_slice(&chunk.bytes()[start..start + row_bytes]);

        // Advance over the non-contiguous axes
        for axis in 1..cell_shape.len() {
            index[axis] += 1;
            if index[axis] < cell_shape[axis] {
                break;
            }
            index[axis] = 0;
        }
    }
    Ok(out)
}
