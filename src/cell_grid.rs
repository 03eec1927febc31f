//! The cell grid of a tiled image cache.
//!
//! A [`CellGrid`] partitions the spatial extent of a dataset into cells, one per chunk.
//! Cells at the upper border of the grid are clipped to the dataset extent.

use thiserror::Error;

use crate::{axes::AxisLayout, dataset::DatasetAttributes};

/// A regular grid of cells over the spatial axes of a dataset, fastest-varying axis first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CellGrid {
    dimensions: Vec<u64>,
    cell_dimensions: Vec<u64>,
}

/// A cell grid creation error.
#[derive(Clone, Debug, Error)]
#[error("cell dimensions {1:?} are incompatible with grid dimensions {0:?}")]
pub struct CellGridCreateError(Vec<u64>, Vec<u64>);

/// A cell position outside of a cell grid.
#[derive(Clone, Debug, Error)]
#[error("cell position {0:?} is outside of cell grid with shape {1:?}")]
pub struct CellPositionError(Vec<u64>, Vec<u64>);

impl CellGrid {
    /// Create a new cell grid with extent `dimensions` and cell shape `cell_dimensions`.
    ///
    /// # Errors
    /// Returns a [`CellGridCreateError`] if the dimensionalities differ or a cell dimension is zero.
    pub fn new(
        dimensions: Vec<u64>,
        cell_dimensions: Vec<u64>,
    ) -> Result<Self, CellGridCreateError> {
        if dimensions.len() != cell_dimensions.len() || cell_dimensions.contains(&0) {
            return Err(CellGridCreateError(dimensions, cell_dimensions));
        }
        Ok(Self {
            dimensions,
            cell_dimensions,
        })
    }

    /// Create the cell grid of a dataset with `attributes` and axis `layout`.
    ///
    /// Layouts with two spatial axes ([`AxisLayout::TwoD`] and [`AxisLayout::SpatialChannelTime2`]) are padded with a singleton third axis.
    /// For other layouts the grid spans the first three axes of the dataset (or all axes, if there are fewer).
    ///
    /// # Errors
    /// Returns a [`CellGridCreateError`] if the dataset has fewer axes than the layout has spatial axes.
    pub fn from_dataset_attributes(
        attributes: &DatasetAttributes,
        layout: AxisLayout,
    ) -> Result<Self, CellGridCreateError> {
        let dimensions = attributes.dimensions();
        let chunk_shape = attributes.chunk_shape();
        let (spatial, pad) = match layout {
            AxisLayout::TwoD | AxisLayout::SpatialChannelTime2 => (2, true),
            _ => (dimensions.len().min(3), false),
        };
        if dimensions.len() < spatial.max(layout.spatial_axis_count()) {
            return Err(CellGridCreateError(
                dimensions.to_vec(),
                chunk_shape.to_vec(),
            ));
        }
        let mut grid_dimensions = dimensions[..spatial].to_vec();
        let mut cell_dimensions = chunk_shape[..spatial].to_vec();
        if pad {
            grid_dimensions.push(1);
            cell_dimensions.push(1);
        }
        Self::new(grid_dimensions, cell_dimensions)
    }

    /// The extent of the grid.
    #[must_use]
    pub fn dimensions(&self) -> &[u64] {
        &self.dimensions
    }

    /// The shape of an interior cell.
    #[must_use]
    pub fn cell_dimensions(&self) -> &[u64] {
        &self.cell_dimensions
    }

    /// The number of cells along each axis.
    #[must_use]
    pub fn grid_shape(&self) -> Vec<u64> {
        std::iter::zip(&self.dimensions, &self.cell_dimensions)
            .map(|(d, c)| d.div_ceil(*c))
            .collect()
    }

    /// The shape of the cell at `position`, clipped to the grid extent.
    ///
    /// `position` may omit trailing axes along which the grid has a single cell, e.g. `[x, y]` on a grid padded with a singleton third axis.
    ///
    /// # Errors
    /// Returns a [`CellPositionError`] if `position` has more elements than the grid has axes, omits an axis with more than one cell, or is outside of the grid.
    pub fn cell_shape(&self, position: &[u64]) -> Result<Vec<u64>, CellPositionError> {
        let grid_shape = self.grid_shape();
        let outside = position.len() > grid_shape.len()
            || grid_shape
                .iter()
                .enumerate()
                .any(|(i, g)| position.get(i).map_or(*g != 1, |p| p >= g));
        if outside {
            return Err(CellPositionError(position.to_vec(), grid_shape));
        }
        Ok(std::iter::zip(&self.dimensions, &self.cell_dimensions)
            .enumerate()
            .map(|(i, (d, c))| {
                let p = position.get(i).copied().unwrap_or(0);
                (*c).min(d - p * c)
            })
            .collect())
    }
}
