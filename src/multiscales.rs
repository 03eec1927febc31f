//! OME-Zarr multiscales metadata.
//!
//! The `multiscales` attribute of an OME-Zarr image group lists the resolution levels of the image (one dataset per level, full resolution first) and its axes.
//!
//! An example `.zattrs` document (OME-NGFF 0.4):
//! ```json
//! {
//!     "multiscales": [{
//!         "version": "0.4",
//!         "name": "example",
//!         "axes": [
//!             {"name": "t", "type": "time", "unit": "millisecond"},
//!             {"name": "c", "type": "channel"},
//!             {"name": "z", "type": "space", "unit": "micrometer"},
//!             {"name": "y", "type": "space", "unit": "micrometer"},
//!             {"name": "x", "type": "space", "unit": "micrometer"}
//!         ],
//!         "datasets": [
//!             {"path": "0", "coordinateTransformations": [{"type": "scale", "scale": [1.0, 1.0, 0.5, 0.5, 0.5]}]},
//!             {"path": "1", "coordinateTransformations": [{"type": "scale", "scale": [1.0, 1.0, 1.0, 1.0, 1.0]}]}
//!         ]
//!     }]
//! }
//! ```
//!
//! OME-NGFF 0.5 nests the same document under an `ome` key.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    axes::{default_axes, Axis, AxisLayout},
    storage::{ReadableStorageTraits, StorageError, StoreKey},
};

/// The multiscale images of an OME-Zarr image group.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Multiscales {
    multiscales: Vec<Multiscale>,
}

/// A multiscale image.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Multiscale {
    /// The OME-NGFF version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// The name of the image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// The axes, slowest-varying first. Absent before OME-NGFF 0.3.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub axes: Option<Vec<Axis>>,
    /// The resolution levels, highest resolution first.
    pub datasets: Vec<MultiscaleDataset>,
}

/// A resolution level of a [`Multiscale`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MultiscaleDataset {
    /// The dataset path relative to the image group.
    pub path: String,
    /// Coordinate transformations of the level.
    #[serde(
        default,
        rename = "coordinateTransformations",
        skip_serializing_if = "Option::is_none"
    )]
    pub coordinate_transformations: Option<Vec<serde_json::Value>>,
}

/// A multiscales metadata error.
#[derive(Debug, Error)]
pub enum MultiscalesError {
    /// A storage error.
    #[error(transparent)]
    StorageError(#[from] StorageError),
    /// The group has no attributes.
    #[error("group attributes are missing at {0}")]
    MissingAttributes(String),
    /// The attributes have no `multiscales` entry.
    #[error("attributes have no multiscales entry")]
    MissingMultiscales,
    /// An error deserializing the metadata.
    #[error(transparent)]
    DeserializationError(#[from] serde_json::Error),
}

impl Multiscales {
    /// Parse the `multiscales` entry of group attributes.
    ///
    /// # Errors
    /// Returns a [`MultiscalesError`] if there is no `multiscales` entry or it is invalid.
    pub fn from_attributes(attributes: &serde_json::Value) -> Result<Self, MultiscalesError> {
        let multiscales = attributes
            .get("multiscales")
            .or_else(|| attributes.get("ome").and_then(|ome| ome.get("multiscales")))
            .ok_or(MultiscalesError::MissingMultiscales)?;
        Ok(Self {
            multiscales: Vec::<Multiscale>::deserialize(multiscales)?,
        })
    }

    /// The multiscale images.
    #[must_use]
    pub fn multiscales(&self) -> &[Multiscale] {
        &self.multiscales
    }

    /// The first multiscale image, which viewers display by default.
    #[must_use]
    pub fn first(&self) -> Option<&Multiscale> {
        self.multiscales.first()
    }
}

impl Multiscale {
    /// The axes, slowest-varying first.
    ///
    /// Returns the implicit `t, c, z, y, x` axes if the metadata has none.
    #[must_use]
    pub fn axes(&self) -> Vec<Axis> {
        self.axes.clone().unwrap_or_else(default_axes)
    }

    /// The axis layout of every resolution level.
    #[must_use]
    pub fn axis_layout(&self) -> AxisLayout {
        self.axes
            .as_deref()
            .map_or(AxisLayout::SpatialChannelTime3, AxisLayout::from_axes)
    }

    /// The number of resolution levels.
    #[must_use]
    pub fn num_levels(&self) -> usize {
        self.datasets.len()
    }

    /// The path of the dataset at resolution `level` in the image group at `group`.
    ///
    /// Returns [`None`] if there is no such level.
    #[must_use]
    pub fn dataset_path(&self, group: &str, level: usize) -> Option<String> {
        let dataset = self.datasets.get(level)?;
        let group = group.trim_matches('/');
        let path = dataset.path.trim_matches('/');
        Some(if group.is_empty() {
            path.to_string()
        } else {
            format!("{group}/{path}")
        })
    }
}

/// Read the multiscales metadata of the image group at `group_path` from the group's `.zattrs`.
///
/// # Errors
/// Returns a [`MultiscalesError`] if the attributes cannot be read or have no valid `multiscales` entry.
pub fn read_multiscales<TStorage: ?Sized + ReadableStorageTraits>(
    storage: &TStorage,
    group_path: &str,
) -> Result<Multiscales, MultiscalesError> {
    let key = StoreKey::under_node(group_path, ".zattrs").map_err(StorageError::from)?;
    let attributes = storage
        .get(&key)?
        .ok_or_else(|| MultiscalesError::MissingAttributes(group_path.to_string()))?;
    let attributes: serde_json::Value = serde_json::from_slice(&attributes)?;
    Multiscales::from_attributes(&attributes)
}
