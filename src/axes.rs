//! Axis layouts of OME-Zarr datasets.
//!
//! An OME-Zarr image has up to five axes: time, channel, and two or three spatial axes, listed slowest-varying first in the metadata (e.g. `t, c, z, y, x`).
//! Chunk indices in this crate are ordered fastest-varying first, so a `t, c, z, y, x` dataset has its channel at chunk index position 3 and its time at position 4.
//!
//! [`AxisLayout`] captures which of the supported combinations a dataset uses.
//! It is determined once per dataset and then drives [`map_to_chunk_index`](crate::chunk_index::map_to_chunk_index).

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// The layout of the axes of a dataset.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Display)]
pub enum AxisLayout {
    /// Two spatial axes (`y, x`).
    #[display("YX")]
    TwoD,
    /// Two spatial axes, a channel axis and a time axis (`t, c, y, x`).
    #[display("TCYX")]
    SpatialChannelTime2,
    /// Three spatial axes, a channel axis and a time axis (`t, c, z, y, x`).
    #[display("TCZYX")]
    SpatialChannelTime3,
    /// Three spatial axes and a channel axis (`c, z, y, x`).
    #[display("CZYX")]
    SpatialChannel3,
    /// Three spatial axes and a time axis (`t, z, y, x`).
    #[display("TZYX")]
    SpatialTime3,
    /// Any other layout. Cell positions are used as chunk indices unchanged.
    #[default]
    #[display("other")]
    Other,
}

impl AxisLayout {
    /// Classify an axis layout from the total number of axes, the presence of a channel and time axis, and the number of spatial axes.
    ///
    /// Returns [`AxisLayout::Other`] if the combination does not match a supported layout.
    #[must_use]
    pub const fn classify(
        total_axis_count: usize,
        has_channel_axis: bool,
        has_time_axis: bool,
        spatial_axis_count: usize,
    ) -> Self {
        match (
            total_axis_count,
            has_channel_axis,
            has_time_axis,
            spatial_axis_count,
        ) {
            (2, false, false, 2) => Self::TwoD,
            (4, true, true, 2) => Self::SpatialChannelTime2,
            (5, true, true, 3) => Self::SpatialChannelTime3,
            (4, true, false, 3) => Self::SpatialChannel3,
            (4, false, true, 3) => Self::SpatialTime3,
            _ => Self::Other,
        }
    }

    /// Classify an axis layout from OME-Zarr axes metadata, listed slowest-varying first.
    ///
    /// Axes must be in the canonical order (time, then channel, then space), otherwise the layout is [`AxisLayout::Other`].
    #[must_use]
    pub fn from_axes(axes: &[Axis]) -> Self {
        let kinds: Vec<AxisType> = axes.iter().map(Axis::kind).collect();
        let is_canonical = kinds.windows(2).all(|w| w[0].order() <= w[1].order());
        if !is_canonical || kinds.contains(&AxisType::Unknown) {
            return Self::Other;
        }
        Self::classify(
            kinds.len(),
            kinds.contains(&AxisType::Channel),
            kinds.contains(&AxisType::Time),
            kinds.iter().filter(|kind| **kind == AxisType::Space).count(),
        )
    }

    /// Guess an axis layout from the dimensionality of a dataset without axes metadata.
    ///
    /// Two axes are `y, x` and five axes are the implicit `t, c, z, y, x` of OME-Zarr.
    /// Four axes are ambiguous and, like any other dimensionality, give [`AxisLayout::Other`].
    #[must_use]
    pub const fn from_dimensionality(dimensionality: usize) -> Self {
        match dimensionality {
            2 => Self::TwoD,
            5 => Self::SpatialChannelTime3,
            _ => Self::Other,
        }
    }

    /// Returns true if the layout is [`AxisLayout::TwoD`].
    #[must_use]
    pub fn is_2d(&self) -> bool {
        *self == Self::TwoD
    }

    /// Returns true if the layout is [`AxisLayout::SpatialChannelTime2`].
    #[must_use]
    pub fn is_4d_with_channels_and_time(&self) -> bool {
        *self == Self::SpatialChannelTime2
    }

    /// Returns true if the layout is [`AxisLayout::SpatialChannelTime3`].
    #[must_use]
    pub fn is_5d(&self) -> bool {
        *self == Self::SpatialChannelTime3
    }

    /// Returns true if the layout is [`AxisLayout::SpatialChannel3`].
    #[must_use]
    pub fn is_4d_with_channels(&self) -> bool {
        *self == Self::SpatialChannel3
    }

    /// Returns true if the layout is [`AxisLayout::SpatialTime3`].
    #[must_use]
    pub fn is_4d_with_time(&self) -> bool {
        *self == Self::SpatialTime3
    }

    /// Returns the number of dimensions of a dataset with this layout, or [`None`] for [`AxisLayout::Other`].
    #[must_use]
    pub const fn num_dimensions(&self) -> Option<usize> {
        match self {
            Self::TwoD => Some(2),
            Self::SpatialChannelTime2 | Self::SpatialChannel3 | Self::SpatialTime3 => Some(4),
            Self::SpatialChannelTime3 => Some(5),
            Self::Other => None,
        }
    }

    /// Returns the number of spatial axes a cell position must provide.
    ///
    /// This is zero for [`AxisLayout::Other`], which places no requirement on cell positions.
    #[must_use]
    pub const fn spatial_axis_count(&self) -> usize {
        match self {
            Self::TwoD | Self::SpatialChannelTime2 => 2,
            Self::SpatialChannelTime3 | Self::SpatialChannel3 | Self::SpatialTime3 => 3,
            Self::Other => 0,
        }
    }

    /// Returns the position of the channel axis in a chunk index, if the layout has one.
    #[must_use]
    pub const fn channel_index(&self) -> Option<usize> {
        match self {
            Self::SpatialChannelTime2 => Some(2),
            Self::SpatialChannelTime3 | Self::SpatialChannel3 => Some(3),
            Self::TwoD | Self::SpatialTime3 | Self::Other => None,
        }
    }

    /// Returns the position of the time axis in a chunk index, if the layout has one.
    #[must_use]
    pub const fn time_index(&self) -> Option<usize> {
        match self {
            Self::SpatialChannelTime2 | Self::SpatialTime3 => Some(3),
            Self::SpatialChannelTime3 => Some(4),
            Self::TwoD | Self::SpatialChannel3 | Self::Other => None,
        }
    }
}

/// The type of an OME-Zarr axis.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Display)]
pub enum AxisType {
    /// A time axis.
    #[display("time")]
    Time,
    /// A channel axis.
    #[display("channel")]
    Channel,
    /// A spatial axis.
    #[display("space")]
    Space,
    /// Any other axis type.
    #[display("unknown")]
    Unknown,
}

impl Serialize for AxisType {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for AxisType {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let axis_type = String::deserialize(d)?;
        Ok(match axis_type.as_str() {
            "time" => Self::Time,
            "channel" => Self::Channel,
            "space" => Self::Space,
            _ => Self::Unknown,
        })
    }
}

impl AxisType {
    /// The canonical position of the axis type in OME-Zarr axes metadata.
    const fn order(self) -> u8 {
        match self {
            Self::Time => 0,
            Self::Channel => 1,
            Self::Space => 2,
            Self::Unknown => 3,
        }
    }
}

/// An OME-Zarr axis.
///
/// Axes are either a bare name (OME-NGFF 0.3) or an object with a name and optional type and unit (OME-NGFF 0.4+).
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Axis {
    /// An axis name, e.g. `"t"`.
    Name(String),
    /// An axis object.
    Object {
        /// The axis name.
        name: String,
        /// The axis type.
        #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
        axis_type: Option<AxisType>,
        /// The axis unit.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        unit: Option<String>,
    },
}

impl Axis {
    /// Create an axis from a name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    /// Create an axis with a name and type.
    #[must_use]
    pub fn new_with_type(name: impl Into<String>, axis_type: AxisType) -> Self {
        Self::Object {
            name: name.into(),
            axis_type: Some(axis_type),
            unit: None,
        }
    }

    /// Returns the axis name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Name(name) | Self::Object { name, .. } => name,
        }
    }

    /// Returns the axis type.
    ///
    /// Untyped axes are inferred from their name: `t` is time, `c` is channel, and `x`, `y`, `z` are space.
    #[must_use]
    pub fn kind(&self) -> AxisType {
        match self {
            Self::Object {
                axis_type: Some(axis_type),
                ..
            } => *axis_type,
            _ => match self.name() {
                "t" => AxisType::Time,
                "c" => AxisType::Channel,
                "x" | "y" | "z" => AxisType::Space,
                _ => AxisType::Unknown,
            },
        }
    }
}

/// The implicit axes of OME-Zarr images which predate axes metadata.
#[must_use]
pub fn default_axes() -> Vec<Axis> {
    ["t", "c", "z", "y", "x"].into_iter().map(Axis::new).collect()
}
