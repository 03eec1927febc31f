//! Mapping cell positions of a tiled image cache to chunk indices.
//!
//! A cache addresses cells over spatial axes only, while a dataset indexes chunks over all of its axes.
//! [`map_to_chunk_index`] copies the spatial part of a cell position and inserts the fixed channel and time chunk indices at the positions dictated by the [`AxisLayout`].

use itertools::Itertools;
use thiserror::Error;

use crate::axes::AxisLayout;

/// Chunk indices, ordered fastest-varying axis first.
pub type ChunkIndex = Vec<u64>;

/// A cell position that has fewer elements than the spatial axes of the layout.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("cell position [{}] has {} elements, but the {layout} layout requires at least {expected}", .position.iter().join(", "), .position.len())]
pub struct InvalidCoordinateError {
    position: Vec<u64>,
    layout: AxisLayout,
    expected: usize,
}

impl InvalidCoordinateError {
    /// Create a new invalid coordinate error.
    #[must_use]
    pub fn new(position: Vec<u64>, layout: AxisLayout, expected: usize) -> Self {
        Self {
            position,
            layout,
            expected,
        }
    }

    /// The rejected cell position.
    #[must_use]
    pub fn position(&self) -> &[u64] {
        &self.position
    }

    /// The minimum number of elements required by the layout.
    #[must_use]
    pub const fn expected(&self) -> usize {
        self.expected
    }
}

/// Map a cell position to the chunk index of a dataset with axis layout `layout`.
///
/// The first [`spatial_axis_count`](AxisLayout::spatial_axis_count) elements of `position` are copied and `channel` and/or `time` are appended.
/// Elements of `position` beyond the spatial axes are ignored, except for [`AxisLayout::Other`] where `position` is returned unchanged.
///
/// # Errors
/// Returns an [`InvalidCoordinateError`] if `position` has fewer elements than the spatial axes of `layout`.
pub fn map_to_chunk_index(
    position: &[u64],
    layout: AxisLayout,
    channel: u64,
    time: u64,
) -> Result<ChunkIndex, InvalidCoordinateError> {
    let spatial = layout.spatial_axis_count();
    if position.len() < spatial {
        return Err(InvalidCoordinateError::new(
            position.to_vec(),
            layout,
            spatial,
        ));
    }
    let spatial = &position[..spatial];
    Ok(match layout {
        AxisLayout::TwoD => spatial.to_vec(),
        AxisLayout::SpatialChannelTime2 | AxisLayout::SpatialChannelTime3 => {
            [spatial, &[channel, time][..]].concat()
        }
        AxisLayout::SpatialChannel3 => [spatial, &[channel][..]].concat(),
        AxisLayout::SpatialTime3 => [spatial, &[time][..]].concat(),
        AxisLayout::Other => position.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_index_2d() {
        assert_eq!(
            map_to_chunk_index(&[4, 4], AxisLayout::TwoD, 0, 0).unwrap(),
            vec![4, 4]
        );
        assert_eq!(
            map_to_chunk_index(&[4, 4], AxisLayout::TwoD, 3, 7).unwrap(),
            vec![4, 4]
        );
        // the cache pads 2D cell grids with a singleton axis
        assert_eq!(
            map_to_chunk_index(&[4, 4, 0], AxisLayout::TwoD, 3, 7).unwrap(),
            vec![4, 4]
        );
    }

    #[test]
    fn chunk_index_spatial_channel_time() {
        assert_eq!(
            map_to_chunk_index(&[5, 9], AxisLayout::SpatialChannelTime2, 3, 7).unwrap(),
            vec![5, 9, 3, 7]
        );
        assert_eq!(
            map_to_chunk_index(&[5, 9, 0], AxisLayout::SpatialChannelTime2, 3, 7).unwrap(),
            vec![5, 9, 3, 7]
        );
        assert_eq!(
            map_to_chunk_index(&[1, 2, 3], AxisLayout::SpatialChannelTime3, 4, 5).unwrap(),
            vec![1, 2, 3, 4, 5]
        );
    }

    #[test]
    fn chunk_index_spatial_channel_or_time() {
        assert_eq!(
            map_to_chunk_index(&[1, 2, 3], AxisLayout::SpatialChannel3, 2, 9).unwrap(),
            vec![1, 2, 3, 2]
        );
        assert_eq!(
            map_to_chunk_index(&[1, 2, 3], AxisLayout::SpatialTime3, 2, 9).unwrap(),
            vec![1, 2, 3, 9]
        );
    }

    #[test]
    fn chunk_index_other() {
        assert_eq!(
            map_to_chunk_index(&[1, 2, 3], AxisLayout::Other, 2, 9).unwrap(),
            vec![1, 2, 3]
        );
        assert_eq!(
            map_to_chunk_index(&[], AxisLayout::Other, 2, 9).unwrap(),
            Vec::<u64>::new()
        );
    }

    #[test]
    fn chunk_index_deterministic() {
        let a = map_to_chunk_index(&[6, 1, 2], AxisLayout::SpatialChannelTime3, 1, 2).unwrap();
        let b = map_to_chunk_index(&[6, 1, 2], AxisLayout::SpatialChannelTime3, 1, 2).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn chunk_index_invalid() {
        let err = map_to_chunk_index(&[1, 2], AxisLayout::SpatialChannel3, 0, 0).unwrap_err();
        assert_eq!(err.position(), &[1, 2]);
        assert_eq!(err.expected(), 3);
        assert_eq!(
            err.to_string(),
            "cell position [1, 2] has 2 elements, but the CZYX layout requires at least 3"
        );
        assert!(map_to_chunk_index(&[1], AxisLayout::TwoD, 0, 0).is_err());
        assert!(map_to_chunk_index(&[1], AxisLayout::SpatialChannelTime2, 0, 0).is_err());
        assert!(map_to_chunk_index(&[1, 2], AxisLayout::SpatialChannelTime3, 0, 0).is_err());
        assert!(map_to_chunk_index(&[1, 2], AxisLayout::SpatialTime3, 0, 0).is_err());
    }
}
