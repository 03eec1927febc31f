//! Loading the cells of a tiled image cache from the chunks of a dataset.
//!
//! A [`ChunkLoader`] is bound to one dataset (typically one resolution level of an OME-Zarr image) at a fixed channel and time.
//! Each call to [`ChunkLoader::load`]
//!  - maps the cell position to a chunk index with [`map_to_chunk_index`],
//!  - reads the chunk with a [dataset reader](crate::dataset::DatasetReaderTraits), and
//!  - materializes the cell with an [`ArrayMaterializer`].
//!
//! A chunk that does not exist, or that could not be read due to a [transient](StorageError::is_transient) storage failure, is materialized as a zero-filled cell.
//! Any other failure is returned to the caller.

mod options;

pub use options::{ChunkLoaderOptions, LogHandle};

use std::{sync::Arc, time::Instant};

use itertools::Itertools;
use thiserror::Error;

use crate::{
    array_creator::{ArrayCreateError, ArrayCreator, ArrayMaterializer},
    axes::AxisLayout,
    cell_grid::{CellGrid, CellGridCreateError},
    chunk_index::{map_to_chunk_index, InvalidCoordinateError},
    dataset::{DatasetAttributes, DatasetReadError, DatasetReaderTraits},
    storage::StorageError,
};

/// A chunk loader creation error.
#[derive(Debug, Error)]
pub enum ChunkLoaderCreateError {
    /// The dataset attributes could not be read, or describe an unsupported dataset.
    #[error(transparent)]
    DatasetReadError(#[from] DatasetReadError),
    /// The dimensionality of the dataset contradicts the axis layout.
    #[error("a {dimensionality}-dimensional dataset cannot have the {layout} axis layout")]
    IncompatibleDimensionality {
        /// The axis layout.
        layout: AxisLayout,
        /// The dimensionality of the dataset.
        dimensionality: usize,
    },
    /// The cell grid could not be created.
    #[error(transparent)]
    CellGridCreateError(#[from] CellGridCreateError),
    /// The dataset has more axes than the cell grid, so cell positions cannot be used as chunk indices unchanged.
    #[error("cell positions with {cell_axes} axes cannot address a {dimensionality}-dimensional dataset with the {layout} axis layout")]
    UnaddressableDataset {
        /// The axis layout.
        layout: AxisLayout,
        /// The dimensionality of the dataset.
        dimensionality: usize,
        /// The number of axes of the cell grid.
        cell_axes: usize,
    },
}

/// A chunk load error.
#[derive(Debug, Error)]
pub enum ChunkLoadError {
    /// The cell position does not have enough elements for the axis layout.
    #[error(transparent)]
    InvalidCoordinate(#[from] InvalidCoordinateError),
    /// A storage error which is not transient.
    #[error(transparent)]
    StorageError(#[from] StorageError),
    /// The cell could not be materialized.
    #[error(transparent)]
    ArrayCreateError(#[from] ArrayCreateError),
}

/// Loads cells of a tiled image cache from the chunks of a dataset.
///
/// The dataset attributes and axis layout are determined once at construction.
/// [`load`](ChunkLoader::load) takes `&self` and holds no state between calls, so a loader can be shared between threads.
pub struct ChunkLoader<TReader: ?Sized, M = ArrayCreator> {
    reader: Arc<TReader>,
    path: String,
    attributes: DatasetAttributes,
    axis_layout: AxisLayout,
    materializer: M,
    options: ChunkLoaderOptions,
}

impl<TReader: ?Sized, M> core::fmt::Debug for ChunkLoader<TReader, M> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ChunkLoader")
            .field("path", &self.path)
            .field("attributes", &self.attributes)
            .field("axis_layout", &self.axis_layout)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<TReader: ?Sized + DatasetReaderTraits> ChunkLoader<TReader> {
    /// Create a chunk loader for the dataset at `path`, producing [`CellArray`](crate::array_creator::CellArray)s.
    ///
    /// The axis layout is taken from `options`, or guessed from the dimensionality of the dataset if unset.
    /// The cell grid is derived from the dataset attributes with [`CellGrid::from_dataset_attributes`].
    /// With [`AxisLayout::Other`] the dataset must have at most three axes, since cell positions are used as chunk indices unchanged.
    ///
    /// # Errors
    /// Returns a [`ChunkLoaderCreateError`] if the dataset attributes cannot be read or the dataset is incompatible with the axis layout.
    pub fn new(
        reader: Arc<TReader>,
        path: &str,
        options: ChunkLoaderOptions,
    ) -> Result<Self, ChunkLoaderCreateError> {
        let attributes = reader.dataset_attributes(path)?;
        let axis_layout = resolve_axis_layout(&attributes, &options)?;
        let grid = CellGrid::from_dataset_attributes(&attributes, axis_layout)?;
        let cell_axes = grid.dimensions().len();
        if axis_layout == AxisLayout::Other && cell_axes != attributes.dimensionality() {
            return Err(ChunkLoaderCreateError::UnaddressableDataset {
                layout: axis_layout,
                dimensionality: attributes.dimensionality(),
                cell_axes,
            });
        }
        let materializer = ArrayCreator::new(grid, attributes.data_type());
        Ok(Self {
            reader,
            path: path.to_string(),
            attributes,
            axis_layout,
            materializer,
            options,
        })
    }
}

impl<TReader: ?Sized + DatasetReaderTraits, M: ArrayMaterializer> ChunkLoader<TReader, M> {
    /// Create a chunk loader for the dataset at `path` with a custom `materializer`.
    ///
    /// # Errors
    /// Returns a [`ChunkLoaderCreateError`] if the dataset attributes cannot be read or the dimensionality of the dataset contradicts the axis layout.
    pub fn new_with_materializer(
        reader: Arc<TReader>,
        path: &str,
        options: ChunkLoaderOptions,
        materializer: M,
    ) -> Result<Self, ChunkLoaderCreateError> {
        let attributes = reader.dataset_attributes(path)?;
        let axis_layout = resolve_axis_layout(&attributes, &options)?;
        Ok(Self {
            reader,
            path: path.to_string(),
            attributes,
            axis_layout,
            materializer,
            options,
        })
    }

    /// The dataset path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The dataset attributes.
    #[must_use]
    pub const fn attributes(&self) -> &DatasetAttributes {
        &self.attributes
    }

    /// The axis layout of the dataset.
    #[must_use]
    pub const fn axis_layout(&self) -> AxisLayout {
        self.axis_layout
    }

    /// The channel chunk index.
    #[must_use]
    pub const fn channel(&self) -> u64 {
        self.options.channel()
    }

    /// The time chunk index.
    #[must_use]
    pub const fn time(&self) -> u64 {
        self.options.time()
    }

    /// The array materializer.
    #[must_use]
    pub const fn materializer(&self) -> &M {
        &self.materializer
    }

    /// Load the cell at `position`.
    ///
    /// Returns a zero-filled cell if the chunk does not exist or a transient storage failure occurs.
    ///
    /// # Errors
    /// Returns a [`ChunkLoadError`] if
    ///  - `position` has fewer elements than the spatial axes of the layout (the dataset is not accessed),
    ///  - the chunk could not be read due to a storage error that is not transient, or
    ///  - the cell could not be materialized.
    pub fn load(&self, position: &[u64]) -> Result<M::Array, ChunkLoadError> {
        let chunk_index = map_to_chunk_index(
            position,
            self.axis_layout,
            self.options.channel(),
            self.options.time(),
        )?;

        let log = self.options.log_chunk_loading();
        let start = log.then(|| {
            self.options
                .log(format_args!("{} {} ...", self.path, fmt_index(&chunk_index)));
            Instant::now()
        });

        let chunk = match self
            .reader
            .read_chunk(&self.path, &self.attributes, &chunk_index)
        {
            Ok(chunk) => chunk,
            Err(err) => {
                if log {
                    self.options.log(format_args!(
                        "{} {} failed: {err}",
                        self.path,
                        fmt_index(&chunk_index)
                    ));
                }
                if err.is_transient() {
                    None
                } else {
                    return Err(err.into());
                }
            }
        };

        if let Some(start) = start {
            match &chunk {
                Some(chunk) => self.options.log(format_args!(
                    "{} {} fetched {} elements in {} ms",
                    self.path,
                    fmt_index(&chunk_index),
                    chunk.num_elements(),
                    start.elapsed().as_millis()
                )),
                None => self.options.log(format_args!(
                    "{} {} is missing, returning zeros",
                    self.path,
                    fmt_index(&chunk_index)
                )),
            }
        }

        Ok(match chunk {
            Some(chunk) => self.materializer.create_from_chunk(&chunk, position)?,
            None => self.materializer.create_empty(position)?,
        })
    }
}

fn resolve_axis_layout(
    attributes: &DatasetAttributes,
    options: &ChunkLoaderOptions,
) -> Result<AxisLayout, ChunkLoaderCreateError> {
    let dimensionality = attributes.dimensionality();
    let layout = options
        .axis_layout()
        .unwrap_or_else(|| AxisLayout::from_dimensionality(dimensionality));
    match layout.num_dimensions() {
        Some(n) if n != dimensionality => Err(ChunkLoaderCreateError::IncompatibleDimensionality {
            layout,
            dimensionality,
        }),
        _ => Ok(layout),
    }
}

fn fmt_index(chunk_index: &[u64]) -> String {
    format!("[{}]", chunk_index.iter().join(", "))
}

#[cfg(test)]
mod tests {
    use std::{
        error::Error,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Mutex,
        },
    };

    use super::*;
    use crate::dataset::{ChunkData, DataType};

    /// An in-memory dataset reader which fails with a configurable error for one chunk.
    struct TestReader {
        attributes: DatasetAttributes,
        failing: Option<(Vec<u64>, fn() -> StorageError)>,
        reads: AtomicUsize,
    }

    impl TestReader {
        fn new(dimensions: Vec<u64>, chunk_shape: Vec<u64>) -> Self {
            Self {
                attributes: DatasetAttributes::new(dimensions, chunk_shape, DataType::UInt8)
                    .unwrap(),
                failing: None,
                reads: AtomicUsize::new(0),
            }
        }
    }

    impl DatasetReaderTraits for TestReader {
        fn dataset_attributes(&self, _path: &str) -> Result<DatasetAttributes, DatasetReadError> {
            Ok(self.attributes.clone())
        }

        fn read_chunk(
            &self,
            _path: &str,
            attributes: &DatasetAttributes,
            chunk_index: &[u64],
        ) -> Result<Option<ChunkData>, StorageError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            if let Some((index, err)) = &self.failing {
                if index == chunk_index {
                    return Err(err());
                }
            }
            // Chunks with an even first index exist and are filled with one plus the sum of the chunk index
            if chunk_index[0] % 2 == 0 {
                let value = u8::try_from(chunk_index.iter().sum::<u64>() + 1).unwrap();
                let num_elements = attributes.chunk_shape().iter().product::<u64>();
                Ok(Some(ChunkData::new(
                    attributes.chunk_shape().to_vec(),
                    vec![value; usize::try_from(num_elements).unwrap()],
                )))
            } else {
                Ok(None)
            }
        }
    }

    fn options(channel: u64, time: u64) -> ChunkLoaderOptions {
        ChunkLoaderOptions::new(channel, time).with_log_chunk_loading(false)
    }

    #[test]
    fn chunk_loader_layout() -> Result<(), Box<dyn Error>> {
        let reader = Arc::new(TestReader::new(vec![8, 8, 3, 2], vec![4, 4, 1, 1]));
        let loader = ChunkLoader::new(
            reader.clone(),
            "image/0",
            options(2, 1).with_axis_layout(AxisLayout::SpatialChannelTime2),
        )?;
        assert_eq!(loader.path(), "image/0");
        assert_eq!(loader.axis_layout(), AxisLayout::SpatialChannelTime2);
        assert_eq!(loader.channel(), 2);
        assert_eq!(loader.time(), 1);

        assert!(matches!(
            ChunkLoader::new(
                reader,
                "image/0",
                options(0, 0).with_axis_layout(AxisLayout::SpatialChannelTime3)
            ),
            Err(ChunkLoaderCreateError::IncompatibleDimensionality {
                layout: AxisLayout::SpatialChannelTime3,
                dimensionality: 4
            })
        ));
        Ok(())
    }

    #[test]
    fn chunk_loader_other_layout() -> Result<(), Box<dyn Error>> {
        // A four-dimensional dataset has no guessed layout, and its cells cannot address chunks unchanged
        let reader = Arc::new(TestReader::new(vec![8, 8, 3, 2], vec![4, 4, 1, 1]));
        assert!(matches!(
            ChunkLoader::new(reader.clone(), "image/0", options(0, 0)),
            Err(ChunkLoaderCreateError::UnaddressableDataset {
                layout: AxisLayout::Other,
                dimensionality: 4,
                cell_axes: 3,
            })
        ));
        assert!(matches!(
            ChunkLoader::new(
                reader,
                "image/0",
                options(0, 0).with_axis_layout(AxisLayout::Other)
            ),
            Err(ChunkLoaderCreateError::UnaddressableDataset { .. })
        ));

        // Up to three axes, cell positions are chunk indices
        let reader = Arc::new(TestReader::new(vec![8, 6, 3], vec![4, 4, 1]));
        let loader = ChunkLoader::new(reader, "image/0", options(0, 0))?;
        assert_eq!(loader.axis_layout(), AxisLayout::Other);
        let cell = loader.load(&[0, 1, 2])?;
        assert_eq!(cell.shape(), &[4, 2, 1]);
        assert_eq!(cell.as_slice::<u8>().unwrap(), &[4; 8]);
        assert!(loader.load(&[1, 1, 2])?.is_all_zero());
        Ok(())
    }

    /// Records the calls made to it.
    #[derive(Default)]
    struct RecordingMaterializer {
        calls: Mutex<Vec<(Option<Vec<u64>>, Vec<u64>)>>,
    }

    impl ArrayMaterializer for RecordingMaterializer {
        type Array = Vec<u64>;

        fn create_empty(&self, position: &[u64]) -> Result<Vec<u64>, ArrayCreateError> {
            self.calls.lock().unwrap().push((None, position.to_vec()));
            Ok(position.to_vec())
        }

        fn create_from_chunk(
            &self,
            chunk: &ChunkData,
            position: &[u64],
        ) -> Result<Vec<u64>, ArrayCreateError> {
            self.calls
                .lock()
                .unwrap()
                .push((Some(chunk.shape().to_vec()), position.to_vec()));
            Ok(position.to_vec())
        }
    }

    #[test]
    fn chunk_loader_custom_materializer() -> Result<(), Box<dyn Error>> {
        let mut reader = TestReader::new(vec![8, 8, 3, 2], vec![4, 4, 1, 1]);
        reader.failing = Some((vec![0, 1, 2, 1], || {
            StorageError::Transient("throttled".to_string())
        }));
        let loader = ChunkLoader::new_with_materializer(
            Arc::new(reader),
            "image/0",
            options(2, 1).with_axis_layout(AxisLayout::SpatialChannelTime2),
            RecordingMaterializer::default(),
        )?;
        assert_eq!(loader.axis_layout(), AxisLayout::SpatialChannelTime2);

        // present, absent, transient failure
        assert_eq!(loader.load(&[0, 0, 0])?, vec![0, 0, 0]);
        assert_eq!(loader.load(&[1, 0, 0])?, vec![1, 0, 0]);
        assert_eq!(loader.load(&[0, 1, 0])?, vec![0, 1, 0]);
        assert_eq!(
            *loader.materializer().calls.lock().unwrap(),
            vec![
                (Some(vec![4, 4, 1, 1]), vec![0, 0, 0]),
                (None, vec![1, 0, 0]),
                (None, vec![0, 1, 0]),
            ]
        );

        // A permanent failure never reaches the materializer
        let mut reader = TestReader::new(vec![8, 8], vec![4, 4]);
        reader.failing = Some((vec![0, 0], || StorageError::Other("corrupt".to_string())));
        let loader = ChunkLoader::new_with_materializer(
            Arc::new(reader),
            "image",
            options(0, 0),
            RecordingMaterializer::default(),
        )?;
        assert!(loader.load(&[0, 0]).is_err());
        assert!(loader.materializer().calls.lock().unwrap().is_empty());
        Ok(())
    }

    #[test]
    fn chunk_loader_load() -> Result<(), Box<dyn Error>> {
        let reader = Arc::new(TestReader::new(vec![8, 6, 3, 2], vec![4, 4, 1, 1]));
        let loader = ChunkLoader::new(
            reader,
            "image/0",
            options(2, 1).with_axis_layout(AxisLayout::SpatialChannelTime2),
        )?;

        // chunk index [0, 1, 2, 1]
        let cell = loader.load(&[0, 1, 0])?;
        assert_eq!(cell.shape(), &[4, 2, 1]);
        assert_eq!(cell.as_slice::<u8>().unwrap(), &[5; 8]);

        let cell = loader.load(&[1, 0, 0])?;
        assert_eq!(cell.shape(), &[4, 4, 1]);
        assert!(cell.is_all_zero());
        Ok(())
    }

    #[test]
    fn chunk_loader_transient_failure() -> Result<(), Box<dyn Error>> {
        let mut reader = TestReader::new(vec![8, 8], vec![4, 4]);
        reader.failing = Some((vec![0, 1], || StorageError::Transient("throttled".to_string())));
        let loader = ChunkLoader::new(Arc::new(reader), "image", options(0, 0))?;
        assert_eq!(loader.axis_layout(), AxisLayout::TwoD);
        let cell = loader.load(&[0, 1, 0])?;
        assert_eq!(cell.shape(), &[4, 4, 1]);
        assert!(cell.is_all_zero());
        assert!(!loader.load(&[0, 0, 0])?.is_all_zero());
        Ok(())
    }

    #[test]
    fn chunk_loader_permanent_failure() -> Result<(), Box<dyn Error>> {
        let mut reader = TestReader::new(vec![8, 8], vec![4, 4]);
        reader.failing = Some((vec![0, 1], || StorageError::Other("corrupt".to_string())));
        let loader = ChunkLoader::new(Arc::new(reader), "image", options(0, 0))?;
        assert!(matches!(
            loader.load(&[0, 1, 0]),
            Err(ChunkLoadError::StorageError(StorageError::Other(_)))
        ));
        Ok(())
    }

    #[test]
    fn chunk_loader_invalid_coordinate() -> Result<(), Box<dyn Error>> {
        let reader = Arc::new(TestReader::new(vec![8, 8, 8, 3, 2], vec![4, 4, 4, 1, 1]));
        let loader = ChunkLoader::new(reader.clone(), "image", options(0, 0))?;
        assert_eq!(loader.axis_layout(), AxisLayout::SpatialChannelTime3);
        let err = loader.load(&[0, 1]).unwrap_err();
        assert!(matches!(err, ChunkLoadError::InvalidCoordinate(_)));
        assert_eq!(reader.reads.load(Ordering::SeqCst), 0);

        // A position outside of the cell grid reaches the reader, but cannot be materialized
        assert!(matches!(
            loader.load(&[0, 2, 0]),
            Err(ChunkLoadError::ArrayCreateError(_))
        ));
        assert_eq!(reader.reads.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[test]
    fn chunk_loader_log() -> Result<(), Box<dyn Error>> {
        let mut reader = TestReader::new(vec![8, 8], vec![4, 4]);
        reader.failing = Some((vec![0, 1], || StorageError::Transient("timeout".to_string())));
        let buffer = Arc::new(Mutex::new(Vec::<u8>::new()));
        let loader = ChunkLoader::new(
            Arc::new(reader),
            "image/1",
            options(0, 0).with_log_handle(buffer.clone(), String::new),
        )?;
        loader.load(&[0, 0, 0])?;
        loader.load(&[1, 0, 0])?;
        loader.load(&[0, 1, 0])?;
        let log = String::from_utf8(buffer.lock().unwrap().clone())?;
        let lines: Vec<&str> = log.lines().collect();
        assert_eq!(lines.len(), 7);
        assert_eq!(lines[0], "image/1 [0, 0] ...");
        assert!(lines[1].starts_with("image/1 [0, 0] fetched 16 elements in "));
        assert!(lines[1].ends_with(" ms"));
        assert_eq!(lines[2], "image/1 [1, 0] ...");
        assert_eq!(lines[3], "image/1 [1, 0] is missing, returning zeros");
        assert_eq!(lines[4], "image/1 [0, 1] ...");
        assert_eq!(
            lines[5],
            "image/1 [0, 1] failed: transient storage failure: timeout"
        );
        assert_eq!(lines[6], "image/1 [0, 1] is missing, returning zeros");
        Ok(())
    }

    #[test]
    fn chunk_loader_log_disabled() -> Result<(), Box<dyn Error>> {
        let buffer = Arc::new(Mutex::new(Vec::<u8>::new()));
        let loader = ChunkLoader::new(
            Arc::new(TestReader::new(vec![8, 8], vec![4, 4])),
            "image",
            options(0, 0)
                .with_log_handle(buffer.clone(), String::new)
                .with_log_chunk_loading(false),
        )?;
        loader.load(&[0, 0, 0])?;
        assert!(buffer.lock().unwrap().is_empty());
        Ok(())
    }
}
