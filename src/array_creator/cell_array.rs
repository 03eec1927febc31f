use crate::dataset::DataType;

/// The typed elements of a [`CellArray`].
#[derive(Clone, Debug, PartialEq)]
#[allow(missing_docs)]
pub enum CellData {
    Int8(Vec<i8>),
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    UInt8(Vec<u8>),
    UInt16(Vec<u16>),
    UInt32(Vec<u32>),
    UInt64(Vec<u64>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
}

macro_rules! cell_data_dispatch {
    ($data:expr, $v:ident => $body:expr) => {
        match $data {
            CellData::Int8($v) => $body,
            CellData::Int16($v) => $body,
            CellData::Int32($v) => $body,
            CellData::Int64($v) => $body,
            CellData::UInt8($v) => $body,
            CellData::UInt16($v) => $body,
            CellData::UInt32($v) => $body,
            CellData::UInt64($v) => $body,
            CellData::Float32($v) => $body,
            CellData::Float64($v) => $body,
        }
    };
}

impl CellData {
    /// Create zero-filled cell data with `num_elements` elements of `data_type`.
    #[must_use]
    pub fn zeros(data_type: DataType, num_elements: usize) -> Self {
        match data_type {
            DataType::Int8 => Self::Int8(vec![0; num_elements]),
            DataType::Int16 => Self::Int16(vec![0; num_elements]),
            DataType::Int32 => Self::Int32(vec![0; num_elements]),
            DataType::Int64 => Self::Int64(vec![0; num_elements]),
            DataType::UInt8 => Self::UInt8(vec![0; num_elements]),
            DataType::UInt16 => Self::UInt16(vec![0; num_elements]),
            DataType::UInt32 => Self::UInt32(vec![0; num_elements]),
            DataType::UInt64 => Self::UInt64(vec![0; num_elements]),
            DataType::Float32 => Self::Float32(vec![0.0; num_elements]),
            DataType::Float64 => Self::Float64(vec![0.0; num_elements]),
        }
    }

    /// Create cell data from native-endian `bytes` of `data_type`.
    ///
    /// The length of `bytes` must be a multiple of the data type size.
    #[must_use]
    pub fn from_ne_bytes(data_type: DataType, bytes: &[u8]) -> Self {
        match data_type {
            DataType::Int8 => Self::Int8(bytemuck::pod_collect_to_vec(bytes)),
            DataType::Int16 => Self::Int16(bytemuck::pod_collect_to_vec(bytes)),
            DataType::Int32 => Self::Int32(bytemuck::pod_collect_to_vec(bytes)),
            DataType::Int64 => Self::Int64(bytemuck::pod_collect_to_vec(bytes)),
            DataType::UInt8 => Self::UInt8(bytes.to_vec()),
            DataType::UInt16 => Self::UInt16(bytemuck::pod_collect_to_vec(bytes)),
            DataType::UInt32 => Self::UInt32(bytemuck::pod_collect_to_vec(bytes)),
            DataType::UInt64 => Self::UInt64(bytemuck::pod_collect_to_vec(bytes)),
            DataType::Float32 => Self::Float32(bytemuck::pod_collect_to_vec(bytes)),
            DataType::Float64 => Self::Float64(bytemuck::pod_collect_to_vec(bytes)),
        }
    }

    /// The data type of the elements.
    #[must_use]
    pub const fn data_type(&self) -> DataType {
        match self {
            Self::Int8(_) => DataType::Int8,
            Self::Int16(_) => DataType::Int16,
            Self::Int32(_) => DataType::Int32,
            Self::Int64(_) => DataType::Int64,
            Self::UInt8(_) => DataType::UInt8,
            Self::UInt16(_) => DataType::UInt16,
            Self::UInt32(_) => DataType::UInt32,
            Self::UInt64(_) => DataType::UInt64,
            Self::Float32(_) => DataType::Float32,
            Self::Float64(_) => DataType::Float64,
        }
    }

    /// The number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        cell_data_dispatch!(self, v => v.len())
    }

    /// Returns true if there are no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The elements as native-endian bytes.
    #[must_use]
    pub fn as_ne_bytes(&self) -> &[u8] {
        cell_data_dispatch!(self, v => bytemuck::cast_slice(v))
    }
}

/// Element types of [`CellData`].
pub trait CellElement: bytemuck::Pod {
    /// The data type of the element.
    const DATA_TYPE: DataType;

    /// Return the elements of `data` if they are of this type.
    fn slice(data: &CellData) -> Option<&[Self]>;
}

macro_rules! impl_cell_element {
    ($t:ty, $variant:ident) => {
        impl CellElement for $t {
            const DATA_TYPE: DataType = DataType::$variant;

            fn slice(data: &CellData) -> Option<&[Self]> {
                if let CellData::$variant(v) = data {
                    Some(v)
                } else {
                    None
                }
            }
        }
    };
}

impl_cell_element!(i8, Int8);
impl_cell_element!(i16, Int16);
impl_cell_element!(i32, Int32);
impl_cell_element!(i64, Int64);
impl_cell_element!(u8, UInt8);
impl_cell_element!(u16, UInt16);
impl_cell_element!(u32, UInt32);
impl_cell_element!(u64, UInt64);
impl_cell_element!(f32, Float32);
impl_cell_element!(f64, Float64);

/// A materialized cell of an image cache.
///
/// The elements are laid out with the first axis of [`shape`](CellArray::shape) varying fastest.
#[derive(Clone, Debug, PartialEq)]
pub struct CellArray {
    shape: Vec<u64>,
    data: CellData,
}

impl CellArray {
    /// Create a new cell array.
    ///
    /// Returns [`None`] if the number of elements of `data` does not match `shape`.
    #[must_use]
    pub fn new(shape: Vec<u64>, data: CellData) -> Option<Self> {
        if shape.iter().product::<u64>() == data.len() as u64 {
            Some(Self { shape, data })
        } else {
            None
        }
    }

    /// Create a zero-filled cell array.
    ///
    /// # Panics
    /// Panics if the number of elements exceeds [`usize::MAX`].
    #[must_use]
    pub fn zeros(shape: Vec<u64>, data_type: DataType) -> Self {
        let num_elements = usize::try_from(shape.iter().product::<u64>()).unwrap();
        Self {
            data: CellData::zeros(data_type, num_elements),
            shape,
        }
    }

    /// The cell shape, fastest-varying first.
    #[must_use]
    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    /// The cell elements.
    #[must_use]
    pub const fn data(&self) -> &CellData {
        &self.data
    }

    /// Consume the cell array and return its elements.
    #[must_use]
    pub fn into_data(self) -> CellData {
        self.data
    }

    /// The element data type.
    #[must_use]
    pub const fn data_type(&self) -> DataType {
        self.data.data_type()
    }

    /// The number of elements.
    #[must_use]
    pub fn num_elements(&self) -> usize {
        self.data.len()
    }

    /// Returns true if every element is zero (all bits unset).
    #[must_use]
    pub fn is_all_zero(&self) -> bool {
        self.data.as_ne_bytes().iter().all(|b| *b == 0)
    }

    /// Return the elements as a slice of `T`, or [`None`] if `T` does not match the data type.
    #[must_use]
    pub fn as_slice<T: CellElement>(&self) -> Option<&[T]> {
        T::slice(&self.data)
    }

    #[cfg(feature = "ndarray")]
    /// Return the cell as an [`ndarray::ArrayD<T>`], or [`None`] if `T` does not match the data type.
    ///
    /// The axes of the returned array are reversed relative to [`shape`](CellArray::shape), so the last axis varies fastest.
    /// For a cell with shape `[x, y, z]` the array is indexed as `[z, y, x]`.
    #[must_use]
    pub fn to_ndarray<T: CellElement>(&self) -> Option<ndarray::ArrayD<T>> {
        let elements = self.as_slice::<T>()?.to_vec();
        let shape: Vec<usize> = self
            .shape
            .iter()
            .rev()
            .map(|s| usize::try_from(*s).ok())
            .collect::<Option<_>>()?;
        ndarray::ArrayD::<T>::from_shape_vec(shape, elements).ok()
    }
}
