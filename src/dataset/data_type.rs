use derive_more::Display;
use thiserror::Error;

/// The element data type of a dataset.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Display)]
pub enum DataType {
    /// `int8` Integer in `[-2^7, 2^7-1]`.
    #[display("int8")]
    Int8,
    /// `int16` Integer in `[-2^15, 2^15-1]`.
    #[display("int16")]
    Int16,
    /// `int32` Integer in `[-2^31, 2^31-1]`.
    #[display("int32")]
    Int32,
    /// `int64` Integer in `[-2^63, 2^63-1]`.
    #[display("int64")]
    Int64,
    /// `uint8` Integer in `[0, 2^8-1]`.
    #[display("uint8")]
    UInt8,
    /// `uint16` Integer in `[0, 2^16-1]`.
    #[display("uint16")]
    UInt16,
    /// `uint32` Integer in `[0, 2^32-1]`.
    #[display("uint32")]
    UInt32,
    /// `uint64` Integer in `[0, 2^64-1]`.
    #[display("uint64")]
    UInt64,
    /// `float32` IEEE 754 single-precision floating point.
    #[display("float32")]
    Float32,
    /// `float64` IEEE 754 double-precision floating point.
    #[display("float64")]
    Float64,
}

impl DataType {
    /// Returns the size in bytes of an element.
    #[must_use]
    pub const fn size(&self) -> usize {
        match self {
            Self::Int8 | Self::UInt8 => 1,
            Self::Int16 | Self::UInt16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float32 => 4,
            Self::Int64 | Self::UInt64 | Self::Float64 => 8,
        }
    }
}

/// The endianness of each element in an array, either `big` or `little`.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Display)]
pub enum Endianness {
    /// Little endian.
    Little,

    /// Big endian.
    Big,
}

impl Endianness {
    /// Return true if the endianness matches the endianness of the CPU.
    #[must_use]
    pub fn is_native(self) -> bool {
        self == NATIVE_ENDIAN
    }
}

/// The endianness of the CPU.
pub const NATIVE_ENDIAN: Endianness = if cfg!(target_endian = "big") {
    Endianness::Big
} else {
    Endianness::Little
};

/// An unsupported Zarr V2 data type error.
#[derive(Clone, Debug, Error)]
#[error("V2 data type {_0:?} is not supported")]
pub struct UnsupportedDataTypeError(String);

/// Convert a Zarr V2 `dtype` (e.g. `<u2`) to a [`DataType`] and its [`Endianness`].
///
/// Single byte data types have no endianness.
///
/// # Errors
/// Returns an [`UnsupportedDataTypeError`] if the data type is not supported.
pub fn data_type_from_v2_dtype(
    dtype: &str,
) -> Result<(DataType, Option<Endianness>), UnsupportedDataTypeError> {
    let data_type = match dtype {
        "|i1" => DataType::Int8,
        "<i2" | ">i2" => DataType::Int16,
        "<i4" | ">i4" => DataType::Int32,
        "<i8" | ">i8" => DataType::Int64,
        "|u1" => DataType::UInt8,
        "<u2" | ">u2" => DataType::UInt16,
        "<u4" | ">u4" => DataType::UInt32,
        "<u8" | ">u8" => DataType::UInt64,
        "<f4" | ">f4" => DataType::Float32,
        "<f8" | ">f8" => DataType::Float64,
        _ => return Err(UnsupportedDataTypeError(dtype.to_string())),
    };
    let endianness = if dtype.starts_with('<') {
        Some(Endianness::Little)
    } else if dtype.starts_with('>') {
        Some(Endianness::Big)
    } else {
        None
    };
    Ok((data_type, endianness))
}
