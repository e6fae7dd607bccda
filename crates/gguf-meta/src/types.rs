//! GGUF format types and constants.

use serde::{Deserialize, Serialize};

/// Magic bytes at offset 0 of every GGUF file.
pub const GGUF_MAGIC: [u8; 4] = *b"GGUF";

//  Value type tag

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u32)]
pub enum GgufValueType {
    Uint8 = 0,
    Int8 = 1,
    Uint16 = 2,
    Int16 = 3,
    Uint32 = 4,
    Int32 = 5,
    Float32 = 6,
    Bool = 7,
    String = 8,
    Array = 9,
    Uint64 = 10,
    Int64 = 11,
    Float64 = 12,
}

impl TryFrom<u32> for GgufValueType {
    type Error = GgufError;
    fn try_from(v: u32) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(Self::Uint8),
            1 => Ok(Self::Int8),
            2 => Ok(Self::Uint16),
            3 => Ok(Self::Int16),
            4 => Ok(Self::Uint32),
            5 => Ok(Self::Int32),
            6 => Ok(Self::Float32),
            7 => Ok(Self::Bool),
            8 => Ok(Self::String),
            9 => Ok(Self::Array),
            10 => Ok(Self::Uint64),
            11 => Ok(Self::Int64),
            12 => Ok(Self::Float64),
            _ => Err(GgufError::InvalidValueType(v)),
        }
    }
}

/// Wire layout of one value: a fixed byte width, a length-prefixed
/// string, or an array with its own element tag and count.
///
/// All skip arithmetic goes through this table; an entry that is
/// under- or over-skipped desyncs every entry after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueLayout {
    Fixed(u64),
    LengthPrefixed,
    Array,
}

impl GgufValueType {
    pub fn layout(self) -> ValueLayout {
        match self {
            Self::Uint8 | Self::Int8 | Self::Bool => ValueLayout::Fixed(1),
            Self::Uint16 | Self::Int16 => ValueLayout::Fixed(2),
            Self::Uint32 | Self::Int32 | Self::Float32 => ValueLayout::Fixed(4),
            Self::Uint64 | Self::Int64 | Self::Float64 => ValueLayout::Fixed(8),
            Self::String => ValueLayout::LengthPrefixed,
            Self::Array => ValueLayout::Array,
        }
    }
}

//  Header

/// Fixed-size header preceding the metadata block.
///
/// The version field is carried for diagnostics but never validated —
/// the KV wire format is the same across the versions seen in the wild.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GgufHeader {
    pub version: u32,
    pub tensor_count: u64,
    pub metadata_kv_count: u64,
}

//  Error

#[derive(Debug, thiserror::Error)]
pub enum GgufError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid GGUF magic: {0:02X?}")]
    InvalidMagic([u8; 4]),

    #[error("invalid value type tag: {0}")]
    InvalidValueType(u32),

    #[error("truncated header (file too small)")]
    TruncatedHeader,

    #[error("{0}")]
    Other(String),
}
