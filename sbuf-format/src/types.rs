//! Value type codes

use crate::error::{Result, SbufError};

/// Value type codes (bits 5:2 of the packed type byte).
///
/// Types up to and including `Float` are stored inline in the parent's
/// slot; everything above is reached through a backward relative offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Type {
    /// Present but null; value bytes are ignored
    Null = 0,
    /// Inline signed integer
    Int = 1,
    /// Inline unsigned integer
    UInt = 2,
    /// Inline IEEE-754 float (32 or 64 bit per width)
    Float = 3,
    /// Offset to a signed integer
    IndirectInt = 4,
    /// Offset to an unsigned integer
    IndirectUInt = 5,
    /// Offset to an IEEE-754 float
    IndirectFloat = 6,
    /// Offset to length-prefixed, NUL-terminated bytes
    String = 7,
    /// Offset to NUL-terminated bytes without a length prefix
    Key = 8,
    /// Offset to a heterogeneous vector
    Vector = 9,
    /// Offset to a homogeneous vector
    TypedVector = 10,
    /// Offset to a sorted key/value map
    Map = 11,
}

impl Type {
    /// Convert from the raw 4-bit code.
    pub fn from_u8(val: u8) -> Result<Self> {
        match val {
            0 => Ok(Type::Null),
            1 => Ok(Type::Int),
            2 => Ok(Type::UInt),
            3 => Ok(Type::Float),
            4 => Ok(Type::IndirectInt),
            5 => Ok(Type::IndirectUInt),
            6 => Ok(Type::IndirectFloat),
            7 => Ok(Type::String),
            8 => Ok(Type::Key),
            9 => Ok(Type::Vector),
            10 => Ok(Type::TypedVector),
            11 => Ok(Type::Map),
            other => Err(SbufError::InvalidPackedType(other)),
        }
    }

    /// Whether values of this type live inside the parent's slot.
    pub fn is_inline(self) -> bool {
        self as u8 <= Type::Float as u8
    }

    /// Whether this type may be the shared element type of a typed vector.
    pub fn is_vector_element(self) -> bool {
        matches!(self, Type::Int | Type::UInt | Type::Float | Type::Key)
    }

    /// The typed-vector element tag for this type, if it has one.
    pub fn to_vector_type(self) -> Option<VectorType> {
        match self {
            Type::Key => Some(VectorType::Key),
            Type::Int => Some(VectorType::Int),
            Type::UInt => Some(VectorType::UInt),
            Type::Float => Some(VectorType::Float),
            _ => None,
        }
    }
}

/// Typed-vector element tags (bits 7:6 of the packed type byte).
///
/// `Key` doubles as the "ignore me" value carried by everything that is
/// not a typed vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum VectorType {
    /// String-key elements; also the placeholder for non-typed-vectors
    Key = 0,
    /// Signed integer elements
    Int = 1,
    /// Unsigned integer elements
    UInt = 2,
    /// Float elements
    Float = 3,
}

impl VectorType {
    /// Convert from the raw 2-bit code. Out-of-range bits are masked.
    pub fn from_u8(val: u8) -> Self {
        match val & 3 {
            1 => VectorType::Int,
            2 => VectorType::UInt,
            3 => VectorType::Float,
            _ => VectorType::Key,
        }
    }

    /// The element `Type` this tag stands for.
    pub fn to_type(self) -> Type {
        match self {
            VectorType::Key => Type::Key,
            VectorType::Int => Type::Int,
            VectorType::UInt => Type::UInt,
            VectorType::Float => Type::Float,
        }
    }
}
