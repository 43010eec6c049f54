//! The packed type byte
//!
//! One byte describes any value: bits 1:0 carry the bit-width code, bits
//! 5:2 the type code, and bits 7:6 the typed-vector element tag (zero for
//! anything that is not a typed vector).

use crate::bitwidth::BitWidth;
use crate::error::Result;
use crate::types::{Type, VectorType};

/// A decoded packed type byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackedType {
    /// Slot width: of the value itself for scalars, of the target
    /// container's elements for offset types
    pub width: BitWidth,
    /// Value type code
    pub ty: Type,
    /// Element tag, meaningful only when `ty` is `TypedVector`
    pub vector_type: VectorType,
}

impl PackedType {
    /// Pack the three fields.
    pub fn new(width: BitWidth, ty: Type, vector_type: VectorType) -> Self {
        Self {
            width,
            ty,
            vector_type,
        }
    }

    /// The packed byte describing a null value.
    pub fn null() -> Self {
        Self::new(BitWidth::W8, Type::Null, VectorType::Key)
    }

    /// Encode to the wire byte.
    pub fn byte(self) -> u8 {
        self.width as u8 | (self.ty as u8) << 2 | (self.vector_type as u8) << 6
    }

    /// Decode from the wire byte. Fails on type codes outside 0..=11.
    pub fn from_byte(byte: u8) -> Result<Self> {
        Ok(Self {
            width: BitWidth::from_code(byte & 3),
            ty: Type::from_u8((byte >> 2) & 0xF)?,
            vector_type: VectorType::from_u8(byte >> 6),
        })
    }
}
