//! Transient encoder stack entries

use sbuf_format::{padding_for, BitWidth, PackedType, Result, SbufError, Type, VectorType};

/// The 64-bit payload of a pending value, tagged by how it will be
/// written.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Payload {
    Int(i64),
    UInt(u64),
    Float(f64),
    /// Absolute buffer position of bytes already written
    Offset(usize),
}

/// One pending value on the builder's stack. Created by a scalar, key,
/// string, or container-end event; consumed when the enclosing container
/// (or `finish`) pops it.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Value {
    payload: Payload,
    ty: Type,
    vector_type: VectorType,
    // For scalars: of the value itself; for containers: of their
    // elements; for strings: of the length prefix.
    min_bit_width: BitWidth,
}

impl Value {
    pub(crate) fn null() -> Self {
        Self {
            payload: Payload::Int(0),
            ty: Type::Null,
            vector_type: VectorType::Key,
            min_bit_width: BitWidth::W8,
        }
    }

    pub(crate) fn int(i: i64) -> Self {
        Self {
            payload: Payload::Int(i),
            ty: Type::Int,
            vector_type: VectorType::Key,
            min_bit_width: BitWidth::for_i64(i),
        }
    }

    pub(crate) fn uint(u: u64) -> Self {
        Self {
            payload: Payload::UInt(u),
            ty: Type::UInt,
            vector_type: VectorType::Key,
            min_bit_width: BitWidth::for_u64(u),
        }
    }

    pub(crate) fn float(f: f32) -> Self {
        Self {
            payload: Payload::Float(f as f64),
            ty: Type::Float,
            vector_type: VectorType::Key,
            min_bit_width: BitWidth::W32,
        }
    }

    pub(crate) fn double(f: f64) -> Self {
        Self {
            payload: Payload::Float(f),
            ty: Type::Float,
            vector_type: VectorType::Key,
            min_bit_width: BitWidth::W64,
        }
    }

    /// A value written to the buffer already, referenced by offset.
    pub(crate) fn offset(target: usize, ty: Type, width: BitWidth) -> Self {
        Self {
            payload: Payload::Offset(target),
            ty,
            vector_type: VectorType::Key,
            min_bit_width: width,
        }
    }

    /// An emitted container, with the resolved element tag of its
    /// elements.
    pub(crate) fn container(
        target: usize,
        ty: Type,
        vector_type: VectorType,
        width: BitWidth,
    ) -> Self {
        Self {
            payload: Payload::Offset(target),
            ty,
            vector_type,
            min_bit_width: width,
        }
    }

    pub(crate) fn payload(&self) -> Payload {
        self.payload
    }

    pub(crate) fn ty(&self) -> Type {
        self.ty
    }

    pub(crate) fn min_bit_width(&self) -> BitWidth {
        self.min_bit_width
    }

    /// Absolute buffer position this value points at. Zero for inline
    /// values, which carry no offset.
    pub(crate) fn offset_target(&self) -> usize {
        match self.payload {
            Payload::Offset(target) => target,
            _ => 0,
        }
    }

    /// Width this value occupies once stored in a slot of a parent whose
    /// elements are `parent` wide. Inline values widen to the parent;
    /// offset values keep their target's width in the packed byte.
    fn stored_width(&self, parent: BitWidth) -> BitWidth {
        if self.ty.is_inline() {
            self.min_bit_width.max(parent)
        } else {
            self.min_bit_width
        }
    }

    /// The packed type byte describing this value inside a parent of the
    /// given element width.
    pub(crate) fn packed_type(&self, parent: BitWidth) -> u8 {
        PackedType::new(self.stored_width(parent), self.ty, self.vector_type).byte()
    }

    /// Width needed to store this value as element `elem_index` of a
    /// container whose emission starts at `buf_len`.
    ///
    /// Inline values answer directly. Offset values hold an absolute
    /// target but are stored relative, and whether the relative offset
    /// fits a candidate width depends on where the slot lands after
    /// alignment of that same width, so each width is tried in turn.
    pub(crate) fn elem_width(&self, buf_len: usize, elem_index: usize) -> Result<BitWidth> {
        if self.ty.is_inline() {
            return Ok(self.min_bit_width);
        }
        let target = self.offset_target();
        let mut byte_width = 1usize;
        while byte_width <= 8 {
            let offset_loc =
                buf_len + padding_for(buf_len, byte_width) + elem_index * byte_width;
            let width = BitWidth::for_u64((offset_loc - target) as u64);
            if width.bytes() == byte_width {
                return Ok(width);
            }
            byte_width *= 2;
        }
        Err(SbufError::WidthOverflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_widths() {
        assert_eq!(Value::int(0).min_bit_width(), BitWidth::W8);
        assert_eq!(Value::int(-129).min_bit_width(), BitWidth::W16);
        assert_eq!(Value::uint(1995).min_bit_width(), BitWidth::W16);
        assert_eq!(Value::float(1.5).min_bit_width(), BitWidth::W32);
        assert_eq!(Value::double(1.5).min_bit_width(), BitWidth::W64);
    }

    #[test]
    fn test_inline_elem_width_ignores_position() {
        let v = Value::uint(300);
        assert_eq!(v.elem_width(0, 0).unwrap(), BitWidth::W16);
        assert_eq!(v.elem_width(12_345, 7).unwrap(), BitWidth::W16);
    }

    #[test]
    fn test_offset_elem_width_fits_after_alignment() {
        // Target at 1, buffer at 7, element 2 of a vector with a 1-elem
        // prefix: at width 1 the slot lands at 9, offset 8 fits a byte.
        let v = Value::offset(1, Type::String, BitWidth::W8);
        assert_eq!(v.elem_width(7, 2).unwrap(), BitWidth::W8);

        // A target 300 bytes back cannot fit a byte-wide slot.
        let v = Value::offset(0, Type::String, BitWidth::W8);
        assert_eq!(v.elem_width(300, 0).unwrap(), BitWidth::W16);
    }

    #[test]
    fn test_stored_width_widens_inline_only() {
        let inline = Value::uint(5);
        assert_eq!(inline.stored_width(BitWidth::W32), BitWidth::W32);

        let offset = Value::offset(0, Type::String, BitWidth::W8);
        assert_eq!(offset.stored_width(BitWidth::W32), BitWidth::W8);
    }

    #[test]
    fn test_packed_type_parent_width() {
        // An int widened into 2-byte slots is described as 16-bit.
        let v = Value::int(-4);
        assert_eq!(v.packed_type(BitWidth::W16), 1 | (1 << 2));
        // The string's packed byte keeps its own length-prefix width.
        let s = Value::offset(1, Type::String, BitWidth::W8);
        assert_eq!(s.packed_type(BitWidth::W16), 7 << 2);
    }
}
