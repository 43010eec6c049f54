//! Property-based tests for SBUF format primitives

use proptest::prelude::*;
use sbuf_format::bitwidth::{padding_for, BitWidth};
use sbuf_format::packed::PackedType;
use sbuf_format::scalar::{read_i64, read_u64, write_i64, write_u64};
use sbuf_format::types::{Type, VectorType};

proptest! {
    #[test]
    fn unsigned_width_is_minimal(value in any::<u64>()) {
        let width = BitWidth::for_u64(value);
        let bits = 8 * width.bytes() as u32;

        // The value fits at the chosen width...
        if bits < 64 {
            prop_assert!(value < 1u64 << bits);
        }
        // ...and not at the next width down.
        if width > BitWidth::W8 {
            let narrower_bits = bits / 2;
            prop_assert!(value >= 1u64 << narrower_bits);
        }
    }

    #[test]
    fn signed_width_roundtrips_through_storage(value in any::<i64>()) {
        let width = BitWidth::for_i64(value);
        let mut buf = Vec::new();
        write_i64(&mut buf, value, width.bytes());
        prop_assert_eq!(read_i64(&buf, 0, width.bytes()), value);
    }

    #[test]
    fn signed_width_is_minimal(value in any::<i64>()) {
        let width = BitWidth::for_i64(value);
        if width > BitWidth::W8 {
            // At the next width down, storage would corrupt the value.
            let narrower = 1 << ((width as u8) - 1);
            let mut buf = Vec::new();
            write_i64(&mut buf, value, narrower);
            prop_assert_ne!(read_i64(&buf, 0, narrower), value);
        }
    }

    #[test]
    fn unsigned_roundtrips_at_classified_width(value in any::<u64>()) {
        let width = BitWidth::for_u64(value);
        let mut buf = Vec::new();
        write_u64(&mut buf, value, width.bytes());
        prop_assert_eq!(buf.len(), width.bytes());
        prop_assert_eq!(read_u64(&buf, 0, width.bytes()), value);
    }

    #[test]
    fn packed_byte_roundtrips(code in 0u8..=11, width_code in 0u8..=3, vt_code in 0u8..=3) {
        let packed = PackedType::new(
            BitWidth::from_code(width_code),
            Type::from_u8(code).unwrap(),
            VectorType::from_u8(vt_code),
        );
        prop_assert_eq!(PackedType::from_byte(packed.byte()).unwrap(), packed);
    }

    #[test]
    fn padding_aligns_and_is_minimal(len in 0usize..1_000_000, width_code in 0u8..=3) {
        let byte_width = BitWidth::from_code(width_code).bytes();
        let pad = padding_for(len, byte_width);
        prop_assert!(pad < byte_width);
        prop_assert_eq!((len + pad) % byte_width, 0);
    }
}
