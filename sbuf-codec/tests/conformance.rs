//! Conformance tests pinning the wire format byte for byte

use sbuf_codec::{root, Builder, Type};

/// An empty typed vector of unsigned integers: one length byte, then the
/// root offset and the two-byte trailer.
#[test]
fn empty_typed_uint_vector_trailer() {
    let mut builder = Builder::new();
    builder.typed_uint_vector(&[]).unwrap();
    builder.finish().unwrap();
    let buf = builder.into_buffer().unwrap();

    let packed: u8 = (10 << 2) | (2 << 6); // width 8, VECTOR_TYPED, UINT
    assert_eq!(buf, vec![0, 0, packed, 1]);

    let reference = root(&buf);
    assert_eq!(reference.kind(), Type::TypedVector);
    let vector = reference.as_typed_vector();
    assert_eq!(vector.element_type(), Type::UInt);
    assert!(vector.is_empty());
}

/// The heterogeneous vector `[-4, "Hello", 1995]`: the string is written
/// first, the vector widens to 16-bit slots for 1995, and three packed
/// type bytes trail the payload.
#[test]
fn heterogeneous_vector_layout() {
    let mut builder = Builder::new();
    builder
        .vector(|b| {
            b.int(-4)?;
            b.string("Hello")?;
            b.uint(1995)?;
            Ok(())
        })
        .unwrap();
    builder.finish().unwrap();
    let buf = builder.into_buffer().unwrap();

    assert_eq!(
        buf,
        vec![
            5, b'H', b'e', b'l', b'l', b'o', 0, // length-prefixed string + NUL
            0, // alignment to the vector's 2-byte slots
            3, 0, // element count
            0xFC, 0xFF, // -4
            11, 0, // offset back to the string bytes
            0xCB, 0x07, // 1995
            1 | (1 << 2),
            7 << 2,
            1 | (2 << 2), // packed types: INT, STRING, UINT
            9,            // root offset
            1 | (9 << 2), // root packed type: VECTOR at 16-bit elements
            1,            // root byte width
        ]
    );

    let vector = root(&buf).as_vector();
    assert_eq!(vector.len(), 3);
    assert_eq!(vector.get(0).as_i32(), -4);
    assert_eq!(vector.get(1).as_string().as_str(), "Hello");
    assert_eq!(vector.get(2).as_u32(), 1995);
}

/// Map keys are sorted for binary search; lookups hit by content and
/// miss to a null reference.
#[test]
fn map_sorts_keys_and_looks_up() {
    let mut builder = Builder::new();
    builder
        .map(|b| {
            b.key("name")?;
            b.string("Pham Van Thong")?;
            b.key("birth_year")?;
            b.uint(1995)?;
            b.key("male")?;
            b.uint(1)?;
            Ok(())
        })
        .unwrap();
    builder.finish().unwrap();
    let buf = builder.into_buffer().unwrap();

    let map = root(&buf).as_map();
    assert_eq!(map.len(), 3);

    let keys: Vec<&str> = map.keys().iter().map(|k| k.as_key()).collect();
    assert_eq!(keys, ["birth_year", "male", "name"]);

    let name = map.get("name");
    assert_eq!(name.kind(), Type::String);
    assert_eq!(name.as_string().as_str(), "Pham Van Thong");
    assert_eq!(map.get("birth_year").as_u64(), 1995);
    assert_eq!(map.get("male").as_u64(), 1);
    assert!(map.get("unknown").is_null());
    assert!(map.get("").is_null());
}

/// Nested containers navigate the same way at every depth.
#[test]
fn nested_maps_in_vector() {
    let mut builder = Builder::new();
    builder
        .map(|b| {
            b.key("scores")?;
            b.vector(|b| {
                b.map(|b| {
                    b.key("subject")?;
                    b.string("Math")?;
                    b.key("score")?;
                    b.uint(7)?;
                    Ok(())
                })?;
                b.map(|b| {
                    b.key("subject")?;
                    b.string("Physics")?;
                    b.key("score")?;
                    b.uint(8)?;
                    Ok(())
                })?;
                Ok(())
            })?;
            Ok(())
        })
        .unwrap();
    builder.finish().unwrap();
    let buf = builder.into_buffer().unwrap();

    let scores = root(&buf).as_map().get("scores").as_vector();
    assert_eq!(scores.len(), 2);
    assert_eq!(
        scores.get(1).as_map().get("subject").as_string().as_str(),
        "Physics"
    );
    assert_eq!(scores.get(0).as_map().get("score").as_u64(), 7);
}

/// Values at the 8-bit boundary stay in byte-wide slots: four values and
/// a length byte, nothing more.
#[test]
fn width_boundary_stays_narrow() {
    let mut builder = Builder::new();
    builder.typed_uint_vector(&[0, 127, 128, 255]).unwrap();
    builder.finish().unwrap();
    let buf = builder.into_buffer().unwrap();

    let packed: u8 = (10 << 2) | (2 << 6);
    assert_eq!(buf, vec![4, 0, 127, 128, 255, 4, packed, 1]);

    let vector = root(&buf).as_typed_vector();
    let values: Vec<u64> = vector.iter().map(|v| v.as_u64()).collect();
    assert_eq!(values, [0, 127, 128, 255]);
}

/// An indirect scalar is emitted before the root that references it, so
/// a wide value hangs off a one-byte root slot.
#[test]
fn indirect_uint_root() {
    let mut builder = Builder::new();
    builder.indirect_uint(1_000_000_000_000).unwrap();
    builder.finish().unwrap();
    let buf = builder.into_buffer().unwrap();

    // 8-byte value, 1-byte root offset, packed type, byte width.
    assert_eq!(buf.len(), 11);
    assert_eq!(buf[buf.len() - 1], 1);
    assert_eq!(buf[buf.len() - 2], 3 | (5 << 2)); // 64-bit INDIRECT_UINT
    assert_eq!(buf[buf.len() - 3], 8); // offset back to the value

    let reference = root(&buf);
    assert_eq!(reference.kind(), Type::IndirectUInt);
    assert!(reference.is_uint());
    assert_eq!(reference.as_u64(), 1_000_000_000_000);
    assert_eq!(reference.as_i64(), 1_000_000_000_000);
}

/// Indirect floats and ints resolve through the same offset convention.
#[test]
fn indirect_scalars_roundtrip() {
    let mut builder = Builder::new();
    builder
        .vector(|b| {
            b.indirect_int(-70_000)?;
            b.indirect_double(6.25)?;
            b.indirect_float(1.5)?;
            Ok(())
        })
        .unwrap();
    builder.finish().unwrap();
    let buf = builder.into_buffer().unwrap();

    let vector = root(&buf).as_vector();
    assert_eq!(vector.get(0).as_i64(), -70_000);
    assert_eq!(vector.get(1).as_f64(), 6.25);
    assert_eq!(vector.get(2).as_f32(), 1.5);
}

/// The root trailer also serves scalars directly, with no indirection.
#[test]
fn scalar_roots() {
    let mut builder = Builder::new();
    builder.int(-4).unwrap();
    builder.finish().unwrap();
    let buf = builder.into_buffer().unwrap();
    assert_eq!(buf, vec![0xFC, 1 << 2, 1]);
    assert_eq!(root(&buf).as_i64(), -4);

    let mut builder = Builder::new();
    builder.double(2.5).unwrap();
    builder.finish().unwrap();
    let buf = builder.into_buffer().unwrap();
    assert_eq!(buf.len(), 10);
    assert_eq!(root(&buf).as_f64(), 2.5);

    let mut builder = Builder::new();
    builder.null().unwrap();
    builder.finish().unwrap();
    let buf = builder.into_buffer().unwrap();
    assert_eq!(buf, vec![0, 0, 1]);
    assert!(root(&buf).is_null());
}

/// A map whose value slots widen: the shared slot width applies to the
/// header fields, the size, and every element uniformly.
#[test]
fn map_with_wide_values() {
    let mut builder = Builder::new();
    builder
        .map(|b| {
            b.key("small")?;
            b.uint(1)?;
            b.key("wide")?;
            b.uint(100_000)?;
            Ok(())
        })
        .unwrap();
    builder.finish().unwrap();
    let buf = builder.into_buffer().unwrap();

    let map = root(&buf).as_map();
    assert_eq!(map.get("small").as_u64(), 1);
    assert_eq!(map.get("wide").as_u64(), 100_000);

    let keys = map.keys();
    assert_eq!(keys.len(), 2);
    assert_eq!(keys.get(0).as_key(), "small");
    assert_eq!(keys.get(1).as_key(), "wide");
}
