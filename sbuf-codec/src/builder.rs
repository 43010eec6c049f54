//! Stack-based encoder
//!
//! The builder accepts a depth-first stream of value events. Scalars,
//! keys, and strings push one pending value each; closing a container
//! pops a contiguous tail of pending values, emits the container's bytes
//! at the smallest width that holds its size, its header fields, and its
//! element slots, and pushes one value describing the emitted container.
//! The buffer only ever grows; offsets always point backward, so there is
//! no back-patching.

use smallvec::SmallVec;

use sbuf_format::{padding_for, scalar, BitWidth, Result, SbufError, Type, VectorType};

use crate::value::{Payload, Value};

/// Single-threaded encoder producing one finished byte buffer.
///
/// Events must balance: every `start_vector`/`start_map` needs a matching
/// `end_vector`/`end_map`, and `finish` requires exactly one value left
/// on the stack. The builder is neither thread-safe nor reentrant.
#[derive(Debug)]
pub struct Builder {
    buf: Vec<u8>,
    stack: SmallVec<[Value; 8]>,
    finished: bool,
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    /// Create an empty builder with a buffer capacity hint.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            stack: SmallVec::new(),
            finished: false,
        }
    }

    /// The serialized buffer, available once `finish` has run.
    pub fn buffer(&self) -> Result<&[u8]> {
        if self.finished {
            Ok(&self.buf)
        } else {
            Err(SbufError::NotFinished)
        }
    }

    /// Consume the builder and take the serialized buffer.
    pub fn into_buffer(self) -> Result<Vec<u8>> {
        if self.finished {
            Ok(self.buf)
        } else {
            Err(SbufError::NotFinished)
        }
    }

    /// Push a null.
    pub fn null(&mut self) -> Result<()> {
        self.ensure_unfinished()?;
        self.stack.push(Value::null());
        Ok(())
    }

    /// Push an inline signed integer.
    pub fn int(&mut self, i: i64) -> Result<()> {
        self.ensure_unfinished()?;
        self.stack.push(Value::int(i));
        Ok(())
    }

    /// Push an inline unsigned integer.
    pub fn uint(&mut self, u: u64) -> Result<()> {
        self.ensure_unfinished()?;
        self.stack.push(Value::uint(u));
        Ok(())
    }

    /// Push an inline 32-bit float.
    pub fn float(&mut self, f: f32) -> Result<()> {
        self.ensure_unfinished()?;
        self.stack.push(Value::float(f));
        Ok(())
    }

    /// Push an inline 64-bit float.
    pub fn double(&mut self, f: f64) -> Result<()> {
        self.ensure_unfinished()?;
        self.stack.push(Value::double(f));
        Ok(())
    }

    /// Write a signed integer to the buffer and push an offset to it.
    /// Lets a wide scalar be held by a narrower parent slot.
    pub fn indirect_int(&mut self, i: i64) -> Result<()> {
        self.ensure_unfinished()?;
        let width = BitWidth::for_i64(i);
        let byte_width = self.align(width);
        let loc = self.buf.len();
        scalar::write_i64(&mut self.buf, i, byte_width);
        self.stack.push(Value::offset(loc, Type::IndirectInt, width));
        Ok(())
    }

    /// Write an unsigned integer to the buffer and push an offset to it.
    pub fn indirect_uint(&mut self, u: u64) -> Result<()> {
        self.ensure_unfinished()?;
        let width = BitWidth::for_u64(u);
        let byte_width = self.align(width);
        let loc = self.buf.len();
        scalar::write_u64(&mut self.buf, u, byte_width);
        self.stack.push(Value::offset(loc, Type::IndirectUInt, width));
        Ok(())
    }

    /// Write a 32-bit float to the buffer and push an offset to it.
    pub fn indirect_float(&mut self, f: f32) -> Result<()> {
        self.push_indirect_float(f as f64, BitWidth::W32)
    }

    /// Write a 64-bit float to the buffer and push an offset to it.
    pub fn indirect_double(&mut self, f: f64) -> Result<()> {
        self.push_indirect_float(f, BitWidth::W64)
    }

    fn push_indirect_float(&mut self, f: f64, width: BitWidth) -> Result<()> {
        self.ensure_unfinished()?;
        let byte_width = self.align(width);
        let loc = self.buf.len();
        scalar::write_f64(&mut self.buf, f, byte_width)?;
        self.stack.push(Value::offset(loc, Type::IndirectFloat, width));
        Ok(())
    }

    /// Write a map key: the bytes followed by a NUL terminator, no length
    /// prefix. Returns the absolute start offset of the written bytes.
    ///
    /// Keys may not contain an interior NUL byte; the terminator is the
    /// only length information the wire form carries.
    pub fn key(&mut self, key: &str) -> Result<usize> {
        self.ensure_unfinished()?;
        if key.as_bytes().contains(&0) {
            return Err(SbufError::MalformedMap(format!(
                "key {key:?} contains a NUL byte"
            )));
        }
        let loc = self.buf.len();
        self.buf.extend_from_slice(key.as_bytes());
        self.buf.push(0);
        self.stack.push(Value::offset(loc, Type::Key, BitWidth::W8));
        Ok(loc)
    }

    /// Write a string: a length prefix at the width of the length, the
    /// bytes, and a NUL terminator. Returns the absolute start offset of
    /// the string bytes.
    pub fn string(&mut self, s: &str) -> Result<usize> {
        self.ensure_unfinished()?;
        let width = BitWidth::for_u64(s.len() as u64);
        let byte_width = self.align(width);
        scalar::write_u64(&mut self.buf, s.len() as u64, byte_width);
        let loc = self.buf.len();
        self.buf.extend_from_slice(s.as_bytes());
        self.buf.push(0);
        self.stack.push(Value::offset(loc, Type::String, width));
        Ok(loc)
    }

    /// Open a vector. Returns the marker to pass to `end_vector`.
    pub fn start_vector(&self) -> usize {
        self.stack.len()
    }

    /// Open a map. Returns the marker to pass to `end_map`.
    pub fn start_map(&self) -> usize {
        self.stack.len()
    }

    /// Close a vector over every value pushed since `start`. With
    /// `typed`, all elements must share one of the Int/UInt/Float/Key
    /// types and no per-element type bytes are written. Returns the
    /// absolute offset of the vector's first element slot.
    pub fn end_vector(&mut self, start: usize, typed: bool) -> Result<usize> {
        self.end_vector_with(start, typed.then_some(VectorType::Key))
    }

    fn end_vector_with(&mut self, start: usize, typed: Option<VectorType>) -> Result<usize> {
        self.ensure_unfinished()?;
        if start > self.stack.len() {
            return Err(SbufError::UnbalancedContainers(self.stack.len()));
        }
        let count = self.stack.len() - start;
        let vec = self.create_vector(start, count, 1, typed, None)?;
        self.stack.truncate(start);
        self.stack.push(vec);
        Ok(vec.offset_target())
    }

    /// Close a map over the alternating key/value entries pushed since
    /// `start`. Entries are sorted by key bytes so the reader can binary
    /// search. Returns the absolute offset of the first value slot.
    pub fn end_map(&mut self, start: usize) -> Result<usize> {
        self.ensure_unfinished()?;
        if start > self.stack.len() {
            return Err(SbufError::UnbalancedContainers(self.stack.len()));
        }
        let len = self.stack.len() - start;
        if len % 2 != 0 {
            return Err(SbufError::MalformedMap(
                "odd number of map entries".to_string(),
            ));
        }
        for entry in self.stack[start..].iter().step_by(2) {
            if entry.ty() != Type::Key {
                return Err(SbufError::MalformedMap(
                    "non-key value at a key position".to_string(),
                ));
            }
        }

        // Sort whole pairs, comparing the key bytes each key offset
        // references. The buffer has not moved since the keys were
        // written, so the offsets are still valid.
        let mut pairs: Vec<(Value, Value)> = self.stack[start..]
            .chunks_exact(2)
            .map(|pair| (pair[0], pair[1]))
            .collect();
        pairs.sort_by(|a, b| key_bytes(&self.buf, &a.0).cmp(key_bytes(&self.buf, &b.0)));
        for adjacent in pairs.windows(2) {
            let key = key_bytes(&self.buf, &adjacent[0].0);
            if key == key_bytes(&self.buf, &adjacent[1].0) {
                return Err(SbufError::DuplicateKey(
                    String::from_utf8_lossy(key).into_owned(),
                ));
            }
        }
        for (i, (key, value)) in pairs.iter().enumerate() {
            self.stack[start + 2 * i] = *key;
            self.stack[start + 2 * i + 1] = *value;
        }

        // The keys become their own typed vector; the values vector is
        // then emitted with a header pointing back at it.
        let pair_count = len / 2;
        let keys = self.create_vector(start, pair_count, 2, Some(VectorType::Key), None)?;
        let map = self.create_vector(start + 1, pair_count, 2, None, Some(keys))?;
        self.stack.truncate(start);
        self.stack.push(map);
        Ok(map.offset_target())
    }

    /// Build an untyped vector from the values `f` pushes.
    pub fn vector<F>(&mut self, f: F) -> Result<usize>
    where
        F: FnOnce(&mut Builder) -> Result<()>,
    {
        let start = self.start_vector();
        f(self)?;
        self.end_vector(start, false)
    }

    /// Build a typed vector from the values `f` pushes.
    pub fn typed_vector<F>(&mut self, f: F) -> Result<usize>
    where
        F: FnOnce(&mut Builder) -> Result<()>,
    {
        let start = self.start_vector();
        f(self)?;
        self.end_vector(start, true)
    }

    /// Build a map from the alternating keys and values `f` pushes.
    pub fn map<F>(&mut self, f: F) -> Result<usize>
    where
        F: FnOnce(&mut Builder) -> Result<()>,
    {
        let start = self.start_map();
        f(self)?;
        self.end_map(start)
    }

    /// Build a typed vector of signed integers from a slice.
    pub fn typed_int_vector(&mut self, values: &[i64]) -> Result<usize> {
        let start = self.start_vector();
        for &v in values {
            self.int(v)?;
        }
        self.end_vector_with(start, Some(VectorType::Int))
    }

    /// Build a typed vector of unsigned integers from a slice.
    pub fn typed_uint_vector(&mut self, values: &[u64]) -> Result<usize> {
        let start = self.start_vector();
        for &v in values {
            self.uint(v)?;
        }
        self.end_vector_with(start, Some(VectorType::UInt))
    }

    /// Build a typed vector of 64-bit floats from a slice.
    pub fn typed_float_vector(&mut self, values: &[f64]) -> Result<usize> {
        let start = self.start_vector();
        for &v in values {
            self.double(v)?;
        }
        self.end_vector_with(start, Some(VectorType::Float))
    }

    /// Write the root value and the two-byte trailer. The stack must
    /// hold exactly one value; every other value must have been popped
    /// into some container.
    pub fn finish(&mut self) -> Result<()> {
        self.ensure_unfinished()?;
        if self.stack.len() != 1 {
            return Err(SbufError::UnbalancedContainers(self.stack.len()));
        }
        let root = self.stack[0];
        let byte_width = self.align(root.elem_width(self.buf.len(), 0)?);
        self.write_any(root, byte_width)?;
        self.buf.push(root.packed_type(BitWidth::W8));
        self.buf.push(byte_width as u8);
        self.finished = true;
        Ok(())
    }

    fn ensure_unfinished(&self) -> Result<()> {
        if self.finished {
            Err(SbufError::AlreadyFinished)
        } else {
            Ok(())
        }
    }

    /// Pad with zeros so the next write of `width`-sized scalars lands
    /// aligned. Returns the byte width.
    fn align(&mut self, width: BitWidth) -> usize {
        let byte_width = width.bytes();
        let pad = padding_for(self.buf.len(), byte_width);
        self.buf.resize(self.buf.len() + pad, 0);
        byte_width
    }

    /// Write the relative form of an absolute offset: distance from the
    /// field's own position back to the target.
    fn write_offset(&mut self, target: usize, byte_width: usize) -> Result<()> {
        let relative = (self.buf.len() - target) as u64;
        if byte_width < 8 && relative >= 1u64 << (8 * byte_width as u32) {
            return Err(SbufError::WidthOverflow);
        }
        scalar::write_u64(&mut self.buf, relative, byte_width);
        Ok(())
    }

    fn write_any(&mut self, value: Value, byte_width: usize) -> Result<()> {
        match value.payload() {
            Payload::Int(i) => scalar::write_i64(&mut self.buf, i, byte_width),
            Payload::UInt(u) => scalar::write_u64(&mut self.buf, u, byte_width),
            Payload::Float(f) => return scalar::write_f64(&mut self.buf, f, byte_width),
            Payload::Offset(target) => return self.write_offset(target, byte_width),
        }
        Ok(())
    }

    /// Emit a container from the stack slice starting at `start`,
    /// visiting every `step`-th entry, `vec_len` entries in all.
    ///
    /// With `typed`, elements share one type and no per-element type
    /// bytes are written; an empty typed vector keeps the supplied tag.
    /// With `keys`, the emitted vector is a map body prefixed by the
    /// keys-offset and keys-width header fields.
    fn create_vector(
        &mut self,
        start: usize,
        vec_len: usize,
        step: usize,
        typed: Option<VectorType>,
        keys: Option<Value>,
    ) -> Result<Value> {
        let mut bit_width = BitWidth::for_u64(vec_len as u64);
        let mut prefix_elems = 1;
        if let Some(keys) = keys {
            // The keys header is an offset field like any other and
            // joins the same width fit test, at slot 0 of the prefix.
            bit_width = bit_width.max(keys.elem_width(self.buf.len(), 0)?);
            prefix_elems += 2;
        }

        let mut vector_type = typed.unwrap_or(VectorType::Key);
        let end = self.stack.len();
        let mut ordinal = 0;
        let mut i = start;
        while i < end {
            let elem = self.stack[i];
            bit_width = bit_width.max(elem.elem_width(self.buf.len(), ordinal + prefix_elems)?);
            if typed.is_some() {
                let elem_type = elem
                    .ty()
                    .to_vector_type()
                    .ok_or(SbufError::TypedVectorTypeMismatch)?;
                if ordinal == 0 {
                    vector_type = elem_type;
                } else if elem_type != vector_type {
                    return Err(SbufError::TypedVectorTypeMismatch);
                }
            }
            i += step;
            ordinal += 1;
        }

        let byte_width = self.align(bit_width);
        if let Some(keys) = keys {
            self.write_offset(keys.offset_target(), byte_width)?;
            scalar::write_u64(&mut self.buf, keys.min_bit_width().bytes() as u64, byte_width);
        }
        scalar::write_u64(&mut self.buf, vec_len as u64, byte_width);

        let data_loc = self.buf.len();
        let mut i = start;
        while i < end {
            let elem = self.stack[i];
            self.write_any(elem, byte_width)?;
            i += step;
        }
        if typed.is_none() {
            let mut i = start;
            while i < end {
                let packed = self.stack[i].packed_type(bit_width);
                self.buf.push(packed);
                i += step;
            }
        }

        let ty = if keys.is_some() {
            Type::Map
        } else if typed.is_some() {
            Type::TypedVector
        } else {
            Type::Vector
        };
        Ok(Value::container(data_loc, ty, vector_type, bit_width))
    }
}

/// The NUL-terminated bytes a key value references.
fn key_bytes<'b>(buf: &'b [u8], key: &Value) -> &'b [u8] {
    let tail = &buf[key.offset_target()..];
    match tail.iter().position(|&b| b == 0) {
        Some(end) => &tail[..end],
        None => tail,
    }
}
