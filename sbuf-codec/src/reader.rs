//! Zero-copy buffer navigation
//!
//! Every view here borrows the caller's byte buffer and carries a few
//! machine words of its own; access constructs further temporary views
//! without allocating. Reads are total: a type mismatch yields an empty
//! stand-in (empty string, empty vector, empty map, zero) rather than an
//! error, and corrupt offsets degrade to the same stand-ins.

use std::cmp::Ordering;
use std::fmt;

use sbuf_format::{scalar, PackedType, Type, VectorType};

static EMPTY_STRING: [u8; 2] = [0, 0];
static EMPTY_VECTOR: [u8; 1] = [0];
// Keys size, keys offset (pointing at the size), keys width, map size.
static EMPTY_MAP: [u8; 4] = [0, 0, 1, 0];

/// Locate the root value of a finished buffer from its two-byte trailer.
pub fn root(buffer: &[u8]) -> Reference<'_> {
    if buffer.len() < 3 {
        return Reference::null_ref();
    }
    let byte_width = buffer[buffer.len() - 1] as usize;
    let packed = buffer[buffer.len() - 2];
    match (buffer.len() - 2).checked_sub(byte_width) {
        Some(addr) => Reference::from_packed(buffer, addr, byte_width, packed),
        None => Reference::null_ref(),
    }
}

/// Container size stored in the `byte_width` bytes before `addr`,
/// capped by the buffer length since every element occupies at least one
/// byte.
fn read_size(buf: &[u8], addr: usize, byte_width: usize) -> usize {
    let raw = match addr.checked_sub(byte_width) {
        Some(pos) => scalar::read_u64(buf, pos, byte_width),
        None => 0,
    };
    (raw as usize).min(buf.len())
}

/// The NUL-terminated key bytes referenced by the offset slot at `slot`.
fn key_bytes_at(buf: &[u8], slot: usize, byte_width: usize) -> &[u8] {
    let off = scalar::read_u64(buf, slot, byte_width);
    let addr = match usize::try_from(off).ok().and_then(|o| slot.checked_sub(o)) {
        Some(addr) => addr,
        None => return &[],
    };
    let tail = match buf.get(addr..) {
        Some(tail) => tail,
        None => return &[],
    };
    match tail.iter().position(|&b| b == 0) {
        Some(end) => &tail[..end],
        None => tail,
    }
}

/// A view of any value in a finished buffer.
///
/// `parent_width` is the width of the slot that held this value and is
/// what inline payloads are read at; `byte_width` is the element width
/// inside whatever container an offset value points at.
#[derive(Debug, Clone, Copy)]
pub struct Reference<'a> {
    buf: &'a [u8],
    addr: usize,
    parent_width: usize,
    byte_width: usize,
    ty: Type,
    vector_type: VectorType,
}

impl<'a> Reference<'a> {
    fn from_parts(
        buf: &'a [u8],
        addr: usize,
        parent_width: usize,
        byte_width: usize,
        ty: Type,
        vector_type: VectorType,
    ) -> Self {
        Self {
            buf,
            addr,
            parent_width,
            byte_width,
            ty,
            vector_type,
        }
    }

    /// Interpret a packed type byte as read from an untyped vector or
    /// the root trailer. An undecodable byte yields a null reference.
    fn from_packed(buf: &'a [u8], addr: usize, parent_width: usize, packed: u8) -> Self {
        match PackedType::from_byte(packed) {
            Ok(p) => Self::from_parts(buf, addr, parent_width, p.width.bytes(), p.ty, p.vector_type),
            Err(_) => Self::null_ref(),
        }
    }

    fn null_ref() -> Self {
        Self::from_parts(&[], 0, 1, 1, Type::Null, VectorType::Key)
    }

    /// The kind of value this reference views.
    pub fn kind(&self) -> Type {
        self.ty
    }

    /// Whether this is a null value (also what absent elements and
    /// failed lookups return).
    pub fn is_null(&self) -> bool {
        self.ty == Type::Null
    }

    /// Whether this is a signed integer, inline or indirect.
    pub fn is_int(&self) -> bool {
        matches!(self.ty, Type::Int | Type::IndirectInt)
    }

    /// Whether this is an unsigned integer, inline or indirect.
    pub fn is_uint(&self) -> bool {
        matches!(self.ty, Type::UInt | Type::IndirectUInt)
    }

    /// Whether this is a float, inline or indirect.
    pub fn is_float(&self) -> bool {
        matches!(self.ty, Type::Float | Type::IndirectFloat)
    }

    /// Whether this is any numeric value.
    pub fn is_numeric(&self) -> bool {
        self.is_int() || self.is_uint() || self.is_float()
    }

    /// Whether this is a string.
    pub fn is_string(&self) -> bool {
        self.ty == Type::String
    }

    /// Whether this is a map key.
    pub fn is_key(&self) -> bool {
        self.ty == Type::Key
    }

    /// Whether this can be viewed as a vector (maps can).
    pub fn is_vector(&self) -> bool {
        matches!(self.ty, Type::Vector | Type::TypedVector | Type::Map)
    }

    /// Whether this is a map.
    pub fn is_map(&self) -> bool {
        self.ty == Type::Map
    }

    /// Resolve the backward relative offset stored in this slot.
    fn indirect(&self) -> Option<usize> {
        let off = scalar::read_u64(self.buf, self.addr, self.parent_width);
        let off = usize::try_from(off).ok()?;
        self.addr.checked_sub(off)
    }

    /// Read as a signed 64-bit integer, converting whatever is here:
    /// floats truncate, strings parse, containers give their element
    /// count, anything else gives 0.
    pub fn as_i64(&self) -> i64 {
        match self.ty {
            Type::Int => scalar::read_i64(self.buf, self.addr, self.parent_width),
            Type::IndirectInt => match self.indirect() {
                Some(addr) => scalar::read_i64(self.buf, addr, self.byte_width),
                None => 0,
            },
            Type::UInt => scalar::read_u64(self.buf, self.addr, self.parent_width) as i64,
            Type::IndirectUInt => match self.indirect() {
                Some(addr) => scalar::read_u64(self.buf, addr, self.byte_width) as i64,
                None => 0,
            },
            Type::Float | Type::IndirectFloat => self.as_f64() as i64,
            Type::String => self.as_string().as_str().parse().unwrap_or(0),
            Type::Vector | Type::Map => self.as_vector().len() as i64,
            Type::TypedVector => self.as_typed_vector().len() as i64,
            Type::Null | Type::Key => 0,
        }
    }

    /// Read as an unsigned 64-bit integer; same conversions as
    /// [`as_i64`](Self::as_i64).
    pub fn as_u64(&self) -> u64 {
        match self.ty {
            Type::UInt => scalar::read_u64(self.buf, self.addr, self.parent_width),
            Type::IndirectUInt => match self.indirect() {
                Some(addr) => scalar::read_u64(self.buf, addr, self.byte_width),
                None => 0,
            },
            Type::Int => scalar::read_i64(self.buf, self.addr, self.parent_width) as u64,
            Type::IndirectInt => match self.indirect() {
                Some(addr) => scalar::read_i64(self.buf, addr, self.byte_width) as u64,
                None => 0,
            },
            Type::Float | Type::IndirectFloat => self.as_f64() as u64,
            Type::String => self.as_string().as_str().parse().unwrap_or(0),
            Type::Vector | Type::Map => self.as_vector().len() as u64,
            Type::TypedVector => self.as_typed_vector().len() as u64,
            Type::Null | Type::Key => 0,
        }
    }

    /// Read as a 64-bit float; same conversions as
    /// [`as_i64`](Self::as_i64).
    pub fn as_f64(&self) -> f64 {
        match self.ty {
            Type::Float => scalar::read_f64(self.buf, self.addr, self.parent_width),
            Type::IndirectFloat => match self.indirect() {
                Some(addr) => scalar::read_f64(self.buf, addr, self.byte_width),
                None => 0.0,
            },
            Type::Int => scalar::read_i64(self.buf, self.addr, self.parent_width) as f64,
            Type::IndirectInt => match self.indirect() {
                Some(addr) => scalar::read_i64(self.buf, addr, self.byte_width) as f64,
                None => 0.0,
            },
            Type::UInt => scalar::read_u64(self.buf, self.addr, self.parent_width) as f64,
            Type::IndirectUInt => match self.indirect() {
                Some(addr) => scalar::read_u64(self.buf, addr, self.byte_width) as f64,
                None => 0.0,
            },
            Type::String => self.as_string().as_str().parse().unwrap_or(0.0),
            Type::Vector | Type::Map => self.as_vector().len() as f64,
            Type::TypedVector => self.as_typed_vector().len() as f64,
            Type::Null | Type::Key => 0.0,
        }
    }

    /// Truncating variant of [`as_i64`](Self::as_i64).
    pub fn as_i32(&self) -> i32 {
        self.as_i64() as i32
    }

    /// Truncating variant of [`as_i64`](Self::as_i64).
    pub fn as_i16(&self) -> i16 {
        self.as_i64() as i16
    }

    /// Truncating variant of [`as_i64`](Self::as_i64).
    pub fn as_i8(&self) -> i8 {
        self.as_i64() as i8
    }

    /// Truncating variant of [`as_u64`](Self::as_u64).
    pub fn as_u32(&self) -> u32 {
        self.as_u64() as u32
    }

    /// Truncating variant of [`as_u64`](Self::as_u64).
    pub fn as_u16(&self) -> u16 {
        self.as_u64() as u16
    }

    /// Truncating variant of [`as_u64`](Self::as_u64).
    pub fn as_u8(&self) -> u8 {
        self.as_u64() as u8
    }

    /// Narrowing variant of [`as_f64`](Self::as_f64).
    pub fn as_f32(&self) -> f32 {
        self.as_f64() as f32
    }

    /// The key text this reference views, or `""` for anything that is
    /// not a key.
    pub fn as_key(&self) -> &'a str {
        if self.ty != Type::Key {
            return "";
        }
        let addr = match self.indirect() {
            Some(addr) => addr,
            None => return "",
        };
        let tail = match self.buf.get(addr..) {
            Some(tail) => tail,
            None => return "",
        };
        let end = tail.iter().position(|&b| b == 0).unwrap_or(tail.len());
        std::str::from_utf8(&tail[..end]).unwrap_or("")
    }

    /// The string this reference views, or the empty string for anything
    /// that is not a string.
    pub fn as_string(&self) -> Str<'a> {
        if self.ty == Type::String {
            if let Some(addr) = self.indirect() {
                return Str {
                    buf: self.buf,
                    addr,
                    byte_width: self.byte_width,
                };
            }
        }
        Str::empty()
    }

    /// A vector view: vectors and maps qualify, everything else gives
    /// the empty vector.
    pub fn as_vector(&self) -> Vector<'a> {
        if matches!(self.ty, Type::Vector | Type::Map) {
            if let Some(addr) = self.indirect() {
                return Vector {
                    buf: self.buf,
                    addr,
                    byte_width: self.byte_width,
                };
            }
        }
        Vector::empty()
    }

    /// A typed-vector view, or the empty vector for anything else.
    pub fn as_typed_vector(&self) -> TypedVector<'a> {
        if self.ty == Type::TypedVector {
            if let Some(addr) = self.indirect() {
                return TypedVector {
                    buf: self.buf,
                    addr,
                    byte_width: self.byte_width,
                    elem_ty: self.vector_type.to_type(),
                };
            }
        }
        TypedVector::empty()
    }

    /// A map view, or the empty map for anything else.
    pub fn as_map(&self) -> Map<'a> {
        if self.ty == Type::Map {
            if let Some(addr) = self.indirect() {
                return Map {
                    buf: self.buf,
                    addr,
                    byte_width: self.byte_width,
                };
            }
        }
        Map::empty()
    }
}

impl fmt::Display for Reference<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ty {
            Type::Null => write!(f, "null"),
            Type::Int | Type::IndirectInt => write!(f, "{}", self.as_i64()),
            Type::UInt | Type::IndirectUInt => write!(f, "{}", self.as_u64()),
            Type::Float | Type::IndirectFloat => write!(f, "{}", self.as_f64()),
            Type::String => write!(f, "{}", self.as_string().as_str()),
            Type::Key => write!(f, "{}", self.as_key()),
            Type::Map => write!(f, "{{..}}"),
            Type::Vector | Type::TypedVector => write!(f, "[..]"),
        }
    }
}

/// A length-prefixed, NUL-terminated string in a finished buffer.
#[derive(Debug, Clone, Copy)]
pub struct Str<'a> {
    buf: &'a [u8],
    addr: usize,
    byte_width: usize,
}

impl<'a> Str<'a> {
    fn empty() -> Self {
        Self {
            buf: &EMPTY_STRING,
            addr: 1,
            byte_width: 1,
        }
    }

    /// Byte length, excluding the NUL terminator.
    pub fn len(&self) -> usize {
        read_size(self.buf, self.addr, self.byte_width)
    }

    /// Whether the string is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The raw string bytes.
    pub fn bytes(&self) -> &'a [u8] {
        self.buf
            .get(self.addr..self.addr + self.len())
            .unwrap_or(&[])
    }

    /// The string text; invalid UTF-8 reads as `""`.
    pub fn as_str(&self) -> &'a str {
        std::str::from_utf8(self.bytes()).unwrap_or("")
    }
}

/// A heterogeneous vector: payload slots followed by one packed type
/// byte per element.
#[derive(Debug, Clone, Copy)]
pub struct Vector<'a> {
    buf: &'a [u8],
    addr: usize,
    byte_width: usize,
}

impl<'a> Vector<'a> {
    fn empty() -> Self {
        Self {
            buf: &EMPTY_VECTOR,
            addr: 1,
            byte_width: 1,
        }
    }

    /// Element count.
    pub fn len(&self) -> usize {
        read_size(self.buf, self.addr, self.byte_width)
    }

    /// Whether the vector has no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The element at `i`, or a null reference past the end.
    pub fn get(&self, i: usize) -> Reference<'a> {
        let len = self.len();
        if i >= len {
            return Reference::null_ref();
        }
        let packed = self
            .buf
            .get(self.addr + len * self.byte_width + i)
            .copied()
            .unwrap_or(0);
        Reference::from_packed(self.buf, self.addr + i * self.byte_width, self.byte_width, packed)
    }

    /// Iterate over the elements.
    pub fn iter(&self) -> impl Iterator<Item = Reference<'a>> + 'a {
        let vector = *self;
        (0..vector.len()).map(move |i| vector.get(i))
    }
}

/// A homogeneous vector: payload slots only, with the element type
/// carried once.
#[derive(Debug, Clone, Copy)]
pub struct TypedVector<'a> {
    buf: &'a [u8],
    addr: usize,
    byte_width: usize,
    elem_ty: Type,
}

impl<'a> TypedVector<'a> {
    fn empty() -> Self {
        Self {
            buf: &EMPTY_VECTOR,
            addr: 1,
            byte_width: 1,
            elem_ty: Type::Key,
        }
    }

    /// The shared element type.
    pub fn element_type(&self) -> Type {
        self.elem_ty
    }

    /// Element count.
    pub fn len(&self) -> usize {
        read_size(self.buf, self.addr, self.byte_width)
    }

    /// Whether the vector has no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The element at `i`, or a null reference past the end.
    pub fn get(&self, i: usize) -> Reference<'a> {
        if i >= self.len() {
            return Reference::null_ref();
        }
        Reference::from_parts(
            self.buf,
            self.addr + i * self.byte_width,
            self.byte_width,
            1,
            self.elem_ty,
            VectorType::Key,
        )
    }

    /// Iterate over the elements.
    pub fn iter(&self) -> impl Iterator<Item = Reference<'a>> + 'a {
        let vector = *self;
        (0..vector.len()).map(move |i| vector.get(i))
    }
}

/// A sorted key/value map: a value vector whose three-field header leads
/// to a parallel typed vector of keys.
#[derive(Debug, Clone, Copy)]
pub struct Map<'a> {
    buf: &'a [u8],
    addr: usize,
    byte_width: usize,
}

impl<'a> Map<'a> {
    fn empty() -> Self {
        Self {
            buf: &EMPTY_MAP,
            addr: 4,
            byte_width: 1,
        }
    }

    /// Entry count.
    pub fn len(&self) -> usize {
        read_size(self.buf, self.addr, self.byte_width)
    }

    /// Whether the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The sorted keys vector.
    pub fn keys(&self) -> TypedVector<'a> {
        let w = self.byte_width;
        let off_pos = match self.addr.checked_sub(3 * w) {
            Some(pos) => pos,
            None => return TypedVector::empty(),
        };
        let off = scalar::read_u64(self.buf, off_pos, w);
        let keys_addr = match usize::try_from(off).ok().and_then(|o| off_pos.checked_sub(o)) {
            Some(addr) => addr,
            None => return TypedVector::empty(),
        };
        let keys_width = scalar::read_u64(self.buf, off_pos + w, w) as usize;
        if !matches!(keys_width, 1 | 2 | 4 | 8) {
            return TypedVector::empty();
        }
        TypedVector {
            buf: self.buf,
            addr: keys_addr,
            byte_width: keys_width,
            elem_ty: Type::Key,
        }
    }

    /// The values as a positional vector, parallel to `keys()`.
    pub fn values(&self) -> Vector<'a> {
        Vector {
            buf: self.buf,
            addr: self.addr,
            byte_width: self.byte_width,
        }
    }

    /// Binary search for `key`. Returns a null reference on a miss.
    pub fn get(&self, key: &str) -> Reference<'a> {
        let keys = self.keys();
        let wanted = key.as_bytes();
        let mut lo = 0;
        let mut hi = keys.len();
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let slot = keys.addr + mid * keys.byte_width;
            match key_bytes_at(self.buf, slot, keys.byte_width).cmp(wanted) {
                Ordering::Less => lo = mid + 1,
                Ordering::Greater => hi = mid,
                Ordering::Equal => return self.values().get(mid),
            }
        }
        Reference::null_ref()
    }

    /// Iterate over `(key, value)` entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, Reference<'a>)> + 'a {
        let map = *self;
        (0..map.len()).map(move |i| (map.keys().get(i).as_key(), map.values().get(i)))
    }
}
