//! `serde_json::Value` bridge
//!
//! Encodes any JSON document into a finished buffer and decodes a buffer
//! back into a `serde_json::Value`. The wire format has no boolean code,
//! so booleans go in as `UINT` 0/1 and come back as numbers; everything
//! else round-trips.

use serde_json::{Map as JsonMap, Number, Value};

use sbuf_format::{Result, Type};

use crate::builder::Builder;
use crate::reader::{self, Reference};

/// Encode a JSON document into a finished buffer.
pub fn to_buffer(value: &Value) -> Result<Vec<u8>> {
    let mut builder = Builder::new();
    push_value(&mut builder, value)?;
    builder.finish()?;
    builder.into_buffer()
}

/// Push a JSON value onto a builder as the next value event.
///
/// Arrays become untyped vectors and objects become maps; integers keep
/// their JSON signedness class.
pub fn push_value(builder: &mut Builder, value: &Value) -> Result<()> {
    match value {
        Value::Null => builder.null(),
        Value::Bool(b) => builder.uint(*b as u64),
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                builder.uint(u)
            } else if let Some(i) = n.as_i64() {
                builder.int(i)
            } else {
                builder.double(n.as_f64().unwrap_or(0.0))
            }
        }
        Value::String(s) => builder.string(s).map(|_| ()),
        Value::Array(items) => {
            let start = builder.start_vector();
            for item in items {
                push_value(builder, item)?;
            }
            builder.end_vector(start, false).map(|_| ())
        }
        Value::Object(fields) => {
            let start = builder.start_map();
            for (name, field) in fields {
                builder.key(name)?;
                push_value(builder, field)?;
            }
            builder.end_map(start).map(|_| ())
        }
    }
}

/// Decode a finished buffer into a JSON document.
pub fn from_buffer(buffer: &[u8]) -> Value {
    to_value(reader::root(buffer))
}

/// Convert any reference into a JSON value.
pub fn to_value(reference: Reference<'_>) -> Value {
    match reference.kind() {
        Type::Null => Value::Null,
        Type::Int | Type::IndirectInt => Value::Number(reference.as_i64().into()),
        Type::UInt | Type::IndirectUInt => Value::Number(reference.as_u64().into()),
        Type::Float | Type::IndirectFloat => Number::from_f64(reference.as_f64())
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Type::String => Value::String(reference.as_string().as_str().to_owned()),
        Type::Key => Value::String(reference.as_key().to_owned()),
        Type::Vector => Value::Array(reference.as_vector().iter().map(to_value).collect()),
        Type::TypedVector => {
            Value::Array(reference.as_typed_vector().iter().map(to_value).collect())
        }
        Type::Map => {
            let map = reference.as_map();
            let mut fields = JsonMap::new();
            for (key, value) in map.iter() {
                fields.insert(key.to_owned(), to_value(value));
            }
            Value::Object(fields)
        }
    }
}
