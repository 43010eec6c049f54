//! SBUF Codec - Encoder and zero-copy reader
//!
//! This crate provides the two engines that share the SBUF wire format:
//!
//! - [`Builder`], a stack-based encoder fed a depth-first stream of value
//!   events, emitting a single contiguous byte buffer with minimal widths
//! - [`Reference`] and its sibling views, which navigate any finished
//!   buffer with zero-copy O(1) element access and O(log n) keyed map
//!   lookups
//! - [`json`], a `serde_json::Value` bridge over both
//!
//! Wire-format primitives live in the `sbuf-format` crate.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod builder;
pub mod json;
pub mod reader;
mod value;

// Re-export commonly used types
pub use builder::Builder;
pub use reader::{root, Map, Reference, Str, TypedVector, Vector};
pub use sbuf_format::{BitWidth, PackedType, Result, SbufError, Type, VectorType};
