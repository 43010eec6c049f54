//! Little-endian sized scalar reads and writes
//!
//! Every multi-byte quantity on the wire is little-endian and occupies
//! exactly 1, 2, 4, or 8 bytes. Reads are bounds-checked and yield zero
//! past the end of the buffer, keeping the reader total on corrupt input.

use crate::error::{Result, SbufError};

/// Append `value` truncated to `byte_width` little-endian bytes.
pub fn write_u64(buf: &mut Vec<u8>, value: u64, byte_width: usize) {
    buf.extend_from_slice(&value.to_le_bytes()[..byte_width]);
}

/// Append the two's-complement encoding of `value` truncated to
/// `byte_width` little-endian bytes.
pub fn write_i64(buf: &mut Vec<u8>, value: i64, byte_width: usize) {
    write_u64(buf, value as u64, byte_width);
}

/// Append an IEEE-754 encoding of `value` at `byte_width` bytes.
///
/// Only 4 and 8 byte widths have an encoding; 1 and 2 fail with
/// `InvalidWidth`.
pub fn write_f64(buf: &mut Vec<u8>, value: f64, byte_width: usize) -> Result<()> {
    match byte_width {
        8 => buf.extend_from_slice(&value.to_le_bytes()),
        4 => buf.extend_from_slice(&(value as f32).to_le_bytes()),
        other => return Err(SbufError::InvalidWidth(other)),
    }
    Ok(())
}

/// Read `byte_width` little-endian bytes at `pos` as an unsigned integer.
///
/// Widths above 8 can only come from corrupt buffers and read as zero.
pub fn read_u64(buf: &[u8], pos: usize, byte_width: usize) -> u64 {
    if byte_width > 8 {
        return 0;
    }
    let mut bytes = [0u8; 8];
    match pos.checked_add(byte_width).and_then(|end| buf.get(pos..end)) {
        Some(src) => bytes[..byte_width].copy_from_slice(src),
        None => return 0,
    }
    u64::from_le_bytes(bytes)
}

/// Read `byte_width` little-endian bytes at `pos` as a sign-extended
/// signed integer.
pub fn read_i64(buf: &[u8], pos: usize, byte_width: usize) -> i64 {
    if byte_width == 0 || byte_width > 8 {
        return 0;
    }
    let u = read_u64(buf, pos, byte_width);
    let shift = 64 - 8 * byte_width as u32;
    ((u << shift) as i64) >> shift
}

/// Read an IEEE-754 value of `byte_width` bytes at `pos`.
///
/// Widths 1 and 2 have no float encoding and read as `0.0`.
pub fn read_f64(buf: &[u8], pos: usize, byte_width: usize) -> f64 {
    match byte_width {
        8 => f64::from_bits(read_u64(buf, pos, 8)),
        4 => f32::from_bits(read_u64(buf, pos, 4) as u32) as f64,
        _ => 0.0,
    }
}
