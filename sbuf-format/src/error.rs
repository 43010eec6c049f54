//! Error types for the SBUF format

use thiserror::Error;

/// SBUF error types
#[derive(Debug, Error)]
pub enum SbufError {
    /// The serialized buffer was requested before `finish` ran.
    #[error("buffer requested before finish")]
    NotFinished,
    /// A builder was mutated after `finish` ran.
    #[error("builder mutated after finish")]
    AlreadyFinished,
    /// `finish` ran with more than one root, or a container end did not
    /// match its start marker.
    #[error("unbalanced containers: {0} values on the stack")]
    UnbalancedContainers(usize),
    /// A map was closed over entries that do not form key/value pairs.
    #[error("malformed map: {0}")]
    MalformedMap(String),
    /// A typed vector was closed over elements of differing types.
    #[error("typed vector elements are not all the same type")]
    TypedVectorTypeMismatch,
    /// An offset did not fit even in 8 bytes.
    #[error("relative offset does not fit in 8 bytes")]
    WidthOverflow,
    /// Two entries of the same map carry identical key bytes.
    #[error("duplicate map key: {0:?}")]
    DuplicateKey(String),
    /// A packed type byte carries a type code outside 0..=11.
    #[error("unknown type code: {0}")]
    InvalidPackedType(u8),
    /// A float was written at a width the format has no encoding for.
    #[error("unsupported float width: {0} bytes")]
    InvalidWidth(usize),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, SbufError>;
