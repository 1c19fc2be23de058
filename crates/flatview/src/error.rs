use alloc::string::String;

use thiserror::Error;

/// Failures raised by the strict read path of the decoder.
///
/// Bulk edits on a [`ByteBuffer`](crate::ByteBuffer) (`slice`, `pad`, `set`)
/// never fail; they clamp or do nothing instead. A keyed lookup that finds
/// nothing is `Ok(None)`, not an error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DecodeError {
    /// A read of `width` bytes at `offset` does not fit in a buffer of `len`
    /// bytes. `offset` is signed because address arithmetic may underflow.
    #[error("read of {width} byte(s) at offset {offset} is outside buffer of {len} byte(s)")]
    OutOfBounds {
        /// First byte of the attempted read.
        offset: i64,
        /// Number of bytes the read needed.
        width: usize,
        /// Length of the buffer at the time of the read.
        len: usize,
    },
    /// The handle (or the view holding it) no longer references a buffer.
    #[error("buffer handle has been released")]
    Released,
    /// A scalar kind tag or name outside the eleven wire kinds.
    #[error("invalid scalar kind: {0}")]
    InvalidKind(String),
    /// Exclusive access was requested while other handles alias the buffer.
    #[error("buffer is aliased by {handles} handles")]
    Aliased {
        /// Live handles at the time of the request, including the caller's.
        handles: usize,
    },
}

impl DecodeError {
    pub(crate) fn out_of_bounds(offset: impl Into<i64>, width: usize, len: usize) -> Self {
        Self::OutOfBounds {
            offset: offset.into(),
            width,
            len,
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = DecodeError> = core::result::Result<T, E>;
