//! Zero-copy reader for vtable-indexed binary buffers.
//!
//! Encoded buffers are read in place: a [`View`] pairs a reference-counted
//! [`SharedBuffer`] with a byte position and decodes scalars, strings,
//! vectors, sub-tables and unions on demand, resolving optional fields through
//! the table's vtable. Sorted vectors can be searched by key without decoding
//! them ([`View::lookup`]).
//!
//! ```
//! use flatview::{ByteBuffer, ScalarKind, SharedBuffer, View};
//!
//! let bytes = ByteBuffer::copy_from(&[4, 0, 0, 0, 0x2a, 0, 0, 0]);
//! let view = View::new(SharedBuffer::new(bytes), 0);
//! assert_eq!(view.indirect(0), Ok(4));
//! assert_eq!(ScalarKind::UOFFSET.unpack(view.buffer()?, 4)?.to_string(), "42");
//! # Ok::<(), flatview::DecodeError>(())
//! ```
//!
//! Every read is bounds checked and reports [`DecodeError`] instead of
//! panicking, so untrusted buffers are safe to inspect.

#![no_std]
extern crate alloc;

#[cfg(test)]
extern crate std;

mod buffer;
mod error;
mod scalar;
mod search;
mod shared;
mod view;

#[cfg(test)]
mod tests;

pub use buffer::ByteBuffer;
pub use error::{DecodeError, Result};
pub use scalar::{SOffset, Scalar, ScalarKind, ScalarType, ScalarValue, UOffset, VOffset};
pub use search::{Found, LookupSpec, SearchKey};
pub use shared::SharedBuffer;
pub use view::{VectorRef, View};
