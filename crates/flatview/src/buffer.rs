//! Owned, growable byte storage.
//!
//! Reads are strict: anything that would touch a byte outside
//! `[0, len)` is a [`DecodeError::OutOfBounds`]. The bulk edits used while a
//! buffer is being assembled (`slice`, `pad`, `set`) are permissive instead
//! and clamp or skip.
//!
//! Growth prepends: a builder writes back to front, so existing content
//! keeps its distance from the end of the buffer.

use alloc::{vec, vec::Vec};

use bstr::BStr;

use crate::{
    error::{DecodeError, Result},
    scalar::Scalar,
};

/// A contiguous, growable array of bytes.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ByteBuffer {
    data: Vec<u8>,
}

impl ByteBuffer {
    /// A buffer of `size` zero bytes.
    #[must_use]
    pub fn zeroed(size: usize) -> Self {
        Self {
            data: vec![0; size],
        }
    }

    /// A buffer holding a copy of `bytes`.
    #[must_use]
    pub fn copy_from(bytes: &[u8]) -> Self {
        Self {
            data: bytes.to_vec(),
        }
    }

    /// Current length in bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the buffer holds no bytes.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The whole buffer.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &BStr {
        BStr::new(&self.data)
    }

    /// Borrows `[start, end)` after clamping both ends into `[0, len]` and
    /// `end` to at least `start`. Degenerate ranges yield an empty slice.
    #[must_use]
    pub fn slice(&self, start: usize, end: usize) -> &BStr {
        let start = start.min(self.data.len());
        let end = end.clamp(start, self.data.len());
        BStr::new(&self.data[start..end])
    }

    /// Grows the buffer to `new_size` bytes, keeping the existing content at
    /// the tail and zero-filling the new head. Does nothing unless
    /// `new_size` exceeds the current length.
    pub fn grow(&mut self, new_size: usize) {
        let old_len = self.data.len();
        if new_size <= old_len {
            return;
        }
        let mut grown = vec![0; new_size];
        grown[new_size - old_len..].copy_from_slice(&self.data);
        self.data = grown;
        tracing::trace!(old_len, new_len = new_size, "grew byte buffer");
    }

    /// Zero-fills up to `n` bytes starting at `start`, truncated to the end of
    /// the buffer. Does nothing if `start` is past the end.
    pub fn pad(&mut self, n: usize, start: usize) {
        let Some(tail) = self.data.get_mut(start..) else {
            return;
        };
        let n = n.min(tail.len());
        tail[..n].fill(0);
    }

    /// Copies `bytes` in at `position`.
    ///
    /// Returns `false`, leaving the buffer untouched, when the bytes do not
    /// fit entirely.
    pub fn set(&mut self, bytes: &[u8], position: usize) -> bool {
        let Some(end) = position.checked_add(bytes.len()) else {
            return false;
        };
        match self.data.get_mut(position..end) {
            Some(dst) => {
                dst.copy_from_slice(bytes);
                true
            }
            None => false,
        }
    }

    /// Writes the wire encoding of `value` at `position`, with the same
    /// all-or-nothing contract as [`set`](Self::set).
    pub fn set_scalar<T: Scalar>(&mut self, position: usize, value: T) -> bool {
        self.set(value.to_le_bytes().as_ref(), position)
    }

    /// The byte at `position`.
    ///
    /// # Errors
    ///
    /// [`DecodeError::OutOfBounds`] if `position >= len`.
    pub fn byte_at(&self, position: u32) -> Result<u8> {
        self.data
            .get(position as usize)
            .copied()
            .ok_or_else(|| DecodeError::out_of_bounds(position, 1, self.data.len()))
    }

    /// The bytes from `position` to the end of the buffer.
    ///
    /// # Errors
    ///
    /// [`DecodeError::OutOfBounds`] if `position >= len`; an empty tail is
    /// never handed out.
    pub fn data(&self, position: u32) -> Result<&BStr> {
        match self.data.get(position as usize..) {
            Some(tail) if !tail.is_empty() => Ok(BStr::new(tail)),
            _ => Err(DecodeError::out_of_bounds(position, 1, self.data.len())),
        }
    }

    /// Decodes a `T` stored at `offset`.
    ///
    /// # Errors
    ///
    /// [`DecodeError::OutOfBounds`] unless `[offset, offset + T::WIDTH)` lies
    /// inside the buffer.
    #[inline]
    pub fn read<T: Scalar>(&self, offset: u32) -> Result<T> {
        self.data
            .get(offset as usize..)
            .and_then(T::from_le_slice)
            .ok_or_else(|| DecodeError::out_of_bounds(offset, T::WIDTH, self.data.len()))
    }

    /// Borrows `len` bytes at `offset`.
    ///
    /// # Errors
    ///
    /// [`DecodeError::OutOfBounds`] unless the whole range lies inside the
    /// buffer.
    pub fn bytes(&self, offset: u32, len: u32) -> Result<&BStr> {
        let start = offset as usize;
        start
            .checked_add(len as usize)
            .and_then(|end| self.data.get(start..end))
            .map(BStr::new)
            .ok_or_else(|| DecodeError::out_of_bounds(offset, len as usize, self.data.len()))
    }
}

impl core::fmt::Debug for ByteBuffer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ByteBuffer")
            .field("len", &self.data.len())
            .field("data", &self.as_bytes())
            .finish()
    }
}

impl From<Vec<u8>> for ByteBuffer {
    fn from(data: Vec<u8>) -> Self {
        Self { data }
    }
}

impl From<&[u8]> for ByteBuffer {
    fn from(bytes: &[u8]) -> Self {
        Self::copy_from(bytes)
    }
}

impl From<ByteBuffer> for Vec<u8> {
    fn from(buffer: ByteBuffer) -> Self {
        buffer.data
    }
}

impl AsRef<[u8]> for ByteBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}
