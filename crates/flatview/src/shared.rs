//! Reference-counted ownership of a [`ByteBuffer`].
//!
//! Every [`View`](crate::View) holds a [`SharedBuffer`]; cloning one is the
//! retain, dropping it is the release. The buffer is freed when the last
//! handle goes away. A handle may also be released early, after which every
//! access through it fails with [`DecodeError::Released`].
//!
//! Counts are non-atomic by default. The `sync` feature switches to atomic
//! counts so that handles and views may cross threads; mutation still needs
//! exclusive access through [`SharedBuffer::get_mut`].

use core::fmt;

use crate::{
    buffer::ByteBuffer,
    error::{DecodeError, Result},
};

#[cfg(not(feature = "sync"))]
type Shared<T> = alloc::rc::Rc<T>;
#[cfg(feature = "sync")]
type Shared<T> = alloc::sync::Arc<T>;

/// The allocation behind every handle; dropped with the last one.
struct Slot(ByteBuffer);

impl Drop for Slot {
    fn drop(&mut self) {
        tracing::debug!(len = self.0.len(), "freed shared byte buffer");
    }
}

/// One counted reference to a [`ByteBuffer`].
#[derive(Clone, Default)]
pub struct SharedBuffer {
    inner: Option<Shared<Slot>>,
}

impl SharedBuffer {
    /// Wraps `buffer` in its first handle.
    #[must_use]
    pub fn new(buffer: ByteBuffer) -> Self {
        Self {
            inner: Some(Shared::new(Slot(buffer))),
        }
    }

    /// A handle that references no buffer.
    #[must_use]
    pub const fn detached() -> Self {
        Self { inner: None }
    }

    /// A second handle to the same buffer.
    #[must_use]
    pub fn retain(&self) -> Self {
        self.clone()
    }

    /// Gives up this handle's share of the buffer, freeing the buffer if no
    /// other handle remains. Releasing twice does nothing.
    pub fn release(&mut self) {
        let Some(inner) = self.inner.take() else {
            return;
        };
        let remaining = Shared::strong_count(&inner) - 1;
        tracing::trace!(remaining, "released buffer handle");
        drop(inner);
    }

    /// The referenced buffer.
    ///
    /// # Errors
    ///
    /// [`DecodeError::Released`] once this handle has been released.
    #[inline]
    pub fn get(&self) -> Result<&ByteBuffer> {
        self.inner
            .as_deref()
            .map(|slot| &slot.0)
            .ok_or(DecodeError::Released)
    }

    /// Exclusive access for `grow`, `pad` and `set`.
    ///
    /// # Errors
    ///
    /// [`DecodeError::Released`] once released, [`DecodeError::Aliased`]
    /// while any other handle references the buffer.
    pub fn get_mut(&mut self) -> Result<&mut ByteBuffer> {
        let inner = self.inner.as_mut().ok_or(DecodeError::Released)?;
        let handles = Shared::strong_count(inner);
        Shared::get_mut(inner)
            .map(|slot| &mut slot.0)
            .ok_or(DecodeError::Aliased { handles })
    }

    /// Number of live handles to the buffer, or 0 once released.
    #[must_use]
    pub fn handle_count(&self) -> usize {
        self.inner.as_ref().map_or(0, Shared::strong_count)
    }

    /// Whether this handle no longer references a buffer.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.inner.is_none()
    }

    /// Whether both handles reference the same live buffer.
    #[must_use]
    pub fn same_buffer(&self, other: &Self) -> bool {
        match (&self.inner, &other.inner) {
            (Some(a), Some(b)) => Shared::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<ByteBuffer> for SharedBuffer {
    fn from(buffer: ByteBuffer) -> Self {
        Self::new(buffer)
    }
}

impl fmt::Debug for SharedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Some(inner) => f
                .debug_struct("SharedBuffer")
                .field("handles", &Shared::strong_count(inner))
                .field("len", &inner.0.len())
                .finish(),
            None => f.write_str("SharedBuffer(<released>)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retain_and_release_track_handles() {
        let mut a = SharedBuffer::new(ByteBuffer::zeroed(4));
        assert_eq!(a.handle_count(), 1);

        let mut b = a.retain();
        let c = b.clone();
        assert_eq!(a.handle_count(), 3);
        assert!(a.same_buffer(&c));

        b.release();
        assert!(b.is_released());
        assert_eq!(b.handle_count(), 0);
        assert_eq!(a.handle_count(), 2);

        b.release();
        assert_eq!(a.handle_count(), 2);

        drop(c);
        assert_eq!(a.handle_count(), 1);
        assert_eq!(a.get().map(ByteBuffer::len), Ok(4));

        a.release();
        assert_eq!(a.get(), Err(DecodeError::Released));
    }

    #[test]
    fn mutation_requires_sole_handle() {
        let mut a = SharedBuffer::new(ByteBuffer::copy_from(b"abc"));
        let b = a.retain();
        assert_eq!(a.get_mut().err(), Some(DecodeError::Aliased { handles: 2 }));
        drop(b);
        a.get_mut().unwrap().grow(5);
        assert_eq!(a.get().unwrap().as_bytes(), b"\0\0abc".as_slice());
    }

    #[test]
    fn detached_handle_is_released() {
        let mut h = SharedBuffer::detached();
        assert!(h.is_released());
        assert_eq!(h.get(), Err(DecodeError::Released));
        assert_eq!(h.get_mut().err(), Some(DecodeError::Released));
        assert!(!h.same_buffer(&SharedBuffer::default()));
    }
}
