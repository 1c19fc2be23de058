//! Zero-copy cursor over an encoded buffer.
//!
//! Overview
//! - A [`View`] is a `(SharedBuffer, position)` pair. It decodes nothing up
//!   front; every accessor computes an address from the position and reads
//!   the bytes it needs straight out of the buffer.
//! - Tables start with a signed 32-bit offset back to their vtable. A vtable
//!   is a run of little-endian `u16`s: its own byte size, the table's byte
//!   size, then one relative field offset per field slot (0 = absent).
//! - Strings, vectors, sub-tables and unions are reached through an unsigned
//!   32-bit forward offset stored at the field's address.
//!
//! Offsets taken by the accessors
//! - [`View::offset`] takes a vtable slot and returns an offset relative to
//!   the view's position.
//! - [`View::vector`], [`View::vector_len`] and [`View::union`] take that
//!   relative offset.
//! - [`View::indirect`], [`View::string`] and [`View::get`] take absolute
//!   buffer offsets, i.e. `pos + relative`.
//!
//! Address arithmetic never wraps: an address that would fall outside
//! `0..=u32::MAX` is reported as [`DecodeError::OutOfBounds`], as is every
//! read that does not fit in the buffer.

use bstr::BStr;

use crate::{
    buffer::ByteBuffer,
    error::{DecodeError, Result},
    scalar::{SOffset, Scalar, ScalarKind, ScalarValue, UOffset, VOffset, with_scalar_type},
    shared::SharedBuffer,
};

/// Size of the length prefix in front of strings and vectors.
const LENGTH_PREFIX: i64 = 4;

/// `base + delta` as a buffer address.
#[inline]
pub(crate) fn advance(buffer: &ByteBuffer, base: u32, delta: i64) -> Result<u32> {
    let target = i64::from(base) + delta;
    u32::try_from(target).map_err(|_| DecodeError::out_of_bounds(target, 1, buffer.len()))
}

/// Relative offset of `slot` in the vtable of the table at `table`, or 0 when
/// the slot is absent or beyond the end of the vtable.
pub(crate) fn vtable_entry(buffer: &ByteBuffer, table: u32, slot: VOffset) -> Result<u32> {
    let soffset: SOffset = buffer.read(table)?;
    let vtable = advance(buffer, table, -i64::from(soffset))?;
    let vtable_size: VOffset = buffer.read(vtable)?;
    if slot >= vtable_size {
        return Ok(0);
    }
    let entry = advance(buffer, vtable, i64::from(slot))?;
    buffer.read::<VOffset>(entry).map(u32::from)
}

/// Follows the forward offset stored at `offset`.
#[inline]
pub(crate) fn indirect(buffer: &ByteBuffer, offset: u32) -> Result<u32> {
    let delta: UOffset = buffer.read(offset)?;
    advance(buffer, offset, i64::from(delta))
}

/// The length-prefixed byte string referenced from `offset`.
pub(crate) fn string_at(buffer: &ByteBuffer, offset: u32) -> Result<&BStr> {
    let at = indirect(buffer, offset)?;
    let len: UOffset = buffer.read(at)?;
    let start = advance(buffer, at, LENGTH_PREFIX)?;
    buffer.bytes(start, len)
}

/// A typed cursor into a shared buffer.
///
/// Cloning a view retains the buffer; dropping it releases its share. Views
/// are cheap to create and to retarget.
///
/// ```
/// use flatview::{ByteBuffer, SharedBuffer, View};
///
/// // vtable at 0: size 6, table size 8, slot 4 -> field at +4
/// // table at 8: soffset 8, then a u32 field holding 42
/// let mut bytes = ByteBuffer::zeroed(16);
/// bytes.set_scalar(0, 6u16);
/// bytes.set_scalar(2, 8u16);
/// bytes.set_scalar(4, 4u16);
/// bytes.set_scalar(8, 8i32);
/// bytes.set_scalar(12, 42u32);
///
/// let view = View::new(SharedBuffer::new(bytes), 8);
/// assert_eq!(view.offset(4), Ok(4));
/// assert_eq!(view.field::<u32>(4, 0), Ok(42));
/// assert_eq!(view.field::<u32>(6, 7), Ok(7));
/// ```
#[derive(Clone, Debug, Default)]
pub struct View {
    bytes: SharedBuffer,
    pos: u32,
}

impl View {
    /// A view of `bytes` positioned at `pos`.
    #[must_use]
    pub fn new(bytes: SharedBuffer, pos: u32) -> Self {
        Self { bytes, pos }
    }

    /// A view without a buffer. Every read fails with
    /// [`DecodeError::Released`] until it is retargeted.
    #[must_use]
    pub const fn detached() -> Self {
        Self {
            bytes: SharedBuffer::detached(),
            pos: 0,
        }
    }

    /// A view of the root table, whose position is the forward offset stored
    /// in the first four bytes of the buffer.
    ///
    /// # Errors
    ///
    /// [`DecodeError::Released`] for a released handle,
    /// [`DecodeError::OutOfBounds`] for a buffer shorter than four bytes.
    pub fn root(bytes: SharedBuffer) -> Result<Self> {
        let pos = bytes.get()?.read::<UOffset>(0)?;
        Ok(Self::new(bytes, pos))
    }

    /// Byte position of this view within its buffer.
    #[inline]
    #[must_use]
    pub fn pos(&self) -> u32 {
        self.pos
    }

    /// A new handle to the viewed buffer.
    #[must_use]
    pub fn bytes(&self) -> SharedBuffer {
        self.bytes.retain()
    }

    /// The viewed buffer.
    ///
    /// # Errors
    ///
    /// [`DecodeError::Released`] for a detached view.
    #[inline]
    pub fn buffer(&self) -> Result<&ByteBuffer> {
        self.bytes.get()
    }

    /// Points this view at `pos` in `bytes`, releasing its previous buffer.
    pub fn retarget(&mut self, bytes: SharedBuffer, pos: u32) {
        self.bytes = bytes;
        self.pos = pos;
    }

    /// A view of the same buffer at `pos`.
    #[must_use]
    pub fn at(&self, pos: u32) -> Self {
        Self::new(self.bytes.retain(), pos)
    }

    /// Releases this view's buffer handle and detaches it.
    pub fn release(&mut self) {
        self.bytes.release();
        self.pos = 0;
    }

    /// Offset of the field in vtable `slot`, relative to [`pos`](Self::pos).
    ///
    /// Returns 0 when the field was not written, and also when `slot` lies
    /// beyond the end of this table's vtable (the buffer predates the
    /// field). Callers substitute the schema default in both cases.
    ///
    /// # Errors
    ///
    /// [`DecodeError::OutOfBounds`] if the table or its vtable do not fit in
    /// the buffer.
    pub fn offset(&self, slot: VOffset) -> Result<u32> {
        vtable_entry(self.buffer()?, self.pos, slot)
    }

    /// `offset` plus the forward offset stored at `offset`.
    ///
    /// # Errors
    ///
    /// [`DecodeError::OutOfBounds`] if the stored offset cannot be read or
    /// points past `u32::MAX`.
    pub fn indirect(&self, offset: u32) -> Result<u32> {
        indirect(self.buffer()?, offset)
    }

    /// The string referenced from the absolute `offset`, without its length
    /// prefix. Strings are not required to be UTF-8 or NUL terminated.
    ///
    /// # Errors
    ///
    /// [`DecodeError::OutOfBounds`] if the reference, the length or any byte
    /// of the string lies outside the buffer.
    pub fn string(&self, offset: u32) -> Result<&BStr> {
        string_at(self.buffer()?, offset)
    }

    /// Element count of the vector referenced from relative `offset`.
    ///
    /// # Errors
    ///
    /// [`DecodeError::OutOfBounds`] if the reference or the count cannot be
    /// read.
    pub fn vector_len(&self, offset: u32) -> Result<u32> {
        let buffer = self.buffer()?;
        let at = indirect(buffer, advance(buffer, self.pos, i64::from(offset))?)?;
        buffer.read(at)
    }

    /// Absolute address of the first element of the vector referenced from
    /// relative `offset`.
    ///
    /// # Errors
    ///
    /// [`DecodeError::OutOfBounds`] if the reference cannot be read.
    pub fn vector(&self, offset: u32) -> Result<u32> {
        let buffer = self.buffer()?;
        let at = indirect(buffer, advance(buffer, self.pos, i64::from(offset))?)?;
        advance(buffer, at, LENGTH_PREFIX)
    }

    /// Points `target` at the table referenced from relative `offset`,
    /// sharing this view's buffer. `target` is left untouched on error.
    ///
    /// # Errors
    ///
    /// [`DecodeError::OutOfBounds`] if the reference cannot be read.
    pub fn union(&self, target: &mut View, offset: u32) -> Result<()> {
        let buffer = self.buffer()?;
        let at = indirect(buffer, advance(buffer, self.pos, i64::from(offset))?)?;
        target.retarget(self.bytes.retain(), at);
        Ok(())
    }

    /// The `T` stored at absolute `offset`.
    ///
    /// # Errors
    ///
    /// [`DecodeError::OutOfBounds`] unless all of `T` fits in the buffer.
    #[inline]
    pub fn get<T: Scalar>(&self, offset: u32) -> Result<T> {
        self.buffer()?.read(offset)
    }

    /// [`get`](Self::get) with the scalar kind chosen at runtime.
    ///
    /// # Errors
    ///
    /// As for [`get`](Self::get).
    pub fn get_kind(&self, kind: ScalarKind, offset: u32) -> Result<ScalarValue> {
        with_scalar_type!(kind, T, wrap => self.get::<T>(offset).map(wrap))
    }

    /// Absolute address of the field in `slot`, or `None` if it is absent.
    fn field_address(&self, slot: VOffset) -> Result<Option<u32>> {
        let buffer = self.buffer()?;
        match vtable_entry(buffer, self.pos, slot)? {
            0 => Ok(None),
            o => advance(buffer, self.pos, i64::from(o)).map(Some),
        }
    }

    /// The scalar table field in `slot`, or `default` when absent.
    ///
    /// # Errors
    ///
    /// [`DecodeError::OutOfBounds`] for a corrupt table.
    pub fn field<T: Scalar>(&self, slot: VOffset, default: T) -> Result<T> {
        match self.field_address(slot)? {
            Some(at) => self.get(at),
            None => Ok(default),
        }
    }

    /// The string table field in `slot`.
    ///
    /// # Errors
    ///
    /// [`DecodeError::OutOfBounds`] for a corrupt table or string.
    pub fn string_field(&self, slot: VOffset) -> Result<Option<&BStr>> {
        self.field_address(slot)?
            .map(|at| self.string(at))
            .transpose()
    }

    /// The sub-table referenced from `slot`. Union values are table
    /// references too and resolve the same way.
    ///
    /// # Errors
    ///
    /// [`DecodeError::OutOfBounds`] for a corrupt table.
    pub fn table_field(&self, slot: VOffset) -> Result<Option<View>> {
        match self.field_address(slot)? {
            Some(at) => Ok(Some(self.at(self.indirect(at)?))),
            None => Ok(None),
        }
    }

    /// The fixed-layout struct stored inline in `slot`.
    ///
    /// # Errors
    ///
    /// [`DecodeError::OutOfBounds`] for a corrupt table.
    pub fn struct_field(&self, slot: VOffset) -> Result<Option<View>> {
        Ok(self.field_address(slot)?.map(|at| self.at(at)))
    }

    /// The union value in `slot`, resolved with [`union`](Self::union).
    ///
    /// # Errors
    ///
    /// [`DecodeError::OutOfBounds`] for a corrupt table.
    pub fn union_field(&self, slot: VOffset) -> Result<Option<View>> {
        let relative = self.offset(slot)?;
        if relative == 0 {
            return Ok(None);
        }
        let mut target = View::detached();
        self.union(&mut target, relative)?;
        Ok(Some(target))
    }

    /// The vector referenced from `slot`.
    ///
    /// # Errors
    ///
    /// [`DecodeError::OutOfBounds`] for a corrupt table or vector header.
    pub fn vector_field(&self, slot: VOffset) -> Result<Option<VectorRef>> {
        let relative = self.offset(slot)?;
        if relative == 0 {
            return Ok(None);
        }
        Ok(Some(VectorRef {
            start: self.vector(relative)?,
            len: self.vector_len(relative)?,
        }))
    }
}

#[cfg(feature = "sync")]
const _: fn() = || {
    fn shareable<T: Send + Sync>() {}
    shareable::<View>();
    shareable::<SharedBuffer>();
};

/// Location of a decoded vector header.
#[cfg_attr(any(test, feature = "serde"), derive(serde::Serialize, serde::Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct VectorRef {
    /// Absolute address of element 0.
    pub start: u32,
    /// Element count.
    pub len: u32,
}

impl VectorRef {
    /// Address of element `index` for elements `stride` bytes apart, or
    /// `None` past the end.
    #[must_use]
    pub fn element(&self, index: u32, stride: u32) -> Option<u32> {
        if index >= self.len {
            return None;
        }
        stride
            .checked_mul(index)
            .and_then(|delta| self.start.checked_add(delta))
    }
}
