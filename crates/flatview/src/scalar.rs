//! Scalar type registry.
//!
//! The wire format knows eleven fixed-width scalar kinds. [`ScalarKind`] names
//! them for runtime dispatch (hosts pass a kind tag alongside an offset),
//! while the sealed [`Scalar`] trait binds each kind to its Rust type for
//! statically typed reads. [`ScalarValue`] carries a decoded value of any
//! kind.

use core::{cmp::Ordering, fmt, str::FromStr};

use alloc::format;

use crate::{
    buffer::ByteBuffer,
    error::{DecodeError, Result},
};

/// Expands `$body` once with `$t` bound to the Rust type that carries
/// `$kind` and `$wrap` bound to the matching [`ScalarValue`] constructor.
///
/// `Bool` is carried as its raw byte so that every stored value survives a
/// runtime-kind read unchanged.
macro_rules! with_scalar_type {
    ($kind:expr, $t:ident, $wrap:ident => $body:expr) => {
        match $kind {
            $crate::ScalarKind::Bool => {
                type $t = u8;
                let $wrap = $crate::ScalarValue::Bool;
                $body
            }
            $crate::ScalarKind::Uint8 => {
                type $t = u8;
                let $wrap = $crate::ScalarValue::Uint8;
                $body
            }
            $crate::ScalarKind::Uint16 => {
                type $t = u16;
                let $wrap = $crate::ScalarValue::Uint16;
                $body
            }
            $crate::ScalarKind::Uint32 => {
                type $t = u32;
                let $wrap = $crate::ScalarValue::Uint32;
                $body
            }
            $crate::ScalarKind::Uint64 => {
                type $t = u64;
                let $wrap = $crate::ScalarValue::Uint64;
                $body
            }
            $crate::ScalarKind::Int8 => {
                type $t = i8;
                let $wrap = $crate::ScalarValue::Int8;
                $body
            }
            $crate::ScalarKind::Int16 => {
                type $t = i16;
                let $wrap = $crate::ScalarValue::Int16;
                $body
            }
            $crate::ScalarKind::Int32 => {
                type $t = i32;
                let $wrap = $crate::ScalarValue::Int32;
                $body
            }
            $crate::ScalarKind::Int64 => {
                type $t = i64;
                let $wrap = $crate::ScalarValue::Int64;
                $body
            }
            $crate::ScalarKind::Float32 => {
                type $t = f32;
                let $wrap = $crate::ScalarValue::Float32;
                $body
            }
            $crate::ScalarKind::Float64 => {
                type $t = f64;
                let $wrap = $crate::ScalarValue::Float64;
                $body
            }
        }
    };
}
pub(crate) use with_scalar_type;

/// Forward (table to referenced object) offset.
pub type UOffset = u32;
/// Field offset stored in a vtable.
pub type VOffset = u16;
/// Backward (table to vtable) offset.
pub type SOffset = i32;

/// One of the eleven wire scalar kinds.
///
/// Discriminants are the stable numeric tags hosts use to name a kind.
#[cfg_attr(any(test, feature = "serde"), derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "fuzzing", derive(arbitrary::Arbitrary))]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum ScalarKind {
    /// One byte, zero is `false`.
    Bool = 1,
    /// Unsigned 8-bit integer.
    Uint8,
    /// Unsigned 16-bit integer.
    Uint16,
    /// Unsigned 32-bit integer.
    Uint32,
    /// Unsigned 64-bit integer.
    Uint64,
    /// Signed 8-bit integer.
    Int8,
    /// Signed 16-bit integer.
    Int16,
    /// Signed 32-bit integer.
    Int32,
    /// Signed 64-bit integer.
    Int64,
    /// IEEE 754 single precision.
    Float32,
    /// IEEE 754 double precision.
    Float64,
}

/// Immutable description of a scalar kind's wire layout.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ScalarType {
    /// The kind described.
    pub kind: ScalarKind,
    /// Width in bytes on the wire.
    pub byte_width: usize,
    /// Whether the integer interpretation is two's complement.
    pub signed: bool,
    /// Whether the value is an IEEE 754 float.
    pub float: bool,
}

impl ScalarKind {
    /// Every kind, in tag order.
    pub const ALL: [Self; 11] = [
        Self::Bool,
        Self::Uint8,
        Self::Uint16,
        Self::Uint32,
        Self::Uint64,
        Self::Int8,
        Self::Int16,
        Self::Int32,
        Self::Int64,
        Self::Float32,
        Self::Float64,
    ];

    /// Width of a forward offset (`UOffsetT`).
    pub const UOFFSET: Self = Self::Uint32;
    /// Width of a vtable entry (`VOffsetT`).
    pub const VOFFSET: Self = Self::Uint16;
    /// Width of a table's vtable reference (`SOffsetT`).
    pub const SOFFSET: Self = Self::Int32;

    /// Resolves a host-supplied numeric tag.
    ///
    /// # Errors
    ///
    /// [`DecodeError::InvalidKind`] for tags outside `1..=11`.
    pub fn from_tag(tag: u8) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.tag() == tag)
            .ok_or_else(|| DecodeError::InvalidKind(format!("tag {tag}")))
    }

    /// The stable numeric tag of this kind.
    #[must_use]
    pub const fn tag(self) -> u8 {
        self as u8
    }

    /// Host-facing name, e.g. `"Uint32"`.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bool => "Bool",
            Self::Uint8 => "Uint8",
            Self::Uint16 => "Uint16",
            Self::Uint32 => "Uint32",
            Self::Uint64 => "Uint64",
            Self::Int8 => "Int8",
            Self::Int16 => "Int16",
            Self::Int32 => "Int32",
            Self::Int64 => "Int64",
            Self::Float32 => "Float32",
            Self::Float64 => "Float64",
        }
    }

    /// Little-endian pack format in the `string.pack` dialect used by
    /// scripting hosts.
    #[must_use]
    pub const fn pack_format(self) -> &'static str {
        match self {
            Self::Bool => "<b",
            Self::Uint8 => "<I1",
            Self::Uint16 => "<I2",
            Self::Uint32 => "<I4",
            Self::Uint64 => "<I8",
            Self::Int8 => "<i1",
            Self::Int16 => "<i2",
            Self::Int32 => "<i4",
            Self::Int64 => "<i8",
            Self::Float32 => "<f",
            Self::Float64 => "<d",
        }
    }

    /// Width in bytes on the wire.
    #[must_use]
    pub const fn byte_width(self) -> usize {
        match self {
            Self::Bool | Self::Uint8 | Self::Int8 => 1,
            Self::Uint16 | Self::Int16 => 2,
            Self::Uint32 | Self::Int32 | Self::Float32 => 4,
            Self::Uint64 | Self::Int64 | Self::Float64 => 8,
        }
    }

    /// Whether integers of this kind are signed. Floats count as signed.
    #[must_use]
    pub const fn is_signed(self) -> bool {
        matches!(
            self,
            Self::Int8 | Self::Int16 | Self::Int32 | Self::Int64 | Self::Float32 | Self::Float64
        )
    }

    /// Whether this kind is an IEEE 754 float.
    #[must_use]
    pub const fn is_float(self) -> bool {
        matches!(self, Self::Float32 | Self::Float64)
    }

    /// The full descriptor record for this kind.
    #[must_use]
    pub const fn descriptor(self) -> ScalarType {
        ScalarType {
            kind: self,
            byte_width: self.byte_width(),
            signed: self.is_signed(),
            float: self.is_float(),
        }
    }

    /// Reads a value of this kind straight from a buffer.
    ///
    /// # Errors
    ///
    /// [`DecodeError::OutOfBounds`] if the value does not fit at `offset`.
    pub fn unpack(self, buffer: &ByteBuffer, offset: u32) -> Result<ScalarValue> {
        with_scalar_type!(self, T, wrap => buffer.read::<T>(offset).map(wrap))
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ScalarKind {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| DecodeError::InvalidKind(format!("name {s:?}")))
    }
}

impl TryFrom<u8> for ScalarKind {
    type Error = DecodeError;

    fn try_from(tag: u8) -> Result<Self> {
        Self::from_tag(tag)
    }
}

mod sealed {
    pub trait Sealed {}
}

/// A Rust type with a fixed little-endian wire representation.
///
/// Implemented for `bool`, the eight fixed-width integers, `f32` and `f64`.
/// The trait is sealed: the set of wire kinds is closed.
pub trait Scalar: Copy + PartialEq + Default + fmt::Debug + sealed::Sealed {
    /// The wire kind of this type.
    const KIND: ScalarKind;
    /// Width in bytes on the wire.
    const WIDTH: usize;
    /// Little-endian byte array of exactly [`Self::WIDTH`] bytes.
    type Bytes: AsRef<[u8]>;

    /// Decodes the first [`Self::WIDTH`] bytes of `bytes`, or `None` if there
    /// are fewer.
    fn from_le_slice(bytes: &[u8]) -> Option<Self>;

    /// Encodes this value in wire order.
    fn to_le_bytes(self) -> Self::Bytes;

    /// Orders two values the way sorted key vectors are sorted.
    ///
    /// Integers use their natural order; floats use IEEE 754 total order so
    /// that every stored value, including NaN, has a defined position.
    fn key_cmp(&self, other: &Self) -> Ordering;

    /// Wraps this value in the kind-tagged union.
    fn into_value(self) -> ScalarValue;

    /// Orders the key stored at `at` relative to `key`.
    ///
    /// # Errors
    ///
    /// [`DecodeError::OutOfBounds`] if the stored key does not fit.
    #[inline]
    fn cmp_stored_at(buffer: &ByteBuffer, at: u32, key: &Self) -> Result<Ordering> {
        Ok(buffer.read::<Self>(at)?.key_cmp(key))
    }
}

macro_rules! impl_scalar {
    ($($t:ty => $kind:ident, $cmp:ident;)*) => {$(
        impl sealed::Sealed for $t {}

        impl Scalar for $t {
            const KIND: ScalarKind = ScalarKind::$kind;
            const WIDTH: usize = core::mem::size_of::<$t>();
            type Bytes = [u8; core::mem::size_of::<$t>()];

            #[inline]
            fn from_le_slice(bytes: &[u8]) -> Option<Self> {
                let raw = bytes.get(..Self::WIDTH)?.try_into().ok()?;
                Some(<$t>::from_le_bytes(raw))
            }

            #[inline]
            fn to_le_bytes(self) -> Self::Bytes {
                <$t>::to_le_bytes(self)
            }

            #[inline]
            fn key_cmp(&self, other: &Self) -> Ordering {
                self.$cmp(other)
            }

            fn into_value(self) -> ScalarValue {
                ScalarValue::$kind(self)
            }
        }
    )*};
}

impl_scalar! {
    u8 => Uint8, cmp;
    u16 => Uint16, cmp;
    u32 => Uint32, cmp;
    u64 => Uint64, cmp;
    i8 => Int8, cmp;
    i16 => Int16, cmp;
    i32 => Int32, cmp;
    i64 => Int64, cmp;
    f32 => Float32, total_cmp;
    f64 => Float64, total_cmp;
}

impl sealed::Sealed for bool {}

impl Scalar for bool {
    const KIND: ScalarKind = ScalarKind::Bool;
    const WIDTH: usize = 1;
    type Bytes = [u8; 1];

    #[inline]
    fn from_le_slice(bytes: &[u8]) -> Option<Self> {
        bytes.first().map(|&b| b != 0)
    }

    #[inline]
    fn to_le_bytes(self) -> Self::Bytes {
        [u8::from(self)]
    }

    #[inline]
    fn key_cmp(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }

    fn into_value(self) -> ScalarValue {
        ScalarValue::Bool(u8::from(self))
    }

    /// Compares the raw stored byte, so a stored 2 never matches `true`.
    #[inline]
    fn cmp_stored_at(buffer: &ByteBuffer, at: u32, key: &Self) -> Result<Ordering> {
        Ok(buffer.read::<u8>(at)?.cmp(&u8::from(*key)))
    }
}

/// A decoded scalar of any kind.
#[cfg_attr(any(test, feature = "serde"), derive(serde::Serialize, serde::Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq)]
#[allow(missing_docs)]
pub enum ScalarValue {
    /// The stored byte; any nonzero value reads as `true` through `bool`.
    Bool(u8),
    Uint8(u8),
    Uint16(u16),
    Uint32(u32),
    Uint64(u64),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
}

impl ScalarValue {
    /// The kind of the carried value.
    #[must_use]
    pub const fn kind(&self) -> ScalarKind {
        match self {
            Self::Bool(_) => ScalarKind::Bool,
            Self::Uint8(_) => ScalarKind::Uint8,
            Self::Uint16(_) => ScalarKind::Uint16,
            Self::Uint32(_) => ScalarKind::Uint32,
            Self::Uint64(_) => ScalarKind::Uint64,
            Self::Int8(_) => ScalarKind::Int8,
            Self::Int16(_) => ScalarKind::Int16,
            Self::Int32(_) => ScalarKind::Int32,
            Self::Int64(_) => ScalarKind::Int64,
            Self::Float32(_) => ScalarKind::Float32,
            Self::Float64(_) => ScalarKind::Float64,
        }
    }

    /// Converts a host integer to `kind` with `as`-cast semantics
    /// (truncating, wrapping).
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn from_i64(kind: ScalarKind, v: i64) -> Self {
        match kind {
            ScalarKind::Bool => Self::Bool(v as u8),
            ScalarKind::Uint8 => Self::Uint8(v as u8),
            ScalarKind::Uint16 => Self::Uint16(v as u16),
            ScalarKind::Uint32 => Self::Uint32(v as u32),
            ScalarKind::Uint64 => Self::Uint64(v as u64),
            ScalarKind::Int8 => Self::Int8(v as i8),
            ScalarKind::Int16 => Self::Int16(v as i16),
            ScalarKind::Int32 => Self::Int32(v as i32),
            ScalarKind::Int64 => Self::Int64(v),
            ScalarKind::Float32 => Self::Float32(v as f32),
            ScalarKind::Float64 => Self::Float64(v as f64),
        }
    }

    /// Converts a host float to `kind` with `as`-cast semantics (saturating
    /// for integers, NaN becomes zero).
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_f64(kind: ScalarKind, v: f64) -> Self {
        match kind {
            ScalarKind::Bool => Self::Bool(v as u8),
            ScalarKind::Uint8 => Self::Uint8(v as u8),
            ScalarKind::Uint16 => Self::Uint16(v as u16),
            ScalarKind::Uint32 => Self::Uint32(v as u32),
            ScalarKind::Uint64 => Self::Uint64(v as u64),
            ScalarKind::Int8 => Self::Int8(v as i8),
            ScalarKind::Int16 => Self::Int16(v as i16),
            ScalarKind::Int32 => Self::Int32(v as i32),
            ScalarKind::Int64 => Self::Int64(v as i64),
            ScalarKind::Float32 => Self::Float32(v as f32),
            ScalarKind::Float64 => Self::Float64(v),
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => fmt::Display::fmt(v, f),
            Self::Uint8(v) => fmt::Display::fmt(v, f),
            Self::Uint16(v) => fmt::Display::fmt(v, f),
            Self::Uint32(v) => fmt::Display::fmt(v, f),
            Self::Uint64(v) => fmt::Display::fmt(v, f),
            Self::Int8(v) => fmt::Display::fmt(v, f),
            Self::Int16(v) => fmt::Display::fmt(v, f),
            Self::Int32(v) => fmt::Display::fmt(v, f),
            Self::Int64(v) => fmt::Display::fmt(v, f),
            Self::Float32(v) => fmt::Display::fmt(v, f),
            Self::Float64(v) => fmt::Display::fmt(v, f),
        }
    }
}
