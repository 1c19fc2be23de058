//! Binary search over keyed vectors.
//!
//! A keyed vector is kept sorted by one field of its elements. Elements are
//! either inline fixed-layout structs (the key sits at a constant byte
//! offset inside each element) or forward references to tables (the key is
//! a table field found through the element's vtable). [`LookupSpec`]
//! describes which.

use core::cmp::Ordering;

use crate::{
    buffer::ByteBuffer,
    error::{DecodeError, Result},
    scalar::{Scalar, ScalarValue, UOffset, VOffset},
    view::{View, VectorRef, advance, indirect, string_at, vtable_entry},
};

#[allow(clippy::cast_possible_truncation)]
const REFERENCE_STRIDE: u32 = UOffset::WIDTH as u32;

/// Where a keyed vector lives and how to find the key in each element.
#[cfg_attr(any(test, feature = "serde"), derive(serde::Serialize, serde::Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct LookupSpec {
    /// Absolute address of element 0. The element count is the `u32`
    /// immediately before it.
    pub vector_location: u32,
    /// Distance in bytes between consecutive elements.
    pub stride: u32,
    /// For table elements, the vtable slot of the key field. For inline
    /// structs, the key's byte offset inside the struct.
    pub key_slot: VOffset,
    /// Whether elements are forward references to tables rather than
    /// inline structs.
    pub indirect: bool,
}

impl LookupSpec {
    /// A vector of inline structs keyed at byte `key_offset`.
    #[must_use]
    pub fn structs(vector_location: u32, stride: u32, key_offset: VOffset) -> Self {
        Self {
            vector_location,
            stride,
            key_slot: key_offset,
            indirect: false,
        }
    }

    /// A vector of table references keyed by the field in `key_slot`.
    #[must_use]
    pub fn tables(vector_location: u32, key_slot: VOffset) -> Self {
        Self {
            vector_location,
            stride: REFERENCE_STRIDE,
            key_slot,
            indirect: true,
        }
    }
}

impl VectorRef {
    /// A [`LookupSpec::structs`] for this vector.
    #[must_use]
    pub fn structs(&self, stride: u32, key_offset: VOffset) -> LookupSpec {
        LookupSpec::structs(self.start, stride, key_offset)
    }

    /// A [`LookupSpec::tables`] for this vector.
    #[must_use]
    pub fn tables(&self, key_slot: VOffset) -> LookupSpec {
        LookupSpec::tables(self.start, key_slot)
    }
}

/// A matching element.
#[cfg_attr(any(test, feature = "serde"), derive(serde::Serialize, serde::Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Found {
    /// Absolute address of the element, or of the referenced table for
    /// table elements.
    pub table_offset: u32,
    /// Position of the element in the vector.
    pub index: u32,
}

/// A key that can be compared against the key field of a vector element.
pub trait SearchKey {
    /// Orders the key stored in `buffer` at `at` (`None` when a table
    /// element omits its key field) relative to `self`.
    ///
    /// # Errors
    ///
    /// [`DecodeError::OutOfBounds`] if the stored key cannot be read.
    fn cmp_stored(&self, buffer: &ByteBuffer, at: Option<u32>) -> Result<Ordering>;
}

impl<T: Scalar> SearchKey for T {
    /// An omitted key field compares as the zero value.
    fn cmp_stored(&self, buffer: &ByteBuffer, at: Option<u32>) -> Result<Ordering> {
        match at {
            Some(at) => T::cmp_stored_at(buffer, at, self),
            None => Ok(T::default().key_cmp(self)),
        }
    }
}

impl SearchKey for [u8] {
    /// Byte-wise comparison; an omitted key field compares as empty.
    fn cmp_stored(&self, buffer: &ByteBuffer, at: Option<u32>) -> Result<Ordering> {
        let stored: &[u8] = match at {
            Some(at) => string_at(buffer, at)?,
            None => &[],
        };
        Ok(stored.cmp(self))
    }
}

impl SearchKey for str {
    fn cmp_stored(&self, buffer: &ByteBuffer, at: Option<u32>) -> Result<Ordering> {
        self.as_bytes().cmp_stored(buffer, at)
    }
}

/// Address of element `index`, computed without wrapping.
fn element_address(buffer: &ByteBuffer, spec: &LookupSpec, index: u32) -> Result<u32> {
    let target = u64::from(spec.vector_location) + u64::from(spec.stride) * u64::from(index);
    u32::try_from(target).map_err(|_| {
        DecodeError::out_of_bounds(
            i64::try_from(target).unwrap_or(i64::MAX),
            spec.stride as usize,
            buffer.len(),
        )
    })
}

/// Address of the key inside the element at `element`.
fn key_address(buffer: &ByteBuffer, spec: &LookupSpec, element: u32) -> Result<Option<u32>> {
    if !spec.indirect {
        return advance(buffer, element, i64::from(spec.key_slot)).map(Some);
    }
    match vtable_entry(buffer, element, spec.key_slot)? {
        0 => Ok(None),
        o => advance(buffer, element, i64::from(o)).map(Some),
    }
}

/// Classic binary search; a hit ends the search at once.
///
/// The count prefix is checked against the buffer before probing, so a
/// corrupt count fails instead of reporting a miss.
pub(crate) fn binary_search<K: SearchKey + ?Sized>(
    buffer: &ByteBuffer,
    spec: &LookupSpec,
    key: &K,
) -> Result<Option<Found>> {
    let count_at = advance(buffer, spec.vector_location, -4)?;
    let count: UOffset = buffer.read(count_at)?;
    let end = element_address(buffer, spec, count)?;
    if end as usize > buffer.len() {
        return Err(DecodeError::out_of_bounds(
            spec.vector_location,
            (end - spec.vector_location) as usize,
            buffer.len(),
        ));
    }

    let mut start = 0u32;
    let mut span = count;
    while span != 0 {
        let middle = span / 2;
        let index = start + middle;
        let mut element = element_address(buffer, spec, index)?;
        if spec.indirect {
            element = indirect(buffer, element)?;
        }
        tracing::trace!(index, span, element, "probing keyed vector");
        match key.cmp_stored(buffer, key_address(buffer, spec, element)?)? {
            Ordering::Greater => span = middle,
            Ordering::Less => {
                start = index + 1;
                span -= middle + 1;
            }
            Ordering::Equal => {
                return Ok(Some(Found {
                    table_offset: element,
                    index,
                }));
            }
        }
    }
    Ok(None)
}

impl View {
    /// Finds the element whose key equals `key`.
    ///
    /// Returns `Ok(None)` when no element matches. With duplicate keys the
    /// search stops at the first match it probes, which need not be the
    /// first in vector order.
    ///
    /// ```
    /// use flatview::{ByteBuffer, LookupSpec, SharedBuffer, View};
    ///
    /// // count 3, then the u32 elements 10, 20, 30 at 4, 8, 12
    /// let mut bytes = ByteBuffer::zeroed(16);
    /// for (i, v) in [3u32, 10, 20, 30].into_iter().enumerate() {
    ///     bytes.set_scalar(i * 4, v);
    /// }
    /// let view = View::new(SharedBuffer::new(bytes), 0);
    /// let spec = LookupSpec::structs(4, 4, 0);
    ///
    /// let hit = view.lookup(&spec, 20u32).unwrap().unwrap();
    /// assert_eq!((hit.table_offset, hit.index), (8, 1));
    /// assert_eq!(view.lookup(&spec, 15u32), Ok(None));
    /// ```
    ///
    /// # Errors
    ///
    /// [`DecodeError::Released`] for a detached view;
    /// [`DecodeError::OutOfBounds`] if the count prefix, an element or a key
    /// lies outside the buffer.
    pub fn lookup<K: SearchKey>(&self, spec: &LookupSpec, key: K) -> Result<Option<Found>> {
        binary_search(self.buffer()?, spec, &key)
    }

    /// Finds the element whose string key equals `key`, byte for byte.
    ///
    /// # Errors
    ///
    /// As for [`lookup`](Self::lookup).
    pub fn lookup_str(&self, spec: &LookupSpec, key: impl AsRef<[u8]>) -> Result<Option<Found>> {
        binary_search(self.buffer()?, spec, key.as_ref())
    }

    /// [`lookup`](Self::lookup) with the key kind chosen at runtime.
    ///
    /// # Errors
    ///
    /// As for [`lookup`](Self::lookup).
    pub fn lookup_value(&self, spec: &LookupSpec, key: ScalarValue) -> Result<Option<Found>> {
        match key {
            ScalarValue::Bool(k) => self.lookup(spec, k),
            ScalarValue::Uint8(k) => self.lookup(spec, k),
            ScalarValue::Uint16(k) => self.lookup(spec, k),
            ScalarValue::Uint32(k) => self.lookup(spec, k),
            ScalarValue::Uint64(k) => self.lookup(spec, k),
            ScalarValue::Int8(k) => self.lookup(spec, k),
            ScalarValue::Int16(k) => self.lookup(spec, k),
            ScalarValue::Int32(k) => self.lookup(spec, k),
            ScalarValue::Int64(k) => self.lookup(spec, k),
            ScalarValue::Float32(k) => self.lookup(spec, k),
            ScalarValue::Float64(k) => self.lookup(spec, k),
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use rstest::rstest;

    use super::*;
    use crate::{ScalarKind, tests::fixture::Layout};

    fn scenario_vector() -> (View, LookupSpec) {
        let mut l = Layout::new(16);
        l.u32(0, 3).u32(4, 10).u32(8, 20).u32(12, 30);
        (l.view(0), LookupSpec::structs(4, 4, 0))
    }

    #[rstest]
    #[case(10, Some((4, 0)))]
    #[case(20, Some((8, 1)))]
    #[case(30, Some((12, 2)))]
    #[case(15, None)]
    #[case(0, None)]
    #[case(31, None)]
    fn finds_inline_u32(#[case] key: u32, #[case] expected: Option<(u32, u32)>) {
        let (view, spec) = scenario_vector();
        let got = view.lookup(&spec, key).unwrap();
        assert_eq!(got.map(|f| (f.table_offset, f.index)), expected);
    }

    #[test]
    fn empty_vector_finds_nothing() {
        let mut l = Layout::new(8);
        l.u32(0, 0);
        assert_eq!(l.view(0).lookup(&LookupSpec::structs(4, 4, 0), 1u32), Ok(None));
    }

    #[test]
    fn corrupt_count_is_out_of_bounds() {
        let mut l = Layout::new(16);
        l.u32(0, 1_000).u32(4, 10).u32(8, 20).u32(12, 30);
        assert!(matches!(
            l.view(0).lookup(&LookupSpec::structs(4, 4, 0), 20u32),
            Err(DecodeError::OutOfBounds { .. })
        ));
    }

    #[rstest]
    #[case(0)]
    #[case(2)]
    #[case(100)]
    fn location_without_count_is_out_of_bounds(#[case] location: u32) {
        let (view, _) = scenario_vector();
        let spec = LookupSpec::structs(location, 4, 0);
        assert!(matches!(
            view.lookup(&spec, 1u32),
            Err(DecodeError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn unsigned_keys_above_signed_range() {
        let mut l = Layout::new(28);
        l.u32(0, 3)
            .u64(4, 1)
            .u64(12, 1 << 63)
            .u64(20, u64::MAX);
        let view = l.view(0);
        let spec = LookupSpec::structs(4, 8, 0);
        assert_eq!(
            view.lookup(&spec, u64::MAX).unwrap().map(|f| f.index),
            Some(2)
        );
        assert_eq!(
            view.lookup(&spec, 1u64 << 63).unwrap().map(|f| f.index),
            Some(1)
        );
    }

    #[test]
    fn struct_keys_at_field_offset() {
        // structs of (u16 tag, u16 key), sorted by key
        let mut l = Layout::new(16);
        l.u32(0, 3);
        for (i, key) in [5u16, 7, 9].into_iter().enumerate() {
            l.u16(4 + i * 4, 0xaa).u16(6 + i * 4, key);
        }
        let spec = LookupSpec::structs(4, 4, 2);
        let found = l.view(0).lookup(&spec, 9u16).unwrap().unwrap();
        assert_eq!(found, Found { table_offset: 12, index: 2 });
        assert_eq!(l.view(0).lookup(&spec, 0xaau16), Ok(None));
    }

    #[test]
    fn table_vector_by_numeric_key() {
        let (view, spec) = Layout::keyed_tables(&[-7, 0, 3, 12]);
        for (i, key) in [-7i32, 0, 3, 12].into_iter().enumerate() {
            let found = view.lookup(&spec, key).unwrap().unwrap();
            assert_eq!(found.index as usize, i);
            assert_eq!(view.at(found.table_offset).field::<i32>(4, 99), Ok(key));
        }
        assert_eq!(view.lookup(&spec, 4i32), Ok(None));
    }

    #[test]
    fn table_vector_by_string_key() {
        let (view, spec) = Layout::keyed_strings(&["Apple", "apple", "banana", "cherry"]);
        let found = view.lookup_str(&spec, "banana").unwrap().unwrap();
        assert_eq!(found.index, 2);
        assert_eq!(view.lookup_str(&spec, b"Apple").unwrap().map(|f| f.index), Some(0));
        assert_eq!(view.lookup_str(&spec, "APPLE"), Ok(None));
        assert_eq!(view.lookup_str(&spec, "banana\0"), Ok(None));
        assert_eq!(view.lookup_str(&spec, ""), Ok(None));
    }

    #[test]
    fn runtime_kind_dispatch() {
        let (view, spec) = Layout::keyed_tables(&[1, 2, 3]);
        let key = ScalarValue::from_i64(ScalarKind::Int32, 3);
        assert_eq!(view.lookup_value(&spec, key).unwrap().map(|f| f.index), Some(2));
        let key = ScalarValue::from_i64(ScalarKind::from_tag(8).unwrap(), 2);
        assert_eq!(view.lookup_value(&spec, key).unwrap().map(|f| f.index), Some(1));
    }

    #[test]
    fn float_keys_inline() {
        let mut l = Layout::new(20);
        l.u32(0, 4);
        for (i, v) in [-1.5f32, 0.0, 2.25, f32::INFINITY].into_iter().enumerate() {
            l.bytes(4 + i * 4, &v.to_le_bytes());
        }
        let view = l.view(0);
        let spec = LookupSpec::structs(4, 4, 0);
        assert_eq!(view.lookup(&spec, 2.25f32).unwrap().map(|f| f.index), Some(2));
        assert_eq!(view.lookup(&spec, f32::INFINITY).unwrap().map(|f| f.index), Some(3));
        assert_eq!(view.lookup(&spec, 1.0f32), Ok(None));
    }

    #[rstest]
    #[case(&[5, 5, 5], 1)]
    #[case(&[5, 5, 5, 5], 2)]
    #[case(&[1, 5, 5], 1)]
    #[case(&[5, 5, 9], 1)]
    #[case(&[1, 2, 3, 5, 5], 4)]
    fn duplicate_keys_stop_at_first_probe(#[case] keys: &[i32], #[case] index: u32) {
        let (view, spec) = Layout::keyed_tables(keys);
        assert_eq!(view.lookup(&spec, 5i32).unwrap().map(|f| f.index), Some(index));
    }

    #[test]
    fn bool_keys_match_stored_bytes() {
        let mut l = Layout::new(7);
        l.u32(0, 3).bytes(4, &[0, 2, 3]);
        let view = l.view(0);
        let spec = LookupSpec::structs(4, 1, 0);

        assert_eq!(view.lookup(&spec, true), Ok(None));
        assert_eq!(view.lookup(&spec, false).unwrap().map(|f| f.index), Some(0));
        assert_eq!(view.lookup_value(&spec, ScalarValue::Bool(1)), Ok(None));
        let stored_two = ScalarValue::from_i64(ScalarKind::Bool, 2);
        assert_eq!(
            view.lookup_value(&spec, stored_two),
            Ok(Some(Found {
                table_offset: 5,
                index: 1
            }))
        );
    }

    #[test]
    fn detached_view_cannot_search() {
        let spec = LookupSpec::structs(4, 4, 0);
        assert_eq!(View::detached().lookup(&spec, 1u8), Err(DecodeError::Released));
    }

    #[test]
    fn vector_ref_builds_specs() {
        let v = VectorRef { start: 40, len: 2 };
        assert_eq!(v.structs(8, 4), LookupSpec::structs(40, 8, 4));
        assert_eq!(
            v.tables(6),
            LookupSpec {
                vector_location: 40,
                stride: 4,
                key_slot: 6,
                indirect: true
            }
        );
    }

    #[test]
    fn lookup_spec_round_trips_through_json() {
        let spec = LookupSpec::tables(12, 4);
        let json = serde_json::to_string(&spec).unwrap();
        assert_eq!(
            json,
            r#"{"vector_location":12,"stride":4,"key_slot":4,"indirect":true}"#
        );
        let keys: Vec<LookupSpec> = serde_json::from_str(&alloc::format!("[{json}]")).unwrap();
        assert_eq!(keys, [spec]);
    }
}
