#![expect(missing_docs)]

mod common;

use flatview::{ByteBuffer, DecodeError, Found, LookupSpec, ScalarKind, ScalarValue};
use rstest::rstest;

#[test]
fn field_resolves_through_vtable() {
    let view = common::view(common::table_with_u32_field(), 8);
    let relative = view.offset(4).unwrap();
    assert_eq!(relative, 8);
    assert_eq!(view.get::<u32>(view.pos() + relative), Ok(42));
}

#[rstest]
#[case(6)]
#[case(8)]
#[case(10)]
fn field_absent_reads_default(#[case] slot: u16) {
    let view = common::view(common::table_with_u32_field(), 8);
    assert_eq!(view.offset(slot), Ok(0));
    assert_eq!(view.field::<u32>(slot, 1234), Ok(1234));
}

#[test]
fn string_through_forward_offset() {
    let view = common::view(common::hello_string(), 0);
    assert_eq!(view.indirect(20), Ok(24));
    assert_eq!(view.string(20).unwrap(), "Hello");
}

#[rstest]
#[case(4)]
#[case(36)]
#[case(1024)]
fn keyed_vector_search(#[case] location: u32) {
    let view = common::view(common::u32_vector(location as usize), 0);
    let spec = LookupSpec::structs(location, 4, 0);
    assert_eq!(
        view.lookup(&spec, 20u32),
        Ok(Some(Found {
            table_offset: location + 4,
            index: 1
        }))
    );
    assert_eq!(view.lookup(&spec, 15u32), Ok(None));
    assert_eq!(
        view.lookup_value(&spec, ScalarValue::from_i64(ScalarKind::Uint32, 30))
            .map(|f| f.map(|f| f.index)),
        Ok(Some(2))
    );
}

#[rstest]
#[case(5, 3, "")]
#[case(3, 5, "34")]
#[case(0, 99, "0123456789")]
fn slice_clamps(#[case] start: usize, #[case] end: usize, #[case] expected: &str) {
    let buf = ByteBuffer::copy_from(b"0123456789");
    assert_eq!(buf.slice(start, end), expected);
}

#[test]
fn grow_keeps_content_at_tail() {
    let mut buf = ByteBuffer::copy_from(b"0123456789");
    buf.grow(20);
    assert_eq!(buf.len(), 20);
    assert_eq!(buf.slice(10, 20), "0123456789");
    assert_eq!(buf.slice(0, 10), &[0u8; 10][..]);
}

#[test]
fn truncated_buffer_reports_bounds() {
    let mut bytes: Vec<u8> = common::hello_string().into();
    bytes.truncate(30);
    let view = common::view(ByteBuffer::from(bytes), 0);
    let err = view.string(20).unwrap_err();
    assert_eq!(
        err,
        DecodeError::OutOfBounds {
            offset: 28,
            width: 5,
            len: 30
        }
    );
    assert_eq!(
        err.to_string(),
        "read of 5 byte(s) at offset 28 is outside buffer of 30 byte(s)"
    );
}
