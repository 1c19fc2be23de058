#![no_main]

use arbitrary::Arbitrary;
use flatview::{ByteBuffer, LookupSpec, ScalarKind, ScalarValue, SharedBuffer, View};
use libfuzzer_sys::fuzz_target;

/// One step against a view of untrusted bytes. Every step must either
/// succeed or return an error; none may panic.
#[derive(Arbitrary, Debug)]
enum Op {
    Move(u32),
    Root,
    Offset(u16),
    Field(ScalarKind, u16),
    Get(ScalarKind, u32),
    Indirect(u32),
    String(u32),
    StringField(u16),
    Table(u16),
    Union(u16),
    Vector(u16),
    LookupStructs { location: u32, stride: u32, key: u16, probe: i64 },
    LookupTables { location: u32, slot: u16, probe: Vec<u8> },
    Grow(u16),
    Pad(u16, u32),
    Set(Vec<u8>, u32),
    Slice(usize, usize),
    Release,
}

#[derive(Arbitrary, Debug)]
struct Input {
    bytes: Vec<u8>,
    ops: Vec<Op>,
}

fn run(input: Input) {
    let mut handle = SharedBuffer::new(ByteBuffer::from(input.bytes));
    let mut view = View::new(handle.retain(), 0);

    for op in input.ops {
        match op {
            Op::Move(pos) => view = view.at(pos),
            Op::Root => {
                if let Ok(root) = View::root(view.bytes()) {
                    view = root;
                }
            }
            Op::Offset(slot) => {
                let _ = view.offset(slot);
            }
            Op::Field(kind, slot) => {
                if let Ok(relative) = view.offset(slot) {
                    let _ = view.get_kind(kind, view.pos().wrapping_add(relative));
                }
            }
            Op::Get(kind, at) => {
                if let Ok(buffer) = view.buffer() {
                    assert_eq!(kind.unpack(buffer, at).is_ok(), view.get_kind(kind, at).is_ok());
                }
            }
            Op::Indirect(at) => {
                let _ = view.indirect(at);
            }
            Op::String(at) => {
                let _ = view.string(at);
            }
            Op::StringField(slot) => {
                let _ = view.string_field(slot);
            }
            Op::Table(slot) => {
                if let Ok(Some(table)) = view.table_field(slot) {
                    view = table;
                }
            }
            Op::Union(slot) => {
                if let Ok(relative) = view.offset(slot) {
                    let mut target = View::detached();
                    if view.union(&mut target, relative).is_ok() {
                        view = target;
                    }
                }
            }
            Op::Vector(slot) => {
                if let Ok(Some(vector)) = view.vector_field(slot) {
                    let _ = view.lookup(&vector.tables(0), 0u8);
                }
            }
            Op::LookupStructs {
                location,
                stride,
                key,
                probe,
            } => {
                for kind in ScalarKind::ALL {
                    let spec = LookupSpec::structs(location, stride, key);
                    let _ = view.lookup_value(&spec, ScalarValue::from_i64(kind, probe));
                }
            }
            Op::LookupTables {
                location,
                slot,
                probe,
            } => {
                let _ = view.lookup_str(&LookupSpec::tables(location, slot), probe);
            }
            Op::Grow(by) => {
                let pos = view.pos();
                view.release();
                if let Ok(buffer) = handle.get_mut() {
                    let len = buffer.len();
                    buffer.grow(len + usize::from(by));
                }
                view = View::new(handle.retain(), pos);
            }
            Op::Pad(n, start) => {
                let pos = view.pos();
                view.release();
                if let Ok(buffer) = handle.get_mut() {
                    buffer.pad(usize::from(n), start as usize);
                }
                view = View::new(handle.retain(), pos);
            }
            Op::Set(bytes, at) => {
                let pos = view.pos();
                view.release();
                if let Ok(buffer) = handle.get_mut() {
                    buffer.set(&bytes, at as usize);
                }
                view = View::new(handle.retain(), pos);
            }
            Op::Slice(start, end) => {
                if let Ok(buffer) = view.buffer() {
                    assert!(buffer.slice(start, end).len() <= buffer.len());
                }
            }
            Op::Release => {
                handle.release();
                view.release();
                assert!(view.offset(0).is_err());
            }
        }
    }
}

fuzz_target!(|input: Input| run(input));
