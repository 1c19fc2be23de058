#![allow(dead_code)]

use flatview::{ByteBuffer, SharedBuffer, View};

/// Writes each `(position, bytes)` pair into a zeroed buffer of `len` bytes.
pub fn assemble(len: usize, writes: &[(usize, &[u8])]) -> ByteBuffer {
    let mut buf = ByteBuffer::zeroed(len);
    for &(at, bytes) in writes {
        assert!(buf.set(bytes, at), "{} bytes at {at} overflow", bytes.len());
    }
    buf
}

pub fn view(buf: ByteBuffer, pos: u32) -> View {
    View::new(SharedBuffer::new(buf), pos)
}

/// Table at 8 whose vtable at 0 is 8 bytes long and maps slot 4 to +8, where
/// a `u32` 42 is stored.
pub fn table_with_u32_field() -> ByteBuffer {
    assemble(
        20,
        &[
            (0, &8u16.to_le_bytes()),
            (4, &8u16.to_le_bytes()),
            (8, &8i32.to_le_bytes()),
            (16, &42u32.to_le_bytes()),
        ],
    )
}

/// Forward offset at 20 to a length-prefixed "Hello" at 24.
pub fn hello_string() -> ByteBuffer {
    assemble(
        33,
        &[
            (20, &4u32.to_le_bytes()),
            (24, &5u32.to_le_bytes()),
            (28, b"Hello"),
        ],
    )
}

/// Vector of the `u32`s 10, 20, 30 whose first element sits at `location`.
pub fn u32_vector(location: usize) -> ByteBuffer {
    assemble(
        location + 12,
        &[
            (location - 4, &3u32.to_le_bytes()),
            (location, &10u32.to_le_bytes()),
            (location + 4, &20u32.to_le_bytes()),
            (location + 8, &30u32.to_le_bytes()),
        ],
    )
}
