#![no_main]

use libfuzzer_sys::fuzz_target;
use segfile::{BinaryReader, BinaryWriter};

fuzz_target!(|data: &[u8]| {
    let Ok(table) = BinaryReader::default().read_from_bytes(data) else {
        return;
    };
    // Anything the reader accepts must serialize back to the same bytes.
    let mut out = Vec::new();
    BinaryWriter::default()
        .write_to(&table, &mut out)
        .expect("accepted table must be writable");
    assert_eq!(out, data);
});
