use std::io::{ErrorKind, Read, Write};

use anyhow::Error;
use engine_driver::{
    ClobClient, UpdatableRow, Value,
    handles::{ClobId, InMemoryLobs},
    lob::{CharRead, CharWrite, ClobReader},
};
use test_case::{test_case, test_matrix};

fn init() {
    // Set environment to something like:
    // RUST_LOG=engine_driver=debug cargo test
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Deterministic text of `len` UTF-16 code units, mixing ASCII with other characters of the basic
/// multilingual plane.
fn text_of_len(len: usize) -> String {
    (0..len)
        .map(|i| char::from_u32(0x41 + (i as u32 * 7) % 0x3000).unwrap())
        .collect()
}

#[test_matrix([0, 1, 65535, 65536, 65537], [1, 2, 1000])]
fn character_stream_round_trip(len: usize, pos: u64) {
    init();
    let lobs = InMemoryLobs::new();
    // Content up to `pos - 1`, so writing at `pos` appends.
    let id = lobs.create_clob(&".".repeat(pos as usize - 1));
    let row = UpdatableRow::new(vec![Value::Clob(id)]);
    let mut clob = ClobClient::attached(&lobs, id, row, 1);
    let text = text_of_len(len);

    let mut writer = clob.set_character_stream(pos).unwrap();
    writer.write_str(&text).unwrap();
    writer.close().unwrap();
    let mut reader = clob.character_stream_range(pos, len as u64).unwrap();
    let actual = reader.read_to_string().unwrap();

    assert_eq!(text, actual);
    assert_eq!(pos - 1 + len as u64, clob.length().unwrap());
}

#[test_case(""; "empty")]
#[test_case("Hello, World!"; "short")]
#[test_case(&"0123456789".repeat(10_000); "longer than one window")]
fn ascii_stream_round_trip(text: &str) {
    init();
    let lobs = InMemoryLobs::new();
    let id = lobs.create_clob("");
    let row = UpdatableRow::new(vec![Value::Clob(id)]);
    let mut clob = ClobClient::attached(&lobs, id, row, 1);

    let mut out = clob.set_ascii_stream(1).unwrap();
    out.write_all(text.as_bytes()).unwrap();
    out.close().unwrap();
    let mut bytes = Vec::new();
    clob.ascii_stream().unwrap().read_to_end(&mut bytes).unwrap();

    assert_eq!(text.as_bytes(), bytes);
}

#[test]
fn characters_outside_of_ascii_read_as_question_marks() -> Result<(), Error> {
    init();
    let lobs = InMemoryLobs::new();
    let id = lobs.create_clob("Grüße 😀!");
    let clob = ClobClient::new(&lobs, id);

    let mut bytes = Vec::new();
    clob.ascii_stream()?.read_to_end(&mut bytes)?;

    assert_eq!(b"Gr??e ?!", bytes.as_slice());
    Ok(())
}

#[test]
fn read_large_object_in_chunks() -> Result<(), Error> {
    init();
    let lobs = InMemoryLobs::new();
    let id = lobs.create_clob(&"A".repeat(70_000));
    let clob = ClobClient::new(&lobs, id);
    let mut stream = clob.ascii_stream()?;
    let mut buf = [0u8; 4096];

    let mut chunk_sizes = Vec::new();
    while let Some(n) = stream.read_bytes(&mut buf)? {
        assert_ne!(0, n, "in memory objects always have characters available");
        assert!(buf[..n].iter().all(|&byte| byte == b'A'));
        chunk_sizes.push(n);
    }

    assert_eq!(18, chunk_sizes.len());
    assert!(chunk_sizes[..17].iter().all(|&n| n == 4096));
    assert_eq!(368, chunk_sizes[17]);
    assert!(stream.is_eof());
    // End of stream is sticky
    assert_eq!(None, stream.read_bytes(&mut buf)?);
    stream.close()?;
    stream.close()?;
    Ok(())
}

#[test]
fn modifications_are_invisible_to_other_readers() -> Result<(), Error> {
    init();
    let lobs = InMemoryLobs::new();
    let original = lobs.create_clob("ABC");
    let row = UpdatableRow::new(vec![Value::Clob(original)]);
    let mut clob = ClobClient::attached(&lobs, original, row.clone(), 1);

    let mut writer = clob.set_character_stream(1)?;
    writer.write_str("X")?;
    writer.close()?;

    // Another reader of the original object does not see the modification
    let other = ClobClient::new(&lobs, original);
    assert_eq!("ABC", other.get_sub_string(1, 3)?);
    // The modifying client and the row do
    assert_eq!("XBC", clob.get_sub_string(1, 3)?);
    let Value::Clob(working) = row.value(1)? else {
        panic!("column must hold a large object");
    };
    assert_ne!(original, working);
    assert_eq!("XBC", lobs.clob_to_string(working)?);

    // Clearing the updates reverts the column to the original object
    clob.clear_updates()?;
    assert_eq!(Value::Clob(original), row.value(1)?);
    assert_eq!("ABC", clob.get_sub_string(1, 3)?);
    assert!(!clob.is_update_in_progress());
    Ok(())
}

#[test]
fn applied_updates_are_committed_to_the_row() -> Result<(), Error> {
    init();
    let lobs = InMemoryLobs::new();
    let original = lobs.create_clob("ABC");
    let row = UpdatableRow::new(vec![Value::Clob(original)]);
    let mut clob = ClobClient::attached(&lobs, original, row.clone(), 1);

    let mut out = clob.set_ascii_stream(4)?;
    out.write_all(b"DEF")?;
    out.close()?;
    row.apply_updates();

    let Value::Clob(committed) = row.committed_value(1)? else {
        panic!("column must hold a large object");
    };
    assert_eq!(committed, clob.current_clob());
    assert_eq!("ABCDEF", clob.get_sub_string(1, 6)?);
    assert_eq!("ABC", lobs.clob_to_string(original)?);
    Ok(())
}

#[test_case(1, 3; "whole object")]
#[test_case(4, 0; "empty range past the last character")]
#[test_case(2, 2; "tail")]
fn valid_sub_ranges(pos: u64, len: usize) {
    init();
    let lobs = InMemoryLobs::new();
    let clob = ClobClient::new(&lobs, lobs.create_clob("ABC"));

    assert!(clob.get_sub_string(pos, len).is_ok());
    assert!(clob.character_stream_range(pos, len as u64).is_ok());
}

#[test_case(0, 1; "position zero")]
#[test_case(5, 0; "start beyond the end")]
#[test_case(2, 3; "range beyond the end")]
fn invalid_sub_ranges(pos: u64, len: usize) {
    init();
    let lobs = InMemoryLobs::new();
    let clob = ClobClient::new(&lobs, lobs.create_clob("ABC"));

    let error = clob.get_sub_string(pos, len).unwrap_err();
    assert!(matches!(error, engine_driver::Error::OutOfRange { .. }));
    assert!(clob.character_stream_range(pos, len as u64).is_err());
}

#[test]
fn streams_fail_after_owner_is_closed() -> Result<(), Error> {
    init();
    let lobs = InMemoryLobs::new();
    let id = lobs.create_clob("Hello");
    let mut clob = ClobClient::new(&lobs, id);
    let mut chars = clob.character_stream()?;
    let mut bytes = clob.ascii_stream()?;

    clob.free();

    let mut buf = [0u16; 8];
    assert!(chars.read_chars(&mut buf).is_err());
    assert!(bytes.read_byte().is_err());
    assert!(matches!(clob.length(), Err(engine_driver::Error::LobClosed)));
    // Closing streams of a closed owner is still fine
    chars.close()?;
    bytes.close()?;
    Ok(())
}

#[test]
fn pending_bytes_are_reported_if_owner_closes_first() -> Result<(), Error> {
    init();
    let lobs = InMemoryLobs::new();
    let original = lobs.create_clob("");
    let row = UpdatableRow::new(vec![Value::Clob(original)]);
    let mut clob = ClobClient::attached(&lobs, original, row.clone(), 1);
    let mut out = clob.set_ascii_stream(1)?;
    out.write_all(b"important")?;

    clob.close();

    assert!(out.close().is_err());
    assert!(out.write_all(b"more").is_err());
    let Value::Clob(working) = row.value(1)? else {
        panic!("column must hold a large object");
    };
    assert_eq!("", lobs.clob_to_string(working)?);
    Ok(())
}

#[test]
fn character_writes_fail_after_owner_is_closed() -> Result<(), Error> {
    init();
    let lobs = InMemoryLobs::new();
    let original = lobs.create_clob("ABC");
    let row = UpdatableRow::new(vec![Value::Clob(original)]);
    let mut clob = ClobClient::attached(&lobs, original, row.clone(), 1);
    let mut writer = clob.set_character_stream(1)?;
    writer.write_str("X")?;

    clob.close();

    assert!(writer.write_str("YZ").is_err());
    let Value::Clob(working) = row.value(1)? else {
        panic!("column must hold a large object");
    };
    assert_eq!("XBC", lobs.clob_to_string(working)?);
    writer.close()?;
    Ok(())
}

#[test]
fn writes_fail_after_row_cancels_updates() -> Result<(), Error> {
    init();
    let lobs = InMemoryLobs::new();
    let original = lobs.create_clob("ABC");
    let row = UpdatableRow::new(vec![Value::Clob(original)]);
    let mut clob = ClobClient::attached(&lobs, original, row.clone(), 1);
    let mut writer = clob.set_character_stream(1)?;
    let mut out = clob.set_ascii_stream(1)?;
    out.write_all(b"pending")?;

    row.cancel_updates();

    assert!(writer.write_str("XYZ").is_err());
    assert!(out.close().is_err());
    assert_eq!(Value::Clob(original), row.value(1)?);
    assert_eq!("ABC", clob.get_sub_string(1, 3)?);
    // The next stream starts a fresh edit session
    let mut writer = clob.set_character_stream(1)?;
    writer.write_str("X")?;
    assert_eq!("XBC", clob.get_sub_string(1, 3)?);
    Ok(())
}

#[test]
fn writes_fail_after_client_clears_updates() -> Result<(), Error> {
    init();
    let lobs = InMemoryLobs::new();
    let original = lobs.create_clob("ABC");
    let row = UpdatableRow::new(vec![Value::Clob(original)]);
    let mut clob = ClobClient::attached(&lobs, original, row.clone(), 1);
    let mut writer = clob.set_character_stream(1)?;
    writer.write_str("X")?;

    clob.clear_updates()?;

    assert!(writer.write_str("YZ").is_err());
    assert_eq!(Value::Clob(original), row.value(1)?);
    assert_eq!("ABC", clob.get_sub_string(1, 3)?);
    Ok(())
}

#[test]
fn engine_failure_surfaces_as_io_error() {
    init();
    let lobs = InMemoryLobs::new();
    let mut reader = ClobReader::new(&lobs, ClobId(42), 0, 10);

    let mut buf = [0u16; 8];
    let error = reader.read_chars(&mut buf).unwrap_err();

    assert_eq!(ErrorKind::Other, error.kind());
    assert!(error.to_string().contains("does not exist"));
}
