//! `InputStream::from_path` against a real on-disk file.

use bitform_core::endian::Endian;
use bitform_core::stream::InputStream;
use std::fs;
use tempfile::tempdir;

#[test]
fn reads_a_file_from_disk() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("sample.bin");
    fs::write(&path, [0xDE, 0xAD, 0xBE, 0xEF]).expect("write fixture");

    let stream = InputStream::from_path(&path).expect("read fixture");
    assert_eq!(stream.total_bytes(), 4);
    assert_eq!(
        stream.read_integer(0, false, 32, Endian::Big).unwrap(),
        0xDEAD_BEEFu32 as i128
    );
}

#[test]
fn missing_file_errors() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("does-not-exist.bin");
    assert!(InputStream::from_path(&path).is_err());
}
