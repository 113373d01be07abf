//! CLI-boundary tests: exit code and stderr/stdout contract (spec §6).

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

fn minimal_bmp(width: i32) -> Vec<u8> {
    let mut data = vec![b'B', b'M'];
    data.extend_from_slice(&0u32.to_le_bytes()); // file_size
    data.extend_from_slice(&0u16.to_le_bytes()); // reserved1
    data.extend_from_slice(&0u16.to_le_bytes()); // reserved2
    data.extend_from_slice(&54u32.to_le_bytes()); // pixel_data_offset
    data.extend_from_slice(&40u32.to_le_bytes()); // dib_header_size
    data.extend_from_slice(&width.to_le_bytes());
    data.extend_from_slice(&1i32.to_le_bytes()); // height
    data.extend_from_slice(&1u16.to_le_bytes()); // planes
    data.extend_from_slice(&24u16.to_le_bytes()); // bit_count
    data.extend_from_slice(&0u32.to_le_bytes()); // compression
    data.extend_from_slice(&0u32.to_le_bytes()); // image_size
    data.extend_from_slice(&0i32.to_le_bytes()); // x_ppm
    data.extend_from_slice(&0i32.to_le_bytes()); // y_ppm
    data.extend_from_slice(&0u32.to_le_bytes()); // colors_used
    data.extend_from_slice(&0u32.to_le_bytes()); // colors_important
    data
}

#[test]
fn valid_bmp_exits_zero_and_dumps_tree() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sample.bmp");
    std::fs::File::create(&path)
        .unwrap()
        .write_all(&minimal_bmp(42))
        .unwrap();

    Command::cargo_bin("bitform")
        .unwrap()
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("header {"))
        .stdout(predicate::str::contains("width"));
}

#[test]
fn unrecognized_file_exits_nonzero_with_error_on_stderr() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("garbage.bin");
    std::fs::File::create(&path)
        .unwrap()
        .write_all(b"not a known format at all")
        .unwrap();

    Command::cargo_bin("bitform")
        .unwrap()
        .arg(&path)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn missing_file_exits_nonzero() {
    Command::cargo_bin("bitform")
        .unwrap()
        .arg("/nonexistent/path/does/not/exist.bmp")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("failed to read"));
}

#[test]
fn help_lists_flags() {
    Command::cargo_bin("bitform")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--quiet"))
        .stdout(predicate::str::contains("--max-bytes"))
        .stdout(predicate::str::contains("--hint"));
}
