//! Classic ustar archive: a sequence of 512-byte header blocks, each
//! followed by the file's data rounded up to a 512-byte boundary, and
//! terminated by (at least) one all-zero header block.
//!
//! ```text
//! TAR archive:
//! └── file[] (one per archive member)
//!     ├── name (100 bytes, NUL-padded)
//!     ├── mode, uid, gid (8 bytes each, octal ASCII, NUL-padded)
//!     ├── size (12 bytes, octal ASCII): data length in bytes
//!     ├── mtime (12 bytes, octal ASCII)
//!     ├── chksum (8 bytes, octal ASCII)
//!     ├── typeflag (1 byte)
//!     ├── linkname (100 bytes)
//!     ├── magic (6 bytes): "ustar\0"
//!     ├── version (2 bytes)
//!     ├── uname, gname (32 bytes each)
//!     ├── devmajor, devminor (8 bytes each)
//!     ├── prefix (155 bytes)
//!     ├── _pad (12 bytes, reserved)
//!     └── data (size bytes, rounded up to 512)
//! ```
//!
//! Only the classic header layout is read; GNU/PAX extension headers are
//! not recognized and will simply be treated as regular entries with an
//! unusual `typeflag`.

mod error;

pub use error::TarError;

use bitform_core::fieldset::{FnGenerator, GenCtx, Node};
use bitform_core::parser::{root_generator, MagicSignature, Parser, Tags};
use bitform_core::settings::Settings;
use bitform_core::stream::{Charset, InputStream};
use bitform_core::{endian::Endian, error::Error, error::FieldError};
use std::rc::Rc;

const BLOCK_BYTES: u64 = 512;

pub static TAGS: Tags = Tags {
    id: "tar",
    category: "archive",
    file_extensions: &["tar"],
    mime_types: &["application/x-tar"],
    // "ustar\0" at offset 257 within the first header block is the one
    // reliable magic; old-style (pre-POSIX) tar has no magic at all, so
    // this parser only quick-matches ustar archives.
    magic: &[MagicSignature {
        offset_bits: 257 * 8,
        bytes: b"ustar\0",
    }],
    min_size_bytes: BLOCK_BYTES * 2,
    description: "POSIX ustar archive",
};

pub fn make_parser(stream: Rc<InputStream>, endian: Endian, settings: Settings) -> Parser {
    Parser::new(
        &TAGS,
        stream,
        endian,
        settings,
        root_generator(move |ctx: &GenCtx| {
            let addr = ctx.addr();
            if addr % (BLOCK_BYTES * 8) != 0 {
                return Err(FieldError::Construction {
                    reason: "tar entries must start on a 512-byte boundary".to_owned(),
                }
                .into());
            }
            if addr + BLOCK_BYTES * 8 > ctx.stream().total_bits() {
                return Ok(None);
            }
            let name_probe = ctx.stream().read_bytes(addr, 100).map_err(Error::from)?;
            if name_probe.iter().all(|b| *b == 0) {
                return Ok(None);
            }
            Ok(Some(ctx.field_set(
                "file[]",
                None,
                None,
                Box::new(FnGenerator::new(entry_step())),
            )))
        }),
    )
}

/// Returns a fresh closure implementing one file entry's header + data.
fn entry_step() -> impl FnMut(&GenCtx) -> Result<Option<Node>, Error> {
    let mut step = 0u8;
    let mut data_bytes = 0u64;
    move |ctx: &GenCtx| {
        let node = match step {
            0 => ctx.string(100, Charset::Ascii, Some("\0"), "name")?,
            1 => ctx.string(8, Charset::Ascii, Some(" \0"), "mode")?,
            2 => ctx.string(8, Charset::Ascii, Some(" \0"), "uid")?,
            3 => ctx.string(8, Charset::Ascii, Some(" \0"), "gid")?,
            4 => {
                let n = ctx.string(12, Charset::Ascii, Some(" \0"), "size")?;
                data_bytes = parse_octal(&n);
                n
            }
            5 => ctx.string(12, Charset::Ascii, Some(" \0"), "mtime")?,
            6 => ctx.string(8, Charset::Ascii, Some(" \0"), "chksum")?,
            7 => ctx.string(1, Charset::Ascii, None, "typeflag")?,
            8 => ctx.string(100, Charset::Ascii, Some("\0"), "linkname")?,
            9 => ctx.string(6, Charset::Ascii, Some("\0"), "magic")?,
            10 => ctx.string(2, Charset::Ascii, Some("\0"), "version")?,
            11 => ctx.string(32, Charset::Ascii, Some("\0"), "uname")?,
            12 => ctx.string(32, Charset::Ascii, Some("\0"), "gname")?,
            13 => ctx.string(8, Charset::Ascii, Some(" \0"), "devmajor")?,
            14 => ctx.string(8, Charset::Ascii, Some(" \0"), "devminor")?,
            15 => ctx.string(155, Charset::Ascii, Some("\0"), "prefix")?,
            16 => ctx.null_bytes(12, "_pad")?,
            17 => {
                let padded = data_bytes.div_ceil(BLOCK_BYTES) * BLOCK_BYTES;
                ctx.raw_bytes(padded, "data")?
            }
            _ => return Ok(None),
        };
        step += 1;
        Ok(Some(node))
    }
}

/// Parses a NUL/space-padded octal ASCII field such as tar's `size`.
fn parse_octal(node: &Node) -> u64 {
    node.value()
        .as_text()
        .map(|text| u64::from_str_radix(text.trim(), 8).unwrap_or(0))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_block(name: &str, size: u64) -> Vec<u8> {
        let mut block = vec![0u8; BLOCK_BYTES as usize];
        block[0..name.len()].copy_from_slice(name.as_bytes());
        let size_octal = format!("{size:011o}\0");
        block[124..124 + size_octal.len()].copy_from_slice(size_octal.as_bytes());
        block[257..257 + 6].copy_from_slice(b"ustar\0");
        block
    }

    fn archive_with_three_files() -> Vec<u8> {
        let mut data = Vec::new();
        for (name, size) in [("a.txt", 4u64), ("b.txt", 4), ("c.txt", 4)] {
            data.extend_from_slice(&header_block(name, size));
            let padded = size.div_ceil(BLOCK_BYTES) * BLOCK_BYTES;
            let mut body = vec![0u8; padded as usize];
            body[..size as usize].copy_from_slice(b"data"[..size as usize].as_ref());
            data.extend_from_slice(&body);
        }
        data.extend_from_slice(&[0u8; (BLOCK_BYTES * 2) as usize]);
        data
    }

    #[test]
    fn three_entries_in_order_and_last_in_array() {
        let data = archive_with_three_files();
        let stream = Rc::new(InputStream::from_bytes(data));
        let p = make_parser(stream, Endian::Little, Settings::default());
        assert!(p.validate().unwrap());

        let names = ["a.txt", "b.txt", "c.txt"];
        for (i, expected) in names.iter().enumerate() {
            let name = p.resolve(&format!("/file[{i}]/name")).unwrap();
            assert_eq!(name.value().as_text(), Some(*expected));
        }

        let last = p.resolve("/file[]").unwrap();
        let last_name = p.resolve("/file[]/name").unwrap();
        assert_eq!(last_name.value().as_text(), Some("c.txt"));
        assert_eq!(last.name(), "file[2]");
    }
}
