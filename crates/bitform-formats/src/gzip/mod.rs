//! Gzip (RFC 1952) member header and trailer.
//!
//! ```text
//! Gzip member:
//! ├── Header (10 bytes)
//! │   ├── magic: 0x1f 0x8b
//! │   ├── compression_method (1 byte, must be 8 = deflate)
//! │   ├── flags (1 byte)
//! │   ├── mtime (4 bytes, little-endian, unix timestamp)
//! │   ├── extra_flags (1 byte)
//! │   └── os (1 byte)
//! ├── filename (NUL-terminated, only if flags & FNAME)
//! ├── file (deflate stream, whatever is left before the trailer)
//! └── Trailer (8 bytes)
//!     ├── crc32 (4 bytes, little-endian)
//!     └── isize (4 bytes, little-endian, uncompressed size mod 2^32)
//! ```
//!
//! Only the member envelope is parsed; the deflate stream itself is left
//! as opaque bytes (inflating it is out of scope for a format
//! demonstration of the field-tree engine).

mod error;

pub use error::GzipError;

use bitform_core::field::DisplayKind;
use bitform_core::field::handlers;
use bitform_core::fieldset::{GenCtx, Node};
use bitform_core::parser::{root_generator, MagicSignature, Parser, Tags};
use bitform_core::settings::Settings;
use bitform_core::stream::{Charset, InputStream};
use bitform_core::{endian::Endian, error::Error, error::FormatError};
use std::rc::Rc;

const FLAG_FNAME: i128 = 0x08;
const TRAILER_BITS: u64 = 8 * 8;

pub static TAGS: Tags = Tags {
    id: "gzip",
    category: "archive",
    file_extensions: &["gz"],
    mime_types: &["application/gzip"],
    magic: &[MagicSignature {
        offset_bits: 0,
        bytes: &[0x1f, 0x8b],
    }],
    min_size_bytes: 18,
    description: "Gzip compressed member (RFC 1952)",
};

pub fn make_parser(stream: Rc<InputStream>, endian: Endian, settings: Settings) -> Parser {
    let mut step = 0u8;
    Parser::new(
        &TAGS,
        stream,
        endian,
        settings,
        root_generator(move |ctx: &GenCtx| next(ctx, &mut step)),
    )
}

/// Fixed header fields, in wire order; `step` counts how many have been
/// yielded so far. The variable-length filename and trailing file/trailer
/// fields are handled once `step` runs past this table.
const FIXED_FIELD_COUNT: u8 = 6;

fn next(ctx: &GenCtx, step: &mut u8) -> Result<Option<Node>, Error> {
    let node = match *step {
        0 => {
            let n = ctx.raw_bytes(2, "magic")?;
            if n.value().as_bytes().map(|b| b.as_ref()) != Some(&[0x1f, 0x8b][..]) {
                return Err(FormatError::Invalid {
                    reason: "bad gzip magic".to_owned(),
                }
                .into());
            }
            n
        }
        1 => {
            let n = ctx.uint_endian(8, Endian::Little, "compression_method")?;
            if n.value().as_int() != Some(8) {
                return Err(FormatError::Invalid {
                    reason: "unsupported compression method".to_owned(),
                }
                .into());
            }
            n
        }
        2 => ctx.uint_endian(8, Endian::Little, "flags")?,
        3 => ctx.with_display(
            ctx.uint_endian(32, Endian::Little, "mtime")?,
            DisplayKind::Handler(handlers::unix_timestamp),
        ),
        4 => ctx.uint_endian(8, Endian::Little, "extra_flags")?,
        5 => ctx.uint_endian(8, Endian::Little, "os")?,
        FIXED_FIELD_COUNT => {
            let has_name = ctx.sibling("flags").and_then(|v| v.as_int()).unwrap_or(0) & FLAG_FNAME != 0;
            *step += 1;
            if has_name {
                return Ok(Some(ctx.cstring(Charset::Ascii, "filename")?));
            }
            return next(ctx, step);
        }
        n if n == FIXED_FIELD_COUNT + 1 => {
            let remaining_bits = ctx.stream().total_bits().saturating_sub(ctx.addr());
            let file_bits = remaining_bits.saturating_sub(TRAILER_BITS);
            ctx.raw_bytes(file_bits / 8, "file")?
        }
        n if n == FIXED_FIELD_COUNT + 2 => ctx.with_display(
            ctx.uint_endian(32, Endian::Little, "crc32")?,
            DisplayKind::Hexadecimal,
        ),
        n if n == FIXED_FIELD_COUNT + 3 => ctx.uint_endian(32, Endian::Little, "isize")?,
        _ => return Ok(None),
    };

    *step += 1;
    Ok(Some(node))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member() -> Vec<u8> {
        let mut data = vec![0x1f, 0x8b, 0x08, 0x08];
        data.extend_from_slice(&0u32.to_le_bytes()); // mtime
        data.push(0); // extra_flags
        data.push(0xff); // os
        data.extend_from_slice(b"test.txt\0");
        data.extend_from_slice(&[0u8; 100]); // fake deflate payload
        data.extend_from_slice(&0u32.to_le_bytes()); // crc32
        data.extend_from_slice(&0u32.to_le_bytes()); // isize
        data
    }

    #[test]
    fn filename_and_file_size() {
        let data = member();
        let total_bits = data.len() as u64 * 8;
        let stream = Rc::new(InputStream::from_bytes(data));
        let p = make_parser(stream, Endian::Little, Settings::default());
        assert!(p.validate().unwrap());
        let filename = p.resolve("/filename").unwrap();
        assert_eq!(filename.value().as_text(), Some("test.txt"));
        let file = p.resolve("/file").unwrap();
        let header_bits = file.addr();
        assert_eq!(file.size_bits(), Some(total_bits - header_bits - TRAILER_BITS));
    }

    #[test]
    fn bad_magic_fails_validate() {
        let stream = Rc::new(InputStream::from_bytes(vec![0u8; 20]));
        let p = make_parser(stream, Endian::Little, Settings::default());
        assert!(p.validate().is_err());
    }
}
