//! ISO 9660: only the Primary Volume Descriptor, found at the fixed
//! "system area" boundary of logical sector 16.
//!
//! ```text
//! ISO 9660 image:
//! ├── system_area (32768 bytes, reserved, unparsed)
//! └── volume_descriptor (sector 16)
//!     ├── type_code (1 byte, 1 = primary)
//!     ├── standard_identifier (5 bytes): "CD001"
//!     ├── version (1 byte)
//!     ├── system_id (32 bytes)
//!     └── volume_id (32 bytes)
//! ```
//!
//! Only the primary descriptor is read; the descriptor set terminator and
//! any supplementary/boot descriptors that may follow are out of scope for
//! this demonstration.

mod error;

pub use error::Iso9660Error;

use bitform_core::fieldset::{FnGenerator, GenCtx, Node};
use bitform_core::parser::{root_generator, MagicSignature, Parser, Tags};
use bitform_core::settings::Settings;
use bitform_core::stream::{Charset, InputStream};
use bitform_core::{endian::Endian, error::Error, error::FormatError};
use std::rc::Rc;

const SECTOR_BYTES: u64 = 2048;
const VOLUME_DESCRIPTOR_SECTOR: u64 = 16;
const STANDARD_IDENTIFIER: &[u8] = b"CD001";

pub static TAGS: Tags = Tags {
    id: "iso9660",
    category: "filesystem",
    file_extensions: &["iso"],
    mime_types: &["application/x-iso9660-image"],
    magic: &[MagicSignature {
        offset_bits: (VOLUME_DESCRIPTOR_SECTOR * SECTOR_BYTES + 1) * 8,
        bytes: STANDARD_IDENTIFIER,
    }],
    min_size_bytes: (VOLUME_DESCRIPTOR_SECTOR + 1) * SECTOR_BYTES,
    description: "ISO 9660 optical disc image (primary volume descriptor only)",
};

pub fn make_parser(stream: Rc<InputStream>, endian: Endian, settings: Settings) -> Parser {
    let mut done = false;
    Parser::new(
        &TAGS,
        stream,
        endian,
        settings,
        root_generator(move |ctx: &GenCtx| {
            if done {
                return Ok(None);
            }
            done = true;
            let mut step = 0u8;
            Ok(Some(ctx.field_set(
                "volume_descriptor",
                None,
                None,
                Box::new(FnGenerator::new(move |inner: &GenCtx| {
                    volume_descriptor_field(inner, &mut step)
                })),
            )))
        }),
    )
}

fn volume_descriptor_field(ctx: &GenCtx, step: &mut u8) -> Result<Option<Node>, Error> {
    let node = match *step {
        0 => {
            debug_assert_eq!(ctx.addr(), VOLUME_DESCRIPTOR_SECTOR * SECTOR_BYTES * 8);
            ctx.uint_endian(8, Endian::Little, "type_code")?
        }
        1 => {
            let n = ctx.raw_bytes(5, "standard_identifier")?;
            if n.value().as_bytes().map(|b| b.as_ref()) != Some(STANDARD_IDENTIFIER) {
                return Err(FormatError::Invalid {
                    reason: "Invalid signature".to_owned(),
                }
                .into());
            }
            n
        }
        2 => ctx.uint_endian(8, Endian::Little, "version")?,
        3 => ctx.string(32, Charset::Ascii, Some(" "), "system_id")?,
        4 => ctx.string(32, Charset::Ascii, Some(" "), "volume_id")?,
        _ => return Ok(None),
    };
    *step += 1;
    Ok(Some(node))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image_with_signature(signature: &[u8; 6]) -> Vec<u8> {
        let mut data = vec![0u8; (VOLUME_DESCRIPTOR_SECTOR * SECTOR_BYTES) as usize];
        data.extend_from_slice(signature);
        data.extend_from_slice(&[0u8; 64]); // system_id + volume_id
        data
    }

    #[test]
    fn valid_signature_validates() {
        let data = image_with_signature(&[0x01, 0x43, 0x44, 0x30, 0x30, 0x31]);
        let stream = Rc::new(InputStream::from_bytes(data));
        let p = make_parser(stream, Endian::Little, Settings::default());
        assert!(p.validate().unwrap());
    }

    #[test]
    fn bad_signature_fails_validate() {
        let data = image_with_signature(&[0x01, 0xff, 0xff, 0xff, 0xff, 0xff]);
        let stream = Rc::new(InputStream::from_bytes(data));
        let p = make_parser(stream, Endian::Little, Settings::default());
        let err = p.validate().unwrap_err();
        match err {
            Error::Format(FormatError::Invalid { reason }) => {
                assert_eq!(reason, "Invalid signature");
            }
            other => panic!("expected FormatError::Invalid, got {other:?}"),
        }
    }
}
