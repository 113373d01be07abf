//! Windows BMP: `BITMAPFILEHEADER` (14 bytes) followed by the classic
//! 40-byte `BITMAPINFOHEADER`, then raw pixel data.
//!
//! ```text
//! BMP file:
//! ├── header (54 bytes)
//! │   ├── signature: "BM"
//! │   ├── file_size (4 bytes, little-endian)
//! │   ├── reserved1, reserved2 (2 bytes each)
//! │   ├── pixel_data_offset (4 bytes, little-endian)
//! │   ├── dib_header_size (4 bytes, little-endian, must be 40 here)
//! │   ├── width, height (4 bytes each, little-endian, signed)
//! │   ├── planes, bit_count (2 bytes each, little-endian)
//! │   ├── compression, image_size (4 bytes each, little-endian)
//! │   ├── x_ppm, y_ppm (4 bytes each, little-endian, signed)
//! │   └── colors_used, colors_important (4 bytes each, little-endian)
//! └── pixels (whatever remains of the stream)
//! ```
//!
//! Only the classic `BITMAPINFOHEADER` variant is recognized; the OS/2 and
//! v4/v5 header extensions are out of scope for this demonstration.

mod error;

pub use error::BmpError;

use bitform_core::field::primitive::{self, StaticFieldDescriptor};
use bitform_core::fieldset::GenCtx;
use bitform_core::parser::{root_generator, MagicSignature, Parser, Tags};
use bitform_core::settings::Settings;
use bitform_core::stream::InputStream;
use bitform_core::{endian::Endian, error::FormatError};
use std::rc::Rc;

const HEADER_BYTES: u64 = 54;

pub static TAGS: Tags = Tags {
    id: "bmp",
    category: "image",
    file_extensions: &["bmp"],
    mime_types: &["image/bmp"],
    magic: &[MagicSignature {
        offset_bits: 0,
        bytes: b"BM",
    }],
    min_size_bytes: HEADER_BYTES,
    description: "Windows bitmap (BITMAPFILEHEADER + BITMAPINFOHEADER)",
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
            Ok(Some(ctx.static_field_set("header", None, header_descriptors())?))
        }),
    )
}

/// `BITMAPFILEHEADER` + `BITMAPINFOHEADER`: a fixed sequence of fields that
/// never depends on stream content, so it is built with `StaticFieldSet`
/// (spec §4.2) rather than a hand-written step-counter generator.
fn header_descriptors() -> Vec<StaticFieldDescriptor> {
    vec![
        Box::new(|stream, addr, settings| {
            let n = primitive::raw_bytes(stream, addr, 2, "signature", settings)?;
            if n.value().as_bytes().map(|b| b.as_ref()) != Some(&b"BM"[..]) {
                return Err(FormatError::Invalid {
                    reason: "bad BMP signature".to_owned(),
                }
                .into());
            }
            Ok(n)
        }),
        Box::new(|stream, addr, settings| {
            primitive::integer(stream, addr, 32, false, Endian::Little, "file_size", settings)
        }),
        Box::new(|stream, addr, settings| {
            primitive::integer(stream, addr, 16, false, Endian::Little, "reserved1", settings)
        }),
        Box::new(|stream, addr, settings| {
            primitive::integer(stream, addr, 16, false, Endian::Little, "reserved2", settings)
        }),
        Box::new(|stream, addr, settings| {
            primitive::integer(stream, addr, 32, false, Endian::Little, "pixel_data_offset", settings)
        }),
        Box::new(|stream, addr, settings| {
            let n = primitive::integer(stream, addr, 32, false, Endian::Little, "dib_header_size", settings)?;
            if n.value().as_int() != Some(40) {
                return Err(FormatError::Invalid {
                    reason: "only the 40-byte BITMAPINFOHEADER is supported".to_owned(),
                }
                .into());
            }
            Ok(n)
        }),
        Box::new(|stream, addr, settings| {
            primitive::integer(stream, addr, 32, true, Endian::Little, "width", settings)
        }),
        Box::new(|stream, addr, settings| {
            primitive::integer(stream, addr, 32, true, Endian::Little, "height", settings)
        }),
        Box::new(|stream, addr, settings| {
            primitive::integer(stream, addr, 16, false, Endian::Little, "planes", settings)
        }),
        Box::new(|stream, addr, settings| {
            primitive::integer(stream, addr, 16, false, Endian::Little, "bit_count", settings)
        }),
        Box::new(|stream, addr, settings| {
            primitive::integer(stream, addr, 32, false, Endian::Little, "compression", settings)
        }),
        Box::new(|stream, addr, settings| {
            primitive::integer(stream, addr, 32, false, Endian::Little, "image_size", settings)
        }),
        Box::new(|stream, addr, settings| {
            primitive::integer(stream, addr, 32, true, Endian::Little, "x_ppm", settings)
        }),
        Box::new(|stream, addr, settings| {
            primitive::integer(stream, addr, 32, true, Endian::Little, "y_ppm", settings)
        }),
        Box::new(|stream, addr, settings| {
            primitive::integer(stream, addr, 32, false, Endian::Little, "colors_used", settings)
        }),
        Box::new(|stream, addr, settings| {
            primitive::integer(stream, addr, 32, false, Endian::Little, "colors_important", settings)
        }),
    ]
}
