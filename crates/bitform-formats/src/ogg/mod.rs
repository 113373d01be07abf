//! Ogg container: one page's fixed header, segment table and the data
//! chunks ("lacing") that table describes.
//!
//! ```text
//! Ogg page:
//! ├── capture_pattern: "OggS"
//! ├── version (1 byte)
//! ├── header_type (1 byte, flag bits)
//! ├── granule_position (8 bytes, little-endian)
//! ├── serial_number (4 bytes, little-endian)
//! ├── sequence_number (4 bytes, little-endian)
//! ├── checksum (4 bytes, little-endian)
//! ├── page_segments (1 byte): number of entries in segment_table
//! ├── segment_table (page_segments bytes): one size per chunk
//! └── chunk[] (one per segment_table entry, sized by that entry)
//! ```
//!
//! The 255-continuation rule (a lacing value of 255 means "this chunk
//! continues into the next table entry") is not implemented; each table
//! entry is treated as one complete chunk, which matches the common case
//! of small packets.

mod error;

pub use error::OggError;

use bitform_core::fieldset::{FieldGenerator, GenCtx, Node};
use bitform_core::parser::{root_generator, DynamicIdentity, MagicSignature, Parser, Tags};
use bitform_core::settings::Settings;
use bitform_core::stream::InputStream;
use bitform_core::{endian::Endian, error::Error, error::FormatError};
use std::cell::RefCell;
use std::rc::Rc;

/// A Theora identification header's packet type byte and magic (the
/// payload byte immediately following `type` starts with this).
const THEORA_IDENTIFICATION: (u8, &[u8]) = (0x80, b"theora");

pub static TAGS: Tags = Tags {
    id: "ogg",
    category: "container",
    file_extensions: &["ogg", "ogv", "oga"],
    mime_types: &["application/ogg"],
    magic: &[MagicSignature {
        offset_bits: 0,
        bytes: b"OggS",
    }],
    min_size_bytes: 27,
    description: "Ogg bitstream container (one page at a time)",
};

pub fn make_parser(stream: Rc<InputStream>, endian: Endian, settings: Settings) -> Parser {
    let dynamic = Rc::new(RefCell::new(None));
    let dynamic_for_gen = Rc::clone(&dynamic);
    let mut done = false;
    let generator = root_generator(move |ctx: &GenCtx| {
        if done || ctx.addr() >= ctx.stream().total_bits() {
            return Ok(None);
        }
        done = true;
        Ok(Some(ctx.field_set(
            "page[]",
            None,
            None,
            Box::new(PageGenerator::new(Rc::clone(&dynamic_for_gen))),
        )))
    });
    Parser::new_with_dynamic_identity(&TAGS, stream, endian, settings, generator, dynamic)
}

struct PageGenerator {
    state: PageState,
    dynamic: Rc<RefCell<Option<DynamicIdentity>>>,
}

impl PageGenerator {
    fn new(dynamic: Rc<RefCell<Option<DynamicIdentity>>>) -> Self {
        Self { state: PageState::CapturePattern, dynamic }
    }
}

enum PageState {
    CapturePattern,
    Version,
    HeaderType,
    GranulePosition,
    SerialNumber,
    SequenceNumber,
    Checksum,
    PageSegments,
    SegmentTable,
    Chunks { sizes: Vec<u8>, next: usize },
    Done,
}

impl FieldGenerator for PageGenerator {
    fn next(&mut self, ctx: &GenCtx) -> Result<Option<Node>, Error> {
        loop {
            match &mut self.state {
                PageState::CapturePattern => {
                    let n = ctx.raw_bytes(4, "capture_pattern")?;
                    if n.value().as_bytes().map(|b| b.as_ref()) != Some(&b"OggS"[..]) {
                        return Err(FormatError::Invalid {
                            reason: "bad Ogg capture pattern".to_owned(),
                        }
                        .into());
                    }
                    self.state = PageState::Version;
                    return Ok(Some(n));
                }
                PageState::Version => {
                    self.state = PageState::HeaderType;
                    return Ok(Some(ctx.uint_endian(8, Endian::Little, "version")?));
                }
                PageState::HeaderType => {
                    self.state = PageState::GranulePosition;
                    return Ok(Some(ctx.uint_endian(8, Endian::Little, "header_type")?));
                }
                PageState::GranulePosition => {
                    self.state = PageState::SerialNumber;
                    return Ok(Some(ctx.uint_endian(64, Endian::Little, "granule_position")?));
                }
                PageState::SerialNumber => {
                    self.state = PageState::SequenceNumber;
                    return Ok(Some(ctx.uint_endian(32, Endian::Little, "serial_number")?));
                }
                PageState::SequenceNumber => {
                    self.state = PageState::Checksum;
                    return Ok(Some(ctx.uint_endian(32, Endian::Little, "sequence_number")?));
                }
                PageState::Checksum => {
                    self.state = PageState::PageSegments;
                    return Ok(Some(ctx.uint_endian(32, Endian::Little, "checksum")?));
                }
                PageState::PageSegments => {
                    self.state = PageState::SegmentTable;
                    return Ok(Some(ctx.uint_endian(8, Endian::Little, "page_segments")?));
                }
                PageState::SegmentTable => {
                    let count = ctx
                        .sibling("page_segments")
                        .and_then(|v| v.as_int())
                        .unwrap_or(0) as u64;
                    let node = ctx.raw_bytes(count, "segment_table")?;
                    let sizes = node.value().as_bytes().map(|b| b.to_vec()).unwrap_or_default();
                    self.state = PageState::Chunks { sizes, next: 0 };
                    return Ok(Some(node));
                }
                PageState::Chunks { sizes, next } => {
                    if *next >= sizes.len() {
                        self.state = PageState::Done;
                        continue;
                    }
                    let size = u64::from(sizes[*next]);
                    let is_first_chunk = *next == 0;
                    *next += 1;
                    return Ok(Some(ctx.field_set(
                        "chunk[]",
                        None,
                        Some(size * 8),
                        Box::new(ChunkGenerator {
                            payload_bytes: size.saturating_sub(1),
                            yielded_type: false,
                            yielded_payload: false,
                            detect_theora: is_first_chunk,
                            dynamic: Rc::clone(&self.dynamic),
                        }),
                    )));
                }
                PageState::Done => return Ok(None),
            }
        }
    }
}

/// One lacing chunk, split into a `type` byte (the first byte of most Ogg
/// codec packets) and the remaining `payload`. The first chunk of the first
/// page also drives [`Parser::mime_type`]/[`Parser::description`]: if it is
/// a Theora identification header, the container's declared identity
/// switches from generic Ogg to Theora (spec §4.4's `create_mime_type`
/// example).
struct ChunkGenerator {
    payload_bytes: u64,
    yielded_type: bool,
    yielded_payload: bool,
    detect_theora: bool,
    dynamic: Rc<RefCell<Option<DynamicIdentity>>>,
}

impl FieldGenerator for ChunkGenerator {
    fn next(&mut self, ctx: &GenCtx) -> Result<Option<Node>, Error> {
        if !self.yielded_type {
            self.yielded_type = true;
            return Ok(Some(ctx.uint_endian(8, Endian::Little, "type")?));
        }
        if !self.yielded_payload {
            self.yielded_payload = true;
            let node = ctx.raw_bytes(self.payload_bytes, "payload")?;
            if self.detect_theora {
                let (type_byte, magic) = THEORA_IDENTIFICATION;
                let type_matches = ctx.sibling("type").and_then(|v| v.as_int()) == Some(i128::from(type_byte));
                let payload_matches = node
                    .value()
                    .as_bytes()
                    .is_some_and(|bytes| bytes.starts_with(magic));
                if type_matches && payload_matches {
                    *self.dynamic.borrow_mut() = Some(DynamicIdentity {
                        mime_type: "video/theora",
                        description: "Ogg bitstream container (Theora video)",
                    });
                }
            }
            return Ok(Some(node));
        }
        Ok(None)
    }
}
