//! Demonstration format parsers built on `bitform-core`.
//!
//! Each submodule implements one (deliberately partial) binary format,
//! showing how the core field-tree engine's pieces — lazy field sets,
//! array auto-numbering, display handlers, path resolution and format
//! validation — come together for a real wire format.

pub mod bmp;
pub mod gzip;
pub mod iso9660;
pub mod ogg;
pub mod tar;

use bitform_core::registry::Registry;

/// A [`Registry`] with every format in this crate registered, in the
/// order sniffing tends to be cheapest: fixed-offset magic first
/// (gzip, BMP, Ogg), then the larger fixed-offset ISO 9660 signature,
/// then TAR, whose `ustar` magic sits deep enough in the first block
/// that it is the most expensive one to quick-match.
pub fn default_registry() -> Registry {
    let mut registry = Registry::new();
    registry
        .register(&gzip::TAGS, gzip::make_parser)
        .register(&bmp::TAGS, bmp::make_parser)
        .register(&ogg::TAGS, ogg::make_parser)
        .register(&iso9660::TAGS, iso9660::make_parser)
        .register(&tar::TAGS, tar::make_parser);
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitform_core::endian::Endian;
    use bitform_core::settings::Settings;
    use bitform_core::stream::InputStream;
    use std::rc::Rc;

    #[test]
    fn identifies_gzip_by_magic() {
        let mut data = vec![0x1f, 0x8b, 0x08, 0x00];
        data.extend_from_slice(&0u32.to_le_bytes());
        data.push(0);
        data.push(0xff);
        data.extend_from_slice(&[0u8; 8]);
        let stream = Rc::new(InputStream::from_bytes(data));
        let registry = default_registry();
        let parser = registry
            .identify(stream, Endian::Little, Settings::default(), None)
            .unwrap();
        assert_eq!(parser.tags().id, "gzip");
    }
}
