//! C6 — a static registry of parser constructors (spec §4.6). No runtime
//! reflection: each entry is a tags reference plus a function pointer that
//! builds a [`Parser`] bound to a stream. Candidates are tried in
//! insertion order; the first whose tags quick-match and whose
//! `validate()` accepts wins.

use crate::endian::Endian;
use crate::error::{Error, FormatError};
use crate::parser::{Parser, Tags};
use crate::settings::Settings;
use crate::stream::InputStream;
use std::rc::Rc;

/// Builds a [`Parser`] for a specific format over an already-open stream.
pub type ParserFactory = fn(Rc<InputStream>, Endian, Settings) -> Parser;

/// One registered format: its identity plus how to instantiate it.
#[derive(Clone, Copy)]
pub struct Registration {
    pub tags: &'static Tags,
    pub factory: ParserFactory,
}

/// An ordered collection of format registrations. Built once per
/// application (typically `const`/`static`), then reused across files.
pub struct Registry {
    entries: Vec<Registration>,
}

impl Registry {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn register(&mut self, tags: &'static Tags, factory: ParserFactory) -> &mut Self {
        self.entries.push(Registration { tags, factory });
        self
    }

    pub fn entries(&self) -> &[Registration] {
        &self.entries
    }

    /// A hint (typically a file extension, without the dot) moves matching
    /// candidates to the front, saving a redundant `quick_match` scan when
    /// the caller already has a good guess (spec §4.6 "hint-based
    /// ordering"). Ties and the rest keep their registration order.
    fn ordered_candidates(&self, hint: Option<&str>) -> Vec<Registration> {
        let Some(hint) = hint else {
            return self.entries.clone();
        };
        let hint = hint.trim_start_matches('.');
        let (mut matching, mut rest): (Vec<_>, Vec<_>) = self
            .entries
            .iter()
            .copied()
            .partition(|reg| reg.tags.file_extensions.iter().any(|ext| *ext == hint));
        matching.append(&mut rest);
        matching
    }

    /// Finds and constructs the first parser whose tags quick-match the
    /// stream and whose `validate()` returns `true`. `hint` is an optional
    /// file extension used only to reorder candidates, never to skip
    /// `validate()`. A candidate whose `validate()` errors (format-invalid,
    /// or a stream error from a fixed-layout read before any field set can
    /// recover) is treated the same as a `false` result: try the next
    /// candidate rather than aborting identification.
    pub fn identify(
        &self,
        stream: Rc<InputStream>,
        endian: Endian,
        settings: Settings,
        hint: Option<&str>,
    ) -> Result<Parser, Error> {
        for reg in self.ordered_candidates(hint) {
            if !reg.tags.quick_match(&stream) {
                continue;
            }
            let parser = (reg.factory)(Rc::clone(&stream), endian, settings);
            if matches!(parser.validate(), Ok(true)) {
                return Ok(parser);
            }
        }
        Err(FormatError::NoParser.into())
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fieldset::{FnGenerator, GenCtx};
    use crate::parser::{root_generator, MagicSignature};
    use crate::stream::{Charset, InputStream};

    static GIF_TAGS: Tags = Tags {
        id: "gif",
        category: "image",
        file_extensions: &["gif"],
        mime_types: &["image/gif"],
        magic: &[MagicSignature {
            offset_bits: 0,
            bytes: b"GIF8",
        }],
        min_size_bytes: 6,
        description: "fixture GIF-like format",
    };

    static FALLBACK_TAGS: Tags = Tags {
        id: "fallback",
        category: "test",
        file_extensions: &[],
        mime_types: &[],
        magic: &[],
        min_size_bytes: 0,
        description: "matches anything",
    };

    fn make_gif(stream: Rc<InputStream>, endian: Endian, settings: Settings) -> Parser {
        Parser::new(
            &GIF_TAGS,
            stream,
            endian,
            settings,
            root_generator(|ctx: &GenCtx| {
                if ctx.addr() > 0 {
                    return Ok(None);
                }
                Ok(Some(ctx.string(4, Charset::Ascii, None, "magic")?))
            }),
        )
    }

    fn make_fallback(stream: Rc<InputStream>, endian: Endian, settings: Settings) -> Parser {
        Parser::new(
            &FALLBACK_TAGS,
            stream,
            endian,
            settings,
            root_generator(|ctx: &GenCtx| {
                if ctx.addr() >= ctx.stream().total_bits() {
                    return Ok(None);
                }
                Ok(Some(ctx.raw_bytes(1, "byte[]")?))
            }),
        )
    }

    fn registry() -> Registry {
        let mut r = Registry::new();
        r.register(&GIF_TAGS, make_gif);
        r.register(&FALLBACK_TAGS, make_fallback);
        r
    }

    #[test]
    fn identifies_by_magic() {
        let stream = Rc::new(InputStream::from_bytes(&b"GIF89a"[..]));
        let p = registry()
            .identify(stream, Endian::Big, Settings::default(), None)
            .unwrap();
        assert_eq!(p.tags().id, "gif");
    }

    #[test]
    fn falls_back_when_no_magic_matches() {
        let stream = Rc::new(InputStream::from_bytes(&b"random"[..]));
        let p = registry()
            .identify(stream, Endian::Big, Settings::default(), None)
            .unwrap();
        assert_eq!(p.tags().id, "fallback");
    }

    #[test]
    fn hint_reorders_but_does_not_bypass_validate() {
        let stream = Rc::new(InputStream::from_bytes(&b"GIF89a"[..]));
        let p = registry()
            .identify(stream, Endian::Big, Settings::default(), Some("gif"))
            .unwrap();
        assert_eq!(p.tags().id, "gif");
    }

    #[test]
    fn no_parser_matches_too_short_input() {
        let mut r = Registry::new();
        r.register(&GIF_TAGS, make_gif);
        let stream = Rc::new(InputStream::from_bytes(&b"no"[..]));
        let err = r
            .identify(stream, Endian::Big, Settings::default(), None)
            .unwrap_err();
        assert!(matches!(err, Error::Format(FormatError::NoParser)));
    }
}
