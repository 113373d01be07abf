//! C4 — the top-level parser abstraction (spec §4.4): format identity
//! (tags), a root field set bound to a stream, and a `validate()` gate the
//! registry (C6) uses to pick a parser for unknown input.

use crate::endian::Endian;
use crate::error::Error;
use crate::fieldset::{FieldGenerator, FieldSet, GenCtx, Node};
use crate::path;
use crate::settings::Settings;
use crate::stream::InputStream;
use std::cell::RefCell;
use std::rc::Rc;

/// A format's identity as computed once enough of the stream has been read
/// to know better than `Tags`' static defaults (spec §4.4's
/// `create_mime_type`/`create_description` hooks) — e.g. an Ogg page whose
/// first packet is a Theora identification header changes the container's
/// effective MIME type and description.
#[derive(Debug, Clone, Copy)]
pub struct DynamicIdentity {
    pub mime_type: &'static str,
    pub description: &'static str,
}

/// A magic byte sequence a format may be recognized by, at a given bit
/// offset (most formats check offset 0, some — e.g. ISO 9660 — check a
/// fixed offset past a reserved area).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MagicSignature {
    pub offset_bits: u64,
    pub bytes: &'static [u8],
}

/// Static identity of a format (spec §4.4): what it's called, what files
/// it claims, and the cheapest signature check before a full `validate()`.
#[derive(Debug, Clone)]
pub struct Tags {
    pub id: &'static str,
    pub category: &'static str,
    pub file_extensions: &'static [&'static str],
    pub mime_types: &'static [&'static str],
    pub magic: &'static [MagicSignature],
    pub min_size_bytes: u64,
    pub description: &'static str,
}

impl Tags {
    /// Cheap pre-filter: does `stream` at least carry every magic
    /// signature this format declares, and is it long enough? A `false`
    /// result proves this is not the right parser; a `true` result is
    /// necessary but not sufficient — `validate()` makes the final call.
    pub fn quick_match(&self, stream: &InputStream) -> bool {
        if stream.total_bytes() < self.min_size_bytes {
            return false;
        }
        self.magic.iter().all(|sig| {
            stream
                .read_bytes(sig.offset_bits, sig.bytes.len() as u64)
                .is_ok_and(|bytes| bytes.as_ref() == sig.bytes)
        })
    }
}

/// A constructed parser instance: a format's tags, bound to a stream, with
/// its root field set ready to be driven lazily.
pub struct Parser {
    tags: &'static Tags,
    root: Rc<FieldSet>,
    settings: Settings,
    dynamic: Rc<RefCell<Option<DynamicIdentity>>>,
}

impl std::fmt::Debug for Parser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parser")
            .field("id", &self.tags.id)
            .field("root", &self.root)
            .finish()
    }
}

impl Parser {
    /// Builds a parser rooted at `generator`, with the whole stream as the
    /// root field set's implicit extent (no explicit size — it runs until
    /// the generator is exhausted).
    pub fn new(
        tags: &'static Tags,
        stream: Rc<InputStream>,
        endian: Endian,
        settings: Settings,
        generator: Box<dyn FieldGenerator>,
    ) -> Self {
        Self::new_with_dynamic_identity(tags, stream, endian, settings, generator, Rc::new(RefCell::new(None)))
    }

    /// Same as [`Parser::new`], but `dynamic` is shared with the generator
    /// so it can override [`Parser::mime_type`]/[`Parser::description`]
    /// once it has read enough of the stream to know better.
    pub fn new_with_dynamic_identity(
        tags: &'static Tags,
        stream: Rc<InputStream>,
        endian: Endian,
        settings: Settings,
        generator: Box<dyn FieldGenerator>,
        dynamic: Rc<RefCell<Option<DynamicIdentity>>>,
    ) -> Self {
        let root = FieldSet::new(tags.id.to_owned(), 0, stream, endian, settings, None, generator);
        Self { tags, root, settings, dynamic }
    }

    pub fn tags(&self) -> &'static Tags {
        self.tags
    }

    /// The format's MIME type: `Tags::mime_types`' first entry, unless the
    /// generator has overridden it via a shared [`DynamicIdentity`].
    pub fn mime_type(&self) -> &'static str {
        self.dynamic
            .borrow()
            .as_ref()
            .map_or_else(|| self.tags.mime_types.first().copied().unwrap_or(""), |d| d.mime_type)
    }

    /// The format's human description, similarly overridable.
    pub fn description(&self) -> &'static str {
        self.dynamic.borrow().as_ref().map_or(self.tags.description, |d| d.description)
    }

    pub fn settings(&self) -> Settings {
        self.settings
    }

    pub fn root(&self) -> &Rc<FieldSet> {
        &self.root
    }

    /// Resolves `path` against the root (spec §4.5). Relative paths are
    /// resolved as if from the root too, since a freshly built parser has
    /// no other starting point.
    pub fn resolve(&self, path_expr: &str) -> Result<Node, Error> {
        path::resolve(&self.root, &self.root, path_expr)
    }

    /// Drives the root field set to completion and reports whether the
    /// format-specific checks this parser performs beyond a bare magic
    /// match hold — e.g. a checksum, a size field matching the stream's
    /// actual length, or a nested signature a step further into the file.
    /// The default is "the root field set completes without an
    /// unrecoverable error"; formats with stronger checks override this
    /// by building it into their generator and inspecting `self.root()`
    /// after `drive_to_completion`.
    pub fn validate(&self) -> Result<bool, Error> {
        self.root.drive_to_completion()?;
        Ok(true)
    }
}

/// Convenience for authoring a parser's root generator directly from a
/// closure, mirroring [`crate::fieldset::FnGenerator`].
pub fn root_generator<F>(f: F) -> Box<dyn FieldGenerator>
where
    F: FnMut(&GenCtx) -> Result<Option<Node>, Error> + 'static,
{
    Box::new(crate::fieldset::FnGenerator::new(f))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fieldset::FnGenerator;
    use crate::stream::{Charset, InputStream};

    static TAGS: Tags = Tags {
        id: "test-format",
        category: "test",
        file_extensions: &["tst"],
        mime_types: &["application/x-test"],
        magic: &[],
        min_size_bytes: 4,
        description: "fixture format for parser tests",
    };

    fn make_parser(data: &'static [u8]) -> Parser {
        let stream = Rc::new(InputStream::from_bytes(data));
        Parser::new(
            &TAGS,
            stream,
            Endian::Big,
            Settings::default(),
            root_generator(move |ctx: &GenCtx| {
                if ctx.addr() >= ctx.stream().total_bits() {
                    return Ok(None);
                }
                Ok(Some(ctx.string(4, Charset::Ascii, None, "chunk[]")?))
            }),
        )
    }

    #[test]
    fn validate_drives_root_to_completion() {
        let p = make_parser(b"ABCDEFGH");
        assert!(p.validate().unwrap());
        assert_eq!(p.root().materialized_len(), 2);
    }

    #[test]
    fn resolve_through_parser() {
        let p = make_parser(b"ABCDEFGH");
        let node = p.resolve("/chunk[1]").unwrap();
        assert_eq!(node.value().as_text(), Some("EFGH"));
    }
}
