//! C2 — primitive (leaf) field types, plus the common [`Node`] abstraction
//! over leaves and field sets that the rest of the engine navigates.
//!
//! Each primitive constructor in [`primitive`] is a pure function of the
//! stream bytes, address, size and endianness (spec §3 invariant 3):
//! construction reads the stream exactly once and caches the result.

use crate::display;
use crate::endian::Endian;
use crate::error::{Error, FieldError};
use crate::settings::Settings;
use crate::stream::{Charset, InputStream, StringMode};
use crate::value::Value;
use std::cell::OnceCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Address, size and descriptive metadata shared by every field, leaf or
/// composite (spec §3).
#[derive(Debug, Clone)]
pub struct FieldMeta {
    pub name: String,
    pub addr: u64,
    pub size_bits: u64,
    pub description: String,
}

/// How a leaf's `human_display` is derived from its raw value. Kept as a
/// closed enum (rather than an arbitrary closure) so every field stays
/// `Debug` and the set of handlers matches spec §4.7 exactly.
#[derive(Debug, Clone)]
pub enum DisplayKind {
    /// `human_display` equals `raw_display`.
    Default,
    /// One of the built-in pure handler functions (timestamps, file size,
    /// bit rate, frequency).
    Handler(fn(&Value) -> String),
    /// Lower-case zero-padded hexadecimal, sized to the field's own bit
    /// width.
    Hexadecimal,
    /// Value-to-label mapping; values with no entry fall back to
    /// `raw_display`.
    EnumMap(Rc<HashMap<i128, String>>),
}

/// A leaf field: a primitive whose value and displays are fixed once
/// constructed.
#[derive(Debug, Clone)]
pub struct LeafField {
    meta: FieldMeta,
    value: Value,
    display: DisplayKind,
    settings: Settings,
    /// Non-fatal issues noticed while decoding (e.g. a `NullBits` field
    /// that was not all-zero).
    warnings: Vec<String>,
    raw_cache: Rc<OnceCell<String>>,
    human_cache: Rc<OnceCell<String>>,
}

impl LeafField {
    fn new(meta: FieldMeta, value: Value, settings: Settings) -> Self {
        Self {
            meta,
            value,
            display: DisplayKind::Default,
            settings,
            warnings: Vec::new(),
            raw_cache: Rc::new(OnceCell::new()),
            human_cache: Rc::new(OnceCell::new()),
        }
    }

    pub fn with_display(mut self, display: DisplayKind) -> Self {
        self.display = display;
        self
    }

    fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    pub fn meta(&self) -> &FieldMeta {
        &self.meta
    }

    /// Used by a containing field set to apply array auto-numbering once a
    /// leaf is yielded (spec §4.3 naming rules).
    pub(crate) fn meta_mut(&mut self) -> &mut FieldMeta {
        &mut self.meta
    }

    pub fn name(&self) -> &str {
        &self.meta.name
    }

    pub fn addr(&self) -> u64 {
        self.meta.addr
    }

    pub fn size_bits(&self) -> u64 {
        self.meta.size_bits
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Literal rendering: integers as decimal, bytes as `\xNN` escapes,
    /// strings quoted (spec §4.7).
    pub fn raw_display(&self) -> &str {
        self.raw_cache
            .get_or_init(|| display::raw_display(&self.value, self.settings.max_byte_length))
    }

    /// `raw_display` unless a handler is attached (spec §4.7).
    pub fn human_display(&self) -> &str {
        self.human_cache.get_or_init(|| match &self.display {
            DisplayKind::Default => self.raw_display().to_owned(),
            DisplayKind::Handler(f) => f(&self.value),
            DisplayKind::Hexadecimal => {
                let v = self.value.as_int().unwrap_or(0);
                #[allow(clippy::cast_sign_loss)]
                display::hexadecimal(v as u64, self.meta.size_bits as u32)
            }
            DisplayKind::EnumMap(map) => {
                let v = self.value.as_int().unwrap_or(0);
                map.get(&v).cloned().unwrap_or_else(|| self.raw_display().to_owned())
            }
        })
    }
}

/// Built-in C7 handler adapters (plain `fn` items, so they coerce to the
/// `fn(&Value) -> String` pointer type [`DisplayKind::Handler`] expects).
pub mod handlers {
    use super::{display, Value};

    pub fn windows64_timestamp(v: &Value) -> String {
        display::timestamp_win64(v.as_int().unwrap_or(0))
    }

    pub fn unix_timestamp(v: &Value) -> String {
        display::timestamp_unix(v.as_int().unwrap_or(0))
    }

    pub fn mac_timestamp(v: &Value) -> String {
        display::timestamp_mac(v.as_int().unwrap_or(0))
    }

    pub fn msdos_datetime(v: &Value) -> String {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        display::msdos_datetime(v.as_int().unwrap_or(0) as u32)
    }

    pub fn human_filesize(v: &Value) -> String {
        #[allow(clippy::cast_sign_loss)]
        display::human_filesize(v.as_int().unwrap_or(0) as u64)
    }

    pub fn human_bitrate(v: &Value) -> String {
        #[allow(clippy::cast_sign_loss)]
        display::human_bitrate(v.as_int().unwrap_or(0) as u64)
    }

    pub fn human_frequency(v: &Value) -> String {
        #[allow(clippy::cast_sign_loss)]
        display::human_frequency(v.as_int().unwrap_or(0) as u64)
    }
}

/// Primitive field constructors (spec §4.2). Each reads the stream exactly
/// once at construction time.
pub mod primitive {
    use super::{
        Charset, DisplayKind, Endian, Error, FieldError, FieldMeta, HashMap, InputStream,
        LeafField, Rc, Settings, StringMode, Value,
    };

    fn meta(name: impl Into<String>, addr: u64, size_bits: u64, description: &str) -> FieldMeta {
        FieldMeta {
            name: name.into(),
            addr,
            size_bits,
            description: description.to_owned(),
        }
    }

    /// A single bit, as a boolean.
    pub fn bit(
        stream: &InputStream,
        addr: u64,
        name: impl Into<String>,
        settings: Settings,
    ) -> Result<LeafField, Error> {
        let v = stream.read_bits(addr, 1, Endian::Big)?;
        Ok(LeafField::new(
            meta(name, addr, 1, "bit"),
            Value::Bool(v != 0),
            settings,
        ))
    }

    /// `n` bits (`1..=63`) as an unsigned integer.
    pub fn bits(
        stream: &InputStream,
        addr: u64,
        n: u8,
        name: impl Into<String>,
        settings: Settings,
    ) -> Result<LeafField, Error> {
        if !(1..=63).contains(&n) {
            return Err(FieldError::Construction {
                reason: format!("Bits(n) requires 1..=63, got {n}"),
            }
            .into());
        }
        let v = stream.read_bits(addr, n, Endian::Big)?;
        Ok(LeafField::new(
            meta(name, addr, u64::from(n), "bitfield"),
            Value::Int(i128::from(v)),
            settings,
        ))
    }

    /// `UIntN`/`IntN`: `n` in `{8,16,24,32,64}`.
    pub fn integer(
        stream: &InputStream,
        addr: u64,
        n: u8,
        signed: bool,
        endian: Endian,
        name: impl Into<String>,
        settings: Settings,
    ) -> Result<LeafField, Error> {
        if ![8, 16, 24, 32, 64].contains(&n) {
            return Err(FieldError::Construction {
                reason: format!("integer size must be one of 8/16/24/32/64, got {n}"),
            }
            .into());
        }
        let v = stream.read_integer(addr, signed, n, endian)?;
        let kind = if signed { "int" } else { "uint" };
        Ok(LeafField::new(
            meta(name, addr, u64::from(n), &format!("{kind}{n}")),
            Value::Int(v),
            settings,
        ))
    }

    /// `n` bits that must be zero; a warning is attached if not.
    pub fn null_bits(
        stream: &InputStream,
        addr: u64,
        n: u8,
        name: impl Into<String>,
        settings: Settings,
    ) -> Result<LeafField, Error> {
        let v = stream.read_bits(addr, n, Endian::Big)?;
        let name = name.into();
        let mut field = LeafField::new(
            meta(name.clone(), addr, u64::from(n), "padding"),
            Value::Int(i128::from(v)),
            settings,
        );
        if v != 0 {
            field = field.with_warning(format!("{name}: non-zero padding bits ({v:#x})"));
        }
        Ok(field)
    }

    /// `n` bytes that must be zero; a warning is attached if not.
    pub fn null_bytes(
        stream: &InputStream,
        addr: u64,
        n: u64,
        name: impl Into<String>,
        settings: Settings,
    ) -> Result<LeafField, Error> {
        let bytes = stream.read_bytes(addr, n)?;
        let name = name.into();
        let non_zero = bytes.iter().any(|b| *b != 0);
        let mut field = LeafField::new(
            meta(name.clone(), addr, n * 8, "padding"),
            Value::Bytes(bytes),
            settings,
        );
        if non_zero {
            field = field.with_warning(format!("{name}: non-zero padding bytes"));
        }
        Ok(field)
    }

    /// `n` raw bytes.
    pub fn raw_bytes(
        stream: &InputStream,
        addr: u64,
        n: u64,
        name: impl Into<String>,
        settings: Settings,
    ) -> Result<LeafField, Error> {
        let bytes = stream.read_bytes(addr, n)?;
        Ok(LeafField::new(
            meta(name, addr, n * 8, "raw bytes"),
            Value::Bytes(bytes),
            settings,
        ))
    }

    /// Fixed-length string, `length` bytes, optionally stripped of `strip`
    /// characters at both ends.
    pub fn string(
        stream: &InputStream,
        addr: u64,
        length: u64,
        charset: Charset,
        strip: Option<&str>,
        name: impl Into<String>,
        settings: Settings,
    ) -> Result<LeafField, Error> {
        let r = stream.read_string(addr, charset, StringMode::Fixed(length), strip)?;
        Ok(LeafField::new(
            meta(name, addr, r.size_bits, "string"),
            Value::Text(r.text),
            settings,
        ))
    }

    /// NUL-terminated string; the terminator is consumed but not part of
    /// the value.
    pub fn cstring(
        stream: &InputStream,
        addr: u64,
        charset: Charset,
        name: impl Into<String>,
        settings: Settings,
    ) -> Result<LeafField, Error> {
        let r = stream.read_string(addr, charset, StringMode::NulTerminated, None)?;
        Ok(LeafField::new(
            meta(name, addr, r.size_bits, "cstring"),
            Value::Text(r.text),
            settings,
        ))
    }

    /// Length-prefixed ("Pascal") string; `width` is `8`, `16` or `32`.
    pub fn pascal_string(
        stream: &InputStream,
        addr: u64,
        width: u8,
        charset: Charset,
        endian: Endian,
        name: impl Into<String>,
        settings: Settings,
    ) -> Result<LeafField, Error> {
        if ![8, 16, 32].contains(&width) {
            return Err(FieldError::Construction {
                reason: format!("pascal string prefix width must be 8/16/32, got {width}"),
            }
            .into());
        }
        let r = stream.read_string(
            addr,
            charset,
            StringMode::LengthPrefixed { width, endian },
            None,
        )?;
        Ok(LeafField::new(
            meta(name, addr, r.size_bits, "pascal string"),
            Value::Text(r.text),
            settings,
        ))
    }

    /// Wraps `inner` with a value→label mapping; the value itself is
    /// unchanged, only `human_display` is affected (spec §4.2).
    pub fn enum_field(inner: LeafField, mapping: HashMap<i128, String>) -> LeafField {
        inner.with_display(DisplayKind::EnumMap(Rc::new(mapping)))
    }

    /// One entry of a [`static_field_set`] descriptor list: builds one leaf
    /// at a given address, reading whatever parameters it already closed
    /// over (size, charset, endianness, ...). The descriptor reports its own
    /// size via the returned field, so the caller needs no separate layout
    /// table (spec §4.2 `StaticFieldSet`, grounded in
    /// `hachoir_parser/common/msdos.py`'s `MSDOSFileAttr(StaticFieldSet)`, a
    /// fixed tuple of `(Klass, name, *args)` descriptors).
    pub type StaticFieldDescriptor = Box<dyn Fn(&InputStream, u64, Settings) -> Result<LeafField, Error>>;

    /// Builds each descriptor in `descriptors` in order, placing it
    /// immediately after the previous one ends. Unlike the closure-backed
    /// [`crate::fieldset::FieldGenerator`] variant, the shape here is fixed
    /// at the call site rather than computed lazily — the right tool when a
    /// composite's fields and their order never depend on stream content
    /// (spec §4.3, "fixed tuple of descriptors" composite).
    pub fn static_field_set(
        stream: &InputStream,
        addr: u64,
        settings: Settings,
        descriptors: &[StaticFieldDescriptor],
    ) -> Result<(Vec<LeafField>, u64), Error> {
        let mut fields = Vec::with_capacity(descriptors.len());
        let mut cursor = addr;
        for descriptor in descriptors {
            let field = descriptor(stream, cursor, settings)?;
            cursor += field.size_bits();
            fields.push(field);
        }
        Ok((fields, cursor - addr))
    }
}
