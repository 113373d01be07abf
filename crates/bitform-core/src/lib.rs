//! A binary-format parsing engine: a bit-addressed stream reader, lazily
//! produced field trees, a slash-separated path resolver, and a static
//! parser registry.
//!
//! Individual format parsers live in the `bitform-formats` crate; this
//! crate is the engine they're built on (spec §1 scope: the framework,
//! not the formats).

pub mod display;
pub mod endian;
pub mod error;
pub mod field;
pub mod fieldset;
pub mod parser;
pub mod path;
pub mod registry;
pub mod settings;
pub mod stream;
pub mod value;

pub use endian::Endian;
pub use error::{Error, FieldError, FormatError, PathError, Result, StreamError};
pub use field::{primitive, DisplayKind, FieldMeta, LeafField};
pub use fieldset::{FieldGenerator, FieldSet, FnGenerator, GenCtx, Node};
pub use parser::{root_generator, MagicSignature, Parser, Tags};
pub use registry::{ParserFactory, Registration, Registry};
pub use settings::Settings;
pub use stream::{Charset, InputStream, StringMode};
pub use value::Value;
