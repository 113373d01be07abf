//! Error taxonomy for the field-tree engine.
//!
//! Every failure mode named in the component design has its own variant
//! group so callers can match on *why* without parsing message strings.
//! [`Error`] aggregates them; field sets translate [`StreamError`] and
//! [`FieldError`] into warnings and truncate rather than propagate them.
//! [`FormatError`] is never locally recovered: it always propagates out of
//! `advance()`, since it is the signal `Parser::validate()` and
//! `Registry::identify()` depend on to reject bad input (see
//! [`crate::fieldset`]).

use thiserror::Error;

/// Failures reading from the underlying [`crate::stream::InputStream`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StreamError {
    /// A read requested bits/bytes past the end of the stream.
    #[error("stream under-run: read of {len} bit(s) at address {addr} exceeds stream length {stream_len}")]
    UnderRun {
        /// Absolute bit address the read started at.
        addr: u64,
        /// Number of bits requested.
        len: u64,
        /// Total known length of the stream, in bits.
        stream_len: u64,
    },

    /// A byte-level read was attempted at a non-byte-aligned address.
    #[error("address {addr} is not byte-aligned")]
    Alignment {
        /// The offending bit address.
        addr: u64,
    },

    /// A string field's strict decode failed.
    #[error("failed to decode {charset} text at address {addr}")]
    Decode {
        /// Name of the charset that rejected the bytes.
        charset: &'static str,
        /// Absolute bit address of the string field.
        addr: u64,
    },
}

/// Failures constructing or sizing a field.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FieldError {
    /// A field was asked to have an invalid size (zero where non-zero is
    /// required, or larger than any primitive the engine supports).
    #[error("invalid field construction: {reason}")]
    Construction {
        /// Human-readable explanation.
        reason: String,
    },

    /// An enum field's mapping could not represent the decoded value.
    #[error("impossible enum mapping for value {value}")]
    ImpossibleEnumMapping {
        /// The value that had no mapping and no fallback.
        value: i128,
    },

    /// Producing the next child of a field set with an explicit size would
    /// exceed that size.
    #[error("child {name} would overflow field set of {limit_bits} bit(s)")]
    SizeOverflow {
        /// Name of the child that was about to be yielded.
        name: String,
        /// The field set's explicit size limit, in bits.
        limit_bits: u64,
    },
}

/// Failures resolving a [`crate::path`] expression.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    /// A path segment did not resolve to any child.
    #[error("field not found: {segment:?} in path {path:?}")]
    NotFound {
        /// The full path expression that was being resolved.
        path: String,
        /// The first segment that failed to resolve.
        segment: String,
    },

    /// A path descended through a leaf field as though it were a field set.
    #[error("path {path:?} descends into leaf field {segment:?}")]
    NotAFieldSet {
        /// The full path expression that was being resolved.
        path: String,
        /// The segment that named a leaf.
        segment: String,
    },
}

/// Failures specific to a parser's format contract.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// A parser's `validate()` rejected the input, or a nested magic/
    /// signature check failed.
    #[error("format invalid: {reason}")]
    Invalid {
        /// Human-readable reason, surfaced verbatim from `validate()`.
        reason: String,
    },

    /// The parser registry had no candidate whose tags matched the input
    /// and whose `validate()` returned true.
    #[error("no parser matched this input")]
    NoParser,
}

/// Top-level error type aggregating every failure kind the engine produces.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// See [`StreamError`].
    #[error(transparent)]
    Stream(#[from] StreamError),

    /// See [`FieldError`].
    #[error(transparent)]
    Field(#[from] FieldError),

    /// See [`PathError`].
    #[error(transparent)]
    Path(#[from] PathError),

    /// See [`FormatError`].
    #[error(transparent)]
    Format(#[from] FormatError),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
