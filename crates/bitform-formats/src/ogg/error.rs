//! Ogg-specific error wrapper; see [`crate::gzip::error`] for the rationale.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OggError {
    #[error(transparent)]
    Core(#[from] bitform_core::error::Error),
}
