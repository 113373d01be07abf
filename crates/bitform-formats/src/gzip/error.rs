//! Gzip-specific error wrapper, following the crate's per-format
//! error-module convention even though every failure mode here is already
//! one of [`bitform_core::error::Error`]'s variants.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GzipError {
    #[error(transparent)]
    Core(#[from] bitform_core::error::Error),
}
