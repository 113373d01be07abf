//! ISO 9660-specific error wrapper; see [`crate::gzip::error`] for the rationale.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Iso9660Error {
    #[error(transparent)]
    Core(#[from] bitform_core::error::Error),
}
