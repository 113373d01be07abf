//! Process-wide, read-mostly settings (spec §5: "no global state is
//! required by the core"). Callers build one [`Settings`] and thread it
//! explicitly to whatever needs it (display rendering, mainly); the engine
//! never reaches for a global singleton.

/// Options that influence display rendering but never decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    /// Maximum number of bytes a [`crate::primitive::RawBytes`] display will
    /// render before truncating with an indicator.
    pub max_byte_length: usize,
    /// Suppress non-essential warnings when rendering/consuming the tree.
    pub quiet: bool,
    /// Whether display strings should prefer localized text. The core ships
    /// no translations; this flag is carried for embedders that do.
    pub use_i18n: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_byte_length: 64,
            quiet: false,
            use_i18n: false,
        }
    }
}
