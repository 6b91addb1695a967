//! Language identification.
//!
//! - [`LanguageTag`] / [`LanguagePair`]: normalized tags and activation pairs
//! - [`LanguageRecognizer`]: text sample → dominant language
//! - [`LocaleProvider`]: the host's display language

// ============================================================================
// Submodules
// ============================================================================

/// Host locale providers.
pub mod locale;

/// Text language recognizer.
pub mod recognizer;

/// Language tags and pairs.
pub mod tag;

// ============================================================================
// Re-exports
// ============================================================================

pub use locale::{FixedLocale, LocaleProvider, SystemLocale};
pub use recognizer::{HeuristicRecognizer, LanguageRecognizer};
pub use tag::{LanguagePair, LanguageTag};
