//! Language tags and language pairs.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use unic_langid::LanguageIdentifier;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Language subtag of the "undetermined" sentinel.
const UNDETERMINED: &str = "und";

/// Longest language subtag accepted; ISO 639 codes only.
const MAX_LANGUAGE_LEN: usize = 3;

// ============================================================================
// LanguageTag
// ============================================================================

/// A canonical language identifier such as `en`, `fr`, or `pt-BR`.
///
/// Parsing goes through [`LanguageIdentifier`]: `_` is accepted as a
/// separator, the language subtag is lowercased, scripts are title-cased
/// and regions uppercased (`zh_hant_tw` → `zh-Hant-TW`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LanguageTag {
    id: LanguageIdentifier,
    canonical: String,
}

impl LanguageTag {
    /// Parses and canonicalizes a tag. Returns `None` if unusable.
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }

        let id: LanguageIdentifier = input.parse().ok()?;
        if id.language.as_str().len() > MAX_LANGUAGE_LEN {
            return None;
        }
        Some(Self::from_identifier(id))
    }

    fn from_identifier(id: LanguageIdentifier) -> Self {
        let canonical = id.to_string();
        Self { id, canonical }
    }

    /// The "undetermined" sentinel (`und`).
    #[inline]
    #[must_use]
    pub fn undetermined() -> Self {
        Self::from_identifier(LanguageIdentifier::default())
    }

    /// Returns `true` for the "undetermined" sentinel.
    #[inline]
    #[must_use]
    pub fn is_undetermined(&self) -> bool {
        self.primary() == UNDETERMINED
    }

    /// Returns the language subtag (`pt` for `pt-BR`).
    #[inline]
    #[must_use]
    pub fn primary(&self) -> &str {
        self.id.language.as_str()
    }

    /// Returns the canonical tag.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.canonical
    }

    /// Returns the underlying identifier.
    #[inline]
    #[must_use]
    pub const fn identifier(&self) -> &LanguageIdentifier {
        &self.id
    }

    /// Returns `true` if both tags name the same language, ignoring
    /// script and region.
    #[inline]
    #[must_use]
    pub fn same_language(&self, other: &Self) -> bool {
        self.id.language == other.id.language
    }
}

impl From<LanguageIdentifier> for LanguageTag {
    fn from(id: LanguageIdentifier) -> Self {
        Self::from_identifier(id)
    }
}

impl FromStr for LanguageTag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| Error::invalid_language(s))
    }
}

impl TryFrom<String> for LanguageTag {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<LanguageTag> for String {
    fn from(tag: LanguageTag) -> Self {
        tag.canonical
    }
}

impl AsRef<str> for LanguageTag {
    fn as_ref(&self) -> &str {
        &self.canonical
    }
}

impl fmt::Display for LanguageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}

// ============================================================================
// LanguagePair
// ============================================================================

/// The `(source, target)` arguments of one activation.
///
/// `source` is the host's display language and `target` the language the
/// page was found to be written in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LanguagePair {
    /// Host display language.
    pub source: LanguageTag,
    /// Guessed page language.
    pub target: LanguageTag,
}

impl LanguagePair {
    /// Creates a new pair.
    #[inline]
    #[must_use]
    pub fn new(source: LanguageTag, target: LanguageTag) -> Self {
        Self { source, target }
    }

    /// Returns `true` if both sides name the same language.
    #[inline]
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.source.same_language(&self.target)
    }
}

impl fmt::Display for LanguagePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.target)
    }
}

// ============================================================================
// Tests
// ============================================================================
