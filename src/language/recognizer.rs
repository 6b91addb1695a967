//! Language recognition over page text.
//!
//! The recognizer accumulates the visible text of one or more samples and
//! names the dominant language with [`whatlang`]. Markup is stripped before
//! the text is kept, so raw page source can be fed in as-is.

// ============================================================================
// Imports
// ============================================================================

use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;
use whatlang::Lang;

use super::LanguageTag;

// ============================================================================
// Constants
// ============================================================================

/// Letters needed before any answer is given.
const MIN_LETTERS: usize = 8;

/// Visible text kept per document; later samples are ignored past this.
const MAX_TEXT_BYTES: usize = 64 * 1024;

/// `<script>` and `<style>` elements including their bodies.
static EMBEDDED_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>|<!--.*?-->")
        .unwrap_or_else(|e| unreachable!("static pattern: {e}"))
});

/// Tags and character entities.
static MARKUP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<[^>]*>|&#?[A-Za-z0-9]+;")
        .unwrap_or_else(|e| unreachable!("static pattern: {e}"))
});

/// Runs of whitespace left behind by stripped markup.
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").unwrap_or_else(|e| unreachable!("static pattern: {e}")));

// ============================================================================
// LanguageRecognizer
// ============================================================================

/// Detector that names the dominant language of accumulated text.
///
/// Samples accumulate until [`LanguageRecognizer::reset`]; a recognizer
/// must be reset before it is reused for another document.
pub trait LanguageRecognizer: Send {
    /// Clears all accumulated evidence.
    fn reset(&mut self);

    /// Adds a text sample to the evidence.
    fn process_sample(&mut self, text: &str);

    /// Returns the dominant language, or [`LanguageTag::undetermined`] when
    /// the evidence is insufficient or ambiguous.
    fn dominant_language(&self) -> LanguageTag;
}

// ============================================================================
// HeuristicRecognizer
// ============================================================================

/// [`LanguageRecognizer`] backed by `whatlang` trigram detection.
///
/// Only reliable detections are reported; anything else is `und`.
#[derive(Debug, Clone, Default)]
pub struct HeuristicRecognizer {
    /// Visible text of all samples, space separated.
    text: String,
    /// Alphabetic characters in `text`.
    letters: usize,
}

impl HeuristicRecognizer {
    /// Creates an empty recognizer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total letters counted so far.
    #[inline]
    #[must_use]
    pub fn letter_count(&self) -> usize {
        self.letters
    }

    /// Removes markup so only visible text is kept.
    fn visible_text(text: &str) -> String {
        let without_code = EMBEDDED_CODE.replace_all(text, " ");
        let without_markup = MARKUP.replace_all(&without_code, " ");
        WHITESPACE
            .replace_all(without_markup.trim(), " ")
            .into_owned()
    }

    fn append(&mut self, visible: &str) {
        let room = MAX_TEXT_BYTES.saturating_sub(self.text.len() + 1);
        if room == 0 || visible.is_empty() {
            return;
        }

        let mut end = visible.len().min(room);
        while !visible.is_char_boundary(end) {
            end -= 1;
        }
        let kept = &visible[..end];
        if kept.is_empty() {
            return;
        }

        if !self.text.is_empty() {
            self.text.push(' ');
        }
        self.text.push_str(kept);
        self.letters += kept.chars().filter(|c| c.is_alphabetic()).count();
    }
}

impl LanguageRecognizer for HeuristicRecognizer {
    fn reset(&mut self) {
        self.text.clear();
        self.letters = 0;
    }

    fn process_sample(&mut self, text: &str) {
        let visible = Self::visible_text(text);
        self.append(&visible);
        trace!(letters = self.letters, "Processed sample");
    }

    fn dominant_language(&self) -> LanguageTag {
        if self.letters < MIN_LETTERS {
            return LanguageTag::undetermined();
        }

        let Some(info) = whatlang::detect(&self.text) else {
            return LanguageTag::undetermined();
        };
        if !info.is_reliable() {
            trace!(
                lang = info.lang().code(),
                confidence = info.confidence(),
                "Unreliable detection"
            );
            return LanguageTag::undetermined();
        }

        LanguageTag::parse(lang_to_code(info.lang())).unwrap_or_else(LanguageTag::undetermined)
    }
}

/// Maps a detected language to its ISO 639-1 code, or the ISO 639-3 code
/// when no two-letter code is listed.
fn lang_to_code(lang: Lang) -> &'static str {
    match lang {
        Lang::Eng => "en",
        Lang::Cmn => "zh",
        Lang::Jpn => "ja",
        Lang::Kor => "ko",
        Lang::Fra => "fr",
        Lang::Deu => "de",
        Lang::Spa => "es",
        Lang::Rus => "ru",
        Lang::Por => "pt",
        Lang::Ita => "it",
        Lang::Ara => "ar",
        Lang::Hin => "hi",
        Lang::Tur => "tr",
        Lang::Vie => "vi",
        Lang::Tha => "th",
        Lang::Nld => "nl",
        Lang::Pol => "pl",
        Lang::Ukr => "uk",
        Lang::Swe => "sv",
        Lang::Dan => "da",
        Lang::Nob => "nb",
        Lang::Fin => "fi",
        Lang::Hun => "hu",
        Lang::Ces => "cs",
        Lang::Slk => "sk",
        Lang::Ell => "el",
        Lang::Heb => "he",
        Lang::Bul => "bg",
        Lang::Ron => "ro",
        Lang::Hrv => "hr",
        Lang::Srp => "sr",
        Lang::Slv => "sl",
        Lang::Lit => "lt",
        Lang::Lav => "lv",
        Lang::Est => "et",
        Lang::Ind => "id",
        Lang::Pes => "fa",
        Lang::Cat => "ca",
        Lang::Afr => "af",
        Lang::Bel => "be",
        Lang::Ben => "bn",
        Lang::Kat => "ka",
        Lang::Lat => "la",
        Lang::Epo => "eo",
        other => other.code(),
    }
}

// ============================================================================
// Tests
// ============================================================================
