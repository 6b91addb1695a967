//! Host locale providers.

// ============================================================================
// Imports
// ============================================================================

use tracing::debug;

use super::LanguageTag;

// ============================================================================
// Constants
// ============================================================================

/// Language used when the host names none.
const FALLBACK_LANGUAGE: &str = "en";

// ============================================================================
// LocaleProvider
// ============================================================================

/// Source of the host's current display language.
pub trait LocaleProvider: Send + Sync {
    /// Returns the host's current language.
    fn current_language(&self) -> LanguageTag;
}

// ============================================================================
// SystemLocale
// ============================================================================

/// Reads the host's display language through [`sys_locale::get_locale`].
///
/// The `C` and `POSIX` locales carry no language. Falls back to `en` when
/// the host reports nothing usable.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLocale;

impl SystemLocale {
    /// Resolves a reported locale such as `fr-FR`, `fr_FR.UTF-8` or
    /// `de_DE@euro`, falling back to `en`.
    #[must_use]
    pub fn resolve(reported: Option<&str>) -> LanguageTag {
        reported
            .and_then(Self::parse_locale)
            .unwrap_or_else(Self::fallback)
    }

    fn parse_locale(value: &str) -> Option<LanguageTag> {
        let name = value
            .split(['.', '@'])
            .next()
            .unwrap_or_default()
            .trim();

        if name.is_empty() || name == "C" || name == "POSIX" {
            return None;
        }

        LanguageTag::parse(name).filter(|tag| !tag.is_undetermined())
    }

    fn fallback() -> LanguageTag {
        LanguageTag::parse(FALLBACK_LANGUAGE).unwrap_or_else(LanguageTag::undetermined)
    }
}

impl LocaleProvider for SystemLocale {
    fn current_language(&self) -> LanguageTag {
        let reported = sys_locale::get_locale();
        let language = Self::resolve(reported.as_deref());
        debug!(reported = ?reported, language = %language, "Host locale resolved");
        language
    }
}

// ============================================================================
// FixedLocale
// ============================================================================

/// Always reports the same language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedLocale(LanguageTag);

impl FixedLocale {
    /// Creates a provider reporting `language`.
    #[inline]
    #[must_use]
    pub const fn new(language: LanguageTag) -> Self {
        Self(language)
    }
}

impl From<LanguageTag> for FixedLocale {
    fn from(language: LanguageTag) -> Self {
        Self(language)
    }
}

impl LocaleProvider for FixedLocale {
    fn current_language(&self) -> LanguageTag {
        self.0.clone()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_reported_locales() {
        let resolve = |v: Option<&str>| SystemLocale::resolve(v).to_string();

        assert_eq!(resolve(Some("fr-FR")), "fr-FR");
        assert_eq!(resolve(Some("fr_FR.UTF-8")), "fr-FR");
        assert_eq!(resolve(Some("de_DE@euro")), "de-DE");
        assert_eq!(resolve(Some("zh-Hans-CN")), "zh-Hans-CN");
        assert_eq!(resolve(Some("ja")), "ja");
    }

    #[test]
    fn test_resolve_falls_back_to_english() {
        let resolve = |v: Option<&str>| SystemLocale::resolve(v).to_string();

        assert_eq!(resolve(None), "en");
        assert_eq!(resolve(Some("C")), "en");
        assert_eq!(resolve(Some("POSIX")), "en");
        assert_eq!(resolve(Some("C.UTF-8")), "en");
        assert_eq!(resolve(Some("und")), "en");
        assert_eq!(resolve(Some("")), "en");
    }

    #[test]
    fn test_system_locale_always_answers() {
        let language = SystemLocale.current_language();
        assert!(!language.is_undetermined());
    }

    #[test]
    fn test_fixed_locale() {
        let locale = FixedLocale::new("pt-BR".parse().expect("valid"));
        assert_eq!(locale.current_language().as_str(), "pt-BR");
        assert_eq!(locale.current_language().primary(), "pt");
    }
}
