//! Script templates with `$<name>` placeholders.
//!
//! The translation script ships with placeholders for values that only
//! exist once a binding is created:
//!
//! | Placeholder | Replaced with |
//! |-------------|---------------|
//! | `$<brave_translate_script>` | The binding namespace |
//! | `$<message_handler>` | The message handler name |
//!
//! Preparing a template with a placeholder left unbound is an error, so
//! a script never reaches a document with a literal `$<...>` in it.

// ============================================================================
// Imports
// ============================================================================

use std::sync::{Arc, LazyLock};

use regex::Regex;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{Error, Result};
use crate::identifiers::Namespace;

// ============================================================================
// Constants
// ============================================================================

/// Placeholder replaced with the binding namespace.
pub const NAMESPACE_PLACEHOLDER: &str = "brave_translate_script";

/// Placeholder replaced with the message handler name.
pub const MESSAGE_HANDLER_PLACEHOLDER: &str = "message_handler";

/// Matches `$<name>`.
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$<([A-Za-z_][A-Za-z0-9_]*)>")
        .unwrap_or_else(|e| unreachable!("static pattern: {e}"))
});

// ============================================================================
// TemplateBindings
// ============================================================================

/// Values substituted into a [`ScriptTemplate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateBindings {
    values: FxHashMap<String, String>,
}

impl TemplateBindings {
    /// Creates an empty set of bindings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bindings for one translation binding.
    #[must_use]
    pub fn for_binding(namespace: &Namespace, message_handler: &str) -> Self {
        Self::new()
            .bind(NAMESPACE_PLACEHOLDER, namespace.as_str())
            .bind(MESSAGE_HANDLER_PLACEHOLDER, message_handler)
    }

    /// Binds `name` to `value`, replacing any previous value.
    #[must_use]
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Returns the value bound to `name`.
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }
}

// ============================================================================
// ScriptTemplate
// ============================================================================

/// Script source containing `$<name>` placeholders.
///
/// Cheap to clone; the source is shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptTemplate {
    source: Arc<str>,
}

impl ScriptTemplate {
    /// Wraps a script source.
    #[must_use]
    pub fn new(source: impl Into<Arc<str>>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// Returns the raw template source.
    #[inline]
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Names of all placeholders in the template, in order of appearance.
    #[must_use]
    pub fn placeholders(&self) -> Vec<&str> {
        let mut names: Vec<&str> = PLACEHOLDER
            .captures_iter(&self.source)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
            .collect();
        let mut seen = FxHashSet::default();
        names.retain(|name| seen.insert(*name));
        names
    }

    /// Substitutes every placeholder.
    ///
    /// Substituted values are not scanned again, so a value may itself
    /// contain `$<...>`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Template`] naming the first placeholder with no
    /// binding.
    pub fn prepare(&self, bindings: &TemplateBindings) -> Result<String> {
        if let Some(missing) = self
            .placeholders()
            .into_iter()
            .find(|name| bindings.get(name).is_none())
        {
            return Err(Error::template(missing));
        }

        let prepared = PLACEHOLDER.replace_all(&self.source, |caps: &regex::Captures<'_>| {
            caps.get(1)
                .and_then(|name| bindings.get(name.as_str()))
                .unwrap_or_default()
                .to_string()
        });

        Ok(prepared.into_owned())
    }
}

impl From<&str> for ScriptTemplate {
    fn from(source: &str) -> Self {
        Self::new(source)
    }
}

impl From<String> for ScriptTemplate {
    fn from(source: String) -> Self {
        Self::new(source)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = r#"
        window.__firefox__.$<brave_translate_script> = {
            getPageLanguage: () => document.documentElement.lang,
        };
        webkit.messageHandlers.$<message_handler>.postMessage({ command: "ready" });
        // $<brave_translate_script> again
    "#;

    #[test]
    fn test_prepare_substitutes_all_occurrences() {
        let namespace = Namespace::from("translate_abc");
        let bindings = TemplateBindings::for_binding(&namespace, "TranslateMessage");
        let prepared = ScriptTemplate::from(SCRIPT).prepare(&bindings).expect("prepare");

        assert!(prepared.contains("window.__firefox__.translate_abc = {"));
        assert!(prepared.contains("messageHandlers.TranslateMessage.postMessage"));
        assert!(prepared.contains("// translate_abc again"));
        assert!(!prepared.contains("$<"));
    }

    #[test]
    fn test_unbound_placeholder_is_error() {
        let template = ScriptTemplate::from("run($<brave_translate_script>, $<origin>)");
        let bindings = TemplateBindings::for_binding(&Namespace::from("ns"), "H");

        let err = template.prepare(&bindings).unwrap_err();
        assert!(matches!(err, Error::Template { ref placeholder } if placeholder == "origin"));
    }

    #[test]
    fn test_placeholders_are_deduplicated() {
        let template = ScriptTemplate::from(SCRIPT);
        assert_eq!(
            template.placeholders(),
            vec![NAMESPACE_PLACEHOLDER, MESSAGE_HANDLER_PLACEHOLDER]
        );
    }

    #[test]
    fn test_values_are_not_rescanned() {
        let template = ScriptTemplate::from("a=$<x>;");
        let bindings = TemplateBindings::new().bind("x", "$<y>");
        assert_eq!(template.prepare(&bindings).expect("prepare"), "a=$<y>;");
    }

    #[test]
    fn test_plain_dollar_signs_are_kept() {
        let template = ScriptTemplate::from("const $ = jQuery; let t = `${x}`;");
        let prepared = template.prepare(&TemplateBindings::new()).expect("prepare");
        assert_eq!(prepared, template.source());
    }
}
