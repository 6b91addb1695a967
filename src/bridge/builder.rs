//! Builder pattern for bridge configuration.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use page_translate_bridge::{Bridge, DocumentId, Result, ScriptInjector, UserScript};
//!
//! struct WebViewInjector;
//!
//! #[async_trait::async_trait]
//! impl ScriptInjector for WebViewInjector {
//!     async fn inject(&self, _document: DocumentId, _script: &UserScript) -> Result<()> {
//!         Ok(())
//!     }
//! }
//!
//! # fn example() -> Result<()> {
//! let bridge = Bridge::builder()
//!     .script("window.__firefox__.$<brave_translate_script> = {};")
//!     .injector(Arc::new(WebViewInjector))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::language::{HeuristicRecognizer, LanguageRecognizer, LocaleProvider, SystemLocale};
use crate::script::{ScriptInjector, ScriptTemplate};

use super::core::Bridge;
use super::options::BridgeOptions;

// ============================================================================
// Types
// ============================================================================

/// Creates a fresh recognizer for each binding.
pub type RecognizerFactory = Arc<dyn Fn() -> Box<dyn LanguageRecognizer> + Send + Sync>;

// ============================================================================
// BridgeBuilder
// ============================================================================

/// Builder for configuring a [`Bridge`] instance.
///
/// Use [`Bridge::builder()`] to create a new builder.
#[derive(Default, Clone)]
pub struct BridgeBuilder {
    /// Translation script template.
    template: Option<ScriptTemplate>,
    /// Host hook installing the script.
    injector: Option<Arc<dyn ScriptInjector>>,
    /// Host language source. Defaults to [`SystemLocale`].
    locale: Option<Arc<dyn LocaleProvider>>,
    /// Recognizer factory. Defaults to [`HeuristicRecognizer`].
    recognizer: Option<RecognizerFactory>,
    /// Shared options.
    options: BridgeOptions,
}

impl fmt::Debug for BridgeBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeBuilder")
            .field("has_template", &self.template.is_some())
            .field("has_injector", &self.injector.is_some())
            .field("has_locale", &self.locale.is_some())
            .field("has_recognizer", &self.recognizer.is_some())
            .field("options", &self.options)
            .finish()
    }
}

// ============================================================================
// BridgeBuilder Implementation
// ============================================================================

impl BridgeBuilder {
    /// Creates a new builder with no configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the translation script template.
    #[inline]
    #[must_use]
    pub fn script(mut self, template: impl Into<ScriptTemplate>) -> Self {
        self.template = Some(template.into());
        self
    }

    /// Sets the host's script injector.
    #[inline]
    #[must_use]
    pub fn injector<I>(mut self, injector: Arc<I>) -> Self
    where
        I: ScriptInjector + 'static,
    {
        self.injector = Some(injector);
        self
    }

    /// Sets the host locale provider.
    #[inline]
    #[must_use]
    pub fn locale(mut self, locale: impl LocaleProvider + 'static) -> Self {
        self.locale = Some(Arc::new(locale));
        self
    }

    /// Sets the recognizer factory, called once per binding.
    #[inline]
    #[must_use]
    pub fn recognizer<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Box<dyn LanguageRecognizer> + Send + Sync + 'static,
    {
        self.recognizer = Some(Arc::new(factory));
        self
    }

    /// Replaces the options.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: BridgeOptions) -> Self {
        self.options = options;
        self
    }

    /// Builds the bridge with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the script or injector is not set
    /// - [`Error::Config`] if the options are invalid
    pub fn build(self) -> Result<Bridge> {
        let template = self.template.ok_or_else(|| {
            Error::config(
                "Translation script is required. Use .script() to set it.\n\
                 Example: Bridge::builder().script(include_str!(\"translate.js\"))",
            )
        })?;

        let injector = self.injector.ok_or_else(|| {
            Error::config(
                "Script injector is required. Use .injector() to set it.\n\
                 Example: Bridge::builder().injector(Arc::new(MyInjector))",
            )
        })?;

        self.options.validate()?;

        let locale = self.locale.unwrap_or_else(|| Arc::new(SystemLocale));
        let recognizer = self.recognizer.unwrap_or_else(|| {
            Arc::new(|| Box::new(HeuristicRecognizer::new()) as Box<dyn LanguageRecognizer>)
        });

        Ok(Bridge::new(
            template,
            injector,
            locale,
            recognizer,
            Arc::new(self.options),
        ))
    }
}

// ============================================================================
// Tests
// ============================================================================
