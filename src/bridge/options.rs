//! Bridge configuration.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use page_translate_bridge::{BridgeOptions, InjectionTiming};
//!
//! let options = BridgeOptions::new()
//!     .with_call_timeout(Duration::from_secs(5))
//!     .with_timing(InjectionTiming::AfterContentLoads);
//!
//! assert!(options.validate().is_ok());
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::borrow::Cow;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::script::{ContentWorld, InjectionTiming, UserScript};
use crate::transport::DEFAULT_CALL_TIMEOUT;

// ============================================================================
// Constants
// ============================================================================

/// Default prefix of generated binding namespaces.
pub const DEFAULT_NAMESPACE_PREFIX: &str = "translate";

/// Default name of the message handler the routine posts to.
pub const DEFAULT_MESSAGE_HANDLER: &str = "TranslateMessage";

// ============================================================================
// BridgeOptions
// ============================================================================

/// Per-bridge configuration shared by every binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeOptions {
    /// Upper bound on each awaited remote call.
    pub call_timeout: Duration,

    /// Prefix of generated namespaces (`<prefix>_<uuid>`).
    pub namespace_prefix: Cow<'static, str>,

    /// Message handler name substituted into the script.
    pub message_handler: Cow<'static, str>,

    /// When the script is injected.
    pub timing: InjectionTiming,

    /// Content world the script runs in. `None` means the default world.
    pub content_world: Option<ContentWorld>,

    /// Whether subframes are skipped.
    pub main_frame_only: bool,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl BridgeOptions {
    /// Creates options with default settings.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            call_timeout: DEFAULT_CALL_TIMEOUT,
            namespace_prefix: Cow::Borrowed(DEFAULT_NAMESPACE_PREFIX),
            message_handler: Cow::Borrowed(DEFAULT_MESSAGE_HANDLER),
            timing: InjectionTiming::BeforeContentLoads,
            content_world: None,
            main_frame_only: true,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl BridgeOptions {
    /// Sets the remote call timeout.
    #[inline]
    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Sets the namespace prefix.
    #[inline]
    #[must_use]
    pub fn with_namespace_prefix(mut self, prefix: impl Into<Cow<'static, str>>) -> Self {
        self.namespace_prefix = prefix.into();
        self
    }

    /// Sets the message handler name.
    #[inline]
    #[must_use]
    pub fn with_message_handler(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.message_handler = name.into();
        self
    }

    /// Sets the injection timing.
    #[inline]
    #[must_use]
    pub fn with_timing(mut self, timing: InjectionTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Sets the content world.
    #[inline]
    #[must_use]
    pub fn with_content_world(mut self, world: ContentWorld) -> Self {
        self.content_world = Some(world);
        self
    }

    /// Sets whether subframes are skipped.
    #[inline]
    #[must_use]
    pub fn with_main_frame_only(mut self, main_frame_only: bool) -> Self {
        self.main_frame_only = main_frame_only;
        self
    }
}

// ============================================================================
// Conversion Methods
// ============================================================================

impl BridgeOptions {
    /// Wraps prepared source into a [`UserScript`] with these settings.
    #[must_use]
    pub fn user_script(&self, source: String) -> UserScript {
        UserScript::new(source)
            .with_timing(self.timing)
            .with_content_world(self.content_world.clone().unwrap_or_default())
            .with_main_frame_only(self.main_frame_only)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the timeout is zero or a name is not a
    /// valid script identifier.
    pub fn validate(&self) -> Result<()> {
        if self.call_timeout.is_zero() {
            return Err(Error::config("Call timeout must be greater than zero"));
        }

        for (field, value) in [
            ("namespace prefix", &self.namespace_prefix),
            ("message handler", &self.message_handler),
        ] {
            if !is_identifier(value) {
                return Err(Error::config(format!(
                    "Invalid {field} {value:?}: must be a script identifier"
                )));
            }
        }

        if let Some(world) = &self.content_world
            && world.as_str().trim().is_empty()
        {
            return Err(Error::config("Content world name must not be empty"));
        }

        Ok(())
    }
}

/// Returns `true` for `[A-Za-z_$][A-Za-z0-9_$]*`.
fn is_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

// ============================================================================
// Tests
// ============================================================================
