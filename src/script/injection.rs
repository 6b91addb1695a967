//! User script descriptors and the injection seam.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::identifiers::DocumentId;

// ============================================================================
// Constants
// ============================================================================

/// Content world the translation script runs in by default.
pub const DEFAULT_CONTENT_WORLD: &str = "defaultClient";

// ============================================================================
// InjectionTiming
// ============================================================================

/// When the script runs relative to document loading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InjectionTiming {
    /// Before any network content is parsed.
    #[default]
    BeforeContentLoads,
    /// After the document has finished parsing.
    AfterContentLoads,
}

impl fmt::Display for InjectionTiming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BeforeContentLoads => f.write_str("beforeContentLoads"),
            Self::AfterContentLoads => f.write_str("afterContentLoads"),
        }
    }
}

// ============================================================================
// ContentWorld
// ============================================================================

/// Isolation context the script executes in.
///
/// Scripts in different worlds share the DOM but not their globals.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentWorld(String);

impl ContentWorld {
    /// Creates a named content world.
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the world name.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ContentWorld {
    fn default() -> Self {
        Self::new(DEFAULT_CONTENT_WORLD)
    }
}

impl fmt::Display for ContentWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// UserScript
// ============================================================================

/// A prepared script ready to hand to the host's injector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserScript {
    /// Script source with all placeholders substituted.
    pub source: String,
    /// When the script runs.
    pub timing: InjectionTiming,
    /// Isolation context.
    pub content_world: ContentWorld,
    /// Whether subframes are skipped.
    pub main_frame_only: bool,
}

impl UserScript {
    /// Creates a main-frame script in the default world, injected before
    /// content loads.
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            timing: InjectionTiming::default(),
            content_world: ContentWorld::default(),
            main_frame_only: true,
        }
    }

    /// Sets the injection timing.
    #[must_use]
    pub fn with_timing(mut self, timing: InjectionTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Sets the content world.
    #[must_use]
    pub fn with_content_world(mut self, world: ContentWorld) -> Self {
        self.content_world = world;
        self
    }

    /// Sets whether subframes are skipped.
    #[must_use]
    pub fn with_main_frame_only(mut self, main_frame_only: bool) -> Self {
        self.main_frame_only = main_frame_only;
        self
    }
}

// ============================================================================
// ScriptInjector
// ============================================================================

/// Host hook that installs a user script into a document.
///
/// Called at most once per binding. Returning `Ok` confirms the script is
/// installed; the routine announces itself later with a `ready` message.
#[async_trait]
pub trait ScriptInjector: Send + Sync {
    /// Installs `script` into `document`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Injection`] if the host could not install
    /// the script.
    async fn inject(&self, document: DocumentId, script: &UserScript) -> Result<()>;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_script_defaults() {
        let script = UserScript::new("void 0;");
        assert_eq!(script.timing, InjectionTiming::BeforeContentLoads);
        assert_eq!(script.content_world.as_str(), "defaultClient");
        assert!(script.main_frame_only);
    }

    #[test]
    fn test_user_script_serialization() {
        let script = UserScript::new("x")
            .with_timing(InjectionTiming::AfterContentLoads)
            .with_content_world(ContentWorld::new("page"))
            .with_main_frame_only(false);

        let json = serde_json::to_value(&script).expect("serialize");
        assert_eq!(json["timing"], "afterContentLoads");
        assert_eq!(json["contentWorld"], "page");
        assert_eq!(json["mainFrameOnly"], false);
    }

    #[test]
    fn test_timing_display_matches_serde() {
        for timing in [InjectionTiming::BeforeContentLoads, InjectionTiming::AfterContentLoads] {
            let json = serde_json::to_value(timing).expect("serialize");
            assert_eq!(json, timing.to_string());
        }
    }
}
