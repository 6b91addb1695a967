//! Translation script preparation and injection.
//!
//! A [`ScriptTemplate`] is prepared once per binding into a [`UserScript`],
//! which the host's [`ScriptInjector`] installs into the document.

// ============================================================================
// Submodules
// ============================================================================

/// User script descriptor and injector seam.
pub mod injection;

/// `$<name>` template substitution.
pub mod template;

// ============================================================================
// Re-exports
// ============================================================================

pub use injection::{ContentWorld, InjectionTiming, ScriptInjector, UserScript};
pub use template::{ScriptTemplate, TemplateBindings};
