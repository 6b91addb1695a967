//! Translation bridge: binding lifecycle and activation.
//!
//! | Type | Role |
//! |------|------|
//! | [`Bridge`] | Entry point; attaches documents and tracks bindings |
//! | [`TranslationCoordinator`] | Per-document state machine |
//! | [`PageFunctionInvoker`] | Typed calls into the injected routine |
//! | [`BindingRegistry`] | Document → coordinator lookup |

// ============================================================================
// Submodules
// ============================================================================

/// Binding state and failure reasons.
pub mod binding;

/// Bridge builder.
pub mod builder;

/// Per-document coordinator.
pub mod coordinator;

/// Bridge entry point.
pub mod core;

/// Page function calls.
pub mod invoker;

/// Bridge options.
pub mod options;

/// Document → coordinator registry.
pub mod registry;

// ============================================================================
// Re-exports
// ============================================================================

pub use binding::{BindingState, DocumentBinding, FailureReason};
pub use builder::{BridgeBuilder, RecognizerFactory};
pub use coordinator::{DocumentCapabilities, TranslationCoordinator};
pub use core::Bridge;
pub use invoker::PageFunctionInvoker;
pub use options::BridgeOptions;
pub use registry::BindingRegistry;
