//! Error types for the translation bridge.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```no_run
//! use page_translate_bridge::{
//!     Error, Result, ScriptInjector, ScriptTemplate, TranslationCoordinator,
//! };
//!
//! async fn example(
//!     coordinator: &TranslationCoordinator,
//!     template: &ScriptTemplate,
//!     injector: &dyn ScriptInjector,
//! ) -> Result<()> {
//!     match coordinator.inject(template, injector).await {
//!         Err(e) if e.is_lifecycle_violation() => Ok(()),
//!         Err(Error::Injection { message, .. }) => {
//!             eprintln!("host rejected the script: {message}");
//!             Ok(())
//!         }
//!         other => other,
//!     }
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::Template`], [`Error::InvalidLanguage`] |
//! | Injection | [`Error::Injection`] |
//! | Communication | [`Error::CallTimeout`], [`Error::Communication`], [`Error::ConnectionClosed`], [`Error::DocumentDestroyed`] |
//! | Protocol | [`Error::Protocol`], [`Error::Remote`], [`Error::Decode`] |
//! | Lifecycle | [`Error::Lifecycle`], [`Error::Cancelled`], [`Error::DocumentNotBound`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`], [`Error::ChannelClosed`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio::sync::oneshot::error::RecvError;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::identifiers::{DocumentId, Namespace};

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when bridge options or builder input are invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Script template error.
    ///
    /// Returned when a placeholder is left unsubstituted after preparation.
    #[error("Template placeholder not substituted: $<{placeholder}>")]
    Template {
        /// Name of the placeholder.
        placeholder: String,
    },

    /// Value is not a usable language tag.
    #[error("Invalid language tag: {value:?}")]
    InvalidLanguage {
        /// The rejected input.
        value: String,
    },

    // ========================================================================
    // Injection Errors
    // ========================================================================
    /// Script injection was rejected by the host.
    #[error("Script injection failed for {document}: {message}")]
    Injection {
        /// Target document.
        document: DocumentId,
        /// Description of the failure.
        message: String,
    },

    // ========================================================================
    // Communication Errors
    // ========================================================================
    /// An awaited remote call did not receive its reply in time.
    #[error("Remote call {function} timed out after {timeout_ms}ms")]
    CallTimeout {
        /// Name of the remote function.
        function: String,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// The transport failed while carrying a remote call.
    #[error("Remote call {function} failed: {message}")]
    Communication {
        /// Name of the remote function.
        function: String,
        /// Description of the transport failure.
        message: String,
    },

    /// The transport connection closed before a remote call completed.
    #[error("Connection closed during {function}")]
    ConnectionClosed {
        /// Name of the remote function.
        function: String,
    },

    /// The remote execution context of a document was destroyed.
    #[error("Document context destroyed during {function}: {namespace}")]
    DocumentDestroyed {
        /// Namespace of the destroyed binding.
        namespace: Namespace,
        /// Name of the remote function.
        function: String,
    },

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Protocol violation or unexpected message.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    /// The document routine answered a call with an error.
    #[error("Remote error from {function}: {message}")]
    Remote {
        /// Name of the remote function.
        function: String,
        /// Error message reported by the document.
        message: String,
    },

    /// A reply value did not have the expected shape.
    #[error("Cannot decode reply of {function}: {message}")]
    Decode {
        /// Name of the remote function.
        function: String,
        /// Description of the shape mismatch.
        message: String,
    },

    // ========================================================================
    // Lifecycle Errors
    // ========================================================================
    /// Operation attempted in an incompatible binding state.
    #[error("Cannot {operation} while binding is {state}")]
    Lifecycle {
        /// Attempted operation.
        operation: String,
        /// State the binding was in.
        state: String,
    },

    /// The binding was torn down while work was in flight.
    #[error("Cancelled")]
    Cancelled,

    /// No binding exists for the document.
    #[error("No binding for {document}")]
    DocumentNotBound {
        /// The unknown document.
        document: DocumentId,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// Channel receive error.
    #[error("Channel closed")]
    ChannelClosed(#[from] RecvError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a template error.
    #[inline]
    pub fn template(placeholder: impl Into<String>) -> Self {
        Self::Template {
            placeholder: placeholder.into(),
        }
    }

    /// Creates an invalid language error.
    #[inline]
    pub fn invalid_language(value: impl Into<String>) -> Self {
        Self::InvalidLanguage {
            value: value.into(),
        }
    }

    /// Creates an injection error.
    #[inline]
    pub fn injection(document: DocumentId, message: impl Into<String>) -> Self {
        Self::Injection {
            document,
            message: message.into(),
        }
    }

    /// Creates a call timeout error.
    #[inline]
    pub fn call_timeout(function: impl Into<String>, timeout_ms: u64) -> Self {
        Self::CallTimeout {
            function: function.into(),
            timeout_ms,
        }
    }

    /// Creates a communication error.
    #[inline]
    pub fn communication(function: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Communication {
            function: function.into(),
            message: message.into(),
        }
    }

    /// Creates a connection closed error.
    #[inline]
    pub fn connection_closed(function: impl Into<String>) -> Self {
        Self::ConnectionClosed {
            function: function.into(),
        }
    }

    /// Creates a document destroyed error.
    #[inline]
    pub fn document_destroyed(namespace: Namespace, function: impl Into<String>) -> Self {
        Self::DocumentDestroyed {
            namespace,
            function: function.into(),
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates a remote error.
    #[inline]
    pub fn remote(function: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Remote {
            function: function.into(),
            message: message.into(),
        }
    }

    /// Creates a decode error.
    #[inline]
    pub fn decode(function: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            function: function.into(),
            message: message.into(),
        }
    }

    /// Creates a lifecycle violation error.
    #[inline]
    pub fn lifecycle(operation: impl Into<String>, state: impl ToString) -> Self {
        Self::Lifecycle {
            operation: operation.into(),
            state: state.to_string(),
        }
    }

    /// Creates a document not bound error.
    #[inline]
    pub fn document_not_bound(document: DocumentId) -> Self {
        Self::DocumentNotBound { document }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::CallTimeout { .. })
    }

    /// Returns `true` if an awaited call failed to complete its round-trip.
    #[inline]
    #[must_use]
    pub fn is_communication_failure(&self) -> bool {
        matches!(
            self,
            Self::CallTimeout { .. }
                | Self::Communication { .. }
                | Self::ConnectionClosed { .. }
                | Self::DocumentDestroyed { .. }
                | Self::WebSocket(_)
                | Self::ChannelClosed(_)
        )
    }

    /// Returns `true` if the remote context is gone.
    ///
    /// Fatal errors end the binding; no later call can succeed.
    #[inline]
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ConnectionClosed { .. }
                | Self::DocumentDestroyed { .. }
                | Self::WebSocket(_)
                | Self::ChannelClosed(_)
                | Self::Cancelled
        )
    }

    /// Returns `true` if this is a lifecycle violation.
    #[inline]
    #[must_use]
    pub fn is_lifecycle_violation(&self) -> bool {
        matches!(self, Self::Lifecycle { .. })
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors may succeed on retry.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::CallTimeout { .. }
                | Self::Communication { .. }
                | Self::Remote { .. }
                | Self::Decode { .. }
        )
    }

    /// Returns the remote function a call error is about, if any.
    #[must_use]
    pub fn function(&self) -> Option<&str> {
        match self {
            Self::CallTimeout { function, .. }
            | Self::Communication { function, .. }
            | Self::ConnectionClosed { function }
            | Self::DocumentDestroyed { function, .. }
            | Self::Remote { function, .. }
            | Self::Decode { function, .. } => Some(function),
            _ => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    #[test]
    fn test_error_display() {
        let err = Error::call_timeout("getPageLanguage", 5000);
        assert_eq!(
            err.to_string(),
            "Remote call getPageLanguage timed out after 5000ms"
        );
    }

    #[test]
    fn test_template_error_display() {
        let err = Error::template("message_handler");
        assert_eq!(
            err.to_string(),
            "Template placeholder not substituted: $<message_handler>"
        );
    }

    #[test]
    fn test_lifecycle_display() {
        let err = Error::lifecycle("inject", "Activated");
        assert_eq!(err.to_string(), "Cannot inject while binding is Activated");
        assert!(err.is_lifecycle_violation());
    }

    #[test]
    fn test_is_timeout() {
        let timeout_err = Error::call_timeout("getRawPageSource", 1000);
        let other_err = Error::connection_closed("getRawPageSource");

        assert!(timeout_err.is_timeout());
        assert!(!other_err.is_timeout());
    }

    #[test]
    fn test_is_communication_failure() {
        assert!(Error::call_timeout("f", 1).is_communication_failure());
        assert!(Error::communication("f", "broken pipe").is_communication_failure());
        assert!(Error::connection_closed("f").is_communication_failure());
        assert!(!Error::decode("f", "not a string").is_communication_failure());
        assert!(!Error::Cancelled.is_communication_failure());
    }

    #[test]
    fn test_is_fatal() {
        let destroyed = Error::document_destroyed(Namespace::from("translate_abc"), "f");

        assert!(destroyed.is_fatal());
        assert!(Error::connection_closed("f").is_fatal());
        assert!(Error::Cancelled.is_fatal());
        assert!(!Error::call_timeout("f", 1).is_fatal());
        assert!(!Error::remote("f", "boom").is_fatal());
    }

    #[test]
    fn test_is_recoverable() {
        assert!(Error::call_timeout("f", 1).is_recoverable());
        assert!(Error::decode("f", "shape").is_recoverable());
        assert!(!Error::config("test").is_recoverable());
        assert!(!Error::connection_closed("f").is_recoverable());
    }

    #[test]
    fn test_call_errors_name_their_function() {
        let closed = Error::connection_closed("getPageSource");
        assert_eq!(closed.function(), Some("getPageSource"));
        assert_eq!(closed.to_string(), "Connection closed during getPageSource");

        let destroyed =
            Error::document_destroyed(Namespace::from("translate_abc"), "getRawPageSource");
        assert_eq!(destroyed.function(), Some("getRawPageSource"));
        assert_eq!(
            destroyed.to_string(),
            "Document context destroyed during getRawPageSource: translate_abc"
        );

        assert_eq!(Error::call_timeout("getPageLanguage", 5).function(), Some("getPageLanguage"));
        assert_eq!(Error::Cancelled.function(), None);
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoError::new(ErrorKind::AddrInUse, "port taken");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
