//! Remote call and inbound message values.
//!
//! These are the transport-independent shapes exchanged with the routine
//! injected into a document. The wire envelopes in [`super::request`] and
//! [`super::event`] carry them.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Command sent by the injected routine once it has initialized.
pub const READY_COMMAND: &str = "ready";

// ============================================================================
// RemoteCallRequest
// ============================================================================

/// A named function call into the document.
///
/// # Format
///
/// ```json
/// { "function": "getPageLanguage", "args": [], "expectReply": true }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteCallRequest {
    /// Name of the document-side function.
    #[serde(rename = "function")]
    pub function_name: String,

    /// Positional arguments.
    #[serde(default)]
    pub args: Vec<Value>,

    /// Whether the caller waits for a reply.
    #[serde(rename = "expectReply")]
    pub expect_reply: bool,
}

impl RemoteCallRequest {
    /// Creates a call that waits for exactly one reply.
    #[inline]
    #[must_use]
    pub fn awaited(function_name: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            function_name: function_name.into(),
            args,
            expect_reply: true,
        }
    }

    /// Creates a fire-and-forget call.
    #[inline]
    #[must_use]
    pub fn fire_and_forget(function_name: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            function_name: function_name.into(),
            args,
            expect_reply: false,
        }
    }
}

// ============================================================================
// RemoteCallReply
// ============================================================================

/// Outcome of a remote call as reported by the document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoteCallReply {
    /// Returned value, if any.
    pub value: Option<Value>,
    /// Failure reason reported by the document, if any.
    pub error: Option<String>,
}

impl RemoteCallReply {
    /// Reply carrying a value.
    #[inline]
    #[must_use]
    pub fn value(value: Value) -> Self {
        Self {
            value: Some(value),
            error: None,
        }
    }

    /// Reply carrying a failure reason.
    #[inline]
    #[must_use]
    pub fn error(reason: impl Into<String>) -> Self {
        Self {
            value: None,
            error: Some(reason.into()),
        }
    }

    /// Reply to a call nobody waits on.
    #[inline]
    #[must_use]
    pub fn transmitted() -> Self {
        Self::default()
    }

    /// Decodes the value as a plain string.
    ///
    /// # Errors
    ///
    /// - [`Error::Remote`] if the reply carries an error
    /// - [`Error::Decode`] if the value is missing or not a string
    pub fn into_string(self, function: &str) -> Result<String> {
        if let Some(reason) = self.error {
            return Err(Error::remote(function, reason));
        }

        match self.value {
            Some(Value::String(text)) => Ok(text),
            Some(other) => Err(Error::decode(
                function,
                format!("expected string, got {}", value_kind(&other)),
            )),
            None => Err(Error::decode(function, "missing value")),
        }
    }
}

/// Short name of a JSON value's type for diagnostics.
fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ============================================================================
// InboundMessage
// ============================================================================

/// An unsolicited message posted by the injected routine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Command name.
    pub command: String,

    /// Key/value payload.
    #[serde(default)]
    pub payload: Map<String, Value>,
}

impl InboundMessage {
    /// Creates a message with an empty payload.
    #[inline]
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            payload: Map::new(),
        }
    }

    /// Returns `true` for the routine's readiness notification.
    #[inline]
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.command == READY_COMMAND
    }
}

// ============================================================================
// Tests
// ============================================================================
