//! Event message types.
//!
//! Events are notifications the injected routine sends without being asked:
//! the messages it posts, and the relay's notice that a document's
//! execution context is gone.
//!
//! | Method | Params |
//! |--------|--------|
//! | `content.message` | `{ "command": string, "payload": object }` |
//! | `content.destroyed` | `{ "reason": string }` |

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::identifiers::{Namespace, RequestId};

use super::InboundMessage;

// ============================================================================
// Constants
// ============================================================================

/// Method of a message posted by the injected routine.
pub const MESSAGE_METHOD: &str = "content.message";

/// Method announcing destruction of the document context.
pub const DESTROYED_METHOD: &str = "content.destroyed";

// ============================================================================
// Event
// ============================================================================

/// An event notification from a document to the host.
///
/// # Format
///
/// ```json
/// {
///   "id": "event-uuid",
///   "type": "event",
///   "namespace": "translate_…",
///   "method": "content.message",
///   "params": { "command": "ready", "payload": {} }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique identifier for EventReply correlation.
    pub id: RequestId,

    /// Event type marker (always "event").
    #[serde(rename = "type")]
    pub event_type: String,

    /// Binding the event belongs to.
    pub namespace: Namespace,

    /// Event name in `module.eventName` format.
    pub method: String,

    /// Event-specific data.
    #[serde(default)]
    pub params: Value,
}

impl Event {
    /// Creates a `content.message` event.
    #[must_use]
    pub fn message(namespace: Namespace, message: &InboundMessage) -> Self {
        Self {
            id: RequestId::generate(),
            event_type: "event".to_string(),
            namespace,
            method: MESSAGE_METHOD.to_string(),
            params: json!({ "command": message.command, "payload": message.payload }),
        }
    }

    /// Creates a `content.destroyed` event.
    #[must_use]
    pub fn destroyed(namespace: Namespace, reason: impl Into<String>) -> Self {
        Self {
            id: RequestId::generate(),
            event_type: "event".to_string(),
            namespace,
            method: DESTROYED_METHOD.to_string(),
            params: json!({ "reason": reason.into() }),
        }
    }

    /// Returns the module name from the method.
    #[inline]
    #[must_use]
    pub fn module(&self) -> &str {
        self.method.split('.').next().unwrap_or_default()
    }

    /// Returns the event name from the method.
    #[inline]
    #[must_use]
    pub fn event_name(&self) -> &str {
        self.method.split('.').nth(1).unwrap_or_default()
    }

    /// Parses the event into a typed variant.
    #[must_use]
    pub fn parse(&self) -> ParsedEvent {
        match self.method.as_str() {
            MESSAGE_METHOD => match serde_json::from_value::<InboundMessage>(self.params.clone()) {
                Ok(message) => ParsedEvent::Message(message),
                Err(e) => ParsedEvent::Malformed {
                    method: self.method.clone(),
                    reason: e.to_string(),
                },
            },

            DESTROYED_METHOD => ParsedEvent::Destroyed {
                reason: self
                    .params
                    .get("reason")
                    .and_then(|v| v.as_str())
                    .unwrap_or("destroyed")
                    .to_string(),
            },

            _ => ParsedEvent::Unknown {
                method: self.method.clone(),
                params: self.params.clone(),
            },
        }
    }
}

// ============================================================================
// EventReply
// ============================================================================

/// Acknowledgement sent back for a posted message.
///
/// # Format
///
/// ```json
/// { "id": "event-uuid", "replyTo": "content.message", "result": null }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventReply {
    /// Matches the event's ID.
    pub id: RequestId,

    /// Event method being replied to.
    #[serde(rename = "replyTo")]
    pub reply_to: String,

    /// Reply value.
    pub result: Value,
}

impl EventReply {
    /// Creates a new event reply.
    #[inline]
    #[must_use]
    pub fn new(id: RequestId, reply_to: impl Into<String>, result: Value) -> Self {
        Self {
            id,
            reply_to: reply_to.into(),
            result,
        }
    }

    /// Creates a reply with no value.
    #[inline]
    #[must_use]
    pub fn empty(id: RequestId, reply_to: impl Into<String>) -> Self {
        Self::new(id, reply_to, Value::Null)
    }
}

// ============================================================================
// ParsedEvent
// ============================================================================

/// Parsed event types for type-safe handling.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedEvent {
    /// A message posted by the routine.
    Message(InboundMessage),

    /// The document's execution context was destroyed.
    Destroyed {
        /// Reason given by the relay.
        reason: String,
    },

    /// A `content.message` whose params are not a well-formed message.
    Malformed {
        /// Event method.
        method: String,
        /// Why parsing failed.
        reason: String,
    },

    /// Unknown event type.
    Unknown {
        /// Event method.
        method: String,
        /// Event params.
        params: Value,
    },
}

// ============================================================================
// Tests
// ============================================================================
