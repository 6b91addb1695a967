//! Request and Response message types.
//!
//! Defines the envelopes for remote calls travelling from the host to the
//! injected routine and the replies coming back.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::identifiers::{Namespace, RequestId};

use super::{RemoteCallReply, RemoteCallRequest};

// ============================================================================
// Constants
// ============================================================================

/// Method name of a function call request.
pub const CALL_FUNCTION_METHOD: &str = "page.callFunction";

// ============================================================================
// Request
// ============================================================================

/// A remote call from the host to a document.
///
/// # Format
///
/// ```json
/// {
///   "id": "uuid",
///   "namespace": "translate_…",
///   "method": "page.callFunction",
///   "params": { "function": "getRawPageSource", "args": [], "expectReply": true }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Unique identifier for request/response correlation.
    pub id: RequestId,

    /// Binding the call is addressed to.
    pub namespace: Namespace,

    /// Request method.
    pub method: String,

    /// Call description.
    pub params: RemoteCallRequest,
}

impl Request {
    /// Creates a function call request with auto-generated ID.
    #[inline]
    #[must_use]
    pub fn call(namespace: Namespace, call: RemoteCallRequest) -> Self {
        Self {
            id: RequestId::generate(),
            namespace,
            method: CALL_FUNCTION_METHOD.to_string(),
            params: call,
        }
    }

    /// Returns the called function's name.
    #[inline]
    #[must_use]
    pub fn function_name(&self) -> &str {
        &self.params.function_name
    }

    /// Returns `true` if a response is expected.
    #[inline]
    #[must_use]
    pub fn expects_reply(&self) -> bool {
        self.params.expect_reply
    }
}

// ============================================================================
// Response
// ============================================================================

/// A response from a document to the host.
///
/// # Format
///
/// Success:
/// ```json
/// { "id": "uuid", "type": "success", "result": "fr" }
/// ```
///
/// Error:
/// ```json
/// { "id": "uuid", "type": "error", "error": "code", "message": "details" }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Matches the request `id`.
    pub id: RequestId,

    /// Response type.
    #[serde(rename = "type")]
    pub response_type: ResponseType,

    /// Result data (if success).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    /// Error code (if error).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Error message (if error).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Response {
    /// Creates a success response.
    #[inline]
    #[must_use]
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            id,
            response_type: ResponseType::Success,
            result: Some(result),
            error: None,
            message: None,
        }
    }

    /// Creates an error response.
    #[inline]
    #[must_use]
    pub fn failure(id: RequestId, error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id,
            response_type: ResponseType::Error,
            result: None,
            error: Some(error.into()),
            message: Some(message.into()),
        }
    }

    /// Returns `true` if this is a success response.
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.response_type == ResponseType::Success
    }

    /// Returns `true` if this is an error response.
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.response_type == ResponseType::Error
    }

    /// Converts into the transport-independent reply.
    ///
    /// An error response keeps its message (or code when no message was sent).
    #[must_use]
    pub fn into_reply(self) -> RemoteCallReply {
        match self.response_type {
            ResponseType::Success => RemoteCallReply {
                value: self.result.filter(|v| !v.is_null()),
                error: None,
            },
            ResponseType::Error => {
                let error_code = self.error.unwrap_or_else(|| "unknown error".to_string());
                RemoteCallReply::error(self.message.unwrap_or(error_code))
            }
        }
    }
}

// ============================================================================
// ResponseType
// ============================================================================

/// Response type discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// Successful response.
    Success,
    /// Error response.
    Error,
}

// ============================================================================
// Tests
// ============================================================================
