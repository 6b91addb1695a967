//! Content channel abstraction.
//!
//! A [`ContentChannel`] is the only way host code reaches a document's
//! injected routine. Traffic is keyed by [`Namespace`], so one transport
//! can carry several bindings without their calls or messages mixing.
//!
//! [`Connection`] is the WebSocket-backed implementation; hosts embedding
//! a different runtime implement the trait over their own message path.

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use tracing::warn;

use crate::error::Result;
use crate::identifiers::Namespace;
use crate::protocol::{InboundMessage, RemoteCallReply, RemoteCallRequest, Request};

use super::Connection;

// ============================================================================
// Types
// ============================================================================

/// Something that happened on a binding's inbound path.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// An unsolicited message from the routine.
    Message(InboundMessage),
    /// The document's execution context was destroyed.
    Destroyed {
        /// Reason given by the remote side.
        reason: String,
    },
    /// The transport itself is gone.
    Disconnected,
}

/// Inbound handler callback type.
///
/// Called once per inbound event, in arrival order. Must not block.
pub type InboundHandler = Box<dyn Fn(ChannelEvent) + Send + Sync>;

// ============================================================================
// ContentChannel
// ============================================================================

/// Asynchronous link to the routines injected into documents.
#[async_trait]
pub trait ContentChannel: Send + Sync {
    /// Sends a remote call to the routine registered under `namespace`.
    ///
    /// With `expect_reply` set, suspends until the correlated reply arrives,
    /// the call timeout elapses, or the transport fails. Without it, returns
    /// once the call was handed to the transport; transmission failures are
    /// logged, not returned.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::CallTimeout`] if no reply arrived in time
    /// - [`crate::Error::ConnectionClosed`] if the transport closed
    /// - [`crate::Error::DocumentDestroyed`] if the document went away mid-call
    async fn send_remote_call(
        &self,
        namespace: &Namespace,
        request: RemoteCallRequest,
    ) -> Result<RemoteCallReply>;

    /// Registers the single inbound handler for `namespace`, replacing any
    /// previous one.
    fn set_inbound_handler(&self, namespace: &Namespace, handler: InboundHandler);

    /// Removes the inbound handler for `namespace`.
    fn clear_inbound_handler(&self, namespace: &Namespace);
}

// ============================================================================
// Connection Implementation
// ============================================================================

#[async_trait]
impl ContentChannel for Connection {
    async fn send_remote_call(
        &self,
        namespace: &Namespace,
        request: RemoteCallRequest,
    ) -> Result<RemoteCallReply> {
        let function = request.function_name.clone();
        let request = Request::call(namespace.clone(), request);

        if !request.expects_reply() {
            if let Err(e) = self.post(request).await {
                warn!(%namespace, %function, error = %e, "Fire-and-forget call not transmitted");
            }
            return Ok(RemoteCallReply::transmitted());
        }

        let response = self.send(request).await?;
        Ok(response.into_reply())
    }

    fn set_inbound_handler(&self, namespace: &Namespace, handler: InboundHandler) {
        self.set_handler(namespace.clone(), handler);
    }

    fn clear_inbound_handler(&self, namespace: &Namespace) {
        self.clear_handler(namespace);
    }
}
