//! Wire message types.
//!
//! This module defines the message format for communication between the
//! host (Rust) and the routine injected into a document.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | `Request` | Host → Document | Remote function call |
//! | `Response` | Document → Host | Reply to an awaited call |
//! | `Event` | Document → Host | Posted message or context teardown |
//! | `EventReply` | Host → Document | Acknowledgement of a posted message |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `call` | Transport-independent call, reply and message values |
//! | `event` | Event and EventReply types |
//! | `request` | Request and Response types |

// ============================================================================
// Submodules
// ============================================================================

/// Remote call and inbound message values.
pub mod call;

/// Event message types.
pub mod event;

/// Request and Response message types.
pub mod request;

// ============================================================================
// Re-exports
// ============================================================================

pub use call::{InboundMessage, READY_COMMAND, RemoteCallReply, RemoteCallRequest};
pub use event::{Event, EventReply, ParsedEvent};
pub use request::{Request, Response, ResponseType};
