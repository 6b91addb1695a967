//! Message transport between host and documents.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐                         ┌──────────────────────┐
//! │  Host (Rust)         │        WebSocket        │  Relay               │
//! │                      │◄───────────────────────►│  ├─ document A       │
//! │  ContentChannel      │     localhost:PORT      │  │  (translate_…)    │
//! │  └─ Connection       │                         │  └─ document B       │
//! └──────────────────────┘                         └──────────────────────┘
//! ```
//!
//! Calls and inbound events carry the binding's namespace, so one relay
//! connection serves any number of documents.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `channel` | [`ContentChannel`] trait and inbound event types |
//! | `connection` | WebSocket connection and event loop |
//! | `server` | WebSocket server binding and acceptance |

// ============================================================================
// Submodules
// ============================================================================

/// Content channel abstraction.
pub mod channel;

/// WebSocket connection and event loop.
pub mod connection;

/// WebSocket server for the document relay.
pub mod server;

// ============================================================================
// Re-exports
// ============================================================================

pub use channel::{ChannelEvent, ContentChannel, InboundHandler};
pub use connection::{Connection, DEFAULT_CALL_TIMEOUT};
pub use server::PendingServer;
