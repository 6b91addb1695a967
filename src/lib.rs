//! Page Translate Bridge - host side of in-document translation.
//!
//! This library injects a translation routine into a rendered document,
//! waits for the routine to report that it is ready, guesses the language
//! the document is written in, and starts translation from the host's
//! display language.
//!
//! # Architecture
//!
//! The bridge follows a host/routine model:
//!
//! - **Host (Rust)**: owns the binding state, guesses languages, issues calls
//! - **Routine (document)**: exposes page functions, posts `ready`
//!
//! Key design principles:
//!
//! - Each binding owns its namespace; traffic for different documents
//!   never mixes on a shared transport
//! - The host never holds the document, only a [`DocumentId`]
//! - Awaited calls are futures with an explicit timeout
//! - Event-driven: activation starts on the routine's `ready` message
//!
//! # Language Guess
//!
//! 1. Raw page source through the [`LanguageRecognizer`]
//! 2. The language the page declares (`getPageLanguage`)
//! 3. The host language
//!
//! # Quick Start
//!
//! ```no_run
//! use std::net::{IpAddr, Ipv4Addr};
//! use std::sync::Arc;
//!
//! use page_translate_bridge::{Bridge, DocumentId, PendingServer, Result, ScriptInjector};
//!
//! # async fn example(injector: Arc<impl ScriptInjector + 'static>) -> Result<()> {
//! // Accept the relay that forwards traffic to the documents
//! let server = PendingServer::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 0).await?;
//! println!("relay url: {}", server.ws_url());
//! let connection = Arc::new(server.accept().await?);
//!
//! let bridge = Bridge::builder()
//!     .script("window.__firefox__.$<brave_translate_script> = {};")
//!     .injector(injector)
//!     .build()?;
//!
//! let coordinator = bridge.attach(DocumentId::next(), connection).await?;
//! coordinator.settled().await;
//! println!("translating {:?}", coordinator.language_pair());
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`bridge`] | [`Bridge`], [`TranslationCoordinator`], binding state |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`language`] | Language tags, recognizer, host locale |
//! | [`protocol`] | WebSocket message types |
//! | [`script`] | Script template and injection seam |
//! | [`transport`] | Content channel and WebSocket transport |

// ============================================================================
// Modules
// ============================================================================

/// Binding lifecycle, activation, and the bridge entry point.
///
/// Use [`Bridge::builder()`] to create a configured bridge.
pub mod bridge;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
///
/// Newtype wrappers prevent mixing incompatible IDs at compile time.
pub mod identifiers;

/// Language tags, recognition, and host locale.
pub mod language;

/// WebSocket protocol message types.
pub mod protocol;

/// Translation script template and injection.
pub mod script;

/// Content channel and WebSocket transport.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Bridge types
pub use bridge::{
    BindingRegistry, BindingState, Bridge, BridgeBuilder, BridgeOptions, DocumentCapabilities,
    FailureReason, PageFunctionInvoker, TranslationCoordinator,
};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{DocumentId, Namespace, RequestId};

// Language types
pub use language::{
    FixedLocale, HeuristicRecognizer, LanguagePair, LanguageRecognizer, LanguageTag,
    LocaleProvider, SystemLocale,
};

// Protocol types
pub use protocol::{InboundMessage, RemoteCallReply, RemoteCallRequest};

// Script types
pub use script::{
    ContentWorld, InjectionTiming, ScriptInjector, ScriptTemplate, TemplateBindings, UserScript,
};

// Transport types
pub use transport::{ChannelEvent, Connection, ContentChannel, InboundHandler, PendingServer};
