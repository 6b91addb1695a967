//! Per-document binding state.
//!
//! ```text
//! Idle ──inject──▶ Injected ──ready──▶ Ready ──▶ Activating ──▶ Activated
//!   │                 │                  │           │
//!   └────────┬────────┴──────────────────┴───────────┘
//!            ▼
//!     Failed(reason)
//! ```
//!
//! `Ready` is only observable for the instant between the `ready` message
//! and the start of activation; the inbound loop makes both transitions
//! before it looks at the next message.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::debug;

use crate::error::{Error, Result};
use crate::identifiers::{DocumentId, Namespace};

// ============================================================================
// FailureReason
// ============================================================================

/// Why a binding ended in [`BindingState::Failed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The host tore the binding down.
    Cancelled,
    /// The transport to the document closed.
    TransportClosed,
    /// The document's execution context was destroyed.
    DocumentDestroyed(String),
    /// The host could not install the script.
    InjectionFailed(String),
    /// A fatal communication error during activation.
    Communication(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => f.write_str("cancelled"),
            Self::TransportClosed => f.write_str("transport closed"),
            Self::DocumentDestroyed(reason) => write!(f, "document destroyed: {reason}"),
            Self::InjectionFailed(reason) => write!(f, "injection failed: {reason}"),
            Self::Communication(reason) => write!(f, "communication failure: {reason}"),
        }
    }
}

// ============================================================================
// BindingState
// ============================================================================

/// Lifecycle state of a [`DocumentBinding`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingState {
    /// Created, script not yet injected.
    Idle,
    /// Script installed, waiting for `ready`.
    Injected,
    /// `ready` received.
    Ready,
    /// Guessing the page language and starting translation.
    Activating,
    /// `startTranslation` was issued.
    Activated,
    /// Terminal failure.
    Failed(FailureReason),
}

impl BindingState {
    /// Returns `true` for [`BindingState::Failed`].
    #[inline]
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Returns `true` once no further transition is expected.
    #[inline]
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        matches!(self, Self::Activated | Self::Failed(_))
    }

    /// Returns `true` if a fatal transport error moves this state to
    /// [`BindingState::Failed`].
    #[inline]
    #[must_use]
    pub const fn can_fail(&self) -> bool {
        matches!(self, Self::Injected | Self::Ready | Self::Activating)
    }

    /// Short state name for logs and errors.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Injected => "injected",
            Self::Ready => "ready",
            Self::Activating => "activating",
            Self::Activated => "activated",
            Self::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for BindingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(reason) => write!(f, "failed({reason})"),
            other => f.write_str(other.name()),
        }
    }
}

// ============================================================================
// DocumentBinding
// ============================================================================

/// One document under translation.
///
/// Owns the document handle and the lifecycle state. Only the coordinator
/// holding the binding mutates its state.
#[derive(Debug)]
pub struct DocumentBinding {
    document: DocumentId,
    namespace: Namespace,
    state: watch::Sender<BindingState>,
    last_error: Mutex<Option<String>>,
}

impl DocumentBinding {
    /// Creates a binding in [`BindingState::Idle`].
    #[must_use]
    pub fn new(document: DocumentId, namespace: Namespace) -> Self {
        let (state, _) = watch::channel(BindingState::Idle);
        Self {
            document,
            namespace,
            state,
            last_error: Mutex::new(None),
        }
    }

    /// Returns the bound document.
    #[inline]
    #[must_use]
    pub const fn document(&self) -> DocumentId {
        self.document
    }

    /// Returns the binding namespace.
    #[inline]
    #[must_use]
    pub const fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Returns a snapshot of the current state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> BindingState {
        self.state.borrow().clone()
    }

    /// Subscribes to state changes.
    #[inline]
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<BindingState> {
        self.state.subscribe()
    }

    /// Returns the last recorded error, if any.
    #[inline]
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }

    /// Records an error message.
    pub(crate) fn record_error(&self, message: impl Into<String>) {
        *self.last_error.lock() = Some(message.into());
    }

    /// Moves `from → to` atomically.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Lifecycle`] naming `operation` if the current state
    /// is not `from`.
    pub(crate) fn transition(
        &self,
        operation: &str,
        from: &BindingState,
        to: BindingState,
    ) -> Result<()> {
        let mut observed = None;
        let changed = self.state.send_if_modified(|current| {
            if current == from {
                *current = to.clone();
                true
            } else {
                observed = Some(current.clone());
                false
            }
        });

        if changed {
            debug!(
                namespace = %self.namespace,
                document = %self.document,
                from = %from,
                to = %to,
                "Binding state changed"
            );
            return Ok(());
        }

        let state = observed.unwrap_or_else(|| self.state());
        Err(Error::lifecycle(operation, state))
    }

    /// Runs `step` on the state under the binding's lock.
    ///
    /// `step` returns the new state, or `None` to leave it unchanged.
    /// Returns the state after the step.
    pub(crate) fn update<F>(&self, step: F) -> BindingState
    where
        F: FnOnce(&BindingState) -> Option<BindingState>,
    {
        self.state.send_if_modified(|current| {
            match step(current) {
                Some(next) if next != *current => {
                    debug!(
                        namespace = %self.namespace,
                        document = %self.document,
                        from = %current,
                        to = %next,
                        "Binding state changed"
                    );
                    *current = next;
                    true
                }
                _ => false,
            }
        });
        self.state()
    }

    /// Moves to [`BindingState::Failed`] if the state allows it.
    ///
    /// Returns `true` if the binding failed because of this call.
    pub(crate) fn fail(&self, reason: FailureReason) -> bool {
        let mut failed = false;
        self.update(|current| {
            if current.can_fail() {
                failed = true;
                Some(BindingState::Failed(reason))
            } else {
                None
            }
        });
        if failed {
            self.record_error(self.state().to_string());
        }
        failed
    }

    /// Moves to [`BindingState::Failed`] from any non-failed state.
    ///
    /// Returns `true` if the binding failed because of this call.
    pub(crate) fn cancel(&self) -> bool {
        let mut cancelled = false;
        self.update(|current| {
            if current.is_failed() {
                None
            } else {
                cancelled = true;
                Some(BindingState::Failed(FailureReason::Cancelled))
            }
        });
        cancelled
    }
}

// ============================================================================
// Tests
// ============================================================================
