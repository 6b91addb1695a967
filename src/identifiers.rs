//! Type-safe identifiers for bridge entities.
//!
//! Newtype wrappers prevent mixing incompatible IDs at compile time.
//!
//! | Type | Underlying | Purpose |
//! |------|------------|---------|
//! | [`RequestId`] | UUID v4 | Request/response and event/reply correlation |
//! | [`DocumentId`] | `u64` | Host-side reference to a rendered document |
//! | [`Namespace`] | `String` | Per-binding message channel key |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::num::NonZeroU64;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// RequestId
// ============================================================================

/// Correlation identifier for a single outbound call or inbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Generates a fresh random ID.
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[inline]
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for RequestId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// DocumentId
// ============================================================================

/// Next document ID to hand out (0 is reserved).
static NEXT_DOCUMENT_ID: AtomicU64 = AtomicU64::new(1);

/// Host-side identifier for a rendered document.
///
/// A back-reference only: looking the document up is the host's business,
/// holding the ID never keeps a document alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(NonZeroU64);

impl DocumentId {
    /// Allocates a process-unique document ID.
    #[inline]
    #[must_use]
    pub fn next() -> Self {
        let raw = NEXT_DOCUMENT_ID.fetch_add(1, Ordering::Relaxed);
        // Counter starts at 1 and would need 2^64 allocations to wrap.
        Self(NonZeroU64::new(raw).unwrap_or(NonZeroU64::MIN))
    }

    /// Wraps a host-assigned ID. Returns `None` for 0.
    #[inline]
    #[must_use]
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "document#{}", self.0)
    }
}

// ============================================================================
// Namespace
// ============================================================================

/// Key that isolates one binding's traffic on a shared transport.
///
/// Generated per binding at injection time and substituted into the
/// injected script, so two documents never share a channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Namespace(Arc<str>);

impl Namespace {
    /// Generates `<prefix>_<32 hex digits>`.
    #[must_use]
    pub fn generate(prefix: &str) -> Self {
        Self(format!("{prefix}_{}", Uuid::new_v4().simple()).into())
    }

    /// Returns the namespace as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Namespace {
    fn from(value: &str) -> Self {
        Self(value.into())
    }
}

impl From<String> for Namespace {
    fn from(value: String) -> Self {
        Self(value.into())
    }
}

impl AsRef<str> for Namespace {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================
