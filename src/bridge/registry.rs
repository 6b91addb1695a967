//! Host-owned lookup from document to coordinator.
//!
//! The host owns its documents; a coordinator only holds a [`DocumentId`].
//! Anything that needs to get from a document back to its coordinator goes
//! through the registry.

// ============================================================================
// Imports
// ============================================================================

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::identifiers::{DocumentId, Namespace};

use super::coordinator::TranslationCoordinator;

// ============================================================================
// BindingRegistry
// ============================================================================

/// Coordinators keyed by the document they are bound to.
#[derive(Debug, Default)]
pub struct BindingRegistry {
    bindings: Mutex<FxHashMap<DocumentId, TranslationCoordinator>>,
}

impl BindingRegistry {
    /// Creates an empty registry.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `coordinator` under its document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Lifecycle`] if the document already has a binding.
    pub fn insert(&self, coordinator: TranslationCoordinator) -> Result<()> {
        let mut bindings = self.bindings.lock();
        let document = coordinator.document();

        if let Some(existing) = bindings.get(&document) {
            return Err(Error::lifecycle(
                format!("bind {document}"),
                existing.state(),
            ));
        }

        bindings.insert(document, coordinator);
        Ok(())
    }

    /// Returns the coordinator bound to `document`.
    #[must_use]
    pub fn get(&self, document: DocumentId) -> Option<TranslationCoordinator> {
        self.bindings.lock().get(&document).cloned()
    }

    /// Removes and returns the coordinator bound to `document`.
    pub fn remove(&self, document: DocumentId) -> Option<TranslationCoordinator> {
        self.bindings.lock().remove(&document)
    }

    /// Removes the coordinator bound to `document` only if it is still the
    /// binding for `namespace`.
    ///
    /// A document that was torn down and attached again keeps its new
    /// binding.
    pub fn remove_binding(
        &self,
        document: DocumentId,
        namespace: &Namespace,
    ) -> Option<TranslationCoordinator> {
        let mut bindings = self.bindings.lock();
        match bindings.get(&document) {
            Some(current) if current.namespace() == namespace => bindings.remove(&document),
            _ => None,
        }
    }

    /// Removes and returns every coordinator.
    pub fn drain(&self) -> Vec<TranslationCoordinator> {
        self.bindings.lock().drain().map(|(_, c)| c).collect()
    }

    /// Returns the number of registered bindings.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.lock().len()
    }

    /// Returns `true` if no binding is registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.lock().is_empty()
    }

    /// Returns the documents with a binding.
    #[must_use]
    pub fn documents(&self) -> Vec<DocumentId> {
        let mut documents: Vec<_> = self.bindings.lock().keys().copied().collect();
        documents.sort_unstable();
        documents
    }
}

// ============================================================================
// Tests
// ============================================================================
