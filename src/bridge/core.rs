//! Bridge entry point.
//!
//! The [`Bridge`] holds what every binding shares (script template,
//! injector, locale provider, options) and the registry of live bindings.
//! A binding that fails on its own (document destroyed, transport closed)
//! is dropped from the registry and torn down without host involvement.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use page_translate_bridge::{Bridge, ContentChannel, DocumentId, Result, ScriptInjector};
//!
//! # async fn example(
//! #     injector: Arc<impl ScriptInjector + 'static>,
//! #     channel: Arc<dyn ContentChannel>,
//! # ) -> Result<()> {
//! let bridge = Bridge::builder()
//!     .script("window.__firefox__.$<brave_translate_script> = {};")
//!     .injector(injector)
//!     .build()?;
//!
//! let document = DocumentId::next();
//! let coordinator = bridge.attach(document, channel).await?;
//! let state = coordinator.settled().await;
//!
//! bridge.shutdown().await;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::{Arc, Weak};

use tokio::sync::watch;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::identifiers::{DocumentId, Namespace};
use crate::language::{LanguageTag, LocaleProvider};
use crate::script::{ScriptInjector, ScriptTemplate};
use crate::transport::ContentChannel;

use super::binding::BindingState;
use super::builder::{BridgeBuilder, RecognizerFactory};
use super::coordinator::{DocumentCapabilities, TranslationCoordinator};
use super::options::BridgeOptions;
use super::registry::BindingRegistry;

// ============================================================================
// Types
// ============================================================================

/// Internal shared state for the bridge.
pub(crate) struct BridgeInner {
    /// Translation script template.
    pub template: ScriptTemplate,

    /// Host hook installing the script.
    pub injector: Arc<dyn ScriptInjector>,

    /// Host language source.
    pub locale: Arc<dyn LocaleProvider>,

    /// Creates one recognizer per binding.
    pub recognizer: RecognizerFactory,

    /// Options shared by every binding.
    pub options: Arc<BridgeOptions>,

    /// Live bindings by document.
    pub registry: BindingRegistry,
}

// ============================================================================
// Bridge
// ============================================================================

/// Attaches translation to documents and tracks the resulting bindings.
///
/// Cheap to clone; clones share the registry.
#[derive(Clone)]
pub struct Bridge {
    /// Shared inner state.
    pub(crate) inner: Arc<BridgeInner>,
}

// ============================================================================
// Bridge - Display
// ============================================================================

impl fmt::Debug for Bridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bridge")
            .field("options", &self.inner.options)
            .field("binding_count", &self.binding_count())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Bridge - Public API
// ============================================================================

impl Bridge {
    /// Creates a configuration builder for the bridge.
    #[inline]
    #[must_use]
    pub fn builder() -> BridgeBuilder {
        BridgeBuilder::new()
    }

    /// Binds `document` and injects the translation script into it.
    ///
    /// The returned coordinator activates translation on its own once the
    /// injected routine reports `ready`.
    ///
    /// # Errors
    ///
    /// - [`Error::Lifecycle`] if `document` is already bound
    /// - any error from [`TranslationCoordinator::inject`]; the failed
    ///   binding is not kept
    ///
    /// A binding that later fails is removed from the registry as well.
    pub async fn attach(
        &self,
        document: DocumentId,
        channel: Arc<dyn ContentChannel>,
    ) -> Result<TranslationCoordinator> {
        let coordinator = TranslationCoordinator::new(
            DocumentCapabilities {
                document,
                channel,
                locale: Arc::clone(&self.inner.locale),
            },
            (self.inner.recognizer)(),
            Arc::clone(&self.inner.options),
        );

        self.inner.registry.insert(coordinator.clone())?;

        if let Err(e) = coordinator
            .inject(&self.inner.template, self.inner.injector.as_ref())
            .await
        {
            self.inner.registry.remove(document);
            coordinator.teardown().await;
            return Err(e);
        }

        tokio::spawn(Self::forget_on_failure(
            Arc::downgrade(&self.inner),
            document,
            coordinator.namespace().clone(),
            coordinator.state_changes(),
        ));

        debug!(
            %document,
            namespace = %coordinator.namespace(),
            binding_count = self.binding_count(),
            "Document attached"
        );

        Ok(coordinator)
    }

    /// Returns the coordinator bound to `document`.
    #[inline]
    #[must_use]
    pub fn coordinator(&self, document: DocumentId) -> Option<TranslationCoordinator> {
        self.inner.registry.get(document)
    }

    /// Tears down the binding of `document` and forgets it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DocumentNotBound`] if `document` has no binding.
    pub async fn teardown(&self, document: DocumentId) -> Result<()> {
        let coordinator = self
            .inner
            .registry
            .remove(document)
            .ok_or_else(|| Error::document_not_bound(document))?;

        coordinator.teardown().await;
        Ok(())
    }

    /// Tears down every binding.
    pub async fn shutdown(&self) {
        let coordinators = self.inner.registry.drain();
        info!(count = coordinators.len(), "Tearing down all bindings");

        for coordinator in coordinators {
            coordinator.teardown().await;
        }
    }

    /// Returns the number of live bindings.
    #[inline]
    #[must_use]
    pub fn binding_count(&self) -> usize {
        self.inner.registry.len()
    }

    /// Returns the documents with a live binding.
    #[inline]
    #[must_use]
    pub fn documents(&self) -> Vec<DocumentId> {
        self.inner.registry.documents()
    }

    /// Returns the host's current language.
    #[inline]
    #[must_use]
    pub fn host_language(&self) -> LanguageTag {
        self.inner.locale.current_language()
    }

    /// Returns the shared options.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &BridgeOptions {
        &self.inner.options
    }
}

// ============================================================================
// Bridge - Internal API
// ============================================================================

impl Bridge {
    /// Drops a binding from the registry once it fails.
    async fn forget_on_failure(
        inner: Weak<BridgeInner>,
        document: DocumentId,
        namespace: Namespace,
        mut changes: watch::Receiver<BindingState>,
    ) {
        let reason = match changes.wait_for(BindingState::is_failed).await {
            Ok(state) => state.to_string(),
            Err(_) => return,
        };

        let Some(inner) = inner.upgrade() else {
            return;
        };
        let Some(coordinator) = inner.registry.remove_binding(document, &namespace) else {
            return;
        };

        debug!(%document, %namespace, %reason, "Forgetting failed binding");
        coordinator.teardown().await;
    }

    /// Creates a bridge from validated parts.
    pub(crate) fn new(
        template: ScriptTemplate,
        injector: Arc<dyn ScriptInjector>,
        locale: Arc<dyn LocaleProvider>,
        recognizer: RecognizerFactory,
        options: Arc<BridgeOptions>,
    ) -> Self {
        info!(
            prefix = %options.namespace_prefix,
            timing = %options.timing,
            call_timeout_ms = options.call_timeout.as_millis() as u64,
            "Bridge initialized"
        );

        Self {
            inner: Arc::new(BridgeInner {
                template,
                injector,
                locale,
                recognizer,
                options,
                registry: BindingRegistry::new(),
            }),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
