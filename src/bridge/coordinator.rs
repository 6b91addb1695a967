//! Translation coordinator for one document.
//!
//! The coordinator owns a [`DocumentBinding`] and drives it through its
//! lifecycle:
//!
//! 1. [`TranslationCoordinator::inject`] prepares the script, registers the
//!    inbound handler and hands the script to the host's injector.
//! 2. The routine posts `ready`. The inbound loop moves the binding to
//!    `Activating` and spawns the activation task.
//! 3. The activation task guesses the page language and issues
//!    `startTranslation(host, page)`.
//!
//! Inbound events are processed by a single task in arrival order, so a
//! second `ready` always observes the state left by the first one.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::identifiers::{DocumentId, Namespace};
use crate::language::{LanguagePair, LanguageRecognizer, LanguageTag, LocaleProvider};
use crate::script::{ScriptInjector, ScriptTemplate, TemplateBindings};
use crate::transport::{ChannelEvent, ContentChannel};

use super::binding::{BindingState, DocumentBinding, FailureReason};
use super::invoker::PageFunctionInvoker;
use super::options::BridgeOptions;

// ============================================================================
// DocumentCapabilities
// ============================================================================

/// What a coordinator may do with its document.
///
/// The coordinator never sees the host's tab or view, only these handles.
#[derive(Clone)]
pub struct DocumentCapabilities {
    /// The document being translated.
    pub document: DocumentId,
    /// Link to the document's injected routine.
    pub channel: Arc<dyn ContentChannel>,
    /// Source of the host language.
    pub locale: Arc<dyn LocaleProvider>,
}

impl fmt::Debug for DocumentCapabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentCapabilities")
            .field("document", &self.document)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// TranslationCoordinator
// ============================================================================

/// Drives one document from script injection to activated translation.
///
/// Cheap to clone; clones share the binding.
#[derive(Clone)]
pub struct TranslationCoordinator {
    inner: Arc<CoordinatorInner>,
}

/// Shared state of a coordinator.
struct CoordinatorInner {
    binding: DocumentBinding,
    invoker: PageFunctionInvoker,
    channel: Arc<dyn ContentChannel>,
    locale: Arc<dyn LocaleProvider>,
    /// Owned by the in-flight guess; reset before every use.
    recognizer: Mutex<Box<dyn LanguageRecognizer>>,
    options: Arc<BridgeOptions>,
    /// Cancelled on teardown or terminal failure.
    cancel: CancellationToken,
    /// Serializes the activation commit against teardown.
    commit: AsyncMutex<()>,
    /// Inbound loop and activation task handles.
    tasks: Mutex<Vec<JoinHandle<()>>>,
    /// Set once injection has been attempted.
    injection_started: Mutex<bool>,
    /// Pair passed to `startTranslation`.
    language_pair: Mutex<Option<LanguagePair>>,
}

impl fmt::Debug for TranslationCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranslationCoordinator")
            .field("document", &self.inner.binding.document())
            .field("namespace", self.inner.binding.namespace())
            .field("state", &self.inner.binding.state())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// TranslationCoordinator - Constructor
// ============================================================================

impl TranslationCoordinator {
    /// Creates a coordinator in the `Idle` state.
    ///
    /// A fresh namespace is generated from the options' prefix.
    #[must_use]
    pub fn new(
        capabilities: DocumentCapabilities,
        recognizer: Box<dyn LanguageRecognizer>,
        options: Arc<BridgeOptions>,
    ) -> Self {
        let DocumentCapabilities {
            document,
            channel,
            locale,
        } = capabilities;

        let namespace = Namespace::generate(&options.namespace_prefix);
        let invoker = PageFunctionInvoker::new(
            Arc::clone(&channel),
            namespace.clone(),
            options.call_timeout,
        );

        debug!(%document, %namespace, "Created translation coordinator");

        Self {
            inner: Arc::new(CoordinatorInner {
                binding: DocumentBinding::new(document, namespace),
                invoker,
                channel,
                locale,
                recognizer: Mutex::new(recognizer),
                options,
                cancel: CancellationToken::new(),
                commit: AsyncMutex::new(()),
                tasks: Mutex::new(Vec::new()),
                injection_started: Mutex::new(false),
                language_pair: Mutex::new(None),
            }),
        }
    }
}

// ============================================================================
// TranslationCoordinator - Accessors
// ============================================================================

impl TranslationCoordinator {
    /// Returns the bound document.
    #[inline]
    #[must_use]
    pub fn document(&self) -> DocumentId {
        self.inner.binding.document()
    }

    /// Returns the binding namespace.
    #[inline]
    #[must_use]
    pub fn namespace(&self) -> &Namespace {
        self.inner.binding.namespace()
    }

    /// Returns the current lifecycle state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> BindingState {
        self.inner.binding.state()
    }

    /// Subscribes to lifecycle state changes.
    #[inline]
    #[must_use]
    pub fn state_changes(&self) -> watch::Receiver<BindingState> {
        self.inner.binding.subscribe()
    }

    /// Returns the last recorded error, if any.
    #[inline]
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.inner.binding.last_error()
    }

    /// Returns the pair passed to `startTranslation`, once activated.
    #[inline]
    #[must_use]
    pub fn language_pair(&self) -> Option<LanguagePair> {
        self.inner.language_pair.lock().clone()
    }

    /// Waits until the binding is `Activated` or `Failed`.
    pub async fn settled(&self) -> BindingState {
        let mut changes = self.state_changes();
        match changes.wait_for(BindingState::is_settled).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        }
    }
}

// ============================================================================
// TranslationCoordinator - Lifecycle
// ============================================================================

impl TranslationCoordinator {
    /// Prepares the script and injects it into the document.
    ///
    /// Registers the inbound handler first, so a `ready` posted while the
    /// injector is still running is queued, not lost. On success the
    /// binding is `Injected`; on failure it is `Failed`.
    ///
    /// # Errors
    ///
    /// - [`Error::Lifecycle`] if injection was already attempted
    /// - [`Error::Template`] if the template has an unbound placeholder
    /// - [`Error::Injection`] (or the injector's error) if injection failed
    /// - [`Error::Cancelled`] if the binding was torn down meanwhile
    pub async fn inject(
        &self,
        template: &ScriptTemplate,
        injector: &dyn ScriptInjector,
    ) -> Result<()> {
        let inner = &self.inner;
        {
            let mut started = inner.injection_started.lock();
            if *started {
                return Err(Error::lifecycle("inject", inner.binding.state()));
            }
            *started = true;
        }

        let state = inner.binding.state();
        if state != BindingState::Idle {
            return Err(Error::lifecycle("inject", state));
        }

        let namespace = inner.binding.namespace();
        let document = inner.binding.document();

        let bindings = TemplateBindings::for_binding(namespace, &inner.options.message_handler);
        let source = match template.prepare(&bindings) {
            Ok(source) => source,
            Err(e) => {
                inner.fail_injection(&e);
                return Err(e);
            }
        };
        let script = inner.options.user_script(source);

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        inner.channel.set_inbound_handler(
            namespace,
            Box::new(move |event: ChannelEvent| {
                let _ = event_tx.send(event);
            }),
        );

        debug!(%document, %namespace, timing = %script.timing, world = %script.content_world, "Injecting script");

        if let Err(e) = injector.inject(document, &script).await {
            inner.channel.clear_inbound_handler(namespace);
            inner.fail_injection(&e);
            return Err(e);
        }

        if let Err(e) = inner
            .binding
            .transition("inject", &BindingState::Idle, BindingState::Injected)
        {
            inner.channel.clear_inbound_handler(namespace);
            debug!(%document, %namespace, error = %e, "Injection completed after teardown");
            return Err(Error::Cancelled);
        }

        let handle = tokio::spawn(run_inbound_loop(
            Arc::downgrade(inner),
            event_rx,
            inner.cancel.clone(),
        ));
        inner.tasks.lock().push(handle);

        info!(%document, %namespace, "Translation script injected");
        Ok(())
    }

    /// Tears the binding down.
    ///
    /// Cancels any suspended call, moves the binding to
    /// `Failed(cancelled)` unless it already failed, and waits for the
    /// binding's tasks to finish. Idempotent.
    pub async fn teardown(&self) {
        let inner = &self.inner;
        {
            let _commit = inner.commit.lock().await;
            if inner.binding.cancel() {
                inner.binding.record_error(FailureReason::Cancelled.to_string());
                info!(
                    document = %inner.binding.document(),
                    namespace = %inner.binding.namespace(),
                    "Binding torn down"
                );
            }
            inner.cancel.cancel();
        }

        inner.channel.clear_inbound_handler(inner.binding.namespace());

        // Awaiting the inbound loop may surface an activation it spawned.
        loop {
            let handles = std::mem::take(&mut *inner.tasks.lock());
            if handles.is_empty() {
                break;
            }
            for handle in handles {
                if let Err(e) = handle.await
                    && e.is_panic()
                {
                    error!(namespace = %inner.binding.namespace(), error = %e, "Binding task panicked");
                }
            }
        }
    }
}

// ============================================================================
// TranslationCoordinator - Page Queries
// ============================================================================

impl TranslationCoordinator {
    /// Returns the serialized document markup.
    ///
    /// # Errors
    ///
    /// Returns fatal transport errors only; other failures yield `None`.
    pub async fn page_source(&self) -> Result<Option<String>> {
        self.inner.invoker.page_source().await
    }

    /// Returns `(host language, page language)`.
    ///
    /// The page language is guessed the same way activation guesses it.
    ///
    /// # Errors
    ///
    /// Returns fatal transport errors only.
    pub async fn language_info(&self) -> Result<(LanguageTag, LanguageTag)> {
        let page = self.inner.guess_page_language().await?;
        Ok((self.inner.locale.current_language(), page))
    }
}

// ============================================================================
// Inbound Processing
// ============================================================================

/// Processes inbound events for one binding, in arrival order.
async fn run_inbound_loop(
    inner: Weak<CoordinatorInner>,
    mut events: mpsc::UnboundedReceiver<ChannelEvent>,
    cancel: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            event = events.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };

        let Some(inner) = inner.upgrade() else {
            break;
        };
        CoordinatorInner::handle_event(&inner, event);
    }
}

impl CoordinatorInner {
    fn handle_event(this: &Arc<Self>, event: ChannelEvent) {
        let namespace = this.binding.namespace();

        match event {
            ChannelEvent::Message(message) if message.is_ready() => {
                if let Err(e) =
                    this.binding
                        .transition("accept ready", &BindingState::Injected, BindingState::Ready)
                {
                    warn!(%namespace, error = %e, "Discarding ready message");
                    return;
                }

                if this
                    .binding
                    .transition("activate", &BindingState::Ready, BindingState::Activating)
                    .is_ok()
                {
                    let handle = tokio::spawn(Self::activate(Arc::clone(this)));
                    this.tasks.lock().push(handle);
                }
            }
            ChannelEvent::Message(message) => {
                warn!(
                    %namespace,
                    command = %message.command,
                    state = %this.binding.state(),
                    "Discarding unknown message"
                );
            }
            ChannelEvent::Destroyed { reason } => {
                debug!(%namespace, %reason, "Document destroyed");
                this.terminate(FailureReason::DocumentDestroyed(reason));
            }
            ChannelEvent::Disconnected => {
                this.terminate(FailureReason::TransportClosed);
            }
        }
    }

    /// Fails the binding and stops its tasks.
    fn terminate(&self, reason: FailureReason) {
        if self.binding.fail(reason.clone()) {
            error!(
                namespace = %self.binding.namespace(),
                document = %self.binding.document(),
                %reason,
                "Binding failed"
            );
        }
        self.cancel.cancel();
    }

    fn fail_injection(&self, e: &Error) {
        let reason = FailureReason::InjectionFailed(e.to_string());
        self.binding.update(|current| {
            (*current == BindingState::Idle).then(|| BindingState::Failed(reason))
        });
        self.binding.record_error(e.to_string());
        error!(
            document = %self.binding.document(),
            namespace = %self.binding.namespace(),
            error = %e,
            "Script injection failed"
        );
    }
}

// ============================================================================
// Activation
// ============================================================================

impl CoordinatorInner {
    /// Guesses the page language and starts translation.
    async fn activate(self: Arc<Self>) {
        let namespace = self.binding.namespace();

        let guessed = tokio::select! {
            biased;
            () = self.cancel.cancelled() => {
                debug!(%namespace, "Activation cancelled");
                return;
            }
            guessed = self.guess_page_language() => guessed,
        };

        let page_language = match guessed {
            Ok(language) => language,
            Err(e) => {
                self.binding.record_error(e.to_string());
                self.terminate(failure_reason(&e));
                return;
            }
        };

        let pair = LanguagePair::new(self.locale.current_language(), page_language);

        let _commit = self.commit.lock().await;
        if self.cancel.is_cancelled() || self.binding.state() != BindingState::Activating {
            debug!(%namespace, state = %self.binding.state(), "Activation abandoned");
            return;
        }

        *self.language_pair.lock() = Some(pair.clone());
        info!(%namespace, document = %self.binding.document(), %pair, "Starting translation");

        if let Err(e) = self.invoker.start_translation(&pair).await {
            warn!(%namespace, error = %e, "startTranslation not delivered");
            self.binding.record_error(e.to_string());
        }

        if let Err(e) =
            self.binding
                .transition("complete activation", &BindingState::Activating, BindingState::Activated)
        {
            debug!(%namespace, error = %e, "Activation superseded");
        }
    }

    /// Guesses the page language.
    ///
    /// Tries, in order: recognizing the raw page source, the language the
    /// page declares, and the host locale. A declared code is canonicalized
    /// (`pt_BR` becomes `pt-BR`) before it is passed on.
    async fn guess_page_language(&self) -> Result<LanguageTag> {
        let namespace = self.binding.namespace();

        if let Some(source) = self.invoker.raw_page_source().await?
            && !source.is_empty()
        {
            let detected = {
                let mut recognizer = self.recognizer.lock();
                recognizer.reset();
                recognizer.process_sample(&source);
                recognizer.dominant_language()
            };

            if !detected.is_undetermined() {
                debug!(%namespace, language = %detected, "Recognized page language");
                return Ok(detected);
            }
            debug!(%namespace, "Page source language undetermined");
        }

        if let Some(code) = self.invoker.page_language().await? {
            match LanguageTag::parse(&code) {
                Some(language) if !language.is_undetermined() => {
                    debug!(%namespace, %language, "Using declared page language");
                    return Ok(language);
                }
                _ => debug!(%namespace, %code, "Declared page language unusable"),
            }
        }

        let language = self.locale.current_language();
        debug!(%namespace, %language, "Falling back to host language");
        Ok(language)
    }
}

impl Drop for CoordinatorInner {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.channel.clear_inbound_handler(self.binding.namespace());
    }
}

/// Maps a fatal error to the binding's failure reason.
fn failure_reason(e: &Error) -> FailureReason {
    match e {
        Error::Cancelled => FailureReason::Cancelled,
        Error::ConnectionClosed { .. } | Error::WebSocket(_) | Error::ChannelClosed(_) => {
            FailureReason::TransportClosed
        }
        Error::DocumentDestroyed { .. } => FailureReason::DocumentDestroyed(e.to_string()),
        other => FailureReason::Communication(other.to_string()),
    }
}

// ============================================================================
// Tests
// ============================================================================
