//! Typed calls into the injected routine.
//!
//! Reads degrade softly: a missing value, a value that is not a string, a
//! remote error, or a timeout yields `Ok(None)` and a warning. Only errors
//! that end the binding (transport closed, document destroyed) are
//! returned.
//!
//! Every call is bounded by the invoker's call timeout, whatever the
//! channel does on its own.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::identifiers::Namespace;
use crate::language::LanguagePair;
use crate::protocol::{RemoteCallReply, RemoteCallRequest};
use crate::transport::ContentChannel;

// ============================================================================
// Constants
// ============================================================================

/// Serialized document markup.
pub const GET_PAGE_SOURCE: &str = "getPageSource";

/// Document text as served, before script mutation.
pub const GET_RAW_PAGE_SOURCE: &str = "getRawPageSource";

/// Language the document declares about itself.
pub const GET_PAGE_LANGUAGE: &str = "getPageLanguage";

/// Starts in-document translation with `(source, target)`.
pub const START_TRANSLATION: &str = "startTranslation";

// ============================================================================
// PageFunctionInvoker
// ============================================================================

/// Calls the routine's functions for one binding.
#[derive(Clone)]
pub struct PageFunctionInvoker {
    channel: Arc<dyn ContentChannel>,
    namespace: Namespace,
    call_timeout: Duration,
}

impl std::fmt::Debug for PageFunctionInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageFunctionInvoker")
            .field("namespace", &self.namespace)
            .field("call_timeout", &self.call_timeout)
            .finish_non_exhaustive()
    }
}

impl PageFunctionInvoker {
    /// Creates an invoker addressing `namespace` over `channel`.
    ///
    /// Calls that take longer than `call_timeout` are abandoned.
    #[must_use]
    pub fn new(
        channel: Arc<dyn ContentChannel>,
        namespace: Namespace,
        call_timeout: Duration,
    ) -> Self {
        Self {
            channel,
            namespace,
            call_timeout,
        }
    }

    /// Returns the timeout applied to every call.
    #[inline]
    #[must_use]
    pub const fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    /// Returns the namespace calls are addressed to.
    #[inline]
    #[must_use]
    pub const fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Returns the serialized document markup.
    ///
    /// # Errors
    ///
    /// Returns fatal transport errors only.
    pub async fn page_source(&self) -> Result<Option<String>> {
        self.read_string(GET_PAGE_SOURCE).await
    }

    /// Returns the document text as served.
    ///
    /// # Errors
    ///
    /// Returns fatal transport errors only.
    pub async fn raw_page_source(&self) -> Result<Option<String>> {
        self.read_string(GET_RAW_PAGE_SOURCE).await
    }

    /// Returns the language code the document declares.
    ///
    /// # Errors
    ///
    /// Returns fatal transport errors only.
    pub async fn page_language(&self) -> Result<Option<String>> {
        self.read_string(GET_PAGE_LANGUAGE).await
    }

    /// Starts translation from `pair.source` to `pair.target`.
    ///
    /// Does not wait for a reply; transmission failures are logged by the
    /// channel.
    ///
    /// # Errors
    ///
    /// Returns errors the channel reports before transmission, or
    /// [`Error::CallTimeout`] if the channel did not take the call in time.
    pub async fn start_translation(&self, pair: &LanguagePair) -> Result<()> {
        let request = RemoteCallRequest::fire_and_forget(
            START_TRANSLATION,
            vec![
                Value::from(pair.source.as_str()),
                Value::from(pair.target.as_str()),
            ],
        );
        self.call(request).await.map(drop)
    }

    /// Sends `request`, giving up after the call timeout.
    async fn call(&self, request: RemoteCallRequest) -> Result<RemoteCallReply> {
        let function = request.function_name.clone();
        let call = self.channel.send_remote_call(&self.namespace, request);

        match timeout(self.call_timeout, call).await {
            Ok(outcome) => outcome,
            Err(_) => {
                debug!(namespace = %self.namespace, %function, "Page function timed out");
                Err(Error::call_timeout(
                    function,
                    self.call_timeout.as_millis() as u64,
                ))
            }
        }
    }

    /// Calls `function` and decodes a string reply.
    async fn read_string(&self, function: &str) -> Result<Option<String>> {
        let request = RemoteCallRequest::awaited(function, Vec::new());

        let reply = match self.call(request).await {
            Ok(reply) => reply,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(namespace = %self.namespace, function, error = %e, "Page function failed");
                return Ok(None);
            }
        };

        match reply.into_string(function) {
            Ok(value) => {
                debug!(namespace = %self.namespace, function, len = value.len(), "Page function returned");
                Ok(Some(value))
            }
            Err(e) => {
                warn!(namespace = %self.namespace, function, error = %e, "Page function result unusable");
                Ok(None)
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
