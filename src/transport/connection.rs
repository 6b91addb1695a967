//! WebSocket connection and event loop.
//!
//! This module handles the WebSocket link to the relay that fronts the
//! injected routines, including request/response correlation and routing
//! of inbound events to per-namespace handlers.
//!
//! # Event Loop
//!
//! The connection spawns a tokio task that handles:
//!
//! - Incoming messages (responses, events)
//! - Outgoing calls from the Rust API
//! - Request/response correlation by UUID
//! - Inbound handler callbacks and message acknowledgements

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::{from_str, to_string};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::{Namespace, RequestId};
use crate::protocol::event::MESSAGE_METHOD;
use crate::protocol::{Event, EventReply, ParsedEvent, Request, Response};

use super::channel::{ChannelEvent, InboundHandler};

// ============================================================================
// Constants
// ============================================================================

/// Default timeout for awaited calls.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum pending requests before rejecting new ones.
const MAX_PENDING_REQUESTS: usize = 100;

// ============================================================================
// Types
// ============================================================================

/// An awaited call waiting for its response.
struct PendingEntry {
    /// Binding the call was addressed to.
    namespace: Namespace,
    /// Remote function being called.
    function: String,
    /// Channel back to the caller.
    response_tx: oneshot::Sender<Result<Response>>,
}

/// Map of request IDs to pending calls.
type CorrelationMap = FxHashMap<RequestId, PendingEntry>;

/// Map of namespaces to inbound handlers.
type HandlerMap = FxHashMap<Namespace, InboundHandler>;

/// Write half of the WebSocket.
type WsSink<S> = SplitSink<WebSocketStream<S>, Message>;

// ============================================================================
// ConnectionCommand
// ============================================================================

/// Internal commands for the event loop.
enum ConnectionCommand {
    /// Send a request and wait for response.
    Send {
        request: Request,
        response_tx: oneshot::Sender<Result<Response>>,
    },
    /// Send a request nobody waits a response for.
    Post {
        request: Request,
        sent_tx: oneshot::Sender<Result<()>>,
    },
    /// Remove an abandoned correlation entry.
    RemoveCorrelation(RequestId),
    /// Shutdown the connection.
    Shutdown,
}

// ============================================================================
// Connection
// ============================================================================

/// WebSocket connection to the document relay.
///
/// Handles request/response correlation and inbound event routing.
/// The connection spawns an internal event loop task.
///
/// # Thread Safety
///
/// `Connection` is `Send + Sync` and can be shared across tasks.
/// All operations are non-blocking.
pub struct Connection {
    /// Channel for sending commands to the event loop.
    command_tx: mpsc::UnboundedSender<ConnectionCommand>,
    /// Correlation map (shared with event loop).
    correlation: Arc<Mutex<CorrelationMap>>,
    /// Inbound handlers (shared with event loop).
    handlers: Arc<Mutex<HandlerMap>>,
    /// Set once the event loop has terminated.
    closed: Arc<AtomicBool>,
    /// Timeout applied by [`Connection::send`].
    call_timeout: Duration,
}

impl Clone for Connection {
    fn clone(&self) -> Self {
        Self {
            command_tx: self.command_tx.clone(),
            correlation: Arc::clone(&self.correlation),
            handlers: Arc::clone(&self.handlers),
            closed: Arc::clone(&self.closed),
            call_timeout: self.call_timeout,
        }
    }
}

impl Connection {
    /// Creates a new connection from a WebSocket stream.
    ///
    /// Spawns the event loop task internally.
    pub fn new<S>(ws_stream: WebSocketStream<S>) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let correlation = Arc::new(Mutex::new(CorrelationMap::default()));
        let handlers = Arc::new(Mutex::new(HandlerMap::default()));
        let closed = Arc::new(AtomicBool::new(false));

        tokio::spawn(Self::run_event_loop(
            ws_stream,
            command_rx,
            Arc::clone(&correlation),
            Arc::clone(&handlers),
            Arc::clone(&closed),
        ));

        Self {
            command_tx,
            correlation,
            handlers,
            closed,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Sets the timeout applied to awaited calls.
    #[must_use]
    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    /// Returns the timeout applied to awaited calls.
    #[inline]
    #[must_use]
    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    /// Registers the inbound handler for a namespace.
    ///
    /// If the connection is already closed the handler is told so at once.
    /// The closed flag is read under the handler lock, so a handler is
    /// either drained by the closing loop or notified here, never lost.
    pub fn set_handler(&self, namespace: Namespace, handler: InboundHandler) {
        {
            let mut handlers = self.handlers.lock();
            if !self.is_closed() {
                handlers.insert(namespace, handler);
                return;
            }
        }

        trace!(%namespace, "Handler registered on closed connection");
        handler(ChannelEvent::Disconnected);
    }

    /// Removes the inbound handler for a namespace.
    pub fn clear_handler(&self, namespace: &Namespace) {
        self.handlers.lock().remove(namespace);
    }

    /// Sends a request and waits for response with the configured timeout.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] if connection is closed
    /// - [`Error::CallTimeout`] if response not received within timeout
    /// - [`Error::DocumentDestroyed`] if the target document went away
    /// - [`Error::Protocol`] if too many pending requests
    pub async fn send(&self, request: Request) -> Result<Response> {
        self.send_with_timeout(request, self.call_timeout).await
    }

    /// Sends a request and waits for response with custom timeout.
    ///
    /// Dropping the returned future abandons the call and releases its
    /// correlation entry.
    ///
    /// # Errors
    ///
    /// Same as [`Connection::send`].
    pub async fn send_with_timeout(
        &self,
        request: Request,
        request_timeout: Duration,
    ) -> Result<Response> {
        let request_id = request.id;
        let function = request.function_name().to_string();

        // Check pending request limit
        {
            let correlation = self.correlation.lock();
            if correlation.len() >= MAX_PENDING_REQUESTS {
                warn!(
                    pending = correlation.len(),
                    max = MAX_PENDING_REQUESTS,
                    "Too many pending requests"
                );
                return Err(Error::protocol(format!(
                    "Too many pending requests: {}/{}",
                    correlation.len(),
                    MAX_PENDING_REQUESTS
                )));
            }
        }

        let (response_tx, response_rx) = oneshot::channel();

        self.command_tx
            .send(ConnectionCommand::Send {
                request,
                response_tx,
            })
            .map_err(|_| Error::connection_closed(&function))?;

        let mut guard = CorrelationGuard::new(request_id, &self.command_tx);

        let outcome = match timeout(request_timeout, response_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(Error::connection_closed(&function)),
            Err(_) => {
                debug!(%request_id, %function, "Remote call timed out");
                return Err(Error::call_timeout(
                    function,
                    request_timeout.as_millis() as u64,
                ));
            }
        };

        guard.disarm();
        outcome
    }

    /// Sends a request without waiting for a response.
    ///
    /// Resolves once the frame was written to the socket.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] if connection is closed
    /// - [`Error::WebSocket`] if the write failed
    pub async fn post(&self, request: Request) -> Result<()> {
        let function = request.function_name().to_string();
        let (sent_tx, sent_rx) = oneshot::channel();

        self.command_tx
            .send(ConnectionCommand::Post { request, sent_tx })
            .map_err(|_| Error::connection_closed(&function))?;

        sent_rx
            .await
            .unwrap_or_else(|_| Err(Error::connection_closed(function)))
    }

    /// Returns the number of pending requests.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.correlation.lock().len()
    }

    /// Returns the number of registered inbound handlers.
    #[inline]
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.handlers.lock().len()
    }

    /// Returns `true` once the event loop has terminated.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Shuts down the connection gracefully.
    ///
    /// Pending calls fail with [`Error::ConnectionClosed`] and every
    /// registered handler receives [`ChannelEvent::Disconnected`].
    pub fn shutdown(&self) {
        let _ = self.command_tx.send(ConnectionCommand::Shutdown);
    }

    /// Event loop that handles WebSocket I/O.
    async fn run_event_loop<S>(
        ws_stream: WebSocketStream<S>,
        mut command_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
        correlation: Arc<Mutex<CorrelationMap>>,
        handlers: Arc<Mutex<HandlerMap>>,
        closed: Arc<AtomicBool>,
    ) where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (mut ws_write, mut ws_read) = ws_stream.split();

        loop {
            tokio::select! {
                // Incoming messages from the relay
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            let reply = Self::handle_incoming_message(
                                &text,
                                &correlation,
                                &handlers,
                            );

                            if let Some(reply) = reply
                                && let Ok(json) = to_string(&reply)
                                && let Err(e) = ws_write.send(Message::Text(json.into())).await
                            {
                                warn!(error = %e, "Failed to send event reply");
                            }
                        }

                        Some(Ok(Message::Close(_))) => {
                            debug!("WebSocket closed by remote");
                            break;
                        }

                        Some(Err(e)) => {
                            error!(error = %e, "WebSocket error");
                            break;
                        }

                        None => {
                            debug!("WebSocket stream ended");
                            break;
                        }

                        // Ignore Binary, Ping, Pong
                        _ => {}
                    }
                }

                // Commands from Rust API
                command = command_rx.recv() => {
                    match command {
                        Some(ConnectionCommand::Send { request, response_tx }) => {
                            Self::handle_send_command(
                                request,
                                response_tx,
                                &mut ws_write,
                                &correlation,
                            ).await;
                        }

                        Some(ConnectionCommand::Post { request, sent_tx }) => {
                            let result = Self::write_request(&request, &mut ws_write).await;
                            if let Err(ref e) = result {
                                warn!(
                                    namespace = %request.namespace,
                                    function = %request.function_name(),
                                    error = %e,
                                    "Failed to transmit call"
                                );
                            }
                            let _ = sent_tx.send(result);
                        }

                        Some(ConnectionCommand::RemoveCorrelation(request_id)) => {
                            if correlation.lock().remove(&request_id).is_some() {
                                debug!(%request_id, "Removed abandoned correlation");
                            }
                        }

                        Some(ConnectionCommand::Shutdown) => {
                            debug!("Shutdown command received");
                            let _ = ws_write.close().await;
                            break;
                        }

                        None => {
                            debug!("Command channel closed");
                            break;
                        }
                    }
                }
            }
        }

        let orphaned = Self::mark_closed(&handlers, &closed);

        Self::fail_pending_requests(&correlation);
        Self::notify_disconnected(orphaned);

        debug!("Event loop terminated");
    }

    /// Handles an incoming text message from the relay.
    fn handle_incoming_message(
        text: &str,
        correlation: &Arc<Mutex<CorrelationMap>>,
        handlers: &Arc<Mutex<HandlerMap>>,
    ) -> Option<EventReply> {
        // Try to parse as Response first
        if let Ok(response) = from_str::<Response>(text) {
            let entry = correlation.lock().remove(&response.id);

            if let Some(entry) = entry {
                let _ = entry.response_tx.send(Ok(response));
            } else {
                warn!(id = %response.id, "Response for unknown request");
            }

            return None;
        }

        // Try to parse as Event
        if let Ok(event) = from_str::<Event>(text) {
            return Self::handle_event(event, correlation, handlers);
        }

        warn!(text = %text, "Failed to parse incoming message");
        None
    }

    /// Routes a parsed event to its namespace.
    fn handle_event(
        event: Event,
        correlation: &Arc<Mutex<CorrelationMap>>,
        handlers: &Arc<Mutex<HandlerMap>>,
    ) -> Option<EventReply> {
        let namespace = event.namespace.clone();

        match event.parse() {
            ParsedEvent::Message(message) => {
                trace!(%namespace, command = %message.command, "Inbound message");
                Self::dispatch(handlers, &namespace, ChannelEvent::Message(message));
                Some(EventReply::empty(event.id, MESSAGE_METHOD))
            }

            ParsedEvent::Destroyed { reason } => {
                debug!(%namespace, %reason, "Document context destroyed");
                Self::fail_namespace_requests(correlation, &namespace);
                Self::dispatch(handlers, &namespace, ChannelEvent::Destroyed { reason });
                None
            }

            ParsedEvent::Malformed { method, reason } => {
                warn!(%namespace, %method, %reason, "Malformed inbound message dropped");
                None
            }

            ParsedEvent::Unknown { method, .. } => {
                debug!(%namespace, %method, "Ignoring unknown event");
                None
            }
        }
    }

    /// Invokes the handler registered for a namespace.
    fn dispatch(handlers: &Arc<Mutex<HandlerMap>>, namespace: &Namespace, event: ChannelEvent) {
        let handlers = handlers.lock();
        match handlers.get(namespace) {
            Some(handler) => handler(event),
            None => debug!(%namespace, "No inbound handler registered"),
        }
    }

    /// Handles a send command from the Rust API.
    async fn handle_send_command<S>(
        request: Request,
        response_tx: oneshot::Sender<Result<Response>>,
        ws_write: &mut WsSink<S>,
        correlation: &Arc<Mutex<CorrelationMap>>,
    ) where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let request_id = request.id;

        // Caller gave up before the request reached the loop
        if response_tx.is_closed() {
            return;
        }

        let json = match to_string(&request) {
            Ok(j) => j,
            Err(e) => {
                let _ = response_tx.send(Err(Error::Json(e)));
                return;
            }
        };

        // Store correlation before sending
        correlation.lock().insert(
            request_id,
            PendingEntry {
                namespace: request.namespace.clone(),
                function: request.function_name().to_string(),
                response_tx,
            },
        );

        if let Err(e) = ws_write.send(Message::Text(json.into())).await
            && let Some(entry) = correlation.lock().remove(&request_id)
        {
            let _ = entry
                .response_tx
                .send(Err(Error::communication(request.function_name(), e.to_string())));
        }

        trace!(%request_id, function = %request.function_name(), "Request sent");
    }

    /// Serializes and writes a request.
    async fn write_request<S>(request: &Request, ws_write: &mut WsSink<S>) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let json = to_string(request)?;
        ws_write.send(Message::Text(json.into())).await?;
        trace!(request_id = %request.id, function = %request.function_name(), "Request posted");
        Ok(())
    }

    /// Fails pending requests addressed to a destroyed document.
    fn fail_namespace_requests(correlation: &Arc<Mutex<CorrelationMap>>, namespace: &Namespace) {
        let failed: Vec<PendingEntry> = {
            let mut correlation = correlation.lock();
            let ids: Vec<RequestId> = correlation
                .iter()
                .filter(|(_, entry)| &entry.namespace == namespace)
                .map(|(id, _)| *id)
                .collect();
            ids.iter().filter_map(|id| correlation.remove(id)).collect()
        };

        for entry in failed {
            let _ = entry.response_tx.send(Err(Error::document_destroyed(
                namespace.clone(),
                entry.function,
            )));
        }
    }

    /// Fails all pending requests with ConnectionClosed error.
    fn fail_pending_requests(correlation: &Arc<Mutex<CorrelationMap>>) {
        let pending: Vec<_> = correlation.lock().drain().collect();
        let count = pending.len();

        for (_, entry) in pending {
            let _ = entry
                .response_tx
                .send(Err(Error::connection_closed(entry.function)));
        }

        if count > 0 {
            debug!(count, "Failed pending requests on shutdown");
        }
    }

    /// Sets the closed flag and takes every registered handler.
    ///
    /// Both happen under the handler lock so `set_handler` cannot slip a
    /// handler in between.
    fn mark_closed(
        handlers: &Arc<Mutex<HandlerMap>>,
        closed: &AtomicBool,
    ) -> Vec<(Namespace, InboundHandler)> {
        let mut handlers = handlers.lock();
        closed.store(true, Ordering::SeqCst);
        handlers.drain().collect()
    }

    /// Tells every drained handler that the transport is gone.
    fn notify_disconnected(handlers: Vec<(Namespace, InboundHandler)>) {
        for (namespace, handler) in handlers {
            trace!(%namespace, "Notifying handler of disconnect");
            handler(ChannelEvent::Disconnected);
        }
    }
}

// ============================================================================
// CorrelationGuard
// ============================================================================

/// Removes a correlation entry when an awaited call is abandoned.
struct CorrelationGuard<'a> {
    request_id: RequestId,
    command_tx: &'a mpsc::UnboundedSender<ConnectionCommand>,
    armed: bool,
}

impl<'a> CorrelationGuard<'a> {
    fn new(request_id: RequestId, command_tx: &'a mpsc::UnboundedSender<ConnectionCommand>) -> Self {
        Self {
            request_id,
            command_tx,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for CorrelationGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let _ = self
                .command_tx
                .send(ConnectionCommand::RemoveCorrelation(self.request_id));
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
