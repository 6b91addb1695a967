//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::io::{DuplexStream, duplex};
use tokio::sync::{Notify, mpsc};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::Role;

use page_translate_bridge::protocol::{Event, Request, Response};
use page_translate_bridge::{
    ChannelEvent, Connection, ContentChannel, DocumentId, Error, HeuristicRecognizer,
    InboundHandler, InboundMessage, LanguageRecognizer, LanguageTag, Namespace, RemoteCallReply,
    RemoteCallRequest, Result, ScriptInjector, UserScript,
};

// ============================================================================
// Tracing
// ============================================================================

/// Installs a test subscriber honoring `RUST_LOG`. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// ScriptedChannel
// ============================================================================

/// How the scripted document answers a function.
#[derive(Debug, Clone)]
pub enum Answer {
    /// Reply with a value.
    Value(Value),
    /// Reply with a document-side error.
    RemoteError(String),
    /// Fail the call with a timeout.
    Timeout,
    /// Fail the call as if the transport closed.
    Closed,
    /// Never answer.
    Hang,
}

/// In-memory [`ContentChannel`] answering calls from a script.
///
/// Functions without an answer fail with a remote error, like an
/// undefined function in the document.
#[derive(Default)]
pub struct ScriptedChannel {
    answers: Mutex<HashMap<String, Answer>>,
    calls: Mutex<Vec<(Namespace, RemoteCallRequest)>>,
    handlers: Mutex<HashMap<Namespace, InboundHandler>>,
    /// Signalled when a call starts hanging.
    pub suspended: Notify,
}

impl ScriptedChannel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Sets the answer for `function`.
    pub fn answer(&self, function: &str, answer: Answer) {
        self.answers.lock().insert(function.to_string(), answer);
    }

    /// Answers `function` with a string value.
    pub fn answer_str(&self, function: &str, value: &str) {
        self.answer(function, Answer::Value(Value::from(value)));
    }

    /// Every call received, in order.
    pub fn calls(&self) -> Vec<(Namespace, RemoteCallRequest)> {
        self.calls.lock().clone()
    }

    /// Names of the functions called, in order.
    pub fn functions(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .map(|(_, call)| call.function_name.clone())
            .collect()
    }

    /// Number of calls to `function`.
    pub fn count(&self, function: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|(_, call)| call.function_name == function)
            .count()
    }

    /// Arguments of every `startTranslation` call.
    pub fn start_translation_args(&self) -> Vec<Vec<Value>> {
        self.calls
            .lock()
            .iter()
            .filter(|(_, call)| call.function_name == "startTranslation")
            .map(|(_, call)| call.args.clone())
            .collect()
    }

    /// Returns `true` if a handler is registered for `namespace`.
    pub fn has_handler(&self, namespace: &Namespace) -> bool {
        self.handlers.lock().contains_key(namespace)
    }

    /// Delivers an inbound event to `namespace`'s handler.
    pub fn deliver(&self, namespace: &Namespace, event: ChannelEvent) -> bool {
        match self.handlers.lock().get(namespace) {
            Some(handler) => {
                handler(event);
                true
            }
            None => false,
        }
    }

    /// Posts `ready` from the routine in `namespace`.
    pub fn ready(&self, namespace: &Namespace) -> bool {
        self.deliver(namespace, ChannelEvent::Message(InboundMessage::new("ready")))
    }
}

#[async_trait]
impl ContentChannel for ScriptedChannel {
    async fn send_remote_call(
        &self,
        namespace: &Namespace,
        request: RemoteCallRequest,
    ) -> Result<RemoteCallReply> {
        let function = request.function_name.clone();
        let expect_reply = request.expect_reply;
        self.calls.lock().push((namespace.clone(), request));

        if !expect_reply {
            return Ok(RemoteCallReply::transmitted());
        }

        let answer = self.answers.lock().get(&function).cloned();
        match answer {
            Some(Answer::Value(value)) => Ok(RemoteCallReply::value(value)),
            Some(Answer::RemoteError(reason)) => Ok(RemoteCallReply::error(reason)),
            Some(Answer::Timeout) => Err(Error::call_timeout(function, 30_000)),
            Some(Answer::Closed) => Err(Error::connection_closed(function)),
            Some(Answer::Hang) => {
                self.suspended.notify_one();
                std::future::pending().await
            }
            None => Ok(RemoteCallReply::error(format!("{function} is not a function"))),
        }
    }

    fn set_inbound_handler(&self, namespace: &Namespace, handler: InboundHandler) {
        self.handlers.lock().insert(namespace.clone(), handler);
    }

    fn clear_inbound_handler(&self, namespace: &Namespace) {
        self.handlers.lock().remove(namespace);
    }
}

// ============================================================================
// CountingRecognizer
// ============================================================================

/// [`HeuristicRecognizer`] that counts the samples it processes.
pub struct CountingRecognizer {
    inner: HeuristicRecognizer,
    samples: Arc<AtomicUsize>,
}

impl CountingRecognizer {
    /// Returns the recognizer and its sample counter.
    pub fn new() -> (Self, Arc<AtomicUsize>) {
        let samples = Arc::new(AtomicUsize::new(0));
        (
            Self {
                inner: HeuristicRecognizer::new(),
                samples: Arc::clone(&samples),
            },
            samples,
        )
    }
}

impl LanguageRecognizer for CountingRecognizer {
    fn reset(&mut self) {
        self.inner.reset();
    }

    fn process_sample(&mut self, text: &str) {
        self.samples.fetch_add(1, Ordering::SeqCst);
        self.inner.process_sample(text);
    }

    fn dominant_language(&self) -> LanguageTag {
        self.inner.dominant_language()
    }
}

// ============================================================================
// RecordingInjector
// ============================================================================

/// [`ScriptInjector`] that records what it was asked to install.
#[derive(Default)]
pub struct RecordingInjector {
    injected: Mutex<Vec<(DocumentId, UserScript)>>,
    fail_with: Mutex<Option<String>>,
}

impl RecordingInjector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Makes every later injection fail with `message`.
    pub fn fail_with(&self, message: &str) {
        *self.fail_with.lock() = Some(message.to_string());
    }

    /// Every script installed, in order.
    pub fn injected(&self) -> Vec<(DocumentId, UserScript)> {
        self.injected.lock().clone()
    }
}

#[async_trait]
impl ScriptInjector for RecordingInjector {
    async fn inject(&self, document: DocumentId, script: &UserScript) -> Result<()> {
        if let Some(message) = self.fail_with.lock().clone() {
            return Err(Error::injection(document, message));
        }
        self.injected.lock().push((document, script.clone()));
        Ok(())
    }
}

// ============================================================================
// FakePage
// ============================================================================

/// Commands for the fake page task.
enum PageCommand {
    Post(Event),
    Close,
}

/// In-process stand-in for the relay and its documents, over a duplex
/// WebSocket.
///
/// Answers `page.callFunction` requests from a function → value map and
/// records every request and acknowledgement it sees. Functions marked
/// silent are recorded but never answered.
pub struct FakePage {
    commands: mpsc::UnboundedSender<PageCommand>,
    requests: Arc<Mutex<Vec<Request>>>,
    acks: Arc<AtomicUsize>,
    task: tokio::task::JoinHandle<()>,
}

impl FakePage {
    /// Connects a fake page to a fresh [`Connection`].
    pub async fn connect(answers: HashMap<String, Value>) -> (Connection, Self) {
        Self::connect_with_silent(answers, &[]).await
    }

    /// Connects a fake page that never answers the `silent` functions.
    pub async fn connect_with_silent(
        answers: HashMap<String, Value>,
        silent: &[&str],
    ) -> (Connection, Self) {
        let silent: HashSet<String> = silent.iter().map(|f| (*f).to_string()).collect();
        let (host, page) = duplex(256 * 1024);
        let host = WebSocketStream::from_raw_socket(host, Role::Server, None).await;
        let page = WebSocketStream::from_raw_socket(page, Role::Client, None).await;

        let (commands, command_rx) = mpsc::unbounded_channel();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let acks = Arc::new(AtomicUsize::new(0));

        let task = tokio::spawn(run_page(
            page,
            answers,
            silent,
            command_rx,
            Arc::clone(&requests),
            Arc::clone(&acks),
        ));

        (
            Connection::new(host),
            Self {
                commands,
                requests,
                acks,
                task,
            },
        )
    }

    /// Posts a message from the routine in `namespace`.
    pub fn post(&self, namespace: &Namespace, message: &InboundMessage) {
        let _ = self
            .commands
            .send(PageCommand::Post(Event::message(namespace.clone(), message)));
    }

    /// Posts `ready` from the routine in `namespace`.
    pub fn ready(&self, namespace: &Namespace) {
        self.post(namespace, &InboundMessage::new("ready"));
    }

    /// Reports that the document in `namespace` was destroyed.
    pub fn destroy(&self, namespace: &Namespace, reason: &str) {
        let _ = self
            .commands
            .send(PageCommand::Post(Event::destroyed(namespace.clone(), reason)));
    }

    /// Closes the WebSocket and waits for the page task.
    pub async fn close(self) {
        let _ = self.commands.send(PageCommand::Close);
        let _ = self.task.await;
    }

    /// Every request received, in order.
    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().clone()
    }

    /// Number of event acknowledgements received.
    pub fn acks(&self) -> usize {
        self.acks.load(Ordering::SeqCst)
    }
}

async fn run_page(
    ws: WebSocketStream<DuplexStream>,
    answers: HashMap<String, Value>,
    silent: HashSet<String>,
    mut commands: mpsc::UnboundedReceiver<PageCommand>,
    requests: Arc<Mutex<Vec<Request>>>,
    acks: Arc<AtomicUsize>,
) {
    let (mut sink, mut stream) = ws.split();

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(PageCommand::Post(event)) => {
                    let text = serde_json::to_string(&event).expect("serialize event");
                    if sink.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Some(PageCommand::Close) | None => {
                    let _ = sink.close().await;
                    break;
                }
            },
            frame = stream.next() => {
                let text = match frame {
                    Some(Ok(Message::Text(text))) => text.as_str().to_string(),
                    Some(Ok(_)) => continue,
                    _ => break,
                };

                let value: Value = serde_json::from_str(&text).expect("valid json");
                if value.get("replyTo").is_some() {
                    acks.fetch_add(1, Ordering::SeqCst);
                    continue;
                }

                let request: Request = serde_json::from_value(value).expect("request");
                requests.lock().push(request.clone());
                if !request.expects_reply() || silent.contains(request.function_name()) {
                    continue;
                }

                let response = match answers.get(request.function_name()) {
                    Some(result) => Response::success(request.id, result.clone()),
                    None => Response::failure(
                        request.id,
                        "ReferenceError",
                        format!("{} is not a function", request.function_name()),
                    ),
                };
                let text = serde_json::to_string(&response).expect("serialize response");
                if sink.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
        }
    }
}
