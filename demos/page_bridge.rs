//! Page bridge walkthrough against an in-process relay.
//!
//! Demonstrates:
//! - Binding a WebSocket server for the relay
//! - Attaching a document and injecting the translation script
//! - The routine posting `ready` and the host guessing the page language
//! - Receiving `startTranslation` on the relay side
//!
//! Usage:
//!   cargo run --example page_bridge
//!   cargo run --example page_bridge -- --debug

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use anyhow::{Context, bail};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::sync::oneshot;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing_subscriber::EnvFilter;

use page_translate_bridge::protocol::{Event, Request, Response};
use page_translate_bridge::{
    Bridge, DocumentId, FixedLocale, InboundMessage, Namespace, PendingServer, ScriptInjector,
    UserScript,
};

// ============================================================================
// Constants
// ============================================================================

const TRANSLATE_SCRIPT: &str = r#"(function() {
  window.__firefox__.$<brave_translate_script> = {
    getRawPageSource: () => document.documentElement.outerHTML,
    getPageLanguage: () => document.documentElement.lang,
    startTranslation: (source, target) => {},
  };
  webkit.messageHandlers.$<message_handler>.postMessage({ command: "ready" });
})();"#;

const PAGE_SOURCE: &str = "<html lang=\"es\"><body>\
<h1>El tiempo</h1>\
<p>Mañana el cielo estará despejado en la costa y las temperaturas subirán por la tarde, \
pero por la noche se espera lluvia en el norte del país.</p>\
</body></html>";

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let debug = std::env::args().any(|arg| arg == "--debug");
    init_logging(debug);

    if let Err(e) = run().await {
        eprintln!("\n[ERROR] {e:#}");
        std::process::exit(1);
    }
}

fn init_logging(debug: bool) {
    let filter = if debug {
        "page_translate_bridge=debug"
    } else {
        "page_translate_bridge=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}

async fn run() -> anyhow::Result<()> {
    println!("=== Page Bridge ===\n");

    // ========================================================================
    // Relay
    // ========================================================================

    println!("[1] Binding relay server...");

    let server = PendingServer::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 0).await?;
    let url = server.ws_url();
    println!("    URL: {url}");

    let (namespace_tx, namespace_rx) = oneshot::channel();
    let relay = tokio::spawn(run_relay(url, namespace_rx));

    let connection = Arc::new(server.accept().await?);
    println!("    ✓ Relay connected\n");

    // ========================================================================
    // Attach
    // ========================================================================

    println!("[2] Attaching document...");

    let bridge = Bridge::builder()
        .script(TRANSLATE_SCRIPT)
        .injector(Arc::new(PrintingInjector))
        .locale(FixedLocale::new("en".parse()?))
        .build()?;

    let coordinator = bridge.attach(DocumentId::next(), connection).await?;
    println!("    Namespace: {}", coordinator.namespace());
    println!("    State: {}\n", coordinator.state());

    namespace_tx
        .send(coordinator.namespace().clone())
        .map_err(|_| anyhow::anyhow!("relay stopped early"))?;

    // ========================================================================
    // Activation
    // ========================================================================

    println!("[3] Waiting for activation...");

    let state = coordinator.settled().await;
    println!("    State: {state}");
    match coordinator.language_pair() {
        Some(pair) => println!("    Pair: {pair}"),
        None => bail!("binding settled without a language pair: {state}"),
    }

    let args = relay.await.context("relay task panicked")??;
    println!("    ✓ Relay received startTranslation{args:?}\n");

    // ========================================================================
    // Teardown
    // ========================================================================

    println!("[4] Shutting down...");
    bridge.shutdown().await;
    println!("    ✓ Done");

    Ok(())
}

// ============================================================================
// Injector
// ============================================================================

/// Injector that only reports what it would install.
struct PrintingInjector;

#[async_trait]
impl ScriptInjector for PrintingInjector {
    async fn inject(
        &self,
        document: DocumentId,
        script: &UserScript,
    ) -> page_translate_bridge::Result<()> {
        println!(
            "    Injecting {} bytes into {document} ({}, world {})",
            script.source.len(),
            script.timing,
            script.content_world
        );
        Ok(())
    }
}

// ============================================================================
// Relay
// ============================================================================

/// Plays the document: posts `ready`, answers page functions, and returns
/// the `startTranslation` arguments.
async fn run_relay(
    url: String,
    namespace_rx: oneshot::Receiver<Namespace>,
) -> anyhow::Result<Vec<Value>> {
    let (mut ws, _) = connect_async(url).await.context("relay connect")?;
    let namespace = namespace_rx.await.context("no namespace")?;

    let ready = Event::message(namespace, &InboundMessage::new("ready"));
    ws.send(Message::Text(serde_json::to_string(&ready)?.into()))
        .await?;

    while let Some(frame) = ws.next().await {
        let Message::Text(text) = frame? else {
            continue;
        };
        let value: Value = serde_json::from_str(text.as_str())?;
        if value.get("replyTo").is_some() {
            continue;
        }

        let request: Request = serde_json::from_value(value)?;
        let response = match request.function_name() {
            "startTranslation" => return Ok(request.params.args),
            "getRawPageSource" | "getPageSource" => {
                Response::success(request.id, json!(PAGE_SOURCE))
            }
            "getPageLanguage" => Response::success(request.id, json!("es")),
            other => Response::failure(
                request.id,
                "ReferenceError",
                format!("{other} is not a function"),
            ),
        };
        ws.send(Message::Text(serde_json::to_string(&response)?.into()))
            .await?;
    }

    bail!("relay closed before startTranslation")
}
