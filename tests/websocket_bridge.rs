//! End-to-end activation over a WebSocket connection.

mod common;

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::sync::oneshot;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use page_translate_bridge::protocol::{Event, Request, Response};
use page_translate_bridge::{
    BindingState, Bridge, BridgeOptions, DocumentId, FailureReason, FixedLocale, InboundMessage,
    Namespace, PendingServer, TranslationCoordinator,
};

use common::{FakePage, RecordingInjector, init_tracing};

const SCRIPT: &str = "window.__firefox__.$<brave_translate_script> = {};";

fn bridge() -> Bridge {
    bridge_with(BridgeOptions::new())
}

fn bridge_with(options: BridgeOptions) -> Bridge {
    init_tracing();
    Bridge::builder()
        .script(SCRIPT)
        .injector(RecordingInjector::new())
        .locale(FixedLocale::new("en".parse().expect("tag")))
        .options(options)
        .build()
        .expect("build bridge")
}

async fn binding_count_reaches(bridge: &Bridge, count: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while bridge.binding_count() != count {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("binding count reached");
}

fn answers(pairs: &[(&str, &str)]) -> HashMap<String, Value> {
    pairs
        .iter()
        .map(|(function, value)| ((*function).to_string(), json!(value)))
        .collect()
}

async fn settled(coordinator: &TranslationCoordinator) -> BindingState {
    tokio::time::timeout(Duration::from_secs(5), coordinator.settled())
        .await
        .expect("binding settled")
}

#[tokio::test]
async fn test_activation_over_websocket() {
    let bridge = bridge();
    let (connection, page) = FakePage::connect(answers(&[(
        "getRawPageSource",
        "<html><body><p>Der Hund ist nicht mit dem Ball gelaufen, und die Katze schläft auf dem Sofa. \
         Morgen wollen wir zusammen in die Stadt fahren und einkaufen gehen.</p></body></html>",
    )]))
    .await;
    let connection = Arc::new(connection);

    let coordinator = bridge
        .attach(DocumentId::next(), connection.clone())
        .await
        .expect("attach");

    page.ready(coordinator.namespace());
    assert_eq!(settled(&coordinator).await, BindingState::Activated);

    // Wait for the fire-and-forget call to land
    tokio::time::sleep(Duration::from_millis(50)).await;

    let requests = page.requests();
    let functions: Vec<&str> = requests.iter().map(Request::function_name).collect();
    assert_eq!(functions, vec!["getRawPageSource", "startTranslation"]);

    let start = &requests[1];
    assert!(!start.expects_reply());
    assert_eq!(start.namespace, *coordinator.namespace());
    assert_eq!(start.params.args, vec![json!("en"), json!("de")]);

    assert_eq!(page.acks(), 1);
    assert_eq!(connection.pending_count(), 0);
}

#[tokio::test]
async fn test_undefined_page_functions_fall_back_to_host() {
    let bridge = bridge();
    let (connection, page) = FakePage::connect(HashMap::new()).await;

    let coordinator = bridge
        .attach(DocumentId::next(), Arc::new(connection))
        .await
        .expect("attach");

    page.ready(coordinator.namespace());
    assert_eq!(settled(&coordinator).await, BindingState::Activated);

    let pair = coordinator.language_pair().expect("pair");
    assert_eq!(pair.to_string(), "en -> en");
}

#[tokio::test]
async fn test_unknown_command_is_acknowledged_and_ignored() {
    let bridge = bridge();
    let (connection, page) = FakePage::connect(HashMap::new()).await;

    let coordinator = bridge
        .attach(DocumentId::next(), Arc::new(connection))
        .await
        .expect("attach");

    page.post(coordinator.namespace(), &InboundMessage::new("translationComplete"));
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(page.acks(), 1);
    assert_eq!(coordinator.state(), BindingState::Injected);
    assert!(page.requests().is_empty());
}

#[tokio::test]
async fn test_page_close_fails_binding() {
    let bridge = bridge();
    let (connection, page) = FakePage::connect(HashMap::new()).await;

    let coordinator = bridge
        .attach(DocumentId::next(), Arc::new(connection))
        .await
        .expect("attach");

    page.close().await;

    assert_eq!(
        settled(&coordinator).await,
        BindingState::Failed(FailureReason::TransportClosed)
    );
}

#[tokio::test]
async fn test_document_destroyed_fails_only_its_binding() {
    let bridge = bridge();
    let (connection, page) = FakePage::connect(HashMap::new()).await;
    let connection = Arc::new(connection);

    let gone = bridge
        .attach(DocumentId::next(), connection.clone())
        .await
        .expect("attach");
    let alive = bridge
        .attach(DocumentId::next(), connection.clone())
        .await
        .expect("attach");

    page.destroy(gone.namespace(), "navigated");

    assert_eq!(
        settled(&gone).await,
        BindingState::Failed(FailureReason::DocumentDestroyed("navigated".into()))
    );
    assert_eq!(alive.state(), BindingState::Injected);

    binding_count_reaches(&bridge, 1).await;
    assert_eq!(bridge.documents(), vec![alive.document()]);

    // Teardown of the forgotten binding runs right after removal
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(connection.handler_count(), 1);
}

#[tokio::test]
async fn test_attach_over_closed_connection_fails_binding() {
    let bridge = bridge();
    let (connection, page) = FakePage::connect(HashMap::new()).await;
    let connection = Arc::new(connection);

    page.close().await;
    tokio::time::timeout(Duration::from_secs(5), async {
        while !connection.is_closed() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("connection closed");

    let coordinator = bridge
        .attach(DocumentId::next(), connection.clone())
        .await
        .expect("attach");

    assert_eq!(
        settled(&coordinator).await,
        BindingState::Failed(FailureReason::TransportClosed)
    );
    assert_eq!(connection.handler_count(), 0);
    binding_count_reaches(&bridge, 0).await;
}

#[tokio::test]
async fn test_silent_page_settles_within_call_timeout() {
    let bridge = bridge_with(BridgeOptions::new().with_call_timeout(Duration::from_millis(100)));
    let (connection, page) =
        FakePage::connect_with_silent(HashMap::new(), &["getRawPageSource", "getPageLanguage"])
            .await;
    let connection = Arc::new(connection);

    let coordinator = bridge
        .attach(DocumentId::next(), connection.clone())
        .await
        .expect("attach");
    page.ready(coordinator.namespace());

    let state = tokio::time::timeout(Duration::from_secs(1), coordinator.settled())
        .await
        .expect("settled within the call timeout");
    assert_eq!(state, BindingState::Activated);

    let pair = coordinator.language_pair().expect("pair");
    assert_eq!(pair.to_string(), "en -> en");

    // Abandoned calls release their correlation entries
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(connection.pending_count(), 0);
    let functions: Vec<String> = page
        .requests()
        .iter()
        .map(|request| request.function_name().to_string())
        .collect();
    assert_eq!(
        functions,
        vec!["getRawPageSource", "getPageLanguage", "startTranslation"]
    );
}

#[tokio::test]
async fn test_relay_accepted_by_pending_server() {
    let bridge = bridge();
    let server = PendingServer::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)
        .await
        .expect("bind");
    let url = server.ws_url();
    let (namespace_tx, namespace_rx) = oneshot::channel::<Namespace>();

    let relay = tokio::spawn(async move {
        let (mut ws, _) = connect_async(url).await.expect("connect");

        let namespace = namespace_rx.await.expect("namespace");
        let ready = Event::message(namespace, &InboundMessage::new("ready"));
        ws.send(Message::Text(
            serde_json::to_string(&ready).expect("serialize").into(),
        ))
        .await
        .expect("send ready");

        while let Some(Ok(frame)) = ws.next().await {
            let Message::Text(text) = frame else { continue };
            let value: Value = serde_json::from_str(text.as_str()).expect("json");
            if value.get("replyTo").is_some() {
                continue;
            }

            let request: Request = serde_json::from_value(value).expect("request");
            if request.function_name() == "startTranslation" {
                return request.params.args;
            }
            let response = Response::success(
                request.id,
                json!(
                    "Bonjour tout le monde, ceci est un texte en français. \
                     Nous allons parler de la cuisine et des vacances avec nos amis pendant l'été."
                ),
            );
            ws.send(Message::Text(
                serde_json::to_string(&response).expect("serialize").into(),
            ))
            .await
            .expect("send response");
        }
        Vec::new()
    });

    let connection = Arc::new(server.accept().await.expect("accept"));
    let coordinator = bridge
        .attach(DocumentId::next(), connection)
        .await
        .expect("attach");
    namespace_tx
        .send(coordinator.namespace().clone())
        .expect("relay waiting");

    assert_eq!(settled(&coordinator).await, BindingState::Activated);
    let args = tokio::time::timeout(Duration::from_secs(5), relay)
        .await
        .expect("relay finished")
        .expect("relay task");
    assert_eq!(args, vec![json!("en"), json!("fr")]);
}
