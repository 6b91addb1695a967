//! Bridge entry point and binding registry.

mod common;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio_test::{assert_err, assert_ok};

use page_translate_bridge::{
    BindingState, Bridge, BridgeOptions, ChannelEvent, DocumentId, Error, FailureReason,
    FixedLocale, InjectionTiming,
};

use common::{Answer, RecordingInjector, ScriptedChannel, init_tracing};

const SCRIPT: &str = "window.__firefox__.$<brave_translate_script> = {}; // $<message_handler>";

fn bridge(injector: &Arc<RecordingInjector>) -> Bridge {
    init_tracing();
    Bridge::builder()
        .script(SCRIPT)
        .injector(Arc::clone(injector))
        .locale(FixedLocale::new("en".parse().expect("tag")))
        .build()
        .expect("build bridge")
}

#[tokio::test]
async fn test_attach_registers_binding() {
    let injector = RecordingInjector::new();
    let bridge = bridge(&injector);
    let channel = ScriptedChannel::new();
    let document = DocumentId::next();

    let coordinator = assert_ok!(bridge.attach(document, channel.clone()).await);

    assert_eq!(coordinator.state(), BindingState::Injected);
    assert_eq!(bridge.binding_count(), 1);
    assert_eq!(bridge.documents(), vec![document]);
    assert!(channel.has_handler(coordinator.namespace()));

    let found = bridge.coordinator(document).expect("registered");
    assert_eq!(found.namespace(), coordinator.namespace());
}

#[tokio::test]
async fn test_attach_same_document_twice_fails() {
    let injector = RecordingInjector::new();
    let bridge = bridge(&injector);
    let channel = ScriptedChannel::new();
    let document = DocumentId::next();

    assert_ok!(bridge.attach(document, channel.clone()).await);
    let err = assert_err!(bridge.attach(document, channel.clone()).await);

    assert!(err.is_lifecycle_violation());
    assert_eq!(injector.injected().len(), 1);
    assert_eq!(bridge.binding_count(), 1);
}

#[tokio::test]
async fn test_failed_injection_is_not_kept() {
    let injector = RecordingInjector::new();
    injector.fail_with("no web view");
    let bridge = bridge(&injector);

    let err = assert_err!(bridge.attach(DocumentId::next(), ScriptedChannel::new()).await);

    assert!(matches!(err, Error::Injection { .. }));
    assert_eq!(bridge.binding_count(), 0);
}

#[tokio::test]
async fn test_documents_on_shared_channel_stay_isolated() {
    let injector = RecordingInjector::new();
    let bridge = bridge(&injector);
    let channel = ScriptedChannel::new();
    channel.answer_str("getPageLanguage", "de");

    let first = assert_ok!(bridge.attach(DocumentId::next(), channel.clone()).await);
    let second = assert_ok!(bridge.attach(DocumentId::next(), channel.clone()).await);
    assert_ne!(first.namespace(), second.namespace());

    assert!(channel.ready(second.namespace()));
    let state = tokio::time::timeout(Duration::from_secs(5), second.settled())
        .await
        .expect("settled");

    assert_eq!(state, BindingState::Activated);
    assert_eq!(first.state(), BindingState::Injected);
    assert_eq!(
        channel.start_translation_args(),
        vec![vec![json!("en"), json!("de")]]
    );
    assert!(
        channel
            .calls()
            .iter()
            .all(|(namespace, _)| namespace == second.namespace())
    );
}

#[tokio::test]
async fn test_teardown_removes_binding() {
    let injector = RecordingInjector::new();
    let bridge = bridge(&injector);
    let channel = ScriptedChannel::new();
    let document = DocumentId::next();

    let coordinator = assert_ok!(bridge.attach(document, channel.clone()).await);
    assert_ok!(bridge.teardown(document).await);

    assert_eq!(bridge.binding_count(), 0);
    assert!(bridge.coordinator(document).is_none());
    assert_eq!(
        coordinator.state(),
        BindingState::Failed(FailureReason::Cancelled)
    );
    assert!(!channel.has_handler(coordinator.namespace()));

    let err = assert_err!(bridge.teardown(document).await);
    assert!(matches!(err, Error::DocumentNotBound { .. }));
}

/// Waits until the bridge tracks `count` bindings.
async fn binding_count_reaches(bridge: &Bridge, count: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while bridge.binding_count() != count {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("binding count reached");
}

#[tokio::test]
async fn test_destroyed_binding_is_forgotten() {
    let injector = RecordingInjector::new();
    let bridge = bridge(&injector);
    let channel = ScriptedChannel::new();

    let gone = assert_ok!(bridge.attach(DocumentId::next(), channel.clone()).await);
    let alive = assert_ok!(bridge.attach(DocumentId::next(), channel.clone()).await);

    assert!(channel.deliver(
        gone.namespace(),
        ChannelEvent::Destroyed {
            reason: "navigated".into(),
        },
    ));

    binding_count_reaches(&bridge, 1).await;
    assert!(bridge.coordinator(gone.document()).is_none());
    assert!(bridge.coordinator(alive.document()).is_some());
    assert_eq!(
        gone.state(),
        BindingState::Failed(FailureReason::DocumentDestroyed("navigated".into()))
    );
    assert!(!channel.has_handler(gone.namespace()));

    let err = assert_err!(bridge.teardown(gone.document()).await);
    assert!(matches!(err, Error::DocumentNotBound { .. }));
}

#[tokio::test]
async fn test_failed_document_can_be_attached_again() {
    let injector = RecordingInjector::new();
    let bridge = bridge(&injector);
    let channel = ScriptedChannel::new();
    let document = DocumentId::next();

    let first = assert_ok!(bridge.attach(document, channel.clone()).await);
    channel.deliver(first.namespace(), ChannelEvent::Disconnected);
    binding_count_reaches(&bridge, 0).await;

    let second = assert_ok!(bridge.attach(document, channel.clone()).await);
    assert_ne!(second.namespace(), first.namespace());
    assert_eq!(second.state(), BindingState::Injected);
    assert_eq!(bridge.documents(), vec![document]);
}

#[tokio::test]
async fn test_shutdown_cancels_suspended_bindings() {
    let injector = RecordingInjector::new();
    let bridge = bridge(&injector);
    let channel = ScriptedChannel::new();
    channel.answer("getRawPageSource", Answer::Hang);

    let first = assert_ok!(bridge.attach(DocumentId::next(), channel.clone()).await);
    let second = assert_ok!(bridge.attach(DocumentId::next(), channel.clone()).await);

    assert!(channel.ready(first.namespace()));
    channel.suspended.notified().await;

    tokio::time::timeout(Duration::from_secs(5), bridge.shutdown())
        .await
        .expect("shutdown finished");

    assert_eq!(bridge.binding_count(), 0);
    for coordinator in [&first, &second] {
        assert_eq!(
            coordinator.state(),
            BindingState::Failed(FailureReason::Cancelled)
        );
    }
    assert_eq!(channel.count("startTranslation"), 0);
}

#[tokio::test]
async fn test_options_flow_into_script() {
    init_tracing();
    let injector = RecordingInjector::new();
    let bridge = Bridge::builder()
        .script(SCRIPT)
        .injector(Arc::clone(&injector))
        .options(
            BridgeOptions::new()
                .with_namespace_prefix("tr")
                .with_message_handler("PageMessage")
                .with_timing(InjectionTiming::AfterContentLoads)
                .with_main_frame_only(false),
        )
        .build()
        .expect("build bridge");

    let coordinator = assert_ok!(bridge.attach(DocumentId::next(), ScriptedChannel::new()).await);

    assert!(coordinator.namespace().as_str().starts_with("tr_"));
    let (_, script) = injector.injected().pop().expect("injected");
    assert!(script.source.ends_with("// PageMessage"));
    assert_eq!(script.timing, InjectionTiming::AfterContentLoads);
    assert!(!script.main_frame_only);
}

#[tokio::test]
async fn test_call_timeout_option_bounds_activation() {
    init_tracing();
    let injector = RecordingInjector::new();
    let bridge = Bridge::builder()
        .script(SCRIPT)
        .injector(Arc::clone(&injector))
        .locale(FixedLocale::new("en".parse().expect("tag")))
        .options(BridgeOptions::new().with_call_timeout(Duration::from_millis(100)))
        .build()
        .expect("build bridge");

    let channel = ScriptedChannel::new();
    channel.answer("getRawPageSource", Answer::Hang);
    channel.answer("getPageLanguage", Answer::Hang);

    let coordinator = assert_ok!(bridge.attach(DocumentId::next(), channel.clone()).await);
    assert!(channel.ready(coordinator.namespace()));

    let state = tokio::time::timeout(Duration::from_secs(1), coordinator.settled())
        .await
        .expect("settled within the call timeout");

    assert_eq!(state, BindingState::Activated);
    assert_eq!(
        channel.start_translation_args(),
        vec![vec![json!("en"), json!("en")]]
    );
    assert_eq!(bridge.binding_count(), 1);
}
