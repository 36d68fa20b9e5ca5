// SPDX-FileCopyrightText: 2026 Lifedesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests: configuration -> HTTP engines -> router -> in-memory usage store.

use std::sync::Arc;

use lifedesk_core::{Engine, FallbackCause, Mode, Quota, Severity, ThreadId, UsageService};
use lifedesk_engines::{HttpEngine, InMemoryUsageStore};
use lifedesk_router::{ChatSession, ModeController};
use lifedesk_test_utils::{RecordingNotifier, TestHarness};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Stack {
    session: ChatSession,
    controller: Arc<ModeController>,
    store: Arc<InMemoryUsageStore>,
    notifier: Arc<RecordingNotifier>,
}

async fn stack(server: &MockServer, search_limit: u32) -> Stack {
    let toml = format!(
        r#"
[quota]
search_limit = {search_limit}

[engines.general]
endpoint = "{uri}/general"
source = "assistant"

[engines.search]
endpoint = "{uri}/search"

[engines.secondary]
endpoint = "{uri}/secondary"
"#,
        uri = server.uri()
    );
    let config = lifedesk_config::load_and_validate_str(&toml).expect("valid config");

    let engine = Arc::new(HttpEngine::from_config(&config.engines).unwrap());
    let store = Arc::new(InMemoryUsageStore::from_config(&config));
    let notifier = Arc::new(RecordingNotifier::new());
    let controller = Arc::new(
        ModeController::from_config(&config, store.clone(), notifier.clone())
            .with_thread(ThreadId::from("e2e")),
    );
    controller.initialize().await;
    let session = ChatSession::new(controller.clone(), engine);
    Stack {
        session,
        controller,
        store,
        notifier,
    }
}

async fn mount_reply(server: &MockServer, route: &str, content: &str) {
    Mock::given(method("POST"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "content": content })),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn search_then_quota_fallback_over_http() {
    let server = MockServer::start().await;
    mount_reply(&server, "/search", "search says hi").await;
    mount_reply(&server, "/general", "general says hi").await;
    let mut s = stack(&server, 1).await;

    assert_eq!(s.controller.toggle_mode(Mode::Search).await, Mode::Search);
    let reply = s.session.send("first").await.unwrap();
    assert_eq!(reply.content, "search says hi");
    assert_eq!(reply.source, "search");
    assert_eq!(s.store.quota(Engine::Search).await.unwrap(), Quota::new(1, 1));

    let reply = s.session.send("second").await.unwrap();
    assert_eq!(reply.content, "general says hi");
    assert_eq!(reply.source, "assistant");
    assert_eq!(reply.fallback_cause, Some(FallbackCause::QuotaExceeded));
    assert_eq!(s.notifier.messages(Severity::Warning).len(), 1);

    let stored = s.store.thread_mode(&ThreadId::from("e2e")).await.unwrap();
    assert_eq!(stored, Some(Mode::General));
}

#[tokio::test]
async fn engine_outage_falls_back_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/secondary"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;
    mount_reply(&server, "/general", "still here").await;
    let mut s = stack(&server, 5).await;

    s.controller.toggle_mode(Mode::Secondary).await;
    let reply = s.session.send("q").await.unwrap();
    assert!(reply.fell_back_to_general);
    assert_eq!(reply.content, "still here");
    assert_eq!(s.store.quota(Engine::Secondary).await.unwrap().used, 0);
    assert_eq!(
        s.notifier.messages(Severity::Error),
        vec!["Secondary model failed — using default mode".to_string()]
    );
}

#[tokio::test]
async fn expired_session_is_reported_not_substituted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/general"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let mut s = stack(&server, 5).await;

    s.controller.toggle_mode(Mode::Search).await;
    let err = s.session.send("q").await.unwrap_err();
    assert!(!err.is_fallback_eligible());
    assert_eq!(s.controller.active_mode().await, Mode::Search);
}

#[tokio::test]
async fn restored_thread_mode_survives_a_new_session() {
    let server = MockServer::start().await;
    let s = stack(&server, 5).await;
    s.controller.toggle_mode(Mode::Secondary).await;

    let controller = ModeController::new(
        s.store.clone(),
        Arc::new(RecordingNotifier::new()),
        lifedesk_core::PermissionSet::all_allowed(),
        lifedesk_core::QuotaSet::from_fn(|_| Quota::new(0, 5)),
    )
    .with_thread(ThreadId::from("e2e"));
    controller.initialize().await;
    assert_eq!(controller.active_mode().await, Mode::Secondary);
}

#[tokio::test]
async fn harness_default_mode_round_trip() {
    let mut h = TestHarness::builder().build().await;
    let reply = h.send("hello").await.unwrap();
    assert_eq!(reply.answered_by, Mode::General);
    assert_eq!(h.engine.calls().await, vec![Mode::General]);
    assert_eq!(h.config.app.name, "lifedesk");
}
