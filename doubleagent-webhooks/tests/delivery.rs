use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::routing::post;
use axum::{extract::State, http::HeaderMap, Router};
use doubleagent_core::config::WebhookConfig;
use doubleagent_webhooks::{DeliveryStatus, WebhookEngine};
use serde_json::json;
use tokio::net::TcpListener;

async fn spawn_accepting_sink() -> String {
    let (url, _) = spawn_recording_sink().await;
    url
}

async fn spawn_recording_sink() -> (String, Arc<Mutex<Option<HeaderMap>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let received = Arc::new(Mutex::new(None));
    let app = Router::new().route(
        "/hook",
        post(|State(received): State<Arc<Mutex<Option<HeaderMap>>>>, headers: HeaderMap| async move {
            *received.lock().unwrap() = Some(headers);
            "ok"
        }),
    )
    .with_state(received.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}/hook"), received)
}

#[tokio::test]
async fn delivers_to_allowed_localhost_target() {
    let url = spawn_accepting_sink().await;
    let engine = WebhookEngine::new(WebhookConfig::default());

    let delivery = engine.deliver(
        &url,
        "issue.created",
        json!({"id": 1}),
        None,
        "default",
        HashMap::new(),
    );
    assert_eq!(delivery.status, DeliveryStatus::Pending);

    for _ in 0..20 {
        let found = engine.get_deliveries(None, None, 10);
        if found.first().map(|d| d.status) == Some(DeliveryStatus::Delivered) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("delivery never reached Delivered status");
}

#[tokio::test]
async fn delivery_sends_spec_mandated_header_names() {
    let (url, received) = spawn_recording_sink().await;
    let engine = WebhookEngine::new(WebhookConfig::default());

    let delivery = engine.deliver(
        &url,
        "issue.created",
        json!({"id": 1}),
        None,
        "tenant-a",
        HashMap::new(),
    );

    for _ in 0..20 {
        if received.lock().unwrap().is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    let headers = received.lock().unwrap().take().expect("sink never received a request");
    assert_eq!(
        headers.get("x-delivery-id").expect("X-Delivery-Id header missing"),
        delivery.id.as_str(),
    );
    assert_eq!(headers.get("x-namespace").expect("X-Namespace header missing"), "tenant-a");
}

#[tokio::test]
async fn rejects_public_target_without_dispatch() {
    let engine = WebhookEngine::new(WebhookConfig::default());
    let delivery = engine.deliver(
        "https://attacker.example.com/hook",
        "issue.created",
        json!({"id": 1}),
        None,
        "default",
        HashMap::new(),
    );
    assert_eq!(delivery.status, DeliveryStatus::Failed);
    assert!(delivery.error.unwrap().contains("allowlist"));
}

#[tokio::test]
async fn delivery_log_filters_by_namespace_and_event_type() {
    let engine = Arc::new(WebhookEngine::new(WebhookConfig::default()));
    engine.deliver(
        "https://blocked.example.com/a",
        "issue.created",
        json!({}),
        None,
        "tenant-a",
        HashMap::new(),
    );
    engine.deliver(
        "https://blocked.example.com/b",
        "issue.closed",
        json!({}),
        None,
        "tenant-b",
        HashMap::new(),
    );

    let tenant_a = engine.get_deliveries(Some("tenant-a"), None, 10);
    assert_eq!(tenant_a.len(), 1);
    assert_eq!(tenant_a[0].namespace, "tenant-a");

    let closed = engine.get_deliveries(None, Some("issue.closed"), 10);
    assert_eq!(closed.len(), 1);
    assert_eq!(closed[0].event_type, "issue.closed");

    engine.clear();
    assert!(engine.get_deliveries(None, None, 10).is_empty());
}
