use std::sync::Arc;
use std::time::Duration;

use axum::{Json, Router, http::StatusCode, response::IntoResponse, routing::post};
use latemark::sync::{SyncStatus, SyncTrigger, transports::http::HttpTransport};
use tokio::net::TcpListener;
use url::Url;

use crate::helpers::{enqueue_all, orchestrator, record};

/// Serve a single misbehaving `/sync` route on an ephemeral port.
async fn stub_endpoint(router: Router) -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    Url::parse(&format!("http://{addr}/")).unwrap()
}

/// Run one manual sync against `router` and check nothing was dropped.
async fn assert_batch_retained(router: Router) -> String {
    let endpoint = stub_endpoint(router).await;
    let transport = Arc::new(HttpTransport::new(&endpoint, Duration::from_secs(5)).unwrap());
    let orchestrator = orchestrator(transport, true);
    let mut events = orchestrator.subscribe();
    enqueue_all(orchestrator.queue(), &[record(10), record(11)]).await;
    let before = orchestrator.queue().list_pending().await.unwrap();

    let result = orchestrator.run_sync(SyncTrigger::Manual).await.unwrap();

    assert_eq!(result.removed, 0);
    assert_eq!(result.retained, 2);
    assert_eq!(orchestrator.queue().list_pending().await.unwrap(), before);
    assert!(events.recv().await.unwrap().error.is_some());

    match result.status {
        SyncStatus::TransportFailed(reason) => reason,
        other => panic!("expected a transport failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_server_error_status_retains_batch() {
    let router = Router::new().route(
        "/sync",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "database locked") }),
    );

    let reason = assert_batch_retained(router).await;

    assert!(reason.contains("500"));
    assert!(reason.contains("database locked"));
}

#[tokio::test]
async fn test_non_json_body_retains_batch() {
    let router = Router::new().route(
        "/sync",
        post(|| async { (StatusCode::OK, "<html>captive portal</html>").into_response() }),
    );

    let reason = assert_batch_retained(router).await;

    assert!(reason.contains("Failed to parse response"));
}

#[tokio::test]
async fn test_json_of_wrong_shape_retains_batch() {
    let router = Router::new().route(
        "/sync",
        post(|| async { Json(serde_json::json!({ "ok": true })) }),
    );

    let reason = assert_batch_retained(router).await;

    assert!(reason.contains("Failed to parse response"));
}
