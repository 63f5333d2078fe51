use latemark::server::HealthResponse;
use latemark::sync::protocol::{ErrorResponse, SyncResponse};
use serde_json::json;

use super::helpers::TestServer;

#[tokio::test]
async fn test_health_endpoint() {
    let server = TestServer::start().await;
    let url = server.endpoint.join("health").unwrap();

    let body: HealthResponse = reqwest::get(url).await.unwrap().json().await.unwrap();
    assert_eq!(body.status, "ok");

    server.stop().await;
}

#[tokio::test]
async fn test_sync_reports_applied_duplicate_and_failed() {
    let server = TestServer::start().await;
    let url = server.endpoint.join("sync").unwrap();
    let client = reqwest::Client::new();

    let batch = json!({"records": [
        {"index": 0, "subjectId": 10, "contextId": 1, "actorId": 5, "eventDate": "2024-05-01"},
        {"index": 1, "subjectId": 11, "contextId": 1, "actorId": 5, "eventDate": "2024-05-01"},
        {"index": 2, "subjectId": 10, "contextId": 1, "actorId": 5, "eventDate": "2024-05-01"},
        {"index": 3, "subjectId": 12, "contextId": -1, "actorId": 5, "eventDate": "2024-05-01"}
    ]});
    let response: SyncResponse = client
        .post(url)
        .json(&batch)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(response.total_processed, 4);
    assert_eq!(response.applied_count, 2);
    assert_eq!(response.failed_count, 1);
    assert_eq!(response.failed_records[0].index, 3);
    assert_eq!(
        response.failed_records[0].reason,
        "All IDs must be positive integers"
    );
    assert_eq!(server.store.count().await.unwrap(), 2);

    server.stop().await;
}

#[tokio::test]
async fn test_sync_without_records_array_is_bad_request() {
    let server = TestServer::start().await;
    let url = server.endpoint.join("sync").unwrap();
    let client = reqwest::Client::new();

    for body in [json!({}), json!({"records": "nope"})] {
        let response = client.post(url.clone()).json(&body).send().await.unwrap();
        assert_eq!(response.status().as_u16(), 400);
        let error: ErrorResponse = response.json().await.unwrap();
        assert!(error.error.contains("records"));
    }

    server.stop().await;
}

#[tokio::test]
async fn test_empty_batch_processes_nothing() {
    let server = TestServer::start().await;
    let url = server.endpoint.join("sync").unwrap();

    let response: SyncResponse = reqwest::Client::new()
        .post(url)
        .json(&json!({"records": []}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(response.total_processed, 0);
    assert_eq!(response.applied_count, 0);

    server.stop().await;
}
