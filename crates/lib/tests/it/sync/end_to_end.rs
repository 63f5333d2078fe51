use std::sync::Arc;
use std::time::Duration;

use latemark::{
    ConnectivityMonitor, LateMarker, SystemClock,
    queue::{QueueStore, SqliteQueue},
    sync::{BatchReconciler, SyncOrchestrator, SyncStatus, SyncTrigger, transports::http::HttpTransport},
};
use url::Url;

use crate::helpers::{TestServer, enqueue_all, invalid_record, orchestrator, record};

#[tokio::test]
async fn test_resending_converges_without_duplicates() {
    let server = TestServer::start().await;
    let orchestrator = orchestrator(server.transport(), true);

    enqueue_all(orchestrator.queue(), &[record(10), record(11)]).await;
    let first = orchestrator.run_sync(SyncTrigger::Manual).await.unwrap();
    assert_eq!(first.applied, 2);
    assert!(orchestrator.queue().is_empty().await.unwrap());

    // The same marks captured again, e.g. after a lost acknowledgement
    enqueue_all(orchestrator.queue(), &[record(10), record(11)]).await;
    let second = orchestrator.run_sync(SyncTrigger::Manual).await.unwrap();
    assert_eq!(second.applied, 0);
    assert_eq!(second.duplicates, 2);
    assert!(orchestrator.queue().is_empty().await.unwrap());

    assert_eq!(server.store.count().await.unwrap(), 2);
    server.stop().await;
}

#[tokio::test]
async fn test_remote_rejection_is_retried_and_surfaced() {
    let server = TestServer::start().await;
    let orchestrator = orchestrator(server.transport(), true);
    let mut events = orchestrator.subscribe();
    enqueue_all(orchestrator.queue(), &[record(10), invalid_record()]).await;

    for _ in 0..2 {
        let result = orchestrator.run_sync(SyncTrigger::Manual).await.unwrap();
        assert_eq!(result.status, SyncStatus::Completed);
        assert_eq!(result.failed(), 1);

        let event = events.recv().await.unwrap();
        assert_eq!(event.failed_count, 1);
        assert_eq!(event.failures[0].reason, "All IDs must be positive integers");
    }

    // The rejected record fails identically on every attempt
    let pending = orchestrator.queue().list_pending().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].record, invalid_record());
    assert_eq!(server.store.count().await.unwrap(), 1);

    server.stop().await;
}

#[tokio::test]
async fn test_unreachable_server_retains_everything() {
    // Nothing listens on the discard port
    let endpoint = Url::parse("http://127.0.0.1:9/").unwrap();
    let transport = Arc::new(HttpTransport::new(&endpoint, Duration::from_secs(2)).unwrap());
    let orchestrator = orchestrator(transport, true);
    enqueue_all(orchestrator.queue(), &[record(10)]).await;

    let result = orchestrator.run_sync(SyncTrigger::Manual).await.unwrap();

    assert!(matches!(result.status, SyncStatus::TransportFailed(_)));
    assert_eq!(orchestrator.queue().len().await.unwrap(), 1);
}

#[tokio::test]
async fn test_marks_queued_offline_sync_after_restart() {
    let server = TestServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("queue.db");

    // Capture while offline, then "restart" the device
    {
        let queue = Arc::new(SqliteQueue::open(&path).await.unwrap());
        let marker = LateMarker::new(queue.clone(), Arc::new(SystemClock));
        marker.mark_late(10, 1, 5, "2024-05-01").await.unwrap();
        marker.mark_late(11, 1, 5, "2024-05-02").await.unwrap();
        assert!(marker.mark_late(12, 1, 5, "2024-5-3").await.is_err());
        queue.close().await;
    }

    let queue: Arc<dyn QueueStore> = Arc::new(SqliteQueue::open(&path).await.unwrap());
    let connectivity = Arc::new(ConnectivityMonitor::new(false));
    let orchestrator = SyncOrchestrator::new(
        queue.clone(),
        BatchReconciler::new(server.transport()),
        connectivity.clone(),
    );

    let offline = orchestrator.run_sync(SyncTrigger::Manual).await.unwrap();
    assert_eq!(offline.status, SyncStatus::SkippedOffline);
    assert_eq!(queue.len().await.unwrap(), 2);

    connectivity.set_online(true);
    let online = orchestrator.run_sync(SyncTrigger::ConnectivityRestored).await.unwrap();
    assert_eq!(online.applied, 2);
    assert!(queue.is_empty().await.unwrap());

    let stored = server.store.records().await.unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[1].event_date.to_string(), "2024-05-02");

    server.stop().await;
}
