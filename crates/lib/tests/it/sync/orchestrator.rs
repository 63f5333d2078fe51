use std::sync::Arc;

use latemark::ConnectivityMonitor;
use latemark::sync::{BatchReconciler, SyncOrchestrator, SyncStatus, SyncTrigger};

use crate::helpers::{
    FailingRemovalQueue, GatedTransport, Reply, ScriptedTransport, enqueue_all, invalid_record,
    orchestrator, record, response,
};

#[tokio::test]
async fn test_full_success_with_inferred_duplicate_clears_queue() {
    let transport = ScriptedTransport::new([Reply::Respond(response(3, 2, &[]))]);
    let orchestrator = orchestrator(transport.clone(), true);
    enqueue_all(orchestrator.queue(), &[record(10), record(11), record(10)]).await;

    let result = orchestrator.run_sync(SyncTrigger::Manual).await.unwrap();

    assert_eq!(result.status, SyncStatus::Completed);
    assert_eq!(result.applied, 2);
    assert_eq!(result.duplicates, 1);
    assert_eq!(result.failed(), 0);
    assert!(orchestrator.queue().is_empty().await.unwrap());
}

#[tokio::test]
async fn test_rejected_record_stays_queued() {
    let transport = ScriptedTransport::new([Reply::Respond(response(2, 1, &[1]))]);
    let orchestrator = orchestrator(transport, true);
    enqueue_all(orchestrator.queue(), &[record(10), invalid_record()]).await;

    let result = orchestrator.run_sync(SyncTrigger::Manual).await.unwrap();

    assert_eq!(result.removed, 1);
    assert_eq!(result.retained, 1);
    assert_eq!(
        result.failures[0].reason,
        "All IDs must be positive integers"
    );
    let pending = orchestrator.queue().list_pending().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].record, invalid_record());
}

#[tokio::test]
async fn test_exactly_failed_count_remains() {
    let transport = ScriptedTransport::new([Reply::Respond(response(5, 2, &[0, 3]))]);
    let orchestrator = orchestrator(transport, true);
    let records: Vec<_> = (1..=5).map(record).collect();
    enqueue_all(orchestrator.queue(), &records).await;

    orchestrator.run_sync(SyncTrigger::Manual).await.unwrap();

    let remaining: Vec<_> = orchestrator
        .queue()
        .list_pending()
        .await
        .unwrap()
        .into_iter()
        .map(|item| item.record.subject_id)
        .collect();
    assert_eq!(remaining, vec![1, 4]);
}

#[tokio::test]
async fn test_offline_sync_makes_no_call() {
    let transport = ScriptedTransport::new([]);
    let orchestrator = orchestrator(transport.clone(), false);
    let mut events = orchestrator.subscribe();
    enqueue_all(orchestrator.queue(), &[record(10)]).await;

    let result = orchestrator.run_sync(SyncTrigger::Manual).await.unwrap();

    assert_eq!(result.status, SyncStatus::SkippedOffline);
    assert_eq!(transport.calls(), 0);
    assert_eq!(orchestrator.queue().len().await.unwrap(), 1);

    let event = events.recv().await.unwrap();
    assert_eq!(event.applied_count, 0);
    assert_eq!(event.duplicate_count, 0);
    assert_eq!(event.failed_count, 0);
}

#[tokio::test]
async fn test_transport_failure_keeps_queue_unchanged() {
    let transport = ScriptedTransport::new([Reply::Fail("connection reset".to_string())]);
    let orchestrator = orchestrator(transport.clone(), true);
    let mut events = orchestrator.subscribe();
    enqueue_all(orchestrator.queue(), &[record(10), record(11)]).await;
    let before = orchestrator.queue().list_pending().await.unwrap();

    let result = orchestrator.run_sync(SyncTrigger::Manual).await.unwrap();

    assert!(matches!(result.status, SyncStatus::TransportFailed(_)));
    assert_eq!(result.removed, 0);
    assert_eq!(orchestrator.queue().list_pending().await.unwrap(), before);

    let event = events.recv().await.unwrap();
    assert!(event.error.unwrap().contains("connection reset"));

    // Next attempt resends the whole batch
    orchestrator.run_sync(SyncTrigger::Manual).await.unwrap();
    assert_eq!(transport.calls(), 2);
    assert_eq!(transport.requests()[1].records.len(), 2);
    assert!(orchestrator.queue().is_empty().await.unwrap());
}

#[tokio::test]
async fn test_inconsistent_response_is_treated_as_transport_failure() {
    // Claims more records than were sent
    let transport = ScriptedTransport::new([Reply::Respond(response(3, 3, &[]))]);
    let orchestrator = orchestrator(transport, true);
    enqueue_all(orchestrator.queue(), &[record(10)]).await;

    let result = orchestrator.run_sync(SyncTrigger::Manual).await.unwrap();

    assert!(matches!(result.status, SyncStatus::TransportFailed(_)));
    assert_eq!(orchestrator.queue().len().await.unwrap(), 1);
}

#[tokio::test]
async fn test_batch_indexes_follow_creation_order() {
    let transport = ScriptedTransport::new([]);
    let orchestrator = orchestrator(transport.clone(), true);
    enqueue_all(orchestrator.queue(), &[record(30), record(10), record(20)]).await;
    let snapshot = orchestrator.queue().list_pending().await.unwrap();

    orchestrator.run_sync(SyncTrigger::Manual).await.unwrap();

    let request = &transport.requests()[0];
    for (position, (wire, item)) in request.records.iter().zip(&snapshot).enumerate() {
        assert_eq!(wire.index, position);
        assert_eq!(wire.subject_id, item.record.subject_id);
    }
}

#[tokio::test]
async fn test_concurrent_runs_make_one_call() {
    let transport = Arc::new(GatedTransport::default());
    let orchestrator = orchestrator(transport.clone(), true);
    enqueue_all(orchestrator.queue(), &[record(10), record(11)]).await;

    let first = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move { orchestrator.run_sync(SyncTrigger::Manual).await })
    };
    transport.entered.notified().await;
    assert!(orchestrator.is_running());

    let second = orchestrator
        .run_sync(SyncTrigger::ConnectivityRestored)
        .await
        .unwrap();
    assert_eq!(second.status, SyncStatus::SkippedAlreadyRunning);
    assert_eq!(second.applied, 0);
    assert_eq!(second.failed(), 0);
    assert_eq!(orchestrator.queue().len().await.unwrap(), 2);

    transport.release.notify_one();
    let first = first.await.unwrap().unwrap();
    assert_eq!(first.status, SyncStatus::Completed);
    assert_eq!(transport.calls(), 1);
    assert!(!orchestrator.is_running());
    assert!(orchestrator.queue().is_empty().await.unwrap());
}

#[tokio::test]
async fn test_items_enqueued_during_sync_survive() {
    let transport = Arc::new(GatedTransport::default());
    let orchestrator = orchestrator(transport.clone(), true);
    enqueue_all(orchestrator.queue(), &[record(10)]).await;

    let run = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move { orchestrator.run_sync(SyncTrigger::Manual).await })
    };
    transport.entered.notified().await;
    enqueue_all(orchestrator.queue(), &[record(11)]).await;
    transport.release.notify_one();
    run.await.unwrap().unwrap();

    let pending = orchestrator.queue().list_pending().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].record, record(11));
}

async fn assert_removal_failure_propagates(reply: Reply) {
    let transport = ScriptedTransport::new([reply]);
    let orchestrator = SyncOrchestrator::new(
        Arc::new(FailingRemovalQueue::default()),
        BatchReconciler::new(transport.clone()),
        Arc::new(ConnectivityMonitor::new(true)),
    );
    let mut events = orchestrator.subscribe();
    enqueue_all(orchestrator.queue(), &[record(10), invalid_record()]).await;
    let before = orchestrator.queue().list_pending().await.unwrap();

    let err = orchestrator
        .run_sync(SyncTrigger::Manual)
        .await
        .unwrap_err();

    assert!(err.is_storage_error());
    assert!(!orchestrator.is_running());
    assert_eq!(transport.calls(), 1);

    let event = events.recv().await.unwrap();
    assert_eq!(event.trigger, SyncTrigger::Manual);
    assert!(event.error.unwrap().contains("disk full"));

    assert_eq!(orchestrator.queue().list_pending().await.unwrap(), before);
    assert!(orchestrator.last_result().is_none());
}

#[tokio::test]
async fn test_storage_failure_clearing_snapshot_is_returned() {
    assert_removal_failure_propagates(Reply::Respond(response(2, 2, &[]))).await;
}

#[tokio::test]
async fn test_storage_failure_removing_resolved_items_is_returned() {
    assert_removal_failure_propagates(Reply::Respond(response(2, 1, &[1]))).await;
}
