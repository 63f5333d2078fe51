use latemark::queue::{QueueStore, SqliteQueue};

use super::helpers::record;

#[tokio::test]
async fn test_pending_items_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("queue.db");

    let queue = SqliteQueue::open(&path).await.unwrap();
    let first = queue.enqueue(&record(10), 1_000).await.unwrap();
    let second = queue.enqueue(&record(11), 2_000).await.unwrap();
    queue.close().await;

    let reopened = SqliteQueue::open(&path).await.unwrap();
    let pending = reopened.list_pending().await.unwrap();
    let ids: Vec<_> = pending.iter().map(|item| item.local_id).collect();
    assert_eq!(ids, vec![first, second]);
    assert_eq!(pending[0].record, record(10));
    assert_eq!(pending[1].created_at_ms, 2_000);
}

#[tokio::test]
async fn test_clear_through_spares_later_items() {
    let queue = SqliteQueue::in_memory().await.unwrap();
    queue.enqueue(&record(1), 0).await.unwrap();
    let snapshot_end = queue.enqueue(&record(2), 0).await.unwrap();

    // Enqueued after the snapshot was taken
    let late = queue.enqueue(&record(3), 0).await.unwrap();

    queue.clear_through(snapshot_end).await.unwrap();
    let pending = queue.list_pending().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].local_id, late);
}

#[tokio::test]
async fn test_remove_many_ignores_absent_ids() {
    let queue = SqliteQueue::in_memory().await.unwrap();
    let a = queue.enqueue(&record(1), 0).await.unwrap();
    let b = queue.enqueue(&record(2), 0).await.unwrap();

    queue.remove_many(&[a, 9_999]).await.unwrap();
    queue.remove_many(&[a]).await.unwrap();

    let pending = queue.list_pending().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].local_id, b);
}

#[tokio::test]
async fn test_same_record_can_be_queued_twice() {
    let queue = SqliteQueue::in_memory().await.unwrap();
    queue.enqueue(&record(1), 0).await.unwrap();
    queue.enqueue(&record(1), 0).await.unwrap();
    assert_eq!(queue.len().await.unwrap(), 2);
}
