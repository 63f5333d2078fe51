use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use latemark::{
    ConnectivityMonitor, LateRecord, Result,
    queue::{InMemoryQueue, LocalId, QueueError, QueueItem, QueueStore},
    server::{RemoteStore, SyncServer},
    sync::{
        BatchReconciler, SyncError, SyncOrchestrator,
        protocol::{FailedRecord, SyncRequest, SyncResponse},
        transports::{SyncTransport, http::HttpTransport},
    },
};
use tokio::sync::Notify;
use url::Url;

/// A valid record for `subject_id` on 2024-05-01.
pub fn record(subject_id: i64) -> LateRecord {
    LateRecord::parse(subject_id, 1, 5, "2024-05-01").unwrap()
}

/// A record the remote store will reject, bypassing local validation.
pub fn invalid_record() -> LateRecord {
    LateRecord {
        subject_id: 0,
        ..record(1)
    }
}

/// Build a response that reports `applied` and fails the given indexes.
pub fn response(total: usize, applied: usize, failed: &[usize]) -> SyncResponse {
    SyncResponse {
        total_processed: total,
        applied_count: applied,
        failed_count: failed.len(),
        failed_records: failed
            .iter()
            .map(|&index| FailedRecord {
                index,
                record: serde_json::Value::Null,
                reason: "All IDs must be positive integers".to_string(),
            })
            .collect(),
    }
}

pub enum Reply {
    Respond(SyncResponse),
    Fail(String),
}

/// Transport replaying scripted replies and recording every request.
///
/// Once the script runs out it reports every record as applied.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<SyncRequest>>,
}

impl ScriptedTransport {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<SyncRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl SyncTransport for ScriptedTransport {
    fn transport_type(&self) -> &'static str {
        "scripted"
    }

    async fn send_batch(&self, request: &SyncRequest) -> Result<SyncResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(Reply::Respond(response)) => Ok(response),
            Some(Reply::Fail(reason)) => Err(SyncError::ConnectionFailed {
                address: "scripted".to_string(),
                reason,
            }
            .into()),
            None => {
                let total = request.records.len();
                Ok(response(total, total, &[]))
            }
        }
    }
}

/// Transport that holds every batch until released.
#[derive(Default)]
pub struct GatedTransport {
    pub entered: Notify,
    pub release: Notify,
    calls: AtomicUsize,
}

impl GatedTransport {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SyncTransport for GatedTransport {
    fn transport_type(&self) -> &'static str {
        "gated"
    }

    async fn send_batch(&self, request: &SyncRequest) -> Result<SyncResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.entered.notify_one();
        self.release.notified().await;
        let total = request.records.len();
        Ok(response(total, total, &[]))
    }
}

/// An orchestrator over an in-memory queue and the given transport.
pub fn orchestrator(transport: Arc<dyn SyncTransport>, online: bool) -> Arc<SyncOrchestrator> {
    Arc::new(SyncOrchestrator::new(
        Arc::new(InMemoryQueue::new()),
        BatchReconciler::new(transport),
        Arc::new(ConnectivityMonitor::new(online)),
    ))
}

/// Queue that stores normally but fails every removal.
#[derive(Debug, Default)]
pub struct FailingRemovalQueue {
    inner: InMemoryQueue,
}

impl FailingRemovalQueue {
    fn removal_failed(action: &str) -> latemark::Error {
        QueueError::Storage {
            reason: format!("disk full during {action}"),
            source: None,
        }
        .into()
    }
}

#[async_trait]
impl QueueStore for FailingRemovalQueue {
    async fn enqueue(&self, record: &LateRecord, created_at_ms: u64) -> Result<LocalId> {
        self.inner.enqueue(record, created_at_ms).await
    }

    async fn list_pending(&self) -> Result<Vec<QueueItem>> {
        self.inner.list_pending().await
    }

    async fn remove_many(&self, _local_ids: &[LocalId]) -> Result<()> {
        Err(Self::removal_failed("remove_many"))
    }

    async fn clear_all(&self) -> Result<()> {
        Err(Self::removal_failed("clear_all"))
    }

    async fn clear_through(&self, _max_local_id: LocalId) -> Result<()> {
        Err(Self::removal_failed("clear_through"))
    }

    async fn len(&self) -> Result<usize> {
        self.inner.len().await
    }
}

pub async fn enqueue_all(queue: &Arc<dyn QueueStore>, records: &[LateRecord]) {
    for record in records {
        queue.enqueue(record, 0).await.unwrap();
    }
}

/// A remote store served over HTTP on an ephemeral port.
pub struct TestServer {
    pub server: SyncServer,
    pub store: RemoteStore,
    pub endpoint: Url,
}

impl TestServer {
    pub async fn start() -> Self {
        let store = RemoteStore::in_memory().await.unwrap();
        let mut server = SyncServer::new(store.clone());
        let addr = server.start("127.0.0.1:0").await.unwrap();
        let endpoint = Url::parse(&format!("http://{addr}/")).unwrap();
        Self {
            server,
            store,
            endpoint,
        }
    }

    pub fn transport(&self) -> Arc<HttpTransport> {
        Arc::new(HttpTransport::new(&self.endpoint, Duration::from_secs(5)).unwrap())
    }

    pub async fn stop(mut self) {
        self.server.stop().await.unwrap();
    }
}
