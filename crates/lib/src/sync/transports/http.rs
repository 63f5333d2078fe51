//! HTTP transport implementation for batch sync.
//!
//! Sends the batch as a JSON body to `<endpoint>/sync` with reqwest. The
//! client-side request timeout is the only deadline a sync has.

use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use super::SyncTransport;
use crate::Result;
use crate::sync::error::SyncError;
use crate::sync::protocol::{SYNC_PATH, SyncRequest, SyncResponse};

/// HTTP transport using reqwest.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    url: Url,
}

impl HttpTransport {
    /// Create a transport posting to the batch endpoint under `endpoint`.
    ///
    /// `endpoint` is the base URL of the remote store, e.g.
    /// `https://records.example.org/api/`.
    pub fn new(endpoint: &Url, timeout: Duration) -> Result<Self> {
        let url = sync_url(endpoint)?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::TransportInit(e.to_string()))?;
        Ok(Self { client, url })
    }

    /// The full URL batches are posted to.
    pub fn url(&self) -> &Url {
        &self.url
    }
}

/// Resolve the batch endpoint under a base URL, tolerating a missing
/// trailing slash.
pub fn sync_url(endpoint: &Url) -> Result<Url> {
    let mut base = endpoint.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(SYNC_PATH).map_err(|e| {
        SyncError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

#[async_trait]
impl SyncTransport for HttpTransport {
    fn transport_type(&self) -> &'static str {
        "http"
    }

    async fn send_batch(&self, request: &SyncRequest) -> Result<SyncResponse> {
        let response = self
            .client
            .post(self.url.clone())
            .json(request)
            .send()
            .await
            .map_err(|e| SyncError::ConnectionFailed {
                address: self.url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::ServerStatus {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let sync_response: SyncResponse = response
            .json()
            .await
            .map_err(|e| SyncError::InvalidResponse(e.to_string()))?;

        Ok(sync_response)
    }
}
