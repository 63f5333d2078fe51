//! Health check command - checks a running Latemark server.

use std::time::Duration;

use latemark::{SyncConfig, server::HealthResponse};
use url::Url;

use crate::cli::HealthArgs;

/// URL of the health endpoint under a base URL.
pub fn health_url(base: &Url) -> Result<Url, url::ParseError> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join("health")
}

/// Ask the server whether it is up. Any failure counts as unreachable.
pub async fn probe(client: &reqwest::Client, url: &Url) -> bool {
    match client.get(url.clone()).send().await {
        Ok(response) if response.status().is_success() => response
            .json::<HealthResponse>()
            .await
            .is_ok_and(|body| body.status == "ok"),
        Ok(response) => {
            tracing::debug!(status = %response.status(), "Health probe got error status");
            false
        }
        Err(e) => {
            tracing::debug!("Health probe failed: {e}");
            false
        }
    }
}

/// Run the health check command
pub async fn run(args: &HealthArgs) -> Result<(), Box<dyn std::error::Error>> {
    let base = SyncConfig::parse_endpoint(&args.url)?;
    let url = health_url(&base)?;
    let timeout = Duration::from_secs(args.timeout);

    let client = reqwest::Client::builder().timeout(timeout).build()?;

    match client.get(url.clone()).send().await {
        Ok(response) if response.status().is_success() => {
            let body: serde_json::Value = response.json().await?;
            let status = body.get("status").and_then(|s| s.as_str()).unwrap_or("");
            if status == "ok" {
                println!("healthy: {}", body);
                Ok(())
            } else {
                eprintln!("unhealthy: server returned status {}", status);
                std::process::exit(1);
            }
        }
        Ok(response) => {
            eprintln!(
                "unhealthy: server returned HTTP status {}",
                response.status()
            );
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("unhealthy: failed to connect to {}: {}", url, e);
            std::process::exit(1);
        }
    }
}
