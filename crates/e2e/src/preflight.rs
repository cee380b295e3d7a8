//! Reachability check for the hosted application

use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::{E2eError, E2eResult};

/// Poll `base_url` until it answers with a non-server-error status
pub async fn wait_for_app(base_url: &str, timeout_duration: Duration) -> E2eResult<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()?;

    let start = std::time::Instant::now();
    let mut attempts = 0;

    loop {
        attempts += 1;

        match client.get(base_url).send().await {
            Ok(resp) if !resp.status().is_server_error() => {
                info!("Application answered at {} ({})", base_url, resp.status());
                return Ok(());
            }
            Ok(resp) => {
                warn!("Preflight returned {}", resp.status());
            }
            Err(e) => {
                if attempts == 1 {
                    info!("Waiting for {} to answer...", base_url);
                }
                if !e.is_connect() && !e.is_timeout() {
                    warn!("Preflight error: {}", e);
                }
            }
        }

        if start.elapsed() >= timeout_duration {
            return Err(E2eError::AppUnreachable(attempts));
        }
        sleep(Duration::from_millis(250)).await;
    }
}
