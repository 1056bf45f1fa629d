//! Suite-wide readiness gate
//!
//! Runs once, before any browser starts: the application can take a while
//! to boot, and failing every scenario on connection refused tells nobody
//! anything.

use std::time::{Duration, Instant};

use tokio::time::sleep;
use tracing::{debug, info};

use crate::error::{E2eError, E2eResult};

/// Delay between probes
pub const PROBE_INTERVAL: Duration = Duration::from_millis(500);

/// Poll `url` until it answers 2xx (after redirects) or `timeout` elapses
pub async fn wait_for_http_ok(url: &str, timeout: Duration) -> E2eResult<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()?;
    wait_for_http_ok_with(&client, url, timeout, PROBE_INTERVAL).await
}

/// [`wait_for_http_ok`] with an explicit client and probe interval
pub async fn wait_for_http_ok_with(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
    interval: Duration,
) -> E2eResult<()> {
    let deadline = Instant::now() + timeout;
    let mut last_error = String::from("Timed out waiting for app");
    let mut attempts = 0u32;

    while Instant::now() < deadline {
        attempts += 1;
        match client.get(url).send().await {
            Ok(resp) if resp.status().is_success() => {
                if attempts > 1 {
                    info!("{} is up after {} attempt(s)", url, attempts);
                }
                return Ok(());
            }
            Ok(resp) => {
                last_error = format!("Non-OK response: {}", resp.status().as_u16());
            }
            Err(e) => {
                if attempts == 1 {
                    info!("Waiting for {} ...", url);
                }
                last_error = e.to_string();
            }
        }
        debug!("Readiness probe {} failed: {}", attempts, last_error);
        sleep(interval).await;
    }

    Err(E2eError::EnvironmentNotReady {
        url: url.to_string(),
        last_error,
    })
}
