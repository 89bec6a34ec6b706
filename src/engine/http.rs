//! Request plumbing shared by the engine endpoints.

use rand::Rng;
use reqwest::{RequestBuilder, Response, StatusCode};
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

use crate::error::{ToolError, ToolResult};

/// First retry waits this long; every further one doubles it
const BACKOFF_START: Duration = Duration::from_millis(500);

/// Jitter is at most a quarter of the delay
const JITTER_FRACTION: u32 = 4;

/// Gateway and throttling statuses; a 500 from the engine is a real failure.
fn transient_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::REQUEST_TIMEOUT
            | StatusCode::TOO_MANY_REQUESTS
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

fn transient_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_body()
}

/// Delay before retry number `attempt` (zero based), without jitter.
fn backoff(attempt: usize) -> Duration {
    let factor = 1u32.checked_shl(attempt as u32).unwrap_or(u32::MAX);
    BACKOFF_START.saturating_mul(factor)
}

fn jittered(delay: Duration) -> Duration {
    let spread = (delay / JITTER_FRACTION).as_millis() as u64;
    if spread == 0 {
        return delay;
    }
    delay + Duration::from_millis(rand::thread_rng().gen_range(0..=spread))
}

/// Map a transport failure to the error callers branch on.
pub(super) fn send_error(err: reqwest::Error) -> ToolError {
    if err.is_connect() {
        ToolError::EngineUnavailable(err.to_string())
    } else if err.is_timeout() {
        ToolError::Engine(format!("request timed out: {}", err))
    } else {
        ToolError::Engine(err.to_string())
    }
}

/// Send a request, retrying transient failures up to `max_retries` times.
///
/// Error responses that are not transient come back as-is so the caller can
/// read the body.
pub(super) async fn send_with_retry(
    max_retries: usize,
    mut make_request: impl FnMut() -> RequestBuilder,
) -> ToolResult<Response> {
    let mut attempt = 0;
    loop {
        let last = attempt >= max_retries;
        let reason = match make_request().send().await {
            Ok(response) if response.status().is_success() => return Ok(response),
            Ok(response) if last || !transient_status(response.status()) => return Ok(response),
            Ok(response) => {
                let status = response.status();
                // Drain so the connection can be reused.
                let _ = response.bytes().await;
                format!("status {}", status)
            }
            Err(err) if last || !transient_error(&err) => return Err(send_error(err)),
            Err(err) => err.to_string(),
        };

        let delay = jittered(backoff(attempt));
        debug!(
            "Engine request failed ({}); retry {}/{} in {:?}",
            reason,
            attempt + 1,
            max_retries,
            delay
        );
        sleep(delay).await;
        attempt += 1;
    }
}
