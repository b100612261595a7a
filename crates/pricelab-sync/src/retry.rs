//! Fixed-delay retry for NetLab fetches.
//!
//! The upstream API throttles hard and recovers quickly, so a flat delay
//! between attempts works better here than exponential back-off.
//! Non-transient errors (API-level failures, malformed documents) are
//! returned immediately.

use std::future::Future;
use std::time::Duration;

use pricelab_netlab::NetlabError;

/// Returns `true` for errors worth another attempt after the delay.
///
/// **Retriable:** network-level failures (timeout, connection reset) and
/// HTTP 5xx responses.
///
/// **Not retriable:** embedded API errors, malformed documents, and 4xx
/// statuses; repeating the identical request cannot change those.
pub(crate) fn is_transient(err: &NetlabError) -> bool {
    match err {
        NetlabError::Http(e) => {
            e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
        }
        NetlabError::UnexpectedStatus { status, .. } => (500..=599).contains(status),
        NetlabError::Api { .. }
        | NetlabError::Xml { .. }
        | NetlabError::MissingElement { .. }
        | NetlabError::InvalidValue { .. }
        | NetlabError::InvalidBaseUrl { .. } => false,
    }
}

/// Runs `operation` with up to `max_retries` additional attempts on
/// transient errors, sleeping `delay_ms` between attempts. A permanently
/// failing operation is therefore called `max_retries + 1` times.
pub(crate) async fn retry_fixed<T, F, Fut>(
    max_retries: u32,
    delay_ms: u64,
    mut operation: F,
) -> Result<T, NetlabError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, NetlabError>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_transient(&err) || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err,
                    "NetLab transient error, retrying after fixed delay"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}
