//! Bearer-token cache for the NetLab authentication endpoint.

use chrono::{Local, NaiveDateTime};
use tokio::sync::Mutex;

use crate::error::NetlabError;

/// Expiry format the authentication endpoint uses, local distributor time.
const EXPIRY_FORMAT: &str = "%d.%m.%Y %H:%M";

/// Refresh this many seconds before the advertised expiry so an in-flight
/// request never carries a token that lapses mid-call.
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: NaiveDateTime,
}

/// Cached bearer token guarded by an async mutex.
///
/// The lock is held across the refresh call so concurrent requests that find
/// an expired token trigger exactly one round-trip to the authentication
/// endpoint.
#[derive(Debug, Default)]
pub(crate) struct TokenCache {
    inner: Mutex<Option<CachedToken>>,
}

impl TokenCache {
    /// Returns the cached token, refreshing through `refresh` when the cache
    /// is empty or the token is within the expiry margin.
    pub(crate) async fn get_or_refresh<F, Fut>(&self, refresh: F) -> Result<String, NetlabError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<(String, String), NetlabError>>,
    {
        let mut guard = self.inner.lock().await;

        let now = Local::now().naive_local();
        if let Some(cached) = guard.as_ref() {
            if cached.expires_at - now > chrono::Duration::seconds(EXPIRY_MARGIN_SECS) {
                return Ok(cached.token.clone());
            }
        }

        let (token, expired_in) = refresh().await?;
        let expires_at = parse_expiry(&expired_in)?;
        tracing::debug!(%expires_at, "refreshed NetLab token");
        *guard = Some(CachedToken {
            token: token.clone(),
            expires_at,
        });
        Ok(token)
    }
}

fn parse_expiry(raw: &str) -> Result<NaiveDateTime, NetlabError> {
    NaiveDateTime::parse_from_str(raw.trim(), EXPIRY_FORMAT).map_err(|_| {
        NetlabError::InvalidValue {
            context: "token expiry".to_string(),
            value: raw.to_string(),
        }
    })
}
