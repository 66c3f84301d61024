//! Transparent recovery from access-token expiry.
//!
//! Every authenticated request runs through [`send_with_refresh`]: a 401 on
//! a not-yet-retried request triggers one token-refresh exchange, then one
//! replay of the original request with the new access token. The refresh
//! strictly precedes the replay, a replayed request never refreshes again,
//! and a rejected refresh tears the whole session down.
//!
//! Concurrent expiries coalesce: the gate serializes refresh attempts and a
//! generation counter lets late arrivals detect that another request already
//! renewed the pair, so N simultaneous 401s cost exactly one refresh call.

use reqwest::Method;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::auth::tokens::TokenPair;
use crate::error::{ApiError, ApiResult};

use super::{ApiClient, ApiRequest};

const REFRESH_PATH: &str = "/api/auth/token/refresh/";

pub(crate) struct RefreshGate {
    generation: AtomicU64,
    lock: Mutex<()>,
}

impl RefreshGate {
    pub fn new() -> Self {
        Self { generation: AtomicU64::new(0), lock: Mutex::new(()) }
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    fn bump(&self) {
        self.generation.fetch_add(1, Ordering::Release);
    }
}

/// Pull the server's error text out of a `{"error": ...}` or
/// `{"detail": ...}` body.
pub(crate) fn body_error(val: &serde_json::Value) -> Option<&str> {
    val.get("error")
        .or_else(|| val.get("detail"))
        .and_then(|v| v.as_str())
}

fn status_is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Send `req` with the current access token, recovering from one 401 via
/// the refresh exchange. Returns the decoded success body.
pub(crate) async fn send_with_refresh(
    client: &ApiClient,
    req: &ApiRequest,
) -> ApiResult<serde_json::Value> {
    let observed = client.gate().generation();
    let bearer = client.token_pair().map(|p| p.access);
    let (status, val) = client.send_raw(req, bearer.as_deref()).await?;
    if status_is_success(status) {
        return Ok(val);
    }

    let refresh_available = client.token_pair().map(|p| !p.refresh.is_empty()).unwrap_or(false);
    if status == 401 && refresh_available {
        debug!("{} {} returned 401; attempting token refresh", req.method, req.path);
        recover(client, observed).await?;

        // Replay exactly once with whatever the recovery installed. A second
        // 401 here propagates; it must not trigger another refresh.
        let bearer = client.token_pair().map(|p| p.access);
        let (status, val) = client.send_raw(req, bearer.as_deref()).await?;
        if status_is_success(status) {
            return Ok(val);
        }
        return Err(ApiError::from_status(status, body_error(&val)));
    }

    Err(ApiError::from_status(status, body_error(&val)))
}

/// Exchange the stored refresh token for a new access token, unless another
/// caller already did so since `observed` was read.
async fn recover(client: &ApiClient, observed: u64) -> ApiResult<()> {
    let _guard = client.gate().lock.lock().await;
    if client.gate().generation() != observed {
        // Coalesced: a concurrent request already renewed the pair.
        debug!("refresh already performed by a concurrent request; reusing it");
        return Ok(());
    }
    let Some(pair) = client.token_pair() else {
        // The pair vanished while we waited (a failed refresh tore it down).
        return Err(ApiError::refresh_expired("session cleared while refreshing"));
    };

    let outcome = client
        .send_public(Method::POST, REFRESH_PATH, &serde_json::json!({"refresh": pair.refresh}))
        .await;
    let (status, val) = match outcome {
        Ok(sv) => sv,
        Err(e) => {
            // The state machine treats any refresh failure as terminal for
            // the session, transport failures included.
            client.teardown();
            warn!("token refresh failed in transit: {}", e);
            return Err(e);
        }
    };

    if !status_is_success(status) {
        client.teardown();
        let msg = body_error(&val).unwrap_or("refresh token rejected").to_string();
        warn!("refresh token rejected (HTTP {}); session cleared", status);
        return Err(ApiError::refresh_expired(msg));
    }

    let Some(access) = val.get("access").and_then(|v| v.as_str()) else {
        client.teardown();
        return Err(ApiError::server("refresh response lacks an access token"));
    };
    // The server reuses the refresh token rather than rotating it; adopt a
    // rotated one if it ever starts sending one back.
    let refresh = val
        .get("refresh")
        .and_then(|v| v.as_str())
        .unwrap_or(&pair.refresh)
        .to_string();
    client.install_pair(TokenPair { access: access.to_string(), refresh })?;
    client.gate().bump();
    info!("access token refreshed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_generation_moves_only_on_bump() {
        let gate = RefreshGate::new();
        let g0 = gate.generation();
        assert_eq!(gate.generation(), g0);
        gate.bump();
        assert_eq!(gate.generation(), g0 + 1);
    }

    #[test]
    fn body_error_prefers_error_over_detail() {
        let v = serde_json::json!({"error": "No available copies", "detail": "other"});
        assert_eq!(body_error(&v), Some("No available copies"));
        let v = serde_json::json!({"detail": "No active account found"});
        assert_eq!(body_error(&v), Some("No active account found"));
        assert_eq!(body_error(&serde_json::Value::Null), None);
    }
}
