//! Session lifecycle: login, logout, hydration from persisted tokens.
//! The one entry point consumers use for authentication state changes.
//! Identity is always derived from the access token currently in the slot,
//! so it can never drift from what the interceptor installs during refresh.

use reqwest::Method;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

use crate::client::ApiClient;
use crate::error::{ApiError, ApiResult};

use super::tokens::{decode_identity, TokenPair, UserIdentity};

const TOKEN_PATH: &str = "/api/auth/token/";
const REGISTER_PATH: &str = "/api/users/register/";

pub struct SessionManager {
    client: Arc<ApiClient>,
    login_in_progress: AtomicBool,
}

impl SessionManager {
    /// Wrap the shared client and validate any hydrated token pair. A pair
    /// whose access token no longer decodes is stale state, not an error:
    /// it is cleared and the session starts logged out. No network calls.
    pub fn new(client: Arc<ApiClient>) -> Self {
        if let Some(pair) = client.token_pair() {
            match decode_identity(&pair.access) {
                Ok(id) => info!("session hydrated for {}", id.email),
                Err(e) => {
                    warn!("persisted token pair unusable ({}); starting logged out", e);
                    client.teardown();
                }
            }
        }
        Self { client, login_in_progress: AtomicBool::new(false) }
    }

    /// Exchange credentials for a token pair. On success the pair is
    /// persisted and the derived identity returned; on any failure the
    /// existing session state is left untouched.
    pub async fn login(&self, username: &str, password: &str) -> ApiResult<UserIdentity> {
        self.login_in_progress.store(true, Ordering::SeqCst);
        let out = self.login_inner(username, password).await;
        self.login_in_progress.store(false, Ordering::SeqCst);
        match &out {
            Ok(id) => info!("login succeeded for {}", id.email),
            Err(e) => warn!("login failed ({}): {}", e.kind_str(), e),
        }
        out
    }

    async fn login_inner(&self, username: &str, password: &str) -> ApiResult<UserIdentity> {
        let body = serde_json::json!({"username": username, "password": password});
        let (status, val) = self.client.send_public(Method::POST, TOKEN_PATH, &body).await?;
        if !(200..300).contains(&status) {
            let msg = crate::client::server_error_text(&val).unwrap_or("login rejected");
            return match status {
                400..=499 => Err(ApiError::invalid_credentials(msg)),
                _ => Err(ApiError::server(format!("HTTP {}: {}", status, msg))),
            };
        }
        let (access, refresh) = match (
            val.get("access").and_then(|v| v.as_str()),
            val.get("refresh").and_then(|v| v.as_str()),
        ) {
            (Some(a), Some(r)) if !a.is_empty() && !r.is_empty() => (a, r),
            _ => return Err(ApiError::server("token endpoint returned an incomplete pair")),
        };
        // Decode before persisting: a token we cannot derive an identity
        // from is never installed.
        let identity = decode_identity(access)?;
        self.client.install_pair(TokenPair { access: access.to_string(), refresh: refresh.to_string() })?;
        Ok(identity)
    }

    /// Clear the persisted pair and in-memory state. Unconditional,
    /// idempotent, never fails.
    pub fn logout(&self) {
        self.client.teardown();
        info!("logged out");
    }

    /// Create an account. Anonymous endpoint; does not log in.
    pub async fn register(&self, username: &str, password: &str) -> ApiResult<()> {
        let body = serde_json::json!({"username": username, "password": password});
        let (status, val) = self.client.send_public(Method::POST, REGISTER_PATH, &body).await?;
        if (200..300).contains(&status) {
            info!("registered account {}", username);
            return Ok(());
        }
        let msg = crate::client::server_error_text(&val).unwrap_or("registration rejected");
        match status {
            400..=499 => Err(ApiError::rejected(msg)),
            _ => Err(ApiError::server(format!("HTTP {}: {}", status, msg))),
        }
    }

    /// Identity for the current session, derived from the live access
    /// token. Absent when logged out or the token stopped decoding.
    pub fn current_user(&self) -> Option<UserIdentity> {
        let pair = self.client.token_pair()?;
        decode_identity(&pair.access).ok()
    }

    pub fn is_authenticated(&self) -> bool {
        self.current_user().is_some()
    }

    pub fn login_in_progress(&self) -> bool {
        self.login_in_progress.load(Ordering::SeqCst)
    }
}
