//! Shared HTTP client for the library API.
//! One [`ApiClient`] carries the base URL, JSON defaults, a defensive
//! request timeout and the single token slot read by every authenticated
//! request. Bearer attachment is an explicit per-request read of that slot,
//! not a mutation of client-wide default headers, so tests and callers can
//! see exactly which credential a request carried.

mod refresh;

use parking_lot::RwLock;
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::auth::store::TokenStore;
use crate::auth::tokens::TokenPair;
use crate::config::Config;
use crate::error::{ApiError, ApiResult};

use refresh::RefreshGate;

/// A request described by value so the refresh interceptor can replay it.
#[derive(Debug, Clone)]
pub(crate) struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<serde_json::Value>,
}

pub struct ApiClient {
    base: Url,
    http: reqwest::Client,
    store: Arc<TokenStore>,
    /// The one shared token slot. Replaced wholesale; readers clone.
    slot: RwLock<Option<TokenPair>>,
    gate: RefreshGate,
}

impl ApiClient {
    /// Build the shared client and hydrate the token slot from the store.
    pub fn new(cfg: &Config, store: Arc<TokenStore>) -> ApiResult<Self> {
        let base = Url::parse(&cfg.api_url)
            .map_err(|e| ApiError::network(format!("invalid base URL '{}': {}", cfg.api_url, e)))?;
        let http = reqwest::Client::builder()
            .timeout(cfg.http_timeout)
            .build()
            .map_err(|e| ApiError::network(format!("build HTTP client: {}", e)))?;
        let slot = RwLock::new(store.load());
        Ok(Self { base, http, store, slot, gate: RefreshGate::new() })
    }

    pub fn base_url(&self) -> &Url { &self.base }

    /// Snapshot of the current pair, if any.
    pub fn token_pair(&self) -> Option<TokenPair> { self.slot.read().clone() }

    /// Install a new pair: persist first, then swap the slot in a single
    /// assignment so concurrent requests never see a half-updated pair.
    pub(crate) fn install_pair(&self, pair: TokenPair) -> ApiResult<()> {
        self.store.save(&pair)?;
        *self.slot.write() = Some(pair);
        Ok(())
    }

    /// Drop the session: clear the durable store and the in-memory slot.
    /// Idempotent and infallible.
    pub(crate) fn teardown(&self) {
        self.store.clear();
        *self.slot.write() = None;
        debug!("session torn down");
    }

    fn url_for(&self, path: &str) -> ApiResult<Url> {
        self.base
            .join(path)
            .map_err(|e| ApiError::network(format!("invalid request path '{}': {}", path, e)))
    }

    /// Lowest-level send. Only transport failures error here; HTTP status
    /// interpretation belongs to the caller.
    pub(crate) async fn send_raw(
        &self,
        req: &ApiRequest,
        bearer: Option<&str>,
    ) -> ApiResult<(u16, serde_json::Value)> {
        let url = self.url_for(&req.path)?;
        let mut builder = self.http.request(req.method.clone(), url);
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &req.body {
            builder = builder.json(body);
        }
        let resp = builder.send().await?;
        let status = resp.status().as_u16();
        // Empty and non-JSON bodies are fine; status drives the outcome.
        let val = resp.json::<serde_json::Value>().await.unwrap_or(serde_json::Value::Null);
        Ok((status, val))
    }

    /// Send an authenticated request through the refresh interceptor and
    /// decode the success body.
    pub(crate) async fn send_authed<T: DeserializeOwned>(&self, req: ApiRequest) -> ApiResult<T> {
        let val = refresh::send_with_refresh(self, &req).await?;
        serde_json::from_value(val)
            .map_err(|e| ApiError::server(format!("unexpected response shape: {}", e)))
    }

    /// Send without credentials (login, refresh, registration). The caller
    /// interprets non-success statuses for its own context.
    pub(crate) async fn send_public(
        &self,
        method: Method,
        path: &str,
        body: &impl Serialize,
    ) -> ApiResult<(u16, serde_json::Value)> {
        let req = ApiRequest {
            method,
            path: path.to_string(),
            body: Some(serde_json::to_value(body).map_err(|e| ApiError::server(e.to_string()))?),
        };
        self.send_raw(&req, None).await
    }

    pub(crate) fn gate(&self) -> &RefreshGate { &self.gate }

    // Typed helpers used by the catalog layer --------------------------------

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.send_authed(ApiRequest { method: Method::GET, path: path.to_string(), body: None }).await
    }

    pub(crate) async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> ApiResult<T> {
        self.send_authed(ApiRequest { method: Method::POST, path: path.to_string(), body: Some(body) }).await
    }

    pub(crate) async fn put_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> ApiResult<T> {
        self.send_authed(ApiRequest { method: Method::PUT, path: path.to_string(), body: Some(body) }).await
    }
}

/// Server error text from an `{"error": ...}` / `{"detail": ...}` body.
pub(crate) fn server_error_text(val: &serde_json::Value) -> Option<&str> {
    refresh::body_error(val)
}
