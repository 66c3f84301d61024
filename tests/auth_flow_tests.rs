//! End-to-end session tests against an in-process mock of the library API:
//! login success/failure, transparent 401 refresh with single retry,
//! teardown on refresh rejection, and coalescing of concurrent refreshes.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::Engine;
use parking_lot::Mutex;
use tempfile::tempdir;

use libris::auth::{SessionManager, TokenPair, TokenStore};
use libris::catalog::Catalog;
use libris::client::ApiClient;
use libris::config::Config;
use libris::error::ApiError;

const REFRESH_TOKEN: &str = "refresh-token-1";

fn jwt_for(email: &str, marker: &str) -> String {
    let enc = |b: &[u8]| base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(b);
    format!(
        "{}.{}.{}",
        enc(br#"{"alg":"HS256","typ":"JWT"}"#),
        enc(serde_json::json!({"email": email, "jti": marker}).to_string().as_bytes()),
        enc(b"sig")
    )
}

struct MockApi {
    /// The only access token the protected endpoint currently accepts.
    valid_access: Mutex<String>,
    refresh_calls: AtomicUsize,
    refresh_succeeds: AtomicBool,
    /// When false, even freshly refreshed tokens are rejected; used to
    /// prove the retried request does not refresh a second time.
    accept_anything: AtomicBool,
}

type AppState = Arc<MockApi>;

fn bearer_of(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|s| s.to_string())
}

async fn token_endpoint(
    State(st): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> (StatusCode, Json<serde_json::Value>) {
    let user = body.get("username").and_then(|v| v.as_str()).unwrap_or("");
    let pass = body.get("password").and_then(|v| v.as_str()).unwrap_or("");
    if user == "alice" && pass == "secret" {
        let access = jwt_for("alice@example.org", "login");
        *st.valid_access.lock() = access.clone();
        (
            StatusCode::OK,
            Json(serde_json::json!({"access": access, "refresh": REFRESH_TOKEN})),
        )
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({"detail": "No active account found with the given credentials"})),
        )
    }
}

async fn refresh_endpoint(
    State(st): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> (StatusCode, Json<serde_json::Value>) {
    st.refresh_calls.fetch_add(1, Ordering::SeqCst);
    let presented = body.get("refresh").and_then(|v| v.as_str()).unwrap_or("");
    if presented == REFRESH_TOKEN && st.refresh_succeeds.load(Ordering::SeqCst) {
        let n = st.refresh_calls.load(Ordering::SeqCst);
        let access = jwt_for("alice@example.org", &format!("refreshed-{}", n));
        *st.valid_access.lock() = access.clone();
        (StatusCode::OK, Json(serde_json::json!({"access": access})))
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({"detail": "Token is invalid or expired"})),
        )
    }
}

async fn borrowed_endpoint(
    State(st): State<AppState>,
    headers: HeaderMap,
) -> (StatusCode, Json<serde_json::Value>) {
    let authorized = st.accept_anything.load(Ordering::SeqCst)
        && bearer_of(&headers).is_some_and(|tok| tok == *st.valid_access.lock());
    if authorized {
        (StatusCode::OK, Json(serde_json::json!([])))
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({"detail": "Given token not valid for any token type"})),
        )
    }
}

async fn spawn_mock() -> (AppState, SocketAddr) {
    let state: AppState = Arc::new(MockApi {
        valid_access: Mutex::new(String::new()),
        refresh_calls: AtomicUsize::new(0),
        refresh_succeeds: AtomicBool::new(true),
        accept_anything: AtomicBool::new(true),
    });
    let app = Router::new()
        .route("/api/auth/token/", post(token_endpoint))
        .route("/api/auth/token/refresh/", post(refresh_endpoint))
        .route("/api/users/me/books/", get(borrowed_endpoint))
        .with_state(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (state, addr)
}

struct Harness {
    state: AppState,
    store: Arc<TokenStore>,
    client: Arc<ApiClient>,
    _tmp: tempfile::TempDir,
}

async fn harness_with(pair: Option<TokenPair>) -> Harness {
    let (state, addr) = spawn_mock().await;
    let tmp = tempdir().unwrap();
    let store = Arc::new(TokenStore::new(tmp.path()));
    if let Some(p) = &pair {
        store.save(p).unwrap();
    }
    let cfg = Config {
        api_url: format!("http://{}", addr),
        state_dir: tmp.path().to_path_buf(),
        ..Config::default()
    };
    let client = Arc::new(ApiClient::new(&cfg, store.clone()).unwrap());
    Harness { state, store, client, _tmp: tmp }
}

fn stale_pair() -> TokenPair {
    TokenPair { access: jwt_for("alice@example.org", "stale"), refresh: REFRESH_TOKEN.into() }
}

#[tokio::test]
async fn login_persists_pair_and_derives_identity() {
    let h = harness_with(None).await;
    let session = SessionManager::new(h.client.clone());
    assert!(!session.is_authenticated());

    let id = session.login("alice", "secret").await.unwrap();
    assert_eq!(id.email, "alice@example.org");
    assert!(!session.login_in_progress());

    let persisted = h.store.load().expect("pair persisted");
    assert_eq!(persisted.refresh, REFRESH_TOKEN);
    assert_eq!(session.current_user().unwrap().email, "alice@example.org");
}

#[tokio::test]
async fn failed_login_leaves_state_untouched() {
    let h = harness_with(None).await;
    let session = SessionManager::new(h.client.clone());

    let err = session.login("alice", "wrong").await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidCredentials(_)));
    assert!(err.to_string().contains("No active account found"));
    assert!(h.store.load().is_none());
    assert!(!session.is_authenticated());
    assert!(!session.login_in_progress());
}

#[tokio::test]
async fn expired_access_token_is_refreshed_and_retried_once() {
    let h = harness_with(Some(stale_pair())).await;
    let catalog = Catalog::new(h.client.clone());

    let records = catalog.my_borrowed().await.unwrap();
    assert!(records.is_empty());
    assert_eq!(h.state.refresh_calls.load(Ordering::SeqCst), 1);

    // The new pair is persisted: fresh access token, same refresh token.
    let persisted = h.store.load().unwrap();
    assert_ne!(persisted.access, stale_pair().access);
    assert_eq!(persisted.refresh, REFRESH_TOKEN);
    // And the retried request carried it: the server only accepted the
    // token it handed back from the refresh endpoint.
    assert_eq!(persisted.access, *h.state.valid_access.lock());
}

#[tokio::test]
async fn rejected_refresh_tears_down_the_session() {
    let h = harness_with(Some(stale_pair())).await;
    h.state.refresh_succeeds.store(false, Ordering::SeqCst);
    let session = SessionManager::new(h.client.clone());
    let catalog = Catalog::new(h.client.clone());
    assert!(session.is_authenticated());

    let err = catalog.my_borrowed().await.unwrap_err();
    assert!(matches!(err, ApiError::RefreshExpired(_)));
    assert!(h.store.load().is_none());
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn retried_request_does_not_refresh_twice() {
    let h = harness_with(Some(stale_pair())).await;
    // Refresh succeeds, but the protected endpoint keeps rejecting, so the
    // replayed request 401s again. That second 401 must propagate without
    // another refresh.
    h.state.accept_anything.store(false, Ordering::SeqCst);
    let catalog = Catalog::new(h.client.clone());

    let err = catalog.my_borrowed().await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized(_)));
    assert_eq!(h.state.refresh_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn concurrent_expiries_share_one_refresh_call() {
    let h = harness_with(Some(stale_pair())).await;
    let catalog = Arc::new(Catalog::new(h.client.clone()));

    let calls = (0..5).map(|_| {
        let catalog = catalog.clone();
        async move { catalog.my_borrowed().await }
    });
    let results = futures::future::join_all(calls).await;
    for r in results {
        r.unwrap();
    }
    assert_eq!(h.state.refresh_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn logout_clears_everything_and_is_repeatable() {
    let h = harness_with(Some(stale_pair())).await;
    let session = SessionManager::new(h.client.clone());
    assert!(session.is_authenticated());

    session.logout();
    assert!(h.store.load().is_none());
    assert!(!session.is_authenticated());
    session.logout();
    assert!(!session.is_authenticated());
}
