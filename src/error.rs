//! Unified client error model.
//! A closed taxonomy so callers can branch on kind instead of scraping
//! free-text messages: transport failures, credential rejection, recoverable
//! token expiry, unrecoverable refresh rejection, and local storage faults
//! are all distinct variants.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// Request never completed: DNS, connect, timeout, broken transport.
    #[error("network error: {0}")]
    Network(String),
    /// Login was rejected by the token endpoint (bad username/password).
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),
    /// An authenticated request came back 401. Recoverable via refresh;
    /// callers only see this once refresh has been ruled out.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// The refresh token itself was rejected. The session is torn down
    /// before this is returned.
    #[error("session expired: {0}")]
    RefreshExpired(String),
    /// Access token could not be parsed as a JWT or lacks required claims.
    #[error("malformed token: {0}")]
    MalformedToken(String),
    /// The server refused the operation (4xx with an error body, e.g.
    /// borrowing a book with no available copies).
    #[error("rejected: {0}")]
    Rejected(String),
    /// 5xx or an unparseable response.
    #[error("server error: {0}")]
    Server(String),
    /// Local token persistence failed.
    #[error("storage error: {0}")]
    Storage(String),
}

impl ApiError {
    pub fn network<S: Into<String>>(msg: S) -> Self { ApiError::Network(msg.into()) }
    pub fn invalid_credentials<S: Into<String>>(msg: S) -> Self { ApiError::InvalidCredentials(msg.into()) }
    pub fn unauthorized<S: Into<String>>(msg: S) -> Self { ApiError::Unauthorized(msg.into()) }
    pub fn refresh_expired<S: Into<String>>(msg: S) -> Self { ApiError::RefreshExpired(msg.into()) }
    pub fn malformed_token<S: Into<String>>(msg: S) -> Self { ApiError::MalformedToken(msg.into()) }
    pub fn rejected<S: Into<String>>(msg: S) -> Self { ApiError::Rejected(msg.into()) }
    pub fn server<S: Into<String>>(msg: S) -> Self { ApiError::Server(msg.into()) }
    pub fn storage<S: Into<String>>(msg: S) -> Self { ApiError::Storage(msg.into()) }

    /// Short stable kind identifier, used in log lines and CLI output.
    pub fn kind_str(&self) -> &'static str {
        match self {
            ApiError::Network(_) => "network",
            ApiError::InvalidCredentials(_) => "invalid_credentials",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::RefreshExpired(_) => "refresh_expired",
            ApiError::MalformedToken(_) => "malformed_token",
            ApiError::Rejected(_) => "rejected",
            ApiError::Server(_) => "server",
            ApiError::Storage(_) => "storage",
        }
    }

    /// Map a non-success response to the taxonomy. `body_error` is the
    /// server's `{"error": ...}` / `{"detail": ...}` text when present.
    pub fn from_status(status: u16, body_error: Option<&str>) -> Self {
        let msg = body_error.unwrap_or("request failed").to_string();
        match status {
            401 => ApiError::Unauthorized(msg),
            400..=499 => ApiError::Rejected(msg),
            _ => ApiError::Server(format!("HTTP {}: {}", status, msg)),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        // Status errors are mapped via from_status before this point;
        // anything reqwest itself fails on is transport-level.
        ApiError::Network(e.to_string())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod error_tests;
