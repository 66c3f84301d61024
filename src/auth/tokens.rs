//! Token pair and JWT payload decoding.
//! Decode is claim extraction only; signature verification is the server's
//! job and the result is used for identity display, never authorization.

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};

/// The access/refresh tuple backing a session. Persisted and replaced
/// wholesale; a partial pair is never written.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Identity derived from the access token's claim set. Recomputed whenever
/// the pair changes, never persisted on its own.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserIdentity {
    pub email: String,
}

#[derive(Debug, Deserialize)]
struct Claims {
    email: Option<String>,
    #[serde(default)]
    #[allow(dead_code)]
    exp: Option<i64>,
}

/// Extract a [`UserIdentity`] from a JWT access token without verifying the
/// signature. Structural problems and missing claims both map to
/// [`ApiError::MalformedToken`].
pub fn decode_identity(access: &str) -> ApiResult<UserIdentity> {
    let mut parts = access.split('.');
    let (_header, payload) = match (parts.next(), parts.next()) {
        (Some(h), Some(p)) if !h.is_empty() && !p.is_empty() => (h, p),
        _ => return Err(ApiError::malformed_token("token is not a structured JWT")),
    };
    let raw = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| ApiError::malformed_token(format!("payload is not base64url: {}", e)))?;
    let claims: Claims = serde_json::from_slice(&raw)
        .map_err(|e| ApiError::malformed_token(format!("payload is not a JSON claim set: {}", e)))?;
    match claims.email {
        Some(email) if !email.is_empty() => Ok(UserIdentity { email }),
        _ => Err(ApiError::malformed_token("claim set lacks an email claim")),
    }
}
