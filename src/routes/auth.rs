//! Auth extractor: identity supplied by the upstream session layer.
//!
//! The service sits behind a gateway that authenticates the browser session
//! and forwards the user id in [`USER_ID_HEADER`]. Requests without it are
//! rejected before any handler runs.

use axum::extract::FromRequestParts;
use axum::http::StatusCode;
use axum::http::request::Parts;

pub const USER_ID_HEADER: &str = "x-user-id";

/// Longest accepted user id.
const MAX_USER_ID_LEN: usize = 128;

/// Authenticated user. Use as a handler parameter to require authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: String,
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .unwrap_or_default();
        if user_id.is_empty() || user_id.len() > MAX_USER_ID_LEN {
            return Err(StatusCode::UNAUTHORIZED);
        }
        Ok(Self { user_id: user_id.to_owned() })
    }
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
