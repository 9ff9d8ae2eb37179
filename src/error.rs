//! Grepable error codes shared by every service error.
//!
//! DESIGN
//! ======
//! Each service keeps its own `thiserror` enum. This trait gives them a
//! stable `E_*` code and a retryable flag so the HTTP layer can render one
//! JSON error shape without knowing which service failed.

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;

use axum::Json;
use axum::http::StatusCode;
use serde::Serialize;

pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

/// JSON body returned alongside a non-2xx status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
    pub retryable: bool,
}

impl ErrorBody {
    pub fn from_error(err: &(impl ErrorCode + ?Sized)) -> Self {
        Self { code: err.error_code(), message: err.to_string(), retryable: err.retryable() }
    }
}

/// Handler error: a status plus the failing service's code.
pub type ApiError = (StatusCode, Json<ErrorBody>);

pub fn api_error(status: StatusCode, err: &(impl ErrorCode + ?Sized)) -> ApiError {
    (status, Json(ErrorBody::from_error(err)))
}
