//! Tool execution timeout wrapper.
//!
//! DESIGN
//! ======
//! Every tool call gets its own deadline. When the deadline passes the
//! execution future is dropped, so it can never emit a late output, and the
//! caller reports a `tool-output-error` with kind `timeout` for that call
//! alone. Other calls in the same turn are unaffected.

#[cfg(test)]
#[path = "tool_exec_test.rs"]
mod tests;

use std::future::Future;
use std::time::Duration;

use wire::ToolErrorKind;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ToolExecError {
    #[error("tool call {tool_call_id} timed out after {}s", .after.as_secs())]
    Timeout { tool_call_id: String, after: Duration },
    #[error("tool call {tool_call_id} failed: {message}")]
    Execution { tool_call_id: String, message: String },
}

impl ToolExecError {
    /// Classification carried on the `tool-output-error` event.
    #[must_use]
    pub fn kind(&self) -> ToolErrorKind {
        match self {
            Self::Timeout { .. } => ToolErrorKind::Timeout,
            Self::Execution { .. } => ToolErrorKind::Execution,
        }
    }
}

impl crate::error::ErrorCode for ToolExecError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "E_TOOL_TIMEOUT",
            Self::Execution { .. } => "E_TOOL_EXECUTION",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Run one tool execution under a deadline.
///
/// # Errors
///
/// Returns [`ToolExecError::Timeout`] if `fut` does not finish within `after`.
pub async fn run_with_timeout<T, F>(tool_call_id: &str, after: Duration, fut: F) -> Result<T, ToolExecError>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(after, fut)
        .await
        .map_err(|_| {
            tracing::warn!(%tool_call_id, after_ms = after.as_millis(), "tool_exec: deadline exceeded");
            ToolExecError::Timeout { tool_call_id: tool_call_id.to_owned(), after }
        })
}
