//! Process configuration parsed from environment variables.
//!
//! Every knob has a default except `DATABASE_URL`, whose absence selects the
//! in-memory thread store. The LLM provider has its own typed config in
//! [`crate::llm::config`].

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_CHAT_MAX_TOOL_ITERATIONS: usize = 10;
pub const DEFAULT_CHAT_MAX_TOKENS: u32 = 4096;
pub const DEFAULT_CHAT_HISTORY_LIMIT: usize = 40;
pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_SSE_KEEPALIVE_SECS: u64 = 15;

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

/// Tuning knobs for one chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatConfig {
    /// Upper bound on model round-trips per turn.
    pub max_tool_iterations: usize,
    pub max_tokens: u32,
    /// Most recent persisted messages sent back to the model as context.
    pub history_limit: usize,
    /// Per-call budget for a single tool execution.
    pub tool_timeout: Duration,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_tool_iterations: DEFAULT_CHAT_MAX_TOOL_ITERATIONS,
            max_tokens: DEFAULT_CHAT_MAX_TOKENS,
            history_limit: DEFAULT_CHAT_HISTORY_LIMIT,
            tool_timeout: Duration::from_secs(DEFAULT_TOOL_TIMEOUT_SECS),
        }
    }
}

impl ChatConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            max_tool_iterations: env_parse("CHAT_MAX_TOOL_ITERATIONS", DEFAULT_CHAT_MAX_TOOL_ITERATIONS).max(1),
            max_tokens: env_parse("CHAT_MAX_TOKENS", DEFAULT_CHAT_MAX_TOKENS),
            history_limit: env_parse("CHAT_HISTORY_LIMIT", DEFAULT_CHAT_HISTORY_LIMIT),
            tool_timeout: Duration::from_secs(env_parse("TOOL_TIMEOUT_SECS", DEFAULT_TOOL_TIMEOUT_SECS)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: Option<String>,
    pub sse_keepalive: Duration,
    pub chat: ChatConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            database_url: None,
            sse_keepalive: Duration::from_secs(DEFAULT_SSE_KEEPALIVE_SECS),
            chat: ChatConfig::default(),
        }
    }
}

impl AppConfig {
    /// Read `PORT`, `DATABASE_URL`, `SSE_KEEPALIVE_SECS` and the `CHAT_*` /
    /// `TOOL_TIMEOUT_SECS` knobs.
    #[must_use]
    pub fn from_env() -> Self {
        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());
        Self {
            port: env_parse("PORT", DEFAULT_PORT),
            database_url,
            sse_keepalive: Duration::from_secs(env_parse("SSE_KEEPALIVE_SECS", DEFAULT_SSE_KEEPALIVE_SECS)),
            chat: ChatConfig::from_env(),
        }
    }
}
