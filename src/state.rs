//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the thread store, the optional LLM client, the verified chart
//! tool registry, the chart executor and the parsed configuration. Every
//! field is cheap to clone.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::llm::LlmChat;
use crate::llm::tools::ToolRegistry;
use crate::services::charts::{ChartExec, execute_chart};
use crate::services::thread::ThreadStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ThreadStore>,
    /// Optional LLM client. `None` if LLM env vars are not configured.
    pub llm: Option<Arc<dyn LlmChat>>,
    pub registry: Arc<ToolRegistry>,
    /// Runs one chart tool call on the blocking pool.
    pub chart_exec: ChartExec,
    pub config: Arc<AppConfig>,
}

impl AppState {
    #[must_use]
    pub fn new(
        store: Arc<dyn ThreadStore>,
        llm: Option<Arc<dyn LlmChat>>,
        registry: ToolRegistry,
        config: AppConfig,
    ) -> Self {
        Self { store, llm, registry: Arc::new(registry), chart_exec: execute_chart, config: Arc::new(config) }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
