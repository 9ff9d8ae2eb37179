//! `GET /api/tools`: the chart tool catalog as the model sees it.

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInfo {
    pub name: String,
    pub chart_type: &'static str,
    pub description: String,
    pub input_schema: serde_json::Value,
}

pub async fn list_tools(State(state): State<AppState>) -> Json<Vec<ToolInfo>> {
    let tools = state
        .registry
        .tools()
        .iter()
        .filter_map(|tool| {
            let kind = state.registry.kind_for(&tool.name)?;
            Some(ToolInfo {
                name: tool.name.clone(),
                chart_type: kind.as_str(),
                description: tool.description.clone(),
                input_schema: tool.input_schema.clone(),
            })
        })
        .collect();
    Json(tools)
}
