//! Stream events emitted by the chat endpoint, one per SSE message.
//!
//! DESIGN
//! ======
//! Events are tagged by `type` so the SSE `event:` name and the JSON body agree.
//! Tool results can arrive twice for the same call: once as
//! `tool-output-available` and again inside the step's `finish-step` marker.
//! Consumers de-duplicate on `toolCallId`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::message::{ToolErrorKind, ToolPart, ToolState};

#[cfg(test)]
#[path = "event_test.rs"]
mod event_test;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum StreamEvent {
    #[serde(rename_all = "camelCase")]
    Start { message_id: Uuid, thread_id: Uuid },
    TextDelta { delta: String },
    #[serde(rename_all = "camelCase")]
    ToolInputStart { tool_call_id: String, tool_name: String },
    #[serde(rename_all = "camelCase")]
    ToolInputAvailable { tool_call_id: String, tool_name: String, input: Value },
    #[serde(rename_all = "camelCase")]
    ToolOutputAvailable { tool_call_id: String, tool_name: String, output: Value },
    #[serde(rename_all = "camelCase")]
    ToolOutputError { tool_call_id: String, tool_name: String, error_text: String, error_kind: ToolErrorKind },
    /// Step-completion marker repeating every terminal tool part of the step.
    #[serde(rename_all = "camelCase")]
    FinishStep { tool_results: Vec<ToolPart> },
    #[serde(rename_all = "camelCase")]
    Finish { message_id: Uuid },
    #[serde(rename_all = "camelCase")]
    Error { error_text: String },
}

impl StreamEvent {
    /// SSE event name; matches the serde tag.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Start { .. } => "start",
            Self::TextDelta { .. } => "text-delta",
            Self::ToolInputStart { .. } => "tool-input-start",
            Self::ToolInputAvailable { .. } => "tool-input-available",
            Self::ToolOutputAvailable { .. } => "tool-output-available",
            Self::ToolOutputError { .. } => "tool-output-error",
            Self::FinishStep { .. } => "finish-step",
            Self::Finish { .. } => "finish",
            Self::Error { .. } => "error",
        }
    }

    /// Tool-part updates carried by this event, in order.
    #[must_use]
    pub fn part_updates(&self) -> Vec<PartUpdate> {
        match self {
            Self::ToolInputStart { tool_call_id, tool_name } => {
                vec![PartUpdate::new(tool_call_id, tool_name, ToolState::Pending, None)]
            }
            Self::ToolInputAvailable { tool_call_id, tool_name, .. } => {
                vec![PartUpdate::new(tool_call_id, tool_name, ToolState::Call, None)]
            }
            Self::ToolOutputAvailable { tool_call_id, tool_name, output } => {
                vec![PartUpdate::new(tool_call_id, tool_name, ToolState::OutputAvailable, Some(output.clone()))]
            }
            Self::ToolOutputError { tool_call_id, tool_name, .. } => {
                vec![PartUpdate::new(tool_call_id, tool_name, ToolState::OutputError, None)]
            }
            Self::FinishStep { tool_results } => tool_results.iter().map(ToolPart::as_part_update).collect(),
            Self::Start { .. } | Self::TextDelta { .. } | Self::Finish { .. } | Self::Error { .. } => Vec::new(),
        }
    }
}

/// The single shape the canvas ingestion adapter consumes.
#[derive(Debug, Clone, PartialEq)]
pub struct PartUpdate {
    pub tool_call_id: String,
    pub tool_name: String,
    pub state: ToolState,
    pub output: Option<Value>,
}

impl PartUpdate {
    #[must_use]
    pub fn new(tool_call_id: &str, tool_name: &str, state: ToolState, output: Option<Value>) -> Self {
        Self { tool_call_id: tool_call_id.to_owned(), tool_name: tool_name.to_owned(), state, output }
    }
}
