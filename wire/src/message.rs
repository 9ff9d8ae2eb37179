//! Messages and parts as persisted in a thread and rebuilt on reload.
//!
//! DESIGN
//! ======
//! A message is an ordered list of parts. A part is either plain text or a
//! tool invocation that carries its `toolCallId` through every state, so the
//! canvas layer can de-duplicate on it whether the part arrives live or from
//! storage.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::event::PartUpdate;

#[cfg(test)]
#[path = "message_test.rs"]
mod message_test;

// =============================================================================
// ROLE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            "system" => Some(Self::System),
            _ => None,
        }
    }
}

// =============================================================================
// TOOL STATE
// =============================================================================

/// Lifecycle of one tool call: `pending → call → output-available | output-error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolState {
    /// Input is still streaming from the model.
    Pending,
    /// Input is complete and the tool is executing.
    Call,
    /// Terminal success; `output` is set.
    OutputAvailable,
    /// Terminal failure; `errorText` is set.
    OutputError,
}

impl ToolState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::OutputAvailable | Self::OutputError)
    }
}

/// Distinguishes why a tool call ended in `output-error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolErrorKind {
    /// The execution wrapper's deadline elapsed; no further output will arrive.
    Timeout,
    /// The tool ran and failed (bad input, malformed output, unknown tool).
    Execution,
    /// The chat turn ended before the tool reached a terminal state.
    Aborted,
}

// =============================================================================
// PARTS
// =============================================================================

/// A tool invocation part. Field names follow the browser SDK's camelCase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolPart {
    pub tool_call_id: String,
    pub tool_name: String,
    pub state: ToolState,
    #[serde(default)]
    pub input: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ToolErrorKind>,
}

impl ToolPart {
    /// A freshly announced call with no input yet.
    #[must_use]
    pub fn pending(tool_call_id: impl Into<String>, tool_name: impl Into<String>) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            state: ToolState::Pending,
            input: Value::Object(serde_json::Map::new()),
            output: None,
            error_text: None,
            error_kind: None,
        }
    }

    #[must_use]
    pub fn as_part_update(&self) -> PartUpdate {
        PartUpdate {
            tool_call_id: self.tool_call_id.clone(),
            tool_name: self.tool_name.clone(),
            state: self.state,
            output: self.output.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Part {
    Text { text: String },
    Tool(ToolPart),
}

impl Part {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// View a tool part as an ingestion update. Text parts have none.
    #[must_use]
    pub fn as_part_update(&self) -> Option<PartUpdate> {
        match self {
            Self::Tool(tool) => Some(tool.as_part_update()),
            Self::Text { .. } => None,
        }
    }
}

// =============================================================================
// MESSAGE
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub role: Role,
    pub parts: Vec<Part>,
    /// Milliseconds since the Unix epoch.
    pub created_at: i64,
}

impl Message {
    #[must_use]
    pub fn new(role: Role, parts: Vec<Part>, created_at: i64) -> Self {
        Self { id: Uuid::new_v4(), role, parts, created_at }
    }

    /// Concatenated text of all text parts, newline separated.
    #[must_use]
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text { text } => Some(text.as_str()),
                Part::Tool(_) => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn tool_parts(&self) -> impl Iterator<Item = &ToolPart> {
        self.parts.iter().filter_map(|p| match p {
            Part::Tool(tool) => Some(tool),
            Part::Text { .. } => None,
        })
    }
}
