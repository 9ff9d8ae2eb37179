//! Artifact model: one renderable chart or table produced by a tool call.
//!
//! An [`Artifact`] is only ever built from an [`ArtifactReady`] signal, and a
//! signal only exists for a payload that passed validation. There is no path
//! that constructs an artifact around a missing or partial payload.

#[cfg(test)]
#[path = "artifact_test.rs"]
mod artifact_test;

use serde::Serialize;
use uuid::Uuid;
use wire::{ChartKind, ChartPayload};

/// Unique identifier for an artifact. Distinct from the tool-call id.
pub type ArtifactId = Uuid;

/// Canvas grouping used when the tool output names none.
pub const DEFAULT_CANVAS_NAME: &str = "Canvas";

/// Emitted by the ingestion adapter once per completed, well-formed chart call.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactReady {
    /// Idempotency key for the artifact.
    pub tool_call_id: String,
    /// Validated output.
    pub payload: ChartPayload,
    /// Milliseconds since the Unix epoch when the completion was observed.
    pub observed_at: i64,
}

/// A materialized canvas entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub id: ArtifactId,
    pub tool_call_id: String,
    pub kind: ChartKind,
    pub title: String,
    pub canvas_name: String,
    /// Raw structured output handed to the renderer for `kind`.
    pub payload: serde_json::Value,
    pub created_at: i64,
}

impl Artifact {
    /// Materialize a ready signal under a freshly generated id.
    #[must_use]
    pub fn from_ready(ready: ArtifactReady) -> Self {
        let ArtifactReady { tool_call_id, payload, observed_at } = ready;
        Self {
            id: Uuid::new_v4(),
            tool_call_id,
            kind: payload.kind,
            title: payload.title,
            canvas_name: payload
                .canvas_name
                .unwrap_or_else(|| DEFAULT_CANVAS_NAME.to_owned()),
            payload: payload.body,
            created_at: observed_at,
        }
    }
}
