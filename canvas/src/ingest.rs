//! Tool-result ingestion: part updates in, artifact-ready signals out.
//!
//! DESIGN
//! ======
//! The upstream stream delivers at least once. A chart result can show up as a
//! `tool-output-available` event, again inside the step's `finish-step` marker,
//! and a third time when the thread is reloaded from storage. All three arrive
//! here as [`PartUpdate`]s and are keyed by `toolCallId`, so each call yields at
//! most one [`ArtifactReady`] for the life of the ingestor.
//!
//! ERROR HANDLING
//! ==============
//! A malformed output is logged once and dropped. The id is not marked as
//! materialized, so a later well-formed delivery for the same call can still
//! produce its artifact.

#[cfg(test)]
#[path = "ingest_test.rs"]
mod ingest_test;

use std::collections::HashSet;

use wire::{ChartKind, ChartPayload, Message, PartUpdate, StreamEvent, ToolState};

use crate::artifact::ArtifactReady;

#[derive(Debug, Default)]
pub struct Ingestor {
    /// Tool-call ids that already produced a signal.
    materialized: HashSet<String>,
    /// Tool-call ids whose output failed validation (log suppression only).
    rejected: HashSet<String>,
}

impl Ingestor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide whether one part update completes a chart artifact.
    pub fn observe(&mut self, update: &PartUpdate, now: i64) -> Option<ArtifactReady> {
        let kind = ChartKind::from_tool_name(&update.tool_name)?;
        if update.state != ToolState::OutputAvailable {
            return None;
        }
        if self.materialized.contains(&update.tool_call_id) {
            return None;
        }

        let payload = match &update.output {
            Some(output) => ChartPayload::from_output(kind, output),
            None => Err(wire::PayloadError::MissingOutput { tool: kind.tool_name() }),
        };

        match payload {
            Ok(payload) => {
                // Check-and-insert in one step: `insert` is the gate.
                if !self.materialized.insert(update.tool_call_id.clone()) {
                    return None;
                }
                self.rejected.remove(&update.tool_call_id);
                Some(ArtifactReady { tool_call_id: update.tool_call_id.clone(), payload, observed_at: now })
            }
            Err(e) => {
                if self.rejected.insert(update.tool_call_id.clone()) {
                    log::warn!("canvas: dropping malformed output for {}: {e}", update.tool_call_id);
                } else {
                    log::debug!("canvas: malformed output redelivered for {}", update.tool_call_id);
                }
                None
            }
        }
    }

    /// Ingest every part update carried by a live stream event.
    pub fn observe_event(&mut self, event: &StreamEvent, now: i64) -> Vec<ArtifactReady> {
        event
            .part_updates()
            .iter()
            .filter_map(|update| self.observe(update, now))
            .collect()
    }

    /// Rebuild signals from persisted messages through the same path as live events.
    pub fn replay(&mut self, messages: &[Message]) -> Vec<ArtifactReady> {
        let mut ready = Vec::new();
        for message in messages {
            for update in message.parts.iter().filter_map(wire::Part::as_part_update) {
                if let Some(signal) = self.observe(&update, message.created_at) {
                    ready.push(signal);
                }
            }
        }
        ready
    }

    /// Whether `tool_call_id` already produced an artifact-ready signal.
    #[must_use]
    pub fn is_materialized(&self, tool_call_id: &str) -> bool {
        self.materialized.contains(tool_call_id)
    }
}
