//! Per-tab canvas session: ingestion, store, and indicators wired together.
//!
//! The host feeds stream events and clock ticks in, and forwards the four user
//! actions. Everything else is derived. After [`CanvasSession::unmount`] the
//! session ignores input, so a late event cannot mutate a destroyed view.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use wire::{ChartKind, Message, StreamEvent, ToolErrorKind, ToolState};

use crate::artifact::{Artifact, ArtifactId};
use crate::indicator::{IndicatorChange, IndicatorConfig, Indicators};
use crate::ingest::Ingestor;
use crate::store::{CanvasError, CanvasState, CanvasStore};

#[derive(Debug)]
pub struct CanvasSession {
    ingestor: Ingestor,
    store: CanvasStore,
    indicators: Indicators,
    mounted: bool,
}

impl Default for CanvasSession {
    fn default() -> Self {
        Self::new(IndicatorConfig::default())
    }
}

impl CanvasSession {
    #[must_use]
    pub fn new(config: IndicatorConfig) -> Self {
        Self { ingestor: Ingestor::new(), store: CanvasStore::new(), indicators: Indicators::new(config), mounted: true }
    }

    // --- Data inputs ---

    /// Apply one live stream event. Returns the ids of artifacts it created.
    pub fn handle_event(&mut self, event: &StreamEvent, now: i64) -> Vec<ArtifactId> {
        if !self.mounted {
            return Vec::new();
        }

        match event {
            StreamEvent::ToolInputStart { tool_call_id, tool_name }
            | StreamEvent::ToolInputAvailable { tool_call_id, tool_name, .. } => {
                if ChartKind::from_tool_name(tool_name).is_some() && !self.ingestor.is_materialized(tool_call_id) {
                    self.indicators.start(tool_call_id, tool_name, now);
                }
            }
            StreamEvent::ToolOutputError { tool_call_id, error_kind, .. } => {
                self.indicators.fail(tool_call_id, *error_kind);
            }
            _ => {}
        }

        let mut created = Vec::new();
        for ready in self.ingestor.observe_event(event, now) {
            self.indicators.resolve(&ready.tool_call_id);
            if let Some(id) = self.store.apply(ready) {
                created.push(id);
            }
        }

        // A terminal output that did not materialize was malformed.
        for update in event.part_updates() {
            if update.state == ToolState::OutputAvailable && !self.ingestor.is_materialized(&update.tool_call_id) {
                self.indicators
                    .fail(&update.tool_call_id, ToolErrorKind::Execution);
            }
        }
        created
    }

    /// Rebuild artifacts from a reloaded thread. Returns how many were created.
    pub fn hydrate(&mut self, messages: &[Message]) -> usize {
        if !self.mounted {
            return 0;
        }
        self.ingestor
            .replay(messages)
            .into_iter()
            .filter_map(|ready| self.store.apply(ready))
            .count()
    }

    /// Advance indicator countdowns.
    pub fn tick(&mut self, now: i64) -> Vec<IndicatorChange> {
        if !self.mounted {
            return Vec::new();
        }
        self.indicators.tick(now)
    }

    /// Tear down: cancel every indicator and stop accepting input.
    pub fn unmount(&mut self) {
        self.indicators.clear();
        self.mounted = false;
    }

    // --- User actions ---

    pub fn close(&mut self) -> bool {
        self.store.close()
    }

    pub fn reopen(&mut self) -> bool {
        self.store.reopen()
    }

    /// # Errors
    ///
    /// Returns [`CanvasError::UnknownArtifact`] if no artifact has that id.
    pub fn select(&mut self, id: ArtifactId) -> Result<(), CanvasError> {
        self.store.select(id)
    }

    /// # Errors
    ///
    /// Returns [`CanvasError::UnknownArtifact`] if no artifact has that id.
    pub fn remove(&mut self, id: ArtifactId) -> Result<Artifact, CanvasError> {
        self.store.remove(id)
    }

    // --- Queries ---

    #[must_use]
    pub fn state(&self) -> CanvasState {
        self.store.state()
    }

    #[must_use]
    pub fn store(&self) -> &CanvasStore {
        &self.store
    }

    #[must_use]
    pub fn indicators(&self) -> &Indicators {
        &self.indicators
    }

    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.mounted
    }
}
