//! Canvas store: the side-panel state machine.
//!
//! ```text
//!            apply (not manually closed)
//!   Hidden ───────────────────────────────► VisiblePopulated ◄─┐ apply
//!     ▲  │ reopen                                │      └──────┘
//!     │  └──────────► VisibleEmpty ◄─────────────┘ remove (last)
//!     │                   │                      │
//!     └──── close ────────┴──────── close ───────┘
//! ```
//!
//! DESIGN
//! ======
//! Visibility changes only through [`CanvasStore::close`] and
//! [`CanvasStore::reopen`], plus the first artifact when the user has not
//! closed the panel. Removing artifacts never hides the panel. No timer reads
//! or writes this store.

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;

use serde::Serialize;

use crate::artifact::{Artifact, ArtifactId, ArtifactReady};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CanvasError {
    #[error("artifact not found: {0}")]
    UnknownArtifact(ArtifactId),
}

/// Observable state of the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CanvasState {
    Hidden,
    VisibleEmpty,
    VisiblePopulated,
}

#[derive(Debug, Default)]
pub struct CanvasStore {
    visible: bool,
    manually_closed: bool,
    artifacts: Vec<Artifact>,
    active: Option<ArtifactId>,
}

impl CanvasStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // --- Queries ---

    #[must_use]
    pub fn state(&self) -> CanvasState {
        match (self.visible, self.artifacts.is_empty()) {
            (false, _) => CanvasState::Hidden,
            (true, true) => CanvasState::VisibleEmpty,
            (true, false) => CanvasState::VisiblePopulated,
        }
    }

    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    #[must_use]
    pub fn is_manually_closed(&self) -> bool {
        self.manually_closed
    }

    /// Artifacts in the order their completions were observed.
    #[must_use]
    pub fn artifacts(&self) -> &[Artifact] {
        &self.artifacts
    }

    #[must_use]
    pub fn active_id(&self) -> Option<ArtifactId> {
        self.active
    }

    #[must_use]
    pub fn active(&self) -> Option<&Artifact> {
        let id = self.active?;
        self.artifacts.iter().find(|a| a.id == id)
    }

    /// Artifacts grouped under one canvas name, in arrival order.
    pub fn artifacts_in<'a>(&'a self, canvas_name: &'a str) -> impl Iterator<Item = &'a Artifact> + 'a {
        self.artifacts
            .iter()
            .filter(move |a| a.canvas_name == canvas_name)
    }

    #[must_use]
    pub fn contains_tool_call(&self, tool_call_id: &str) -> bool {
        self.artifacts
            .iter()
            .any(|a| a.tool_call_id == tool_call_id)
    }

    // --- Mutators ---

    /// Append an artifact for a ready signal. Returns `None` when the
    /// tool call already has an artifact; the existing entry keeps its place.
    pub fn apply(&mut self, ready: ArtifactReady) -> Option<ArtifactId> {
        if self.contains_tool_call(&ready.tool_call_id) {
            return None;
        }

        let artifact = Artifact::from_ready(ready);
        let id = artifact.id;
        self.artifacts.push(artifact);
        self.active = Some(id);

        if !self.visible && !self.manually_closed {
            self.visible = true;
        }
        Some(id)
    }

    /// Hide the panel, discard its artifacts, and remember the user did it.
    /// Returns whether visibility changed.
    pub fn close(&mut self) -> bool {
        self.manually_closed = true;
        if !self.visible {
            return false;
        }
        self.visible = false;
        self.artifacts.clear();
        self.active = None;
        true
    }

    /// Show the panel and clear the manual-close flag. No-op when visible.
    pub fn reopen(&mut self) -> bool {
        if self.visible {
            return false;
        }
        self.visible = true;
        self.manually_closed = false;
        if self.active.is_none() {
            self.active = self.artifacts.last().map(|a| a.id);
        }
        true
    }

    /// Make `id` the active artifact.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::UnknownArtifact`] if no artifact has that id.
    pub fn select(&mut self, id: ArtifactId) -> Result<(), CanvasError> {
        if !self.artifacts.iter().any(|a| a.id == id) {
            return Err(CanvasError::UnknownArtifact(id));
        }
        self.active = Some(id);
        Ok(())
    }

    /// Remove one artifact. The panel stays visible even when this empties it.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::UnknownArtifact`] if no artifact has that id.
    pub fn remove(&mut self, id: ArtifactId) -> Result<Artifact, CanvasError> {
        let Some(index) = self.artifacts.iter().position(|a| a.id == id) else {
            return Err(CanvasError::UnknownArtifact(id));
        };
        let removed = self.artifacts.remove(index);

        if self.active == Some(id) {
            // Prefer the entry that slid into the removed slot, else the new last.
            self.active = self
                .artifacts
                .get(index)
                .or_else(|| self.artifacts.last())
                .map(|a| a.id);
        }
        Ok(removed)
    }
}
