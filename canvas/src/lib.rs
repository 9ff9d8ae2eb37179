//! Canvas core for the chat side panel.
//!
//! This crate runs in the browser next to the chat view. It turns tool results
//! observed on the chat stream (or reloaded from a persisted thread) into
//! de-duplicated, user-closable artifacts. It performs no I/O and owns no
//! timers: the host passes the current time in and renders whatever state the
//! session exposes.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`session`] | Per-tab composition and the host-facing entry point |
//! | [`ingest`] | Part updates → artifact-ready signals, keyed by tool-call id |
//! | [`store`] | Panel state machine (hidden / visible-empty / visible-populated) |
//! | [`indicator`] | Per-call loading, slow, and timed-out presentation |
//! | [`artifact`] | Artifact and signal types |

pub mod artifact;
pub mod indicator;
pub mod ingest;
pub mod session;
pub mod store;

pub use artifact::{Artifact, ArtifactId, ArtifactReady};
pub use session::CanvasSession;
pub use store::{CanvasError, CanvasState, CanvasStore};
