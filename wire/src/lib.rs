//! Shared chat wire model for the streaming endpoint, persistence, and canvas.
//!
//! This crate owns the JSON shapes used by both the `chartbot` server and the
//! `canvas` client core: persisted messages and their parts, the typed stream
//! events sent over SSE, and the chart tool catalog with its output validation.
//!
//! | Module | Role |
//! |--------|------|
//! | [`message`] | Messages, parts, tool states |
//! | [`event`] | Stream events and [`event::PartUpdate`] |
//! | [`chart`] | Chart kind catalog and completed-output validation |

pub mod chart;
pub mod event;
pub mod message;

pub use chart::{ChartKind, ChartPayload, PayloadError};
pub use event::{PartUpdate, StreamEvent};
pub use message::{Message, Part, Role, ToolErrorKind, ToolPart, ToolState};
