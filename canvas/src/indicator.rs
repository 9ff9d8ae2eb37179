//! Loading/timeout indicators for in-flight chart tool calls.
//!
//! Each indicator is advisory: it mirrors how long a call has been running and
//! what the server's execution wrapper reported. Indicators never touch the
//! canvas store. Time is passed in by the host so nothing here owns a timer,
//! and [`Indicators::clear`] drops everything when the view goes away.

#[cfg(test)]
#[path = "indicator_test.rs"]
mod indicator_test;

use serde::Serialize;
use wire::ToolErrorKind;

pub const DEFAULT_SLOW_AFTER_MS: u64 = 15_000;
pub const DEFAULT_TIMEOUT_AFTER_MS: u64 = 30_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndicatorConfig {
    /// Elapsed time before the "slow" warning shows.
    pub slow_after_ms: u64,
    /// Elapsed time before the indicator gives up and shows "timed out".
    pub timeout_after_ms: u64,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self { slow_after_ms: DEFAULT_SLOW_AFTER_MS, timeout_after_ms: DEFAULT_TIMEOUT_AFTER_MS }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum IndicatorPhase {
    Running,
    Slow,
    TimedOut,
    Failed,
}

impl IndicatorPhase {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::TimedOut | Self::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Indicator {
    pub tool_call_id: String,
    pub tool_name: String,
    pub started_at: i64,
    pub phase: IndicatorPhase,
}

/// A phase transition reported by [`Indicators::tick`] or [`Indicators::fail`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicatorChange {
    pub tool_call_id: String,
    pub phase: IndicatorPhase,
}

#[derive(Debug, Default)]
pub struct Indicators {
    config: IndicatorConfig,
    entries: Vec<Indicator>,
}

impl Indicators {
    #[must_use]
    pub fn new(config: IndicatorConfig) -> Self {
        Self { config, entries: Vec::new() }
    }

    /// Begin tracking a call. Returns `false` if it is already tracked.
    pub fn start(&mut self, tool_call_id: &str, tool_name: &str, now: i64) -> bool {
        if self.get(tool_call_id).is_some() {
            return false;
        }
        self.entries.push(Indicator {
            tool_call_id: tool_call_id.to_owned(),
            tool_name: tool_name.to_owned(),
            started_at: now,
            phase: IndicatorPhase::Running,
        });
        true
    }

    /// Advance every non-terminal indicator to the phase its elapsed time implies.
    pub fn tick(&mut self, now: i64) -> Vec<IndicatorChange> {
        let config = self.config;
        let mut changes = Vec::new();
        for entry in self.entries.iter_mut().filter(|e| !e.phase.is_terminal()) {
            let elapsed = u64::try_from(now.saturating_sub(entry.started_at)).unwrap_or(0);
            let next = if elapsed >= config.timeout_after_ms {
                IndicatorPhase::TimedOut
            } else if elapsed >= config.slow_after_ms {
                IndicatorPhase::Slow
            } else {
                IndicatorPhase::Running
            };
            if next != entry.phase {
                entry.phase = next;
                changes.push(IndicatorChange { tool_call_id: entry.tool_call_id.clone(), phase: next });
            }
        }
        changes
    }

    /// Discard the indicator for a completed call.
    pub fn resolve(&mut self, tool_call_id: &str) -> Option<Indicator> {
        let index = self
            .entries
            .iter()
            .position(|e| e.tool_call_id == tool_call_id)?;
        Some(self.entries.remove(index))
    }

    /// Mark a call as failed by the server. A timeout from the execution
    /// wrapper shows as `TimedOut`; anything else as `Failed`.
    pub fn fail(&mut self, tool_call_id: &str, kind: ToolErrorKind) -> Option<IndicatorChange> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.tool_call_id == tool_call_id)?;
        let phase = match kind {
            ToolErrorKind::Timeout => IndicatorPhase::TimedOut,
            ToolErrorKind::Execution | ToolErrorKind::Aborted => IndicatorPhase::Failed,
        };
        if entry.phase == phase {
            return None;
        }
        entry.phase = phase;
        Some(IndicatorChange { tool_call_id: tool_call_id.to_owned(), phase })
    }

    /// Cancel everything. Called on unmount.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn get(&self, tool_call_id: &str) -> Option<&Indicator> {
        self.entries
            .iter()
            .find(|e| e.tool_call_id == tool_call_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Indicator> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
