//! Chart tool catalog and completed-output validation.
//!
//! DESIGN
//! ======
//! [`ChartKind::ALL`] is the only list of chart tools. The server derives its
//! tool registry from it and the canvas derives its "is this a chart tool"
//! check from it, so the two can never disagree about names.
//!
//! A completed output is accepted only when every field its kind requires is
//! present and non-empty. There is no partially valid payload.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[cfg(test)]
#[path = "chart_test.rs"]
mod chart_test;

/// Output key carrying the kind discriminator.
pub const CHART_TYPE_FIELD: &str = "chartType";

/// Output key carrying the canvas grouping name.
pub const CANVAS_NAME_FIELD: &str = "canvasName";

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    #[error("tool {tool} completed without an output")]
    MissingOutput { tool: &'static str },
    #[error("output for {tool} is not a JSON object")]
    NotAnObject { tool: &'static str },
    #[error("output for {tool} declares chartType {found:?}")]
    KindMismatch { tool: &'static str, found: String },
    #[error("output for {tool} is missing required field {field:?}")]
    MissingField { tool: &'static str, field: &'static str },
    #[error("output for {tool} has empty required field {field:?}")]
    EmptyField { tool: &'static str, field: &'static str },
    #[error("output for {tool} has non-numeric field {field:?}")]
    NotNumeric { tool: &'static str, field: &'static str },
}

// =============================================================================
// CHART KIND
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChartKind {
    Bar,
    Line,
    Pie,
    Area,
    Scatter,
    Radar,
    Funnel,
    Treemap,
    Sankey,
    RadialBar,
    Composed,
    Geographic,
    Gauge,
    CalendarHeatmap,
    /// Big-number card.
    Ban,
    Histogram,
    Table,
}

impl ChartKind {
    pub const ALL: [Self; 17] = [
        Self::Bar,
        Self::Line,
        Self::Pie,
        Self::Area,
        Self::Scatter,
        Self::Radar,
        Self::Funnel,
        Self::Treemap,
        Self::Sankey,
        Self::RadialBar,
        Self::Composed,
        Self::Geographic,
        Self::Gauge,
        Self::CalendarHeatmap,
        Self::Ban,
        Self::Histogram,
        Self::Table,
    ];

    /// Discriminator written to the output's `chartType` field.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bar => "bar",
            Self::Line => "line",
            Self::Pie => "pie",
            Self::Area => "area",
            Self::Scatter => "scatter",
            Self::Radar => "radar",
            Self::Funnel => "funnel",
            Self::Treemap => "treemap",
            Self::Sankey => "sankey",
            Self::RadialBar => "radial-bar",
            Self::Composed => "composed",
            Self::Geographic => "geographic",
            Self::Gauge => "gauge",
            Self::CalendarHeatmap => "calendar-heatmap",
            Self::Ban => "ban",
            Self::Histogram => "histogram",
            Self::Table => "table",
        }
    }

    /// Name the model invokes the tool by.
    #[must_use]
    pub fn tool_name(self) -> &'static str {
        match self {
            Self::Bar => "create_bar_chart",
            Self::Line => "create_line_chart",
            Self::Pie => "create_pie_chart",
            Self::Area => "create_area_chart",
            Self::Scatter => "create_scatter_chart",
            Self::Radar => "create_radar_chart",
            Self::Funnel => "create_funnel_chart",
            Self::Treemap => "create_treemap_chart",
            Self::Sankey => "create_sankey_chart",
            Self::RadialBar => "create_radial_bar_chart",
            Self::Composed => "create_composed_chart",
            Self::Geographic => "create_geographic_chart",
            Self::Gauge => "create_gauge_chart",
            Self::CalendarHeatmap => "create_calendar_heatmap",
            Self::Ban => "create_ban_chart",
            Self::Histogram => "create_histogram",
            Self::Table => "create_table",
        }
    }

    #[must_use]
    pub fn from_tool_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.tool_name() == name)
    }

    #[must_use]
    pub fn from_chart_type(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == raw)
    }

    /// Fields a completed output must carry for this kind's renderer.
    #[must_use]
    pub fn required_fields(self) -> &'static [&'static str] {
        match self {
            Self::Sankey => &["title", "nodes", "links"],
            Self::Gauge | Self::Ban => &["title", "value"],
            Self::Table => &["title", "columns", "data"],
            Self::Geographic => &["title", "geoType", "data"],
            _ => &["title", "data"],
        }
    }
}

impl std::fmt::Display for ChartKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// PAYLOAD
// =============================================================================

/// A validated, complete chart output ready for its renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartPayload {
    pub kind: ChartKind,
    pub title: String,
    pub canvas_name: Option<String>,
    /// The full output object, unmodified.
    pub body: Value,
}

impl ChartPayload {
    /// Validate a completed tool output for `kind`.
    ///
    /// # Errors
    ///
    /// Returns a [`PayloadError`] naming the first field that fails.
    pub fn from_output(kind: ChartKind, output: &Value) -> Result<Self, PayloadError> {
        let tool = kind.tool_name();
        let Some(obj) = output.as_object() else {
            return Err(PayloadError::NotAnObject { tool });
        };

        if let Some(found) = obj.get(CHART_TYPE_FIELD) {
            let matches = found.as_str().and_then(ChartKind::from_chart_type) == Some(kind);
            if !matches {
                return Err(PayloadError::KindMismatch { tool, found: found.to_string() });
            }
        }

        for &field in kind.required_fields() {
            let Some(value) = obj.get(field) else {
                return Err(PayloadError::MissingField { tool, field });
            };
            check_field(tool, field, value)?;
        }

        let title = obj
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim()
            .to_owned();
        let canvas_name = obj
            .get(CANVAS_NAME_FIELD)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned);

        Ok(Self { kind, title, canvas_name, body: output.clone() })
    }
}

fn check_field(tool: &'static str, field: &'static str, value: &Value) -> Result<(), PayloadError> {
    if field == "value" {
        return if value.is_number() { Ok(()) } else { Err(PayloadError::NotNumeric { tool, field }) };
    }
    let empty = match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    };
    if empty { Err(PayloadError::EmptyField { tool, field }) } else { Ok(()) }
}
