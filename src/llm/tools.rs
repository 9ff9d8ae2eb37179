//! Chart tool definitions and the tool registry.
//!
//! DESIGN
//! ======
//! Tool definitions are generated from [`ChartKind::ALL`]: one
//! `create_*` tool per kind. The registry maps provider tool names back to a
//! kind. [`ToolRegistry::verify`] checks that the two sets are identical and
//! runs at startup, so a renamed tool fails the boot instead of silently
//! never producing an artifact.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Value, json};
use wire::ChartKind;

use super::types::Tool;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("tool {0} registered more than once")]
    Duplicate(String),
    #[error("chart kind {0} has no registered tool")]
    Missing(&'static str),
    #[error("registered tool {0} maps to no chart kind")]
    Unknown(String),
}

impl crate::error::ErrorCode for RegistryError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Duplicate(_) => "E_TOOL_DUPLICATE",
            Self::Missing(_) => "E_TOOL_MISSING",
            Self::Unknown(_) => "E_TOOL_UNKNOWN",
        }
    }
}

// =============================================================================
// CATALOG
// =============================================================================

/// One tool definition per chart kind, in catalog order.
#[must_use]
pub fn chart_tools() -> Vec<Tool> {
    ChartKind::ALL
        .into_iter()
        .map(|kind| Tool { name: kind.tool_name().into(), description: description(kind).into(), input_schema: input_schema(kind) })
        .collect()
}

fn description(kind: ChartKind) -> &'static str {
    match kind {
        ChartKind::Bar => "Create a bar chart comparing values across categories.",
        ChartKind::Line => "Create a line chart showing a trend over an ordered axis such as time.",
        ChartKind::Pie => "Create a pie chart showing parts of a whole.",
        ChartKind::Area => "Create an area chart showing cumulative trends.",
        ChartKind::Scatter => "Create a scatter chart plotting the relationship between two numeric variables.",
        ChartKind::Radar => "Create a radar chart comparing several variables across items.",
        ChartKind::Funnel => "Create a funnel chart showing progressive reduction through stages.",
        ChartKind::Treemap => "Create a treemap showing hierarchical proportions as nested rectangles.",
        ChartKind::Sankey => "Create a sankey diagram showing flows between nodes.",
        ChartKind::RadialBar => "Create a radial bar chart comparing values on concentric rings.",
        ChartKind::Composed => "Create a composed chart mixing bar, line and area series on one axis.",
        ChartKind::Geographic => "Create a choropleth map colouring regions by value.",
        ChartKind::Gauge => "Create a gauge showing a single value within a range.",
        ChartKind::CalendarHeatmap => "Create a calendar heatmap of daily values.",
        ChartKind::Ban => "Create a big-number card highlighting one key metric.",
        ChartKind::Histogram => "Create a histogram showing the distribution of raw numeric values.",
        ChartKind::Table => "Create a table of rows and columns.",
    }
}

fn labelled_points() -> Value {
    json!({
        "type": "array",
        "description": "Data points",
        "items": {
            "type": "object",
            "properties": {
                "name": { "type": "string" },
                "value": { "type": "number" }
            },
            "required": ["name", "value"]
        }
    })
}

fn series_rows() -> Value {
    json!({
        "type": "array",
        "description": "Rows keyed by xKey plus one numeric field per series",
        "items": { "type": "object" }
    })
}

fn kind_properties(kind: ChartKind) -> Value {
    match kind {
        ChartKind::Bar | ChartKind::Line | ChartKind::Area | ChartKind::Radar => json!({
            "data": series_rows(),
            "xKey": { "type": "string", "description": "Field holding the category or x value" },
            "series": { "type": "array", "items": { "type": "string" }, "description": "Numeric fields to plot" }
        }),
        ChartKind::Pie | ChartKind::Funnel | ChartKind::Treemap | ChartKind::RadialBar => json!({
            "data": labelled_points()
        }),
        ChartKind::Scatter => json!({
            "data": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": { "x": { "type": "number" }, "y": { "type": "number" }, "label": { "type": "string" } },
                    "required": ["x", "y"]
                }
            },
            "xLabel": { "type": "string" },
            "yLabel": { "type": "string" }
        }),
        ChartKind::Sankey => json!({
            "nodes": { "type": "array", "items": { "type": "object", "properties": { "name": { "type": "string" } }, "required": ["name"] } },
            "links": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": { "source": { "type": "integer" }, "target": { "type": "integer" }, "value": { "type": "number" } },
                    "required": ["source", "target", "value"]
                }
            }
        }),
        ChartKind::Composed => json!({
            "data": series_rows(),
            "xKey": { "type": "string" },
            "series": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": { "key": { "type": "string" }, "type": { "type": "string", "enum": ["bar", "line", "area"] } },
                    "required": ["key", "type"]
                }
            }
        }),
        ChartKind::Geographic => json!({
            "geoType": { "type": "string", "enum": ["world", "usa"] },
            "data": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": { "region": { "type": "string" }, "value": { "type": "number" } },
                    "required": ["region", "value"]
                }
            }
        }),
        ChartKind::Gauge => json!({
            "value": { "type": "number" },
            "min": { "type": "number" },
            "max": { "type": "number" },
            "unit": { "type": "string" }
        }),
        ChartKind::CalendarHeatmap => json!({
            "data": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": { "date": { "type": "string", "format": "date" }, "value": { "type": "number" } },
                    "required": ["date", "value"]
                }
            }
        }),
        ChartKind::Ban => json!({
            "value": { "type": "number" },
            "unit": { "type": "string" },
            "change": { "type": "number", "description": "Relative change, e.g. 0.12 for +12%" }
        }),
        ChartKind::Histogram => json!({
            "values": { "type": "array", "items": { "type": "number" }, "description": "Raw observations to bin" },
            "bins": { "type": "integer", "minimum": 1, "description": "Number of bins (default 10)" }
        }),
        ChartKind::Table => json!({
            "columns": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": { "key": { "type": "string" }, "label": { "type": "string" } },
                    "required": ["key"]
                },
                "description": "Column order; derived from the first row when omitted"
            },
            "data": { "type": "array", "items": { "type": "object" } }
        }),
    }
}

/// Fields the model must supply. Differs from the output contract where the
/// server derives a field (histogram bins, table columns).
#[must_use]
pub fn input_required(kind: ChartKind) -> Vec<&'static str> {
    match kind {
        ChartKind::Histogram => vec!["title", "values"],
        ChartKind::Table => vec!["title", "data"],
        _ => kind.required_fields().to_vec(),
    }
}

fn input_schema(kind: ChartKind) -> Value {
    let mut properties = serde_json::Map::new();
    properties.insert("title".into(), json!({ "type": "string", "description": "Chart title" }));
    properties.insert("description".into(), json!({ "type": "string", "description": "One-line caption" }));
    properties.insert(
        wire::chart::CANVAS_NAME_FIELD.into(),
        json!({ "type": "string", "description": "Canvas group the chart belongs to" }),
    );
    if let Value::Object(extra) = kind_properties(kind) {
        properties.extend(extra);
    }
    json!({
        "type": "object",
        "properties": properties,
        "required": input_required(kind)
    })
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Provider tool name → chart kind, plus the definitions sent to the model.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: Vec<Tool>,
    kinds: BTreeMap<String, ChartKind>,
    duplicates: Vec<String>,
}

impl ToolRegistry {
    /// Registry over the full chart catalog.
    #[must_use]
    pub fn build() -> Self {
        Self::from_tools(chart_tools())
    }

    #[must_use]
    pub fn from_tools(tools: Vec<Tool>) -> Self {
        let mut kinds = BTreeMap::new();
        let mut duplicates = Vec::new();
        for tool in &tools {
            if kinds.contains_key(&tool.name) {
                duplicates.push(tool.name.clone());
                continue;
            }
            if let Some(kind) = ChartKind::from_tool_name(&tool.name) {
                kinds.insert(tool.name.clone(), kind);
            }
        }
        Self { tools, kinds, duplicates }
    }

    /// Check that registered tool names and chart kinds are the same set.
    ///
    /// # Errors
    ///
    /// Returns the first [`RegistryError`] found.
    pub fn verify(&self) -> Result<(), RegistryError> {
        if let Some(name) = self.duplicates.first() {
            return Err(RegistryError::Duplicate(name.clone()));
        }
        let registered: BTreeSet<&str> = self.tools.iter().map(|t| t.name.as_str()).collect();
        if let Some(name) = registered.iter().find(|name| !self.kinds.contains_key(**name)) {
            return Err(RegistryError::Unknown((*name).to_owned()));
        }
        if let Some(kind) = ChartKind::ALL
            .into_iter()
            .find(|kind| !registered.contains(kind.tool_name()))
        {
            return Err(RegistryError::Missing(kind.tool_name()));
        }
        Ok(())
    }

    #[must_use]
    pub fn kind_for(&self, tool_name: &str) -> Option<ChartKind> {
        self.kinds.get(tool_name).copied()
    }

    #[must_use]
    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }
}

#[cfg(test)]
#[path = "tools_test.rs"]
mod tests;
