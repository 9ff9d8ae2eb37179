//! Chart execution: model input in, completed chart output out.
//!
//! The model supplies the fields described by the tool schema. Execution
//! stamps the `chartType`, trims the title, derives fields the server owns
//! (histogram bins, table columns) and validates the result against the
//! same contract the canvas uses, so a tool never reports success with a
//! payload the client would reject.

#[cfg(test)]
#[path = "charts_test.rs"]
mod tests;

use serde_json::{Map, Value, json};
use wire::chart::{CANVAS_NAME_FIELD, CHART_TYPE_FIELD};
use wire::{ChartKind, ChartPayload, PayloadError};

/// Signature of a chart executor. [`execute_chart`] is the only one outside tests.
pub type ChartExec = fn(ChartKind, &Value) -> Result<Value, ChartError>;

const DEFAULT_HISTOGRAM_BINS: usize = 10;
const MAX_HISTOGRAM_BINS: usize = 100;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ChartError {
    #[error("{tool} input must be a JSON object")]
    InputNotObject { tool: &'static str },
    #[error("{tool} field {field:?} must be an array of numbers")]
    InvalidValues { tool: &'static str, field: &'static str },
    #[error(transparent)]
    Payload(#[from] PayloadError),
}

impl crate::error::ErrorCode for ChartError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InputNotObject { .. } => "E_CHART_INPUT",
            Self::InvalidValues { .. } => "E_CHART_VALUES",
            Self::Payload(_) => "E_CHART_PAYLOAD",
        }
    }
}

/// Execute a chart tool and return its completed output.
///
/// # Errors
///
/// Returns a [`ChartError`] when the input cannot produce a complete chart.
pub fn execute_chart(kind: ChartKind, input: &Value) -> Result<Value, ChartError> {
    let tool = kind.tool_name();
    let Some(fields) = input.as_object() else {
        return Err(ChartError::InputNotObject { tool });
    };

    let mut output = fields.clone();
    output.insert(CHART_TYPE_FIELD.into(), Value::String(kind.as_str().into()));
    trim_string(&mut output, "title");
    trim_string(&mut output, CANVAS_NAME_FIELD);

    match kind {
        ChartKind::Histogram if !output.contains_key("data") => {
            let data = histogram_bins(tool, &output)?;
            output.insert("data".into(), data);
        }
        ChartKind::Table if !output.contains_key("columns") => {
            if let Some(columns) = columns_from_rows(output.get("data")) {
                output.insert("columns".into(), columns);
            }
        }
        _ => {}
    }

    let output = Value::Object(output);
    ChartPayload::from_output(kind, &output)?;
    Ok(output)
}

fn trim_string(map: &mut Map<String, Value>, key: &str) {
    let Some(Value::String(s)) = map.get_mut(key) else {
        return;
    };
    let trimmed = s.trim();
    if trimmed.len() != s.len() {
        *s = trimmed.to_owned();
    }
}

/// Equal-width bins over `[min, max]`. The last bin is closed on the right.
fn histogram_bins(tool: &'static str, fields: &Map<String, Value>) -> Result<Value, ChartError> {
    let invalid = ChartError::InvalidValues { tool, field: "values" };
    let Some(raw) = fields.get("values").and_then(Value::as_array) else {
        return Err(invalid);
    };
    let values: Vec<f64> = raw.iter().filter_map(Value::as_f64).collect();
    if values.is_empty() || values.len() != raw.len() {
        return Err(invalid);
    }

    let bins = fields
        .get("bins")
        .and_then(Value::as_u64)
        .and_then(|b| usize::try_from(b).ok())
        .unwrap_or(DEFAULT_HISTOGRAM_BINS)
        .clamp(1, MAX_HISTOGRAM_BINS);

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = max - min;

    // All observations identical: one bin holding everything.
    if span <= 0.0 {
        return Ok(json!([{ "binStart": min, "binEnd": max, "count": values.len() }]));
    }

    #[allow(clippy::cast_precision_loss)]
    let width = span / bins as f64;
    let mut counts = vec![0_usize; bins];
    for v in &values {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let index = (((v - min) / width).floor() as usize).min(bins - 1);
        counts[index] += 1;
    }

    let data = counts
        .iter()
        .enumerate()
        .map(|(i, count)| {
            #[allow(clippy::cast_precision_loss)]
            let start = min + width * i as f64;
            let end = if i + 1 == bins { max } else { start + width };
            json!({ "binStart": start, "binEnd": end, "count": count })
        })
        .collect();
    Ok(Value::Array(data))
}

/// Column list taken from the first row's keys, in the order the model wrote them.
fn columns_from_rows(data: Option<&Value>) -> Option<Value> {
    let first = data?.as_array()?.first()?.as_object()?;
    if first.is_empty() {
        return None;
    }
    let columns = first
        .keys()
        .map(|key| json!({ "key": key, "label": key }))
        .collect();
    Some(Value::Array(columns))
}
