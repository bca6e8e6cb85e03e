use super::types::AnalysisResult;
use crate::{Error, Result};
use serde_json::Value;
use tracing::{debug, warn};

const SNIPPET_CHARS: usize = 200;

/// Parses the analysis unit's stdout into an [`AnalysisResult`].
///
/// Text that is not JSON at all is a [`Error::Decode`]; JSON that is not an
/// object is an [`Error::Schema`]. Known keys with the wrong type decode as absent.
pub fn decode(raw_stdout: &str) -> Result<AnalysisResult> {
    let trimmed = raw_stdout.trim();
    if trimmed.is_empty() {
        warn!("Analysis unit produced no output");
        return Err(Error::Decode {
            snippet: "<empty output>".to_string(),
        });
    }

    let value: Value = serde_json::from_str(trimmed).map_err(|e| {
        warn!("Analysis output is not valid JSON: {}", e);
        Error::Decode {
            snippet: snippet(trimmed),
        }
    })?;

    if !value.is_object() {
        return Err(Error::schema(format!(
            "expected a JSON object, got {}",
            json_type_name(&value)
        )));
    }

    let result: AnalysisResult = serde_json::from_value(value)
        .map_err(|e| Error::schema(format!("unexpected field shape: {}", e)))?;

    debug!(
        "Decoded analysis result: pie_chart={}, scatter_plot={}, recommendations={}, forecast={}",
        result.pie_chart.is_some(),
        result.scatter_plot.is_some(),
        result.savings_recommendations.as_ref().map_or(0, Vec::len),
        result.expense_forecast.as_ref().map_or(0, Vec::len),
    );

    Ok(result)
}

/// First few characters of `text`, cut on a char boundary.
pub(crate) fn snippet(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(SNIPPET_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
