//! Request and plan decoding for the CLI hosts.
//!
//! Both `serve` and `run` speak the same flat request shape:
//! `{"id"?, "action", ...params}`. The `id` and `action` keys are lifted out
//! and whatever is left becomes the action's arguments.

use serde_json::{Map, Value};
use std::path::Path;

use tapectl_core::{TapeError, ToolCall};

/// Turn one flat request object into a [`ToolCall`].
///
/// `fallback_id` is used when the request carries no `id`.
pub fn call_from_value(value: Value, fallback_id: &str) -> tapectl_core::Result<ToolCall> {
    let Value::Object(mut fields) = value else {
        return Err(TapeError::InvalidArgument {
            field: "request".into(),
            reason: "expected a JSON object".into(),
        });
    };

    let tool_name = match fields.remove("action") {
        Some(Value::String(name)) if !name.trim().is_empty() => name,
        Some(Value::String(_)) | None => return Err(TapeError::MissingArgument("action".into())),
        Some(other) => {
            return Err(TapeError::InvalidArgument {
                field: "action".into(),
                reason: format!("expected a string, got {other}"),
            });
        }
    };

    let id = match fields.remove("id") {
        Some(Value::String(id)) => id,
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Null) | None => fallback_id.to_string(),
        Some(other) => {
            return Err(TapeError::InvalidArgument {
                field: "id".into(),
                reason: format!("expected a string or number, got {other}"),
            });
        }
    };

    Ok(ToolCall {
        id,
        tool_name,
        arguments: Value::Object(fields),
    })
}

/// Decode one stdin line of the `serve` protocol.
pub fn call_from_line(line: &str, fallback_id: &str) -> tapectl_core::Result<ToolCall> {
    let value: Value = serde_json::from_str(line).map_err(|e| TapeError::InvalidArgument {
        field: "request".into(),
        reason: e.to_string(),
    })?;
    call_from_value(value, fallback_id)
}

/// An ordered list of actions read from a plan file.
#[derive(Debug, Clone)]
pub struct Plan {
    pub steps: Vec<ToolCall>,
}

/// Plan file flavour, picked from the extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanFormat {
    Toml,
    Json,
}

impl PlanFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Toml,
        }
    }
}

impl Plan {
    /// Read and decode a plan file.
    pub fn load(path: &Path) -> tapectl_core::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text, PlanFormat::from_path(path))
    }

    /// Decode plan text. Steps live under a top-level `step` array
    /// (`[[step]]` tables in TOML).
    pub fn parse(text: &str, format: PlanFormat) -> tapectl_core::Result<Self> {
        let root: Value = match format {
            PlanFormat::Toml => toml::from_str(text).map_err(|e| plan_error(e.to_string()))?,
            PlanFormat::Json => serde_json::from_str(text).map_err(|e| plan_error(e.to_string()))?,
        };

        let steps = match root {
            Value::Object(mut map) => take_steps(&mut map)?,
            Value::Array(items) => items,
            _ => return Err(plan_error("expected a table with a `step` list".into())),
        };

        let steps = steps
            .into_iter()
            .enumerate()
            .map(|(i, step)| call_from_value(step, &format!("step-{}", i + 1)))
            .collect::<tapectl_core::Result<Vec<_>>>()?;

        if steps.is_empty() {
            return Err(plan_error("plan has no steps".into()));
        }
        Ok(Self { steps })
    }
}

fn take_steps(map: &mut Map<String, Value>) -> tapectl_core::Result<Vec<Value>> {
    match map.remove("step") {
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(plan_error("`step` must be a list".into())),
        None => Err(plan_error("missing `step` list".into())),
    }
}

fn plan_error(reason: String) -> TapeError {
    TapeError::InvalidArgument {
        field: "plan".into(),
        reason,
    }
}
