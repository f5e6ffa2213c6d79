use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::TapeError;

/// Description of an action a caller can invoke.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
    /// Action name, e.g. "start", "capture".
    pub name: String,
    /// Human-readable description for the caller.
    pub description: String,
    /// JSON Schema of the parameters object.
    pub parameters: Value,
    /// Whether the action touches the external engine.
    #[serde(default)]
    pub runs_engine: bool,
}

/// A request to invoke one action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    #[serde(default)]
    pub id: String,
    pub tool_name: String,
    #[serde(default)]
    pub arguments: Value,
}

/// The result of executing an action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool_call_id: String,
    pub content: String,
    pub is_error: bool,
    /// Optional structured data returned alongside the text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ToolResult {
    /// Successful result carrying structured data.
    pub fn ok(call: &ToolCall, content: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            tool_call_id: call.id.clone(),
            content: content.into(),
            is_error: false,
            data,
        }
    }

    /// Structured failure: the message as content, the error kind in `data`.
    pub fn from_error(call: &ToolCall, err: &TapeError) -> Self {
        let message = err.to_string();
        Self {
            tool_call_id: call.id.clone(),
            data: Some(json!({ "error": err.kind(), "message": message })),
            content: message,
            is_error: true,
        }
    }
}

/// Trait implemented by anything that can execute action calls.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// List all actions this executor provides.
    fn tools(&self) -> Vec<Tool>;

    /// Execute a single call. Domain failures come back as `is_error` results.
    async fn execute(&self, call: &ToolCall) -> ToolResult;
}
