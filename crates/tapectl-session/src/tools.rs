//! Action protocol: tool definitions and dispatch.
//!
//! Exposes the controller's four actions (`start`, `send`, `capture`, `exit`)
//! through the `tapectl-core` `ToolExecutor` pattern. Every failure comes
//! back as an `is_error` result carrying the error kind; nothing escapes as
//! a Rust error.

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use tapectl_config::TapeConfig;
use tapectl_core::{TapeError, Tool, ToolCall, ToolExecutor, ToolResult};

use crate::controller::{SendInput, TapeController};
use crate::engine::{TapeEngine, VhsEngine};

// ─── Action Parameters ────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
struct StartParams {
    command: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SendParams {
    text: Option<String>,
    keys: Option<Vec<String>>,
    #[serde(rename = "sleepMs", alias = "sleep_ms")]
    sleep_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct CaptureParams {
    #[serde(rename = "waitPattern", alias = "wait_pattern")]
    wait_pattern: Option<String>,
}

/// A parsed caller action.
#[derive(Debug)]
pub enum Action {
    Start { command: String },
    Send(SendInput),
    Capture { wait_pattern: Option<String> },
    Exit,
}

impl Action {
    /// Parse an action name and its JSON parameters.
    pub fn parse(name: &str, arguments: &Value) -> tapectl_core::Result<Self> {
        match name {
            "start" => {
                // An empty command is rejected by the controller, after the
                // session slot check.
                let params: StartParams = parse_params(arguments)?;
                Ok(Self::Start {
                    command: params.command.unwrap_or_default(),
                })
            }
            "send" => {
                let params: SendParams = parse_params(arguments)?;
                Ok(Self::Send(SendInput {
                    text: params.text,
                    keys: params.keys,
                    sleep_ms: params.sleep_ms,
                }))
            }
            "capture" => {
                let params: CaptureParams = parse_params(arguments)?;
                Ok(Self::Capture {
                    wait_pattern: params.wait_pattern,
                })
            }
            "exit" => Ok(Self::Exit),
            other => Err(TapeError::UnknownAction(other.to_string())),
        }
    }
}

/// Deserialize parameters, treating null/absent as an empty object.
fn parse_params<T>(arguments: &Value) -> tapectl_core::Result<T>
where
    T: DeserializeOwned + Default,
{
    if arguments.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(arguments.clone()).map_err(|e| TapeError::InvalidArgument {
        field: "arguments".into(),
        reason: e.to_string(),
    })
}

// ─── Dispatcher ───────────────────────────────────────────────────────

/// Shares one controller between callers and dispatches actions to it.
pub struct TapeTools {
    pub controller: Arc<Mutex<TapeController>>,
    action_timeout: Duration,
    root_cancel: CancellationToken,
}

impl TapeTools {
    pub fn new(controller: TapeController, action_timeout: Duration) -> Self {
        Self {
            controller: Arc::new(Mutex::new(controller)),
            action_timeout,
            root_cancel: CancellationToken::new(),
        }
    }

    /// Build the controller and subprocess engine from config.
    pub fn from_config(config: &TapeConfig) -> Self {
        let engine: Arc<dyn TapeEngine> = Arc::new(VhsEngine::from_config(&config.engine));
        Self::new(
            TapeController::new(config.session.clone(), engine),
            Duration::from_secs(config.limits.action_timeout_secs),
        )
    }

    /// Check if a name is one of the protocol's actions.
    pub fn has_tool(name: &str) -> bool {
        matches!(name, "start" | "send" | "capture" | "exit")
    }

    /// Abort every in-flight engine run, now and later.
    pub fn cancel_all(&self) {
        self.root_cancel.cancel();
    }

    /// Host teardown: remove any live session's workspace.
    pub async fn shutdown(&self) {
        self.controller.lock().await.shutdown().await;
    }

    /// Run one action. Engine-backed actions get a per-call token that the
    /// deadline timer or [`TapeTools::cancel_all`] can fire.
    pub async fn dispatch(&self, action: Action) -> tapectl_core::Result<Value> {
        match action {
            Action::Start { command } => {
                let mut controller = self.controller.lock().await;
                let session = controller.start(&command).await?;
                Ok(json!({
                    "command": session.command(),
                    "workspaceDir": session.workspace_dir(),
                }))
            }
            Action::Send(input) => {
                let mut controller = self.controller.lock().await;
                let appended = controller.send(input)?;
                Ok(json!({ "appended": appended }))
            }
            Action::Capture { wait_pattern } => {
                let mut controller = self.controller.lock().await;
                let token = self.deadline_token();
                let result = controller.capture(wait_pattern.as_deref(), Some(&token)).await;
                token.cancel();
                Ok(serde_json::to_value(result?)?)
            }
            Action::Exit => {
                let mut controller = self.controller.lock().await;
                let token = self.deadline_token();
                let result = controller.exit(Some(&token)).await;
                token.cancel();
                Ok(serde_json::to_value(result?)?)
            }
        }
    }

    /// Child of the root token that fires on its own after the deadline.
    fn deadline_token(&self) -> CancellationToken {
        let token = self.root_cancel.child_token();
        let timer = token.clone();
        let timeout = self.action_timeout;
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(timeout) => {
                    warn!(?timeout, "action deadline reached, aborting engine run");
                    timer.cancel();
                }
                _ = timer.cancelled() => {}
            }
        });
        token
    }
}

#[async_trait]
impl ToolExecutor for TapeTools {
    /// Return all action definitions.
    fn tools(&self) -> Vec<Tool> {
        vec![
            Tool {
                name: "start".into(),
                description: "Start a terminal session running the given shell command. Fails if a session is already active.".into(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "command": {
                            "type": "string",
                            "description": "Shell command of the program under test"
                        }
                    },
                    "required": ["command"]
                }),
                runs_engine: false,
            },
            Tool {
                name: "send".into(),
                description: "Queue input for the session: text is typed first, then each key is pressed, then the optional sleep. At least one parameter is required.".into(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "text": {
                            "type": "string",
                            "description": "Text to type"
                        },
                        "keys": {
                            "type": "array",
                            "items": { "type": "string" },
                            "description": "Key names such as Enter, Tab, Up, Ctrl+C. A single character is typed literally."
                        },
                        "sleepMs": {
                            "type": "integer",
                            "minimum": 0,
                            "description": "Pause after the input, in milliseconds"
                        }
                    }
                }),
                runs_engine: false,
            },
            Tool {
                name: "capture".into(),
                description: "Replay the session, take a screenshot and return the terminal's current text.".into(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "waitPattern": {
                            "type": "string",
                            "description": "Regex to wait for on screen before the screenshot"
                        }
                    }
                }),
                runs_engine: true,
            },
            Tool {
                name: "exit".into(),
                description: "Interrupt the program, end the session and remove its workspace.".into(),
                parameters: json!({ "type": "object", "properties": {} }),
                runs_engine: true,
            },
        ]
    }

    async fn execute(&self, call: &ToolCall) -> ToolResult {
        debug!(action = %call.tool_name, "executing action");
        let result = match Action::parse(&call.tool_name, &call.arguments) {
            Ok(action) => self.dispatch(action).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(data) => ToolResult::ok(call, summarize(&call.tool_name, &data), Some(data)),
            Err(e) => ToolResult::from_error(call, &e),
        }
    }
}

// ─── Helpers ──────────────────────────────────────────────────────────

/// One-line human summary of a successful action.
fn summarize(action: &str, data: &Value) -> String {
    match action {
        "start" => format!(
            "session started: {}",
            data["command"].as_str().unwrap_or_default()
        ),
        "send" => format!("queued {} script line(s)", data["appended"]),
        "capture" => data["text"].as_str().unwrap_or_default().to_string(),
        "exit" => format!(
            "session closed after {} capture(s)",
            data["captureCount"]
        ),
        _ => data.to_string(),
    }
}
