//! `tapectl run`: execute a plan file step by step.

use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use tapectl_config::TapeConfig;
use tapectl_core::{TapeError, ToolCall, ToolExecutor, ToolResult};
use tapectl_session::{SessionState, TapeTools};

use crate::plan::Plan;

pub(crate) async fn cmd_run(
    config: TapeConfig,
    plan_path: &Path,
    json: bool,
) -> tapectl_core::Result<()> {
    let plan = Plan::load(plan_path)?;
    let tools = Arc::new(TapeTools::from_config(&config));

    let interrupt = {
        let tools = Arc::clone(&tools);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, aborting plan");
                tools.cancel_all();
            }
        })
    };

    info!(steps = plan.steps.len(), plan = %plan_path.display(), "running plan");
    let failed = run_steps(tools.as_ref(), &plan, json).await;

    let live = tools.controller.lock().await.state() != SessionState::Idle;
    if live {
        let call = ToolCall {
            id: "cleanup-exit".into(),
            tool_name: "exit".into(),
            arguments: Value::Null,
        };
        let result = tools.execute(&call).await;
        report(None, &call, &result, json);
    }
    tools.shutdown().await;
    interrupt.abort();

    match failed {
        Some((step, message)) => Err(TapeError::Other(anyhow::anyhow!(
            "step {step} failed: {message}"
        ))),
        None => Ok(()),
    }
}

/// Execute steps in order; returns the first failing step and its message.
pub(crate) async fn run_steps<E: ToolExecutor>(
    tools: &E,
    plan: &Plan,
    json: bool,
) -> Option<(usize, String)> {
    for (i, call) in plan.steps.iter().enumerate() {
        let result = tools.execute(call).await;
        report(Some(i + 1), call, &result, json);
        if result.is_error {
            return Some((i + 1, result.content));
        }
    }
    None
}

fn report(step: Option<usize>, call: &ToolCall, result: &ToolResult, json: bool) {
    if json {
        match serde_json::to_string(result) {
            Ok(line) => println!("{line}"),
            Err(e) => warn!(error = %e, "cannot encode result"),
        }
        return;
    }

    let label = match step {
        Some(n) => format!("[{n}] {}", call.tool_name),
        None => call.tool_name.clone(),
    };
    if result.is_error {
        println!("❌ {label}: {}", result.content);
    } else if call.tool_name == "capture" {
        println!("✅ {label}:");
        for line in result.content.lines() {
            println!("   │ {line}");
        }
    } else {
        println!("✅ {label}: {}", result.content);
    }
}
