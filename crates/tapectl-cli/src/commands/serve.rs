//! `tapectl serve`: one JSON request per stdin line, one result per stdout line.

use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use tapectl_config::TapeConfig;
use tapectl_core::{TapeError, ToolCall, ToolExecutor, ToolResult};
use tapectl_session::TapeTools;

use crate::plan::call_from_line;

pub(crate) async fn cmd_serve(config: TapeConfig) -> tapectl_core::Result<()> {
    let tools = Arc::new(TapeTools::from_config(&config));
    let stop = CancellationToken::new();

    // Ctrl-C aborts the running action, then ends the loop
    let watcher = {
        let tools = Arc::clone(&tools);
        let stop = stop.clone();
        tokio::spawn(async move {
            tokio::select! {
                signal = tokio::signal::ctrl_c() => {
                    if signal.is_ok() {
                        info!("interrupt received, aborting in-flight actions");
                        tools.cancel_all();
                    }
                    stop.cancel();
                }
                _ = stop.cancelled() => {}
            }
        })
    };

    info!(engine = %config.engine.binary, "serving actions on stdin");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut seq: u64 = 0;

    let outcome = loop {
        let line = tokio::select! {
            _ = stop.cancelled() => break Ok(()),
            line = lines.next_line() => line,
        };
        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => {
                debug!("stdin closed");
                break Ok(());
            }
            Err(e) => break Err(TapeError::from(e)),
        };
        if line.trim().is_empty() {
            continue;
        }

        seq += 1;
        let fallback_id = format!("req-{seq}");
        let result = match call_from_line(&line, &fallback_id) {
            Ok(call) => tools.execute(&call).await,
            Err(e) => {
                let call = ToolCall {
                    id: fallback_id,
                    tool_name: String::new(),
                    arguments: serde_json::Value::Null,
                };
                ToolResult::from_error(&call, &e)
            }
        };
        match serde_json::to_string(&result) {
            Ok(encoded) => println!("{encoded}"),
            Err(e) => break Err(TapeError::from(e)),
        }
    };

    stop.cancel();
    tools.cancel_all();
    tools.shutdown().await;
    let _ = watcher.await;
    info!("serve loop finished");
    outcome
}
