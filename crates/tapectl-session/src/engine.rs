//! # Execution Engine
//!
//! Runs the external tape interpreter against a rendered script. The engine
//! keeps no state between invocations, so every run replays the complete
//! script from the top inside the session workspace.
//!
//! ## Process handling
//!
//! - The script is written to `<workspace>/session.script` and passed as the
//!   last argument.
//! - stdout/stderr are piped and drained concurrently with the wait.
//! - `VHS_NO_SANDBOX=true` is always set; the bundled browser cannot start
//!   its sandbox inside containers.
//! - The child leads its own process group. Cancellation sends `SIGTERM` to
//!   the group, then `SIGKILL` after [`TERMINATE_GRACE`].
//!
//! Failures are values ([`RunStatus`]), never errors, so the controller
//! decides how each one surfaces.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use tapectl_config::EngineConfig;
use tapectl_core::TapeError;

use crate::script::TEXT_OUTPUT_FILE;

/// File name of the rendered script inside the workspace.
pub const SCRIPT_FILE: &str = "session.script";

/// Environment override required for containerized execution.
pub const SANDBOX_ENV: (&str, &str) = ("VHS_NO_SANDBOX", "true");

/// Time allowed between `SIGTERM` and `SIGKILL` on cancellation.
pub const TERMINATE_GRACE: Duration = Duration::from_secs(2);

/// How long to keep reading pipes after the engine itself has exited.
const PIPE_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

// ─── Run Result ───────────────────────────────────────────────────────

/// How an engine invocation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Succeeded,
    /// Non-zero exit. `code` is `None` when the process died from a signal.
    Exited { code: Option<i32>, detail: String },
    /// The cancellation token fired before the process exited.
    Aborted,
    /// The process could not be started.
    SpawnFailed(String),
}

/// Outcome of one engine invocation.
#[derive(Debug, Clone)]
pub struct EngineRun {
    pub status: RunStatus,
    /// Where the engine wrote its text dump; set on success.
    pub text_output_path: Option<PathBuf>,
}

impl EngineRun {
    fn succeeded(workspace: &Path) -> Self {
        Self {
            status: RunStatus::Succeeded,
            text_output_path: Some(workspace.join(TEXT_OUTPUT_FILE)),
        }
    }

    fn failed(status: RunStatus) -> Self {
        Self {
            status,
            text_output_path: None,
        }
    }

    pub fn success(&self) -> bool {
        self.status == RunStatus::Succeeded
    }

    /// Human-readable failure, `None` on success.
    pub fn error(&self) -> Option<String> {
        match &self.status {
            RunStatus::Succeeded => None,
            RunStatus::Exited {
                code: Some(code),
                detail,
            } => Some(format!("exit code {code}: {detail}")),
            RunStatus::Exited { code: None, detail } => {
                Some(format!("terminated by signal: {detail}"))
            }
            RunStatus::Aborted => Some("Aborted".into()),
            RunStatus::SpawnFailed(msg) => Some(msg.clone()),
        }
    }

    /// Map the run onto the error taxonomy, yielding the text dump path.
    pub fn into_result(self) -> tapectl_core::Result<Option<PathBuf>> {
        let error = self.error();
        match self.status {
            RunStatus::Succeeded => Ok(self.text_output_path),
            RunStatus::Exited { .. } => Err(TapeError::EngineFailure(error.unwrap_or_default())),
            RunStatus::Aborted => Err(TapeError::Aborted),
            RunStatus::SpawnFailed(msg) => Err(TapeError::SpawnFailure(msg)),
        }
    }
}

// ─── Engine Trait ─────────────────────────────────────────────────────

/// Something that can execute a complete tape script.
#[async_trait]
pub trait TapeEngine: Send + Sync {
    /// Execute `script` inside `workspace`. Firing `cancel` terminates the run.
    async fn run(
        &self,
        script: &str,
        workspace: &Path,
        cancel: Option<&CancellationToken>,
    ) -> EngineRun;
}

// ─── Subprocess Engine ────────────────────────────────────────────────

/// Engine backed by an external interpreter binary (VHS or compatible).
#[derive(Debug, Clone)]
pub struct VhsEngine {
    binary: String,
    args: Vec<String>,
}

impl VhsEngine {
    pub fn new(binary: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            binary: binary.into(),
            args,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.binary.clone(), config.args.clone())
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }
}

#[async_trait]
impl TapeEngine for VhsEngine {
    async fn run(
        &self,
        script: &str,
        workspace: &Path,
        cancel: Option<&CancellationToken>,
    ) -> EngineRun {
        if cancel.is_some_and(|t| t.is_cancelled()) {
            return EngineRun::failed(RunStatus::Aborted);
        }

        let script_path = workspace.join(SCRIPT_FILE);
        if let Err(e) = tokio::fs::write(&script_path, script).await {
            return EngineRun::failed(RunStatus::SpawnFailed(format!(
                "failed to write {}: {e}",
                script_path.display()
            )));
        }

        let mut cmd = Command::new(&self.binary);
        cmd.args(&self.args)
            .arg(&script_path)
            .current_dir(workspace)
            .env(SANDBOX_ENV.0, SANDBOX_ENV.1)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(binary = %self.binary, error = %e, "engine spawn failed");
                return EngineRun::failed(RunStatus::SpawnFailed(format!(
                    "failed to spawn '{}': {e}",
                    self.binary
                )));
            }
        };
        let pid = child.id();
        debug!(binary = %self.binary, ?pid, script_bytes = script.len(), "engine started");

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let waited = match cancel {
            Some(token) => tokio::select! {
                status = child.wait() => Some(status),
                _ = token.cancelled() => None,
            },
            None => Some(child.wait().await),
        };

        let Some(waited) = waited else {
            info!(?pid, "engine run cancelled, terminating");
            terminate(&mut child, pid).await;
            stdout.abort();
            stderr.abort();
            return EngineRun::failed(RunStatus::Aborted);
        };

        let status = match waited {
            Ok(status) => status,
            Err(e) => {
                return EngineRun::failed(RunStatus::Exited {
                    code: None,
                    detail: format!("failed to wait for engine: {e}"),
                });
            }
        };

        if status.success() {
            debug!(?pid, "engine finished");
            stdout.abort();
            stderr.abort();
            return EngineRun::succeeded(workspace);
        }

        let stderr = collect(stderr).await;
        let stdout = collect(stdout).await;
        let detail = if stderr.trim().is_empty() {
            stdout.trim().to_string()
        } else {
            stderr.trim().to_string()
        };
        warn!(?pid, code = ?status.code(), "engine exited with failure");
        EngineRun::failed(RunStatus::Exited {
            code: status.code(),
            detail,
        })
    }
}

// ─── Helpers ──────────────────────────────────────────────────────────

/// Read a pipe to the end on a background task.
fn drain<R>(pipe: Option<R>) -> JoinHandle<Vec<u8>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf).await;
        }
        buf
    })
}

/// Collect drained output. A grandchild holding the pipe open only costs
/// [`PIPE_DRAIN_TIMEOUT`].
async fn collect(handle: JoinHandle<Vec<u8>>) -> String {
    match tokio::time::timeout(PIPE_DRAIN_TIMEOUT, handle).await {
        Ok(Ok(bytes)) => String::from_utf8_lossy(&bytes).into_owned(),
        _ => String::new(),
    }
}

/// Terminate the engine and everything it spawned.
async fn terminate(child: &mut Child, pid: Option<u32>) {
    #[cfg(unix)]
    if let Some(pid) = pid {
        // Negative pid addresses the whole process group.
        unsafe {
            libc::kill(-(pid as i32), libc::SIGTERM);
        }
        if let Ok(Ok(_)) = tokio::time::timeout(TERMINATE_GRACE, child.wait()).await {
            unsafe {
                libc::kill(-(pid as i32), libc::SIGKILL);
            }
            return;
        }
        unsafe {
            libc::kill(-(pid as i32), libc::SIGKILL);
        }
    }
    #[cfg(not(unix))]
    let _ = pid;

    if let Err(e) = child.kill().await {
        warn!(error = %e, "failed to kill engine process");
    }
}
