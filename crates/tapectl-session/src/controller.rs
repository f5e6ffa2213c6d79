//! # Session Controller
//!
//! Owns the single session slot and drives every state transition:
//!
//! ```text
//!   Idle ──start──▶ Active ──exit──▶ Closing ──▶ Idle
//!                    │  ▲
//!                    └──┘ send / capture
//! ```
//!
//! `send` only grows the script. `capture` and `exit` replay the whole
//! accumulated script through the engine, because the engine forgets
//! everything between invocations.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use tapectl_config::SessionConfig;
use tapectl_core::TapeError;

use crate::engine::TapeEngine;
use crate::keys;
use crate::output;
use crate::script::{Script, ScriptHeader, ScriptLine, TEXT_OUTPUT_FILE, type_text};
use crate::workspace::Workspace;

/// Lifecycle of the session slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    Idle,
    Active,
    Closing,
}

/// The one live session.
#[derive(Debug)]
pub struct Session {
    workspace: Workspace,
    script: Script,
    command: String,
    capture_count: u32,
    state: SessionState,
    started_at: DateTime<Utc>,
}

impl Session {
    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn workspace_dir(&self) -> &std::path::Path {
        self.workspace.path()
    }

    pub fn capture_count(&self) -> u32 {
        self.capture_count
    }

    pub fn script(&self) -> &Script {
        &self.script
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}

/// Options for one `send` call. Empty values count as absent.
#[derive(Debug, Clone, Default)]
pub struct SendInput {
    pub text: Option<String>,
    pub keys: Option<Vec<String>>,
    pub sleep_ms: Option<u64>,
}

/// Result of a successful `capture`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Capture {
    pub screenshot_path: PathBuf,
    pub text: String,
}

/// Summary returned by `exit`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExitSummary {
    pub command: String,
    pub capture_count: u32,
    pub workspace_dir: PathBuf,
    pub started_at: DateTime<Utc>,
    /// Failure of the final replay, if any. Exit still completes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine_error: Option<String>,
}

/// Drives the external engine for at most one session at a time.
pub struct TapeController {
    settings: SessionConfig,
    engine: Arc<dyn TapeEngine>,
    session: Option<Session>,
}

impl TapeController {
    pub fn new(settings: SessionConfig, engine: Arc<dyn TapeEngine>) -> Self {
        Self {
            settings,
            engine,
            session: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.session.as_ref().map_or(SessionState::Idle, |s| s.state)
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Engine preamble for the current settings.
    pub fn header(&self) -> ScriptHeader {
        ScriptHeader {
            output_file: TEXT_OUTPUT_FILE.into(),
            typing_speed_ms: self.settings.typing_speed_ms,
            shell: self.settings.shell.clone(),
            width: self.settings.width,
            height: self.settings.height,
        }
    }

    /// Full rendered script of the live session.
    pub fn script(&self) -> Option<String> {
        let header = self.header();
        self.session.as_ref().map(|s| s.script.render(&header))
    }

    // ── Actions ─────────────────────────────────────────────────

    /// Open a session that launches `command`.
    pub async fn start(&mut self, command: &str) -> tapectl_core::Result<&Session> {
        if let Some(existing) = &self.session {
            return Err(TapeError::AlreadyActive {
                command: existing.command.clone(),
            });
        }
        if command.trim().is_empty() {
            return Err(TapeError::MissingArgument("command".into()));
        }

        let workspace = Workspace::create(&self.settings.base_dir).await?;
        let mut script = Script::new();
        script.extend(type_text(command));
        script.push(ScriptLine::Key("Enter"));
        script.push(ScriptLine::Sleep(self.settings.startup_delay_ms));

        info!(command, workspace = %workspace.path().display(), "session started");
        Ok(&*self.session.insert(Session {
            workspace,
            script,
            command: command.to_string(),
            capture_count: 0,
            state: SessionState::Active,
            started_at: Utc::now(),
        }))
    }

    /// Queue input. Returns the number of lines appended.
    pub fn send(&mut self, input: SendInput) -> tapectl_core::Result<usize> {
        let key_delay_ms = self.settings.key_delay_ms;
        let session = self.active_mut()?;

        let text = input.text.filter(|t| !t.is_empty());
        let keys = input.keys.filter(|k| !k.is_empty());
        let sleep_ms = input.sleep_ms.filter(|ms| *ms > 0);
        if text.is_none() && keys.is_none() && sleep_ms.is_none() {
            return Err(TapeError::NoOperation);
        }

        // Translate up front so an unknown key leaves the script untouched.
        let key_lines = match &keys {
            Some(keys) => keys::translate_all(keys)?,
            None => Vec::new(),
        };

        let mut lines = Vec::new();
        if let Some(text) = &text {
            lines.extend(type_text(text));
        }
        for line in key_lines {
            lines.push(line);
            lines.push(ScriptLine::Sleep(key_delay_ms));
        }
        if let Some(ms) = sleep_ms {
            lines.push(ScriptLine::Sleep(ms));
        }

        let appended = lines.len();
        session.script.extend(lines);
        debug!(appended, total = session.script.len(), "input queued");
        Ok(appended)
    }

    /// Replay the script, screenshot the terminal and return its last frame.
    pub async fn capture(
        &mut self,
        wait_pattern: Option<&str>,
        cancel: Option<&CancellationToken>,
    ) -> tapectl_core::Result<Capture> {
        let header = self.header();
        let settle_ms = self.settings.capture_settle_ms;
        let engine = Arc::clone(&self.engine);
        let session = self.active_mut()?;

        let wait_pattern = wait_pattern.filter(|p| !p.is_empty());
        if let Some(pattern) = wait_pattern {
            validate_wait_pattern(pattern)?;
        }

        session.capture_count += 1;
        let screenshot = format!("screenshot_{}.png", session.capture_count);
        match wait_pattern {
            Some(pattern) => session.script.push(ScriptLine::Wait(pattern.to_string())),
            None => session.script.push(ScriptLine::Sleep(settle_ms)),
        }
        session.script.push(ScriptLine::Screenshot(screenshot.clone()));

        let rendered = session.script.render(&header);
        let run = engine.run(&rendered, session.workspace.path(), cancel).await;
        let text_path = run.into_result()?;

        let screenshot_path = session.workspace.file(&screenshot);
        if !tokio::fs::try_exists(&screenshot_path).await.unwrap_or(false) {
            return Err(TapeError::MissingOutput(format!(
                "engine finished but {} was not written",
                screenshot_path.display()
            )));
        }

        let text_path = text_path.unwrap_or_else(|| session.workspace.file(TEXT_OUTPUT_FILE));
        let raw = match tokio::fs::read_to_string(&text_path).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(path = %text_path.display(), error = %e, "text output unreadable, returning empty text");
                String::new()
            }
        };
        let text = output::extract(&raw);

        info!(capture = session.capture_count, text_bytes = text.len(), "captured terminal");
        Ok(Capture {
            screenshot_path,
            text,
        })
    }

    /// Interrupt the program, replay once more, tear the session down.
    ///
    /// The final replay and the directory removal are best effort; the slot
    /// always returns to `Idle`.
    pub async fn exit(
        &mut self,
        cancel: Option<&CancellationToken>,
    ) -> tapectl_core::Result<ExitSummary> {
        let header = self.header();
        let settle_ms = self.settings.exit_settle_ms;
        let engine = Arc::clone(&self.engine);
        let session = match self.session.as_mut() {
            Some(s) => s,
            None => return Err(TapeError::NoActiveSession),
        };

        if session.state == SessionState::Active {
            session.script.push(ScriptLine::Key("Ctrl+C"));
            session.script.push(ScriptLine::Sleep(settle_ms));
            session.state = SessionState::Closing;
        }

        let rendered = session.script.render(&header);
        let run = engine.run(&rendered, session.workspace.path(), cancel).await;
        let engine_error = run.error();
        if let Some(err) = &engine_error {
            warn!(error = %err, "final replay failed during exit");
        }

        let Some(session) = self.session.take() else {
            return Err(TapeError::NoActiveSession);
        };
        session.workspace.remove().await;

        info!(command = %session.command, captures = session.capture_count, "session closed");
        Ok(ExitSummary {
            command: session.command,
            capture_count: session.capture_count,
            workspace_dir: session.workspace.path().to_path_buf(),
            started_at: session.started_at,
            engine_error,
        })
    }

    /// Host teardown hook: drop any live session and its workspace without
    /// running the engine. Safe to call repeatedly.
    pub async fn shutdown(&mut self) {
        if let Some(session) = self.session.take() {
            info!(command = %session.command, "shutdown with live session, cleaning up");
            session.workspace.remove().await;
        }
    }

    fn active_mut(&mut self) -> tapectl_core::Result<&mut Session> {
        match self.session.as_mut() {
            Some(s) if s.state == SessionState::Active => Ok(s),
            _ => Err(TapeError::NoActiveSession),
        }
    }
}

/// Wait patterns go between slashes on a single line and must be valid regex.
fn validate_wait_pattern(pattern: &str) -> tapectl_core::Result<()> {
    let invalid = |reason: String| TapeError::InvalidArgument {
        field: "waitPattern".into(),
        reason,
    };
    if pattern.contains('\n') || pattern.contains('\r') {
        return Err(invalid("pattern must be a single line".into()));
    }
    if pattern.contains('/') {
        return Err(invalid("pattern must not contain '/'".into()));
    }
    regex::Regex::new(pattern).map_err(|e| invalid(e.to_string()))?;
    Ok(())
}
