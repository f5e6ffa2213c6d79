use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration: maps to `tapectl.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TapeConfig {
    pub engine: EngineConfig,
    pub session: SessionConfig,
    pub limits: LimitsConfig,
    pub logging: LoggingConfig,
}

// ── Engine ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Program that interprets the rendered script.
    pub binary: String,
    /// Arguments placed before the script path.
    pub args: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            binary: "vhs".into(),
            args: vec![],
        }
    }
}

// ── Session ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Directory under which per-session workspaces are created.
    pub base_dir: PathBuf,
    /// Shell the engine starts the terminal with.
    pub shell: String,
    /// Delay between typed characters.
    pub typing_speed_ms: u64,
    /// Terminal width in pixels (engine default when unset).
    pub width: Option<u32>,
    /// Terminal height in pixels (engine default when unset).
    pub height: Option<u32>,
    /// Pause after launching the command under test.
    pub startup_delay_ms: u64,
    /// Pause after every key press.
    pub key_delay_ms: u64,
    /// Pause before a screenshot when no wait pattern is given.
    pub capture_settle_ms: u64,
    /// Pause after the interrupt sent on exit.
    pub exit_settle_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            base_dir: std::env::temp_dir().join("tapectl"),
            shell: "bash".into(),
            typing_speed_ms: 50,
            width: None,
            height: None,
            startup_delay_ms: 500,
            key_delay_ms: 100,
            capture_settle_ms: 1000,
            exit_settle_ms: 200,
        }
    }
}

// ── Limits ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Deadline for a single capture/exit engine run. The run is aborted
    /// when it passes.
    pub action_timeout_secs: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            action_timeout_secs: 120,
        }
    }
}

// ── Logging ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
    /// Output format: "pretty", "json", "compact".
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "pretty".into(),
        }
    }
}

// ── Validation ─────────────────────────────────────────────────

/// A single config validation issue.
#[derive(Debug)]
pub struct ConfigWarning {
    pub field: String,
    pub message: String,
    pub severity: WarningSeverity,
    pub hint: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningSeverity {
    Error,
    Warning,
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self.severity {
            WarningSeverity::Error => "error",
            WarningSeverity::Warning => "warning",
        };
        write!(f, "{} {}: {}", label, self.field, self.message)?;
        if let Some(ref h) = self.hint {
            write!(f, "\n   ↳ {}", h)?;
        }
        Ok(())
    }
}

impl TapeConfig {
    /// Validate the config and return a list of warnings.
    /// Returns `Err` with all messages joined if any severity is Error.
    pub fn validate(&self) -> Result<Vec<ConfigWarning>, String> {
        let mut warnings = Vec::new();

        if self.engine.binary.trim().is_empty() {
            warnings.push(ConfigWarning {
                field: "engine.binary".into(),
                message: "engine binary is empty".into(),
                severity: WarningSeverity::Error,
                hint: Some("Set to the tape interpreter, e.g. 'vhs'".into()),
            });
        }

        if self.session.shell.trim().is_empty() {
            warnings.push(ConfigWarning {
                field: "session.shell".into(),
                message: "shell is empty".into(),
                severity: WarningSeverity::Error,
                hint: Some("Set to e.g. 'bash' or 'zsh'".into()),
            });
        }

        if self.session.typing_speed_ms == 0 {
            warnings.push(ConfigWarning {
                field: "session.typing_speed_ms".into(),
                message: "typing speed must be at least 1ms".into(),
                severity: WarningSeverity::Error,
                hint: None,
            });
        }

        if self.limits.action_timeout_secs == 0 {
            warnings.push(ConfigWarning {
                field: "limits.action_timeout_secs".into(),
                message: "timeout of 0 would abort every engine run".into(),
                severity: WarningSeverity::Error,
                hint: Some("Use a generous value such as 120".into()),
            });
        }

        if self.session.base_dir.is_relative() {
            warnings.push(ConfigWarning {
                field: "session.base_dir".into(),
                message: format!(
                    "'{}' is relative and resolves against the working directory",
                    self.session.base_dir.display()
                ),
                severity: WarningSeverity::Warning,
                hint: None,
            });
        }

        let valid_formats = ["pretty", "json", "compact"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            warnings.push(ConfigWarning {
                field: "logging.format".into(),
                message: format!("unknown log format '{}'", self.logging.format),
                severity: WarningSeverity::Warning,
                hint: Some(format!("Valid values: {}", valid_formats.join(", "))),
            });
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            warnings.push(ConfigWarning {
                field: "logging.level".into(),
                message: format!("unknown log level '{}'", self.logging.level),
                severity: WarningSeverity::Warning,
                hint: Some(format!("Valid values: {}", valid_levels.join(", "))),
            });
        }

        let errors: Vec<String> = warnings
            .iter()
            .filter(|w| w.severity == WarningSeverity::Error)
            .map(|w| format!("{}: {}", w.field, w.message))
            .collect();

        if !errors.is_empty() {
            return Err(format!("Configuration errors:\n  • {}", errors.join("\n  • ")));
        }

        Ok(warnings)
    }
}
