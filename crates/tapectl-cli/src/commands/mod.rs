use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tapectl_config::{ConfigLoader, TapeConfig, WarningSeverity};
use tapectl_core::TapeError;
use tapectl_session::keys::KEYS;

mod run;
mod serve;

/// tapectl: drive terminal programs step by step through a tape engine
#[derive(Parser)]
#[command(name = "tapectl", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to tapectl.toml config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level override (e.g. debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress all log output (errors only)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve actions as JSON lines on stdin/stdout
    Serve,
    /// Execute a plan file of actions (TOML or JSON)
    Run {
        /// Plan file with a `[[step]]` list
        plan: PathBuf,
        /// Print each result as a JSON line
        #[arg(long)]
        json: bool,
    },
    /// List the key names accepted by `send`
    Keys,
    /// Check the engine binary and workspace directory
    Doctor,
    /// Show current configuration
    Config {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completions for bash, zsh, or fish
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

impl Cli {
    pub async fn run(self) -> tapectl_core::Result<()> {
        // Load config first so we can use it for log format
        let config_loader = ConfigLoader::load(self.config.as_deref())?;
        let config = config_loader.get();

        // --verbose > --quiet > --log-level > config
        let log_level = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            self.log_level
                .as_deref()
                .unwrap_or(config.logging.level.as_str())
        };

        // stdout carries protocol output, so logs go to stderr
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));
        match config.logging.format.as_str() {
            "json" => tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .with_target(true)
                .with_writer(std::io::stderr)
                .init(),
            "compact" => tracing_subscriber::fmt()
                .with_env_filter(filter)
                .compact()
                .with_target(false)
                .with_writer(std::io::stderr)
                .init(),
            _ => tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init(),
        }

        match self.command {
            Commands::Serve => serve::cmd_serve(config).await,
            Commands::Run { plan, json } => run::cmd_run(config, &plan, json).await,
            Commands::Keys => Self::cmd_keys(),
            Commands::Doctor => Self::cmd_doctor(config, config_loader.path()).await,
            Commands::Config { json } => Self::cmd_config(config, json),
            Commands::Completions { shell } => Self::cmd_completions(shell),
        }
    }

    fn cmd_keys() -> tapectl_core::Result<()> {
        println!("{:<12} {:<12} ALIASES", "KEY", "TOKEN");
        for key in KEYS {
            println!("{:<12} {:<12} {}", key.name, key.token, key.aliases.join(", "));
        }
        println!();
        println!("Names match case-insensitively, ignoring '-', '_', '+' and spaces.");
        println!("Any other single character is typed literally.");
        Ok(())
    }

    fn cmd_config(config: TapeConfig, json: bool) -> tapectl_core::Result<()> {
        if json {
            println!("{}", serde_json::to_string_pretty(&config)?);
        } else {
            println!(
                "{}",
                toml::to_string_pretty(&config).map_err(|e| TapeError::Config(e.to_string()))?
            );
        }
        Ok(())
    }

    async fn cmd_doctor(config: TapeConfig, config_path: &Path) -> tapectl_core::Result<()> {
        println!("🩺 tapectl doctor");
        println!("   config: {}", config_path.display());
        println!();

        let mut failures = 0;
        let mut warn_count = 0;

        // Validation errors already stopped the loader; only warnings remain
        let warnings = config.validate().map_err(TapeError::Config)?;
        for w in &warnings {
            println!("  {w}");
            if w.severity == WarningSeverity::Warning {
                warn_count += 1;
            }
        }

        match probe_engine(&config).await {
            Ok(version) => println!("  ✅ engine: {} ({version})", config.engine.binary),
            Err(e) => {
                println!("  ❌ engine: {e}");
                failures += 1;
            }
        }

        match probe_base_dir(&config.session.base_dir) {
            Ok(()) => println!(
                "  ✅ session.base_dir: {} is writable",
                config.session.base_dir.display()
            ),
            Err(e) => {
                println!(
                    "  ❌ session.base_dir: {} ({e})",
                    config.session.base_dir.display()
                );
                failures += 1;
            }
        }

        println!();
        println!("  {failures} problem(s), ⚠️  {warn_count} warning(s)");

        if failures > 0 {
            return Err(TapeError::Config(format!(
                "doctor found {failures} problem(s)"
            )));
        }
        Ok(())
    }

    fn cmd_completions(shell: Shell) -> tapectl_core::Result<()> {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "tapectl", &mut std::io::stdout());
        Ok(())
    }
}

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Spawn `<binary> [args] --version` and return the first line it prints.
async fn probe_engine(config: &TapeConfig) -> Result<String, String> {
    let output = tokio::time::timeout(
        PROBE_TIMEOUT,
        tokio::process::Command::new(&config.engine.binary)
            .args(&config.engine.args)
            .arg("--version")
            .stdin(std::process::Stdio::null())
            .kill_on_drop(true)
            .output(),
    )
    .await
    .map_err(|_| format!("`{} --version` timed out", config.engine.binary))?
    .map_err(|e| format!("cannot spawn `{}`: {e}", config.engine.binary))?;

    if !output.status.success() {
        return Err(format!(
            "`{} --version` exited with {}",
            config.engine.binary, output.status
        ));
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(stdout
        .lines()
        .next()
        .unwrap_or("unknown version")
        .trim()
        .to_string())
}

/// Create the base directory if needed and write a probe file into it.
fn probe_base_dir(base: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(base)?;
    let probe = base.join(format!(".tapectl-doctor-{}", std::process::id()));
    std::fs::write(&probe, b"ok")?;
    std::fs::remove_file(&probe)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_probe_base_dir_creates_missing_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a").join("b");
        probe_base_dir(&nested).unwrap();
        assert!(nested.is_dir());
        assert_eq!(std::fs::read_dir(&nested).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_probe_engine_reports_spawn_failure() {
        let mut config = TapeConfig::default();
        config.engine.binary = "/nonexistent/tapectl-engine".into();
        let err = probe_engine(&config).await.unwrap_err();
        assert!(err.contains("cannot spawn"));
    }
}
