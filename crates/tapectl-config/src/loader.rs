use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::schema::TapeConfig;
use tapectl_core::TapeError;

/// Loads the tapectl configuration.
pub struct ConfigLoader {
    config: Arc<RwLock<TapeConfig>>,
    config_path: PathBuf,
}

impl ConfigLoader {
    /// Resolve the config path: explicit path > TAPECTL_CONFIG env > ~/.tapectl/tapectl.toml
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        if let Some(p) = explicit {
            return p.to_path_buf();
        }
        if let Ok(p) = std::env::var("TAPECTL_CONFIG") {
            return PathBuf::from(p);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".tapectl")
            .join("tapectl.toml")
    }

    /// Load the config from disk, falling back to defaults.
    pub fn load(path: Option<&Path>) -> tapectl_core::Result<Self> {
        let config_path = Self::resolve_path(path);
        let config = if config_path.exists() {
            info!(?config_path, "loading configuration");
            Self::parse_file(&config_path)?
        } else {
            warn!(?config_path, "config file not found, using defaults");
            TapeConfig::default()
        };

        let config = Self::apply_env_overrides(config);

        match config.validate() {
            Ok(warnings) => {
                for w in &warnings {
                    warn!("{}", w);
                }
            }
            Err(e) => {
                return Err(TapeError::Config(e));
            }
        }

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_path,
        })
    }

    /// Get a read snapshot of the current config.
    pub fn get(&self) -> TapeConfig {
        self.config.read().clone()
    }

    /// Get a shared reference for subscription.
    pub fn shared(&self) -> Arc<RwLock<TapeConfig>> {
        Arc::clone(&self.config)
    }

    /// Path the config was (or would have been) loaded from.
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Reload the config from disk. The current config is kept when the
    /// file is missing, unparsable or invalid.
    pub fn reload(&self) -> tapectl_core::Result<()> {
        if !self.config_path.exists() {
            return Err(TapeError::Config(format!(
                "config file not found: {}",
                self.config_path.display()
            )));
        }
        let new_config = Self::apply_env_overrides(Self::parse_file(&self.config_path)?);
        new_config.validate().map_err(TapeError::Config)?;
        *self.config.write() = new_config;
        info!("configuration reloaded");
        Ok(())
    }

    fn parse_file(path: &Path) -> tapectl_core::Result<TapeConfig> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str::<TapeConfig>(&raw).map_err(|e| {
            TapeError::Config(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    /// Apply env var overrides (TAPECTL_ENGINE_BINARY, TAPECTL_BASE_DIR, etc.)
    fn apply_env_overrides(mut config: TapeConfig) -> TapeConfig {
        if let Ok(v) = std::env::var("TAPECTL_ENGINE_BINARY") {
            config.engine.binary = v;
        }
        if let Ok(v) = std::env::var("TAPECTL_BASE_DIR") {
            config.session.base_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("TAPECTL_SHELL") {
            config.session.shell = v;
        }
        if let Ok(v) = std::env::var("TAPECTL_LOG_LEVEL") {
            config.logging.level = v;
        }
        if let Ok(v) = std::env::var("TAPECTL_ACTION_TIMEOUT") {
            match v.parse::<u64>() {
                Ok(secs) => config.limits.action_timeout_secs = secs,
                Err(_) => warn!(value = %v, "ignoring non-numeric TAPECTL_ACTION_TIMEOUT"),
            }
        }
        config
    }
}
