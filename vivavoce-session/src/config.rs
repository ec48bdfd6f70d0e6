//! Configuration management

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use vivavoce_audio::AudioConfig;
use vivavoce_policy::{CoveragePolicy, RetakePolicy};

/// Session configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Path to configuration file
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Questions required before a session may end early (default: 5)
    pub min_questions: u32,

    /// Capture and wire format
    pub audio: AudioConfig,

    /// Domain thresholds and session end timing
    pub coverage: CoveragePolicy,

    /// Retake rules
    pub retake: RetakePolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            config_path: Self::default_config_path(),
            min_questions: 5,
            audio: AudioConfig::default(),
            coverage: CoveragePolicy::default(),
            retake: RetakePolicy::default(),
        }
    }
}

impl SessionConfig {
    /// Load configuration from the default location, or create it
    pub fn load() -> Result<Self> {
        Self::load_from(Self::default_config_path())
    }

    /// Load configuration from `path`, writing defaults there when missing
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let config_path = path.as_ref().to_path_buf();

        let config = if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config file {}", config_path.display()))?;

            let mut config: SessionConfig =
                toml::from_str(&contents).context("Failed to parse config file")?;

            config.config_path = config_path;
            config
        } else {
            let config = Self {
                config_path,
                ..Self::default()
            };
            config.save().context("Failed to save default config")?;
            config
        };

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&self.config_path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Reject settings the pipeline or policies cannot run with
    pub fn validate(&self) -> Result<()> {
        self.audio.validate().context("Invalid [audio] section")?;
        self.coverage.validate().context("Invalid [coverage] section")?;
        self.retake.validate().context("Invalid [retake] section")?;
        Ok(())
    }

    /// Get default config path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vivavoce")
            .join("config.toml")
    }
}
