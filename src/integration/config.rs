//! Configuration for the player
//!
//! Loaded from a TOML file. Every field has a default, so an empty file
//! (or no file at all) gives the stock behaviour.

use crate::catalog::Catalog;
use crate::{Result, TurnUpError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Playback settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Directory holding `<file_name>.<audio_extension>` files
    pub audio_dir: PathBuf,
    pub audio_extension: String,
    /// Playlist position selected at startup
    pub default_playlist: usize,
    /// Elapsed-time sampler period in milliseconds
    pub sampler_interval_ms: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            audio_dir: PathBuf::from("audio"),
            audio_extension: "wav".to_string(),
            default_playlist: 1,
            sampler_interval_ms: 500,
        }
    }
}

/// Voice control settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Inactivity timeout while collecting a title
    pub title_timeout_ms: u64,
    /// Delay before a new recognition session replaces an ended one
    pub restart_delay_ms: u64,
    /// Start listening as soon as the orchestrator runs
    pub listen_on_start: bool,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            title_timeout_ms: 5000,
            restart_delay_ms: 500,
            listen_on_start: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    /// How long a status message stays visible
    pub display_ms: u64,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self { display_ms: 1000 }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub clock_interval_secs: u64,
    /// Brightness below which dark mode is used
    pub dark_mode_threshold: f32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            clock_interval_secs: 60,
            dark_mode_threshold: 0.3,
        }
    }
}

/// Configuration for the complete player
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TurnUpConfig {
    pub playback: PlaybackConfig,
    pub voice: VoiceConfig,
    pub status: StatusConfig,
    pub display: DisplayConfig,
    /// TOML catalog replacing the built-in one
    pub catalog_path: Option<PathBuf>,
    /// Capacity of command and event channels
    pub channel_buffer_size: usize,
    /// How long shutdown waits for the orchestrator thread
    pub shutdown_timeout_ms: u64,
}

impl Default for TurnUpConfig {
    fn default() -> Self {
        Self {
            playback: PlaybackConfig::default(),
            voice: VoiceConfig::default(),
            status: StatusConfig::default(),
            display: DisplayConfig::default(),
            catalog_path: None,
            channel_buffer_size: 100,
            shutdown_timeout_ms: 5000,
        }
    }
}

impl TurnUpConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TurnUpConfig = toml::from_str(content)
            .map_err(|e| TurnUpError::ConfigError(format!("Invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            TurnUpError::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Default location: `<config dir>/turnup/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("turnup").join("config.toml"))
    }

    /// Load the given file, else the default location if it exists, else defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(path),
            _ => {
                debug!("No configuration file, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Catalog from `catalog_path`, or the built-in one
    pub fn load_catalog(&self) -> Result<Catalog> {
        match &self.catalog_path {
            Some(path) => Catalog::load(path),
            None => Ok(Catalog::builtin()),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("playback.sampler_interval_ms", self.playback.sampler_interval_ms),
            ("voice.title_timeout_ms", self.voice.title_timeout_ms),
            ("voice.restart_delay_ms", self.voice.restart_delay_ms),
            ("status.display_ms", self.status.display_ms),
            ("display.clock_interval_secs", self.display.clock_interval_secs),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(TurnUpError::ConfigError(format!("{} must be positive", name)));
            }
        }

        let threshold = self.display.dark_mode_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(TurnUpError::ConfigError(format!(
                "display.dark_mode_threshold must be within [0, 1], got {}",
                threshold
            )));
        }

        if self.playback.audio_extension.trim().is_empty() {
            return Err(TurnUpError::ConfigError(
                "playback.audio_extension is required".to_string(),
            ));
        }

        if self.channel_buffer_size == 0 {
            return Err(TurnUpError::ConfigError(
                "channel_buffer_size must be positive".to_string(),
            ));
        }

        Ok(())
    }

    // === Builder setters ===

    pub fn with_audio_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.playback.audio_dir = dir.into();
        self
    }

    pub fn with_catalog_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.catalog_path = Some(path.into());
        self
    }

    pub fn with_default_playlist(mut self, position: usize) -> Self {
        self.playback.default_playlist = position;
        self
    }

    pub fn with_title_timeout_ms(mut self, timeout: u64) -> Self {
        self.voice.title_timeout_ms = timeout;
        self
    }

    pub fn with_restart_delay_ms(mut self, delay: u64) -> Self {
        self.voice.restart_delay_ms = delay;
        self
    }

    /// Do not start recognition automatically
    pub fn without_listening(mut self) -> Self {
        self.voice.listen_on_start = false;
        self
    }

    pub fn with_channel_buffer_size(mut self, size: usize) -> Self {
        self.channel_buffer_size = size;
        self
    }

    pub fn with_shutdown_timeout_ms(mut self, timeout: u64) -> Self {
        self.shutdown_timeout_ms = timeout;
        self
    }

    // === Durations ===

    pub fn sampler_interval(&self) -> Duration {
        Duration::from_millis(self.playback.sampler_interval_ms)
    }

    pub fn title_timeout(&self) -> Duration {
        Duration::from_millis(self.voice.title_timeout_ms)
    }

    pub fn restart_delay(&self) -> Duration {
        Duration::from_millis(self.voice.restart_delay_ms)
    }

    pub fn status_display(&self) -> Duration {
        Duration::from_millis(self.status.display_ms)
    }

    pub fn clock_interval(&self) -> Duration {
        Duration::from_secs(self.display.clock_interval_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}
