// Engine configuration
// RON file with every field optional; missing fields take the defaults below

use crate::sequencer::timeline::Tempo;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Settings used to build a sequencer and its channels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub tempo_bpm: f64,
    pub steps_per_beat: u32,
    pub steps_per_bar: u32,
    pub total_bars: u32,
    pub loop_enabled: bool,
    /// Delay of odd steps, 0 = straight, 1 = half a step late
    pub swing: f32,
    /// How far ahead of the driver events are computed, in seconds
    pub schedule_ahead_secs: f64,
    pub max_tracks: usize,
    pub master_volume: f32,
    pub command_capacity: usize,
    pub notification_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tempo_bpm: 120.0,
            steps_per_beat: 4,
            steps_per_bar: 16,
            total_bars: 4,
            loop_enabled: true,
            swing: 0.0,
            schedule_ahead_secs: 0.1,
            max_tracks: 16,
            master_volume: 0.8,
            command_capacity: 512,
            notification_capacity: 256,
        }
    }
}

impl EngineConfig {
    /// Parse and validate RON text
    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig =
            ron::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a RON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_ron_str(&text)
    }

    /// Load `path`, or the user config when `None`; anything unreadable falls
    /// back to the defaults with a warning
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let path = match path.map(Path::to_path_buf).or_else(user_config_path) {
            Some(path) => path,
            None => return Self::default(),
        };
        if !path.exists() {
            log::debug!(target: "config", "no config at {}, using defaults", path.display());
            return Self::default();
        }
        match Self::load(&path) {
            Ok(config) => {
                log::info!(target: "config", "loaded {}", path.display());
                config
            }
            Err(e) => {
                log::warn!(target: "config", "ignoring config {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn to_ron_string(&self) -> Result<String, ConfigError> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        Tempo::new(self.tempo_bpm).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if self.steps_per_beat == 0 || self.steps_per_bar == 0 {
            return Err(ConfigError::Invalid("grid sizes must be > 0".to_string()));
        }
        if self.total_bars == 0 {
            return Err(ConfigError::Invalid("total_bars must be > 0".to_string()));
        }
        if !self.schedule_ahead_secs.is_finite() || self.schedule_ahead_secs < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "schedule_ahead_secs {} must be >= 0",
                self.schedule_ahead_secs
            )));
        }
        if !(0.0..=1.0).contains(&self.swing) {
            return Err(ConfigError::Invalid(format!("swing {} outside 0..=1", self.swing)));
        }
        if self.max_tracks == 0 {
            return Err(ConfigError::Invalid("max_tracks must be > 0".to_string()));
        }
        if !(0.0..=1.0).contains(&self.master_volume) {
            return Err(ConfigError::Invalid(format!(
                "master_volume {} outside 0..=1",
                self.master_volume
            )));
        }
        if self.command_capacity == 0 || self.notification_capacity == 0 {
            return Err(ConfigError::Invalid("channel capacities must be > 0".to_string()));
        }
        Ok(())
    }
}

/// `<config dir>/haos-sequencer/config.ron`
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("haos-sequencer").join("config.ron"))
}
