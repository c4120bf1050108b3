//! Configuration loading for avatar-sync.
//!
//! Configuration is read from an optional TOML file given with `--config`.
//! Every section and field may be omitted.

use std::path::{Path, PathBuf};

use avatar_client::SyncConfig;
use avatar_types::{AvatarSelection, CharacterAttributes, CharacterPayload};
use serde::Deserialize;

/// Root configuration for avatar-sync.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CliConfig {
    /// This device.
    #[serde(default)]
    pub device: DeviceConfig,
    /// Session and controller buffers.
    #[serde(default)]
    pub sync: SyncSection,
    /// Character used when none is given on the command line.
    #[serde(default)]
    pub character: CharacterConfig,
    /// Log output.
    #[serde(default)]
    pub log: LogConfig,
}

/// Device configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    /// Name used in log lines (default: "phone").
    #[serde(default = "default_device_name")]
    pub name: String,
}

/// Buffer sizes for the sync layer.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncSection {
    /// Inbound envelope buffer per session (default: 64).
    #[serde(default = "default_capacity")]
    pub inbound_capacity: usize,
    /// Controller event buffer (default: 64).
    #[serde(default = "default_capacity")]
    pub event_capacity: usize,
}

/// Starting character.
#[derive(Debug, Clone, Deserialize)]
pub struct CharacterConfig {
    /// Avatar image identifier (default: "avatar_1").
    #[serde(default = "default_avatar")]
    pub avatar: String,
    /// Age (default: lower bound).
    #[serde(default = "default_age")]
    pub age: i64,
    /// Height (default: lower bound).
    #[serde(default = "default_height")]
    pub height: i64,
    /// Weight (default: lower bound).
    #[serde(default = "default_weight")]
    pub weight: i64,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset (default: "warn").
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

// Default value functions
fn default_device_name() -> String {
    "phone".to_string()
}

fn default_capacity() -> usize {
    avatar_client::config::DEFAULT_CHANNEL_CAPACITY
}

fn default_avatar() -> String {
    "avatar_1".to_string()
}

fn default_age() -> i64 {
    CharacterAttributes::default().age
}

fn default_height() -> i64 {
    CharacterAttributes::default().height
}

fn default_weight() -> i64 {
    CharacterAttributes::default().weight
}

fn default_log_filter() -> String {
    "warn".to_string()
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: default_device_name(),
        }
    }
}

impl Default for SyncSection {
    fn default() -> Self {
        Self {
            inbound_capacity: default_capacity(),
            event_capacity: default_capacity(),
        }
    }
}

impl Default for CharacterConfig {
    fn default() -> Self {
        Self {
            avatar: default_avatar(),
            age: default_age(),
            height: default_height(),
            weight: default_weight(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

impl CliConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Load from `path` if given, otherwise use defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Session settings for a device with the given name.
    pub fn sync_config(&self, device_name: &str) -> SyncConfig {
        SyncConfig::default()
            .with_device_name(device_name)
            .with_inbound_capacity(self.sync.inbound_capacity)
            .with_event_capacity(self.sync.event_capacity)
    }

    /// The configured starting character.
    pub fn character(&self) -> CharacterPayload {
        CharacterPayload::new(
            AvatarSelection::new(self.character.avatar.as_str()),
            CharacterAttributes::new(
                self.character.age,
                self.character.height,
                self.character.weight,
            ),
        )
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
}
