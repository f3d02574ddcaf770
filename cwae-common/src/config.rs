//! Host configuration loading and bank root resolution
//!
//! Configuration comes from a TOML file; every field has a compiled default so an
//! empty (or missing) file yields a runnable host.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable overriding the bank root folder
pub const BANK_ROOT_ENV: &str = "CWAE_BANK_ROOT";

/// Compiled default bank root, relative to the working directory
pub const DEFAULT_BANK_ROOT: &str = "SoundBanks";

/// Compiled default language for localized banks
pub const DEFAULT_LANGUAGE: &str = "English(US)";

/// Memory manager settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemorySettings {
    /// Total bytes the memory manager may hand out
    pub pool_size_bytes: u64,
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            pool_size_bytes: 64 * 1024 * 1024,
        }
    }
}

/// Streaming manager settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingSettings {
    /// Maximum number of concurrently open streams
    pub max_concurrent_streams: u32,
}

impl Default for StreamingSettings {
    fn default() -> Self {
        Self {
            max_concurrent_streams: 32,
        }
    }
}

/// Low-level I/O device settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSettings {
    /// Transfer granularity in bytes
    pub granularity_bytes: u32,
    /// I/O buffer memory in bytes
    pub io_memory_bytes: u64,
    /// Maximum concurrent I/O transfers
    pub max_concurrent_io: u32,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            granularity_bytes: 16 * 1024,
            io_memory_bytes: 2 * 1024 * 1024,
            max_concurrent_io: 8,
        }
    }
}

/// Sound engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Output sample rate (Hz)
    pub sample_rate: u32,
    /// Samples rendered per render quantum
    pub samples_per_frame: u32,
    /// Maximum simultaneously playing voices
    pub max_voices: u32,
    /// Capacity of the posted-event queue
    pub command_queue_size: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            samples_per_frame: 1024,
            max_voices: 256,
            command_queue_size: 256,
        }
    }
}

/// Top-level host configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Folder containing sound banks (localized banks live in a language subfolder)
    pub bank_root: PathBuf,
    /// Language tag for localized banks
    pub language: String,
    /// Banks to load, in order
    pub banks: Vec<String>,
    /// Name of the emitter registered for playback
    pub game_object: String,
    /// Event posted against the emitter
    pub event: String,
    /// Render cadence in milliseconds
    pub frame_period_ms: u64,
    /// Number of render ticks before shutdown
    pub frame_count: u32,

    pub memory: MemorySettings,
    pub streaming: StreamingSettings,
    pub device: DeviceSettings,
    pub engine: EngineSettings,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            bank_root: PathBuf::from(DEFAULT_BANK_ROOT),
            language: DEFAULT_LANGUAGE.to_string(),
            banks: vec!["Init".to_string(), "TestBank".to_string()],
            game_object: "GameObj1".to_string(),
            event: "PlayCombo".to_string(),
            frame_period_ms: 30,
            frame_count: 300,
            memory: MemorySettings::default(),
            streaming: StreamingSettings::default(),
            device: DeviceSettings::default(),
            engine: EngineSettings::default(),
        }
    }
}

impl HostConfig {
    /// Parse and validate a configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: HostConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Reject values the host cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.frame_period_ms == 0 {
            return Err(Error::Config("frame_period_ms must be greater than zero".to_string()));
        }
        if self.banks.is_empty() {
            return Err(Error::Config("at least one bank must be listed".to_string()));
        }
        if self.banks.iter().any(|b| b.trim().is_empty()) {
            return Err(Error::Config("bank names must not be empty".to_string()));
        }
        if self.language.trim().is_empty() {
            return Err(Error::Config("language must not be empty".to_string()));
        }
        if self.engine.sample_rate == 0 || self.engine.samples_per_frame == 0 {
            return Err(Error::Config(
                "sample_rate and samples_per_frame must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load the host configuration
///
/// An explicit path must exist. Without one, the platform config file
/// (`<config dir>/cwae/config.toml`) is used when present, otherwise the
/// compiled defaults.
pub fn load_host_config(explicit: Option<&Path>) -> Result<HostConfig> {
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(Error::NotFound(format!("config file {}", path.display())));
        }
        info!("Loading configuration from {}", path.display());
        return HostConfig::from_file(path);
    }

    match default_config_path() {
        Some(path) if path.exists() => {
            info!("Loading configuration from {}", path.display());
            HostConfig::from_file(&path)
        }
        _ => {
            debug!("No config file found, using compiled defaults");
            Ok(HostConfig::default())
        }
    }
}

/// Platform configuration file location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("cwae").join("config.toml"))
}

/// Bank root resolution, in priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. Value from the TOML config file
/// 4. Compiled default (fallback)
pub fn resolve_bank_root(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    config_value: Option<&Path>,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = config_value {
        return path.to_path_buf();
    }

    PathBuf::from(DEFAULT_BANK_ROOT)
}
