//! Configuration for the context window manager.

use eyre::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration surface enumerated in spec.md §6 ("Context: ...").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Hard token ceiling for the window, including the response reservation.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Tokens reserved for the model's next response; not available to stored items.
    #[serde(default = "default_reserved")]
    pub reserved_for_response: u32,

    /// Usage fraction at which `is_warning` becomes true.
    #[serde(default = "default_warning_threshold")]
    pub warning_threshold: f64,

    /// Usage fraction at which `is_critical` becomes true and auto-compression fires.
    #[serde(default = "default_critical_threshold")]
    pub critical_threshold: f64,

    /// Whether to trigger compression automatically when the critical threshold is crossed.
    #[serde(default = "default_true")]
    pub auto_compress: bool,

    /// Target usage fraction for compression to bring the window down to.
    #[serde(default = "default_compression_target")]
    pub compression_target: f64,

    /// Floor on the number of items the compressor will never go below.
    #[serde(default = "default_min_items")]
    pub min_items_to_keep: usize,

    /// Whether to persist snapshots to `persistence_path`.
    #[serde(default)]
    pub persistence_enabled: bool,

    /// Snapshot file path, relative to the config directory.
    #[serde(default = "default_persistence_path")]
    pub persistence_path: PathBuf,

    /// Half-life, in hours, for the recency factor's exponential decay.
    #[serde(default = "default_recency_half_life_hours")]
    pub recency_half_life_hours: f64,
}

fn default_max_tokens() -> u32 {
    100_000
}
fn default_reserved() -> u32 {
    4_096
}
fn default_warning_threshold() -> f64 {
    0.75
}
fn default_critical_threshold() -> f64 {
    0.90
}
fn default_true() -> bool {
    true
}
fn default_compression_target() -> f64 {
    0.60
}
fn default_min_items() -> usize {
    5
}
fn default_persistence_path() -> PathBuf {
    PathBuf::from("context_snapshot.json")
}
fn default_recency_half_life_hours() -> f64 {
    2.0
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            reserved_for_response: default_reserved(),
            warning_threshold: default_warning_threshold(),
            critical_threshold: default_critical_threshold(),
            auto_compress: default_true(),
            compression_target: default_compression_target(),
            min_items_to_keep: default_min_items(),
            persistence_enabled: false,
            persistence_path: default_persistence_path(),
            recency_half_life_hours: default_recency_half_life_hours(),
        }
    }
}

impl Config {
    /// Load config from an explicit path, or fall back to defaults.
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        if let Some(config_path) = path {
            let content = std::fs::read_to_string(config_path)?;
            let config: Config = serde_yaml::from_str(&content)?;
            return Ok(config);
        }

        let default_paths = [
            dirs::config_dir().map(|p| p.join("ralph").join("context.yml")),
            Some(PathBuf::from("context.yml")),
        ];

        for path in default_paths.iter().flatten() {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let config: Config = serde_yaml::from_str(&content)?;
                return Ok(config);
            }
        }

        Ok(Config::default())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Tokens at which auto-compression should fire: `max_tokens * critical_threshold`.
    pub fn critical_token_mark(&self) -> u32 {
        (self.max_tokens as f64 * self.critical_threshold) as u32
    }

    /// Target token count for a compression pass: `max_tokens * compression_target`.
    pub fn target_tokens(&self) -> u32 {
        (self.max_tokens as f64 * self.compression_target) as u32
    }
}
