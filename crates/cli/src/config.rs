//! Tool configuration — persisted as JSON.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Global configuration.  Command-line flags and environment variables
/// override these values per invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    #[serde(default = "default_swap_config")]
    pub swap_config: PathBuf,
}

fn default_cache_dir() -> PathBuf {
    model_cache::default_cache_dir()
}

fn default_swap_config() -> PathBuf {
    PathBuf::from("/etc/llama-swap/config.yaml")
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            swap_config: default_swap_config(),
        }
    }
}

impl AppConfig {
    /// Platform config directory: `~/.config/llm-tools/`
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("llm-tools")
    }

    fn config_file() -> PathBuf {
        Self::config_dir().join("config.json")
    }

    /// Load from disk, or return defaults if the file doesn't exist.
    pub fn load_or_default() -> anyhow::Result<Self> {
        let path = Self::config_file();
        if path.exists() {
            let data = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&data)?)
        } else {
            Ok(Self::default())
        }
    }

    /// Persist to disk.
    pub fn save(&self) -> anyhow::Result<()> {
        let dir = Self::config_dir();
        std::fs::create_dir_all(&dir)?;
        let data = serde_json::to_string_pretty(self)?;
        std::fs::write(Self::config_file(), data)?;
        Ok(())
    }
}
