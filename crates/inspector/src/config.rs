//! Inspector configuration, persisted as JSON.

use std::path::{Path, PathBuf};

use jubatus_model::{BatchMode, InspectOptions, MagicPolicy};
use serde::{Deserialize, Serialize};

use crate::cli::GlobalArgs;

/// Global configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// `strict` rejects files without the Jubatus magic.
    #[serde(default)]
    pub magic_policy: MagicPolicy,
    /// `fail_fast` aborts on the first bad file.
    #[serde(default)]
    pub batch_mode: BatchMode,
}

impl AppConfig {
    /// Platform config directory: `~/.config/jubamodel/`
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("jubamodel")
    }

    fn config_file() -> PathBuf {
        Self::config_dir().join("config.json")
    }

    /// Load from disk, or return defaults if the file doesn't exist.
    pub fn load_or_default() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_file())
    }

    /// Persist to disk.
    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_file())
    }

    fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let data = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&data)?)
        } else {
            Ok(Self::default())
        }
    }

    fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let data = serde_json::to_string_pretty(self)?;
        std::fs::write(path, data)?;
        Ok(())
    }

    /// Apply a `config set` pair.
    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        let quoted = serde_json::Value::String(value.to_string());
        match key {
            "magic_policy" => self.magic_policy = serde_json::from_value(quoted)?,
            "batch_mode" => self.batch_mode = serde_json::from_value(quoted)?,
            _ => anyhow::bail!("Unknown config key: {key}"),
        }
        Ok(())
    }

    /// Inspection options: command-line flags win over the file.
    pub fn inspect_options(&self, global: &GlobalArgs) -> InspectOptions {
        InspectOptions {
            magic: if global.permissive {
                MagicPolicy::Permissive
            } else {
                self.magic_policy
            },
            batch: if global.best_effort {
                BatchMode::BestEffort
            } else {
                self.batch_mode
            },
        }
    }
}
