/*!
 * Engine configuration
 *
 * Loaded from a JSON file; every field has a default so a missing file or a
 * partial file both work.
 */

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use crate::error::AppResult;

/// Operator ids allowed to run admin-only commands when none are configured.
pub const DEFAULT_OPERATOR_IDS: [u64; 2] = [140245257416736769, 79179147875721216];

pub const DEFAULT_DATA_DIR: &str = "command_data";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    pub operator_ids: Vec<u64>,
    pub data_dir: PathBuf,
    pub command_prefix: String,
    pub autosave_delay_secs: u64,
    pub autosave_interval_secs: u64,
    pub denial_retract_secs: u64,
    pub pretty_storage: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            operator_ids: DEFAULT_OPERATOR_IDS.to_vec(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            command_prefix: "!".to_string(),
            autosave_delay_secs: 30,
            autosave_interval_secs: 300, // 5 minutes
            denial_retract_secs: 5,
            pretty_storage: true,
        }
    }
}

impl EngineConfig {
    /// Reads the config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            tracing::info!("config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.command_prefix.trim().is_empty() {
            bail!("commandPrefix must not be empty");
        }
        if self.autosave_interval_secs == 0 {
            bail!("autosaveIntervalSecs must be greater than zero");
        }
        Ok(())
    }

    pub fn autosave_delay(&self) -> Duration {
        Duration::from_secs(self.autosave_delay_secs)
    }

    pub fn autosave_interval(&self) -> Duration {
        Duration::from_secs(self.autosave_interval_secs)
    }

    pub fn denial_retract_delay(&self) -> Duration {
        Duration::from_secs(self.denial_retract_secs)
    }
}
