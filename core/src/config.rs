use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::controller::PollIntervals;
use crate::network::{ProviderConfig, COINGECKO_API_URL, DEFAULT_ASSET_ID};

/// Dashboard settings stored as JSON. Every field is optional in the file.
///
/// Path: `data_dir()/config.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub provider: ProviderConfig,
    /// Address of the transfer ledger contract.
    pub contract_address: Option<String>,
    pub price_api_url: String,
    pub price_asset_id: String,
    pub balance_refresh_secs: u64,
    pub price_refresh_secs: u64,
    pub account_poll_secs: u64,
    pub confirmation_poll_secs: u64,
    pub confirmation_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            contract_address: None,
            price_api_url: COINGECKO_API_URL.to_string(),
            price_asset_id: DEFAULT_ASSET_ID.to_string(),
            balance_refresh_secs: 30,
            price_refresh_secs: 60,
            account_poll_secs: 2,
            confirmation_poll_secs: 2,
            confirmation_timeout_secs: 300,
            request_timeout_secs: 15,
        }
    }
}

impl DashboardConfig {
    pub fn default_path() -> Result<PathBuf> {
        Ok(crate::data_dir()?.join("config.json"))
    }

    /// Read the config file, falling back to defaults when it does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&data).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
    }

    pub fn intervals(&self) -> PollIntervals {
        PollIntervals {
            balance: secs(self.balance_refresh_secs),
            price: secs(self.price_refresh_secs),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        secs(self.request_timeout_secs)
    }

    pub fn account_poll_interval(&self) -> Duration {
        secs(self.account_poll_secs)
    }

    pub fn confirmation_poll_interval(&self) -> Duration {
        secs(self.confirmation_poll_secs)
    }

    pub fn confirmation_timeout(&self) -> Duration {
        secs(self.confirmation_timeout_secs)
    }
}

// Zero would make tokio intervals panic.
fn secs(value: u64) -> Duration {
    Duration::from_secs(value.max(1))
}
