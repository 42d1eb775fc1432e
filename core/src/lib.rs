use std::path::PathBuf;

use anyhow::Context;

pub mod commands;
pub mod config;
pub mod controller;
pub mod display;
pub mod error;
pub mod export;
pub mod gateway;
pub mod history;
pub mod network;
pub mod scheduler;
pub mod state;
pub mod store;
pub mod validate;

#[cfg(test)]
pub(crate) mod testing;

pub use commands::Command;
pub use config::DashboardConfig;
pub use controller::{PollIntervals, SubmitReceipt, TransactionController};
pub use error::{SubmitStage, WalletError};
pub use gateway::{ContractGateway, GatewayError, PriceSource, WalletGateway};
pub use history::{SortOrder, TransactionQuery, TransactionStats};
pub use network::{CoinGeckoClient, Provider, ProviderConfig, RpcClient, RpcContractGateway, RpcWalletGateway};
pub use state::{PriceQuote, SessionSnapshot, SubmissionState, Theme, TransactionRecord};
pub use store::SettingsStore;
pub use validate::{DraftTransaction, Field, Validation};

/// XDG-compliant data directory for the settings database and config file.
/// Linux: `~/.local/share/flashet/`, macOS: `~/Library/Application Support/flashet/`
pub fn data_dir() -> anyhow::Result<PathBuf> {
    let dir = dirs::data_dir()
        .context("Cannot determine data directory")?
        .join("flashet");
    Ok(dir)
}
