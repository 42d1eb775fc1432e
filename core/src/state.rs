/// Session data owned by the controller and handed out as snapshots.
use std::fmt;
use std::str::FromStr;

use ethers::types::U256;
use serde::{Deserialize, Serialize};

use crate::display;
use crate::gateway::RawTransfer;
use crate::validate::DraftTransaction;

/// One ledger entry, immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    pub from: String,
    pub to: String,
    pub amount_wei: U256,
    pub message: String,
    pub keyword: String,
    /// Unix seconds.
    pub timestamp: u64,
}

impl TransactionRecord {
    pub fn amount_eth(&self) -> f64 {
        display::wei_to_eth_f64(self.amount_wei)
    }
}

impl From<RawTransfer> for TransactionRecord {
    fn from(raw: RawTransfer) -> Self {
        // Contract timestamps are block seconds; anything past u64 is garbage.
        let timestamp = if raw.timestamp > U256::from(u64::MAX) {
            u64::MAX
        } else {
            raw.timestamp.as_u64()
        };
        Self {
            from: raw.sender,
            to: raw.receiver,
            amount_wei: raw.amount,
            message: raw.message,
            keyword: raw.keyword,
            timestamp,
        }
    }
}

/// ETH/USD quote. The zero value stands for "unavailable".
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub usd: f64,
    pub change_24h: f64,
}

impl PriceQuote {
    pub fn value_in_usd(&self, eth: f64) -> f64 {
        eth * self.usd
    }

    pub fn is_available(&self) -> bool {
        self.usd > 0.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionState {
    #[default]
    Idle,
    AwaitingWalletConfirmation,
    AwaitingChainConfirmation,
}

impl fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::AwaitingWalletConfirmation => write!(f, "awaiting wallet confirmation"),
            Self::AwaitingChainConfirmation => write!(f, "awaiting chain confirmation"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn toggle(self) -> Self {
        match self {
            Self::Dark => Self::Light,
            Self::Light => Self::Dark,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dark => "dark",
            Self::Light => "light",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dark" => Ok(Self::Dark),
            "light" => Ok(Self::Light),
            other => Err(format!("Unknown theme '{other}'. Use 'dark' or 'light'.")),
        }
    }
}

/// Read-only copy of the controller state at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub account: Option<String>,
    /// Decimal ETH string; "0" while disconnected.
    pub balance: String,
    /// Newest first.
    pub transactions: Vec<TransactionRecord>,
    pub price: PriceQuote,
    pub submission: SubmissionState,
    pub draft: DraftTransaction,
    pub transaction_count: Option<u64>,
    pub theme: Theme,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            account: None,
            balance: "0".to_string(),
            transactions: Vec::new(),
            price: PriceQuote::default(),
            submission: SubmissionState::Idle,
            draft: DraftTransaction::default(),
            transaction_count: None,
            theme: Theme::default(),
        }
    }
}

impl SessionSnapshot {
    pub fn is_connected(&self) -> bool {
        self.account.is_some()
    }

    pub fn balance_in_usd(&self) -> f64 {
        let eth = self.balance.parse::<f64>().unwrap_or(0.0);
        self.price.value_in_usd(eth)
    }
}
