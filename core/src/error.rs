//! Domain error type for dashboard operations.

use std::fmt;

use thiserror::Error;

use crate::gateway::GatewayError;
use crate::validate::FieldErrors;

/// Which leg of the two-step submission failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitStage {
    /// The raw value transfer through the wallet provider.
    Transfer,
    /// The contract write that records message and keyword.
    Record,
}

impl fmt::Display for SubmitStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transfer => write!(f, "transfer"),
            Self::Record => write!(f, "record"),
        }
    }
}

/// Typed error enum for controller operations, allowing callers to match on
/// specific failure modes instead of inspecting opaque `anyhow::Error` messages.
#[derive(Debug, Error)]
pub enum WalletError {
    /// No wallet provider is reachable.
    #[error("No wallet provider found. Start your wallet or pass --provider-url.")]
    NoProvider,

    /// The user declined a wallet prompt.
    #[error("Request rejected in the wallet.")]
    UserRejected,

    /// Balance, transaction list or price could not be read.
    #[error("{0}")]
    NetworkRead(String),

    /// Either leg of a submission failed. When the record leg fails the
    /// transfer already went through and its hash is kept for reconciliation.
    #[error("Transaction failed during {stage}: {message}")]
    TransactionFailed {
        stage: SubmitStage,
        message: String,
        transfer_hash: Option<String>,
    },

    /// Draft did not pass validation. Never reaches the network.
    #[error("Invalid transaction: {0}")]
    Validation(FieldErrors),

    /// An operation needs a connected account.
    #[error("No wallet connected. Run 'connect' first.")]
    NotConnected,

    /// Another submission is still awaiting confirmation.
    #[error("A transaction is already being submitted.")]
    SubmissionInProgress,

    /// Invalid controller state or configuration.
    #[error("{0}")]
    InvalidState(String),

    /// Settings store (SQLite) error.
    #[error("{0}")]
    Storage(String),

    /// Unexpected error from internal subsystems.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl WalletError {
    /// Map a gateway failure on a read path. Provider absence and rejection
    /// keep their own kinds; everything else is a read failure.
    pub(crate) fn from_read(context: &str, err: GatewayError) -> Self {
        match err {
            GatewayError::NoProvider => Self::NoProvider,
            GatewayError::UserRejected => Self::UserRejected,
            other => Self::NetworkRead(format!("{context}: {other}")),
        }
    }

    pub(crate) fn transaction_failed(
        stage: SubmitStage,
        err: GatewayError,
        transfer_hash: Option<String>,
    ) -> Self {
        Self::TransactionFailed {
            stage,
            message: err.to_string(),
            transfer_hash,
        }
    }
}

impl From<rusqlite::Error> for WalletError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

/// Alias for `std::result::Result<T, WalletError>`.
pub type Result<T> = std::result::Result<T, WalletError>;
