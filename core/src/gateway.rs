/// Gateway abstractions that isolate the controller from the wallet provider,
/// the ledger contract and the price API.
///
/// Every method is a single request/response with no retry layered on top;
/// failures reach the controller verbatim, tagged by [`GatewayError`] kind.
use async_trait::async_trait;
use ethers::types::U256;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::network::MarketData;
use crate::state::PriceQuote;

/// Gas limit for a plain value transfer.
pub const TRANSFER_GAS: u64 = 21_000;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum GatewayError {
    /// The provider endpoint is absent or unreachable.
    #[error("wallet provider not available")]
    NoProvider,

    /// EIP-1193 code 4001: the user declined the prompt.
    #[error("user rejected the request")]
    UserRejected,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("timed out: {0}")]
    Timeout(String),
}

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// Parameters of an `eth_sendTransaction` value transfer.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferRequest {
    pub from: String,
    pub to: String,
    pub gas: u64,
    pub value_wei: U256,
}

/// One entry as returned by `getAllTransactions()`, before conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTransfer {
    pub sender: String,
    pub receiver: String,
    pub amount: U256,
    pub message: String,
    pub timestamp: U256,
    pub keyword: String,
}

/// Handle to a submitted contract write, awaitable through
/// [`ContractGateway::wait_for_confirmation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingWrite {
    pub tx_hash: String,
}

/// Narrow view of the injected wallet provider.
#[async_trait]
pub trait WalletGateway: Send + Sync {
    /// Accounts already authorized, without prompting (`eth_accounts`).
    async fn get_accounts(&self) -> GatewayResult<Vec<String>>;

    /// Prompt the user to authorize accounts (`eth_requestAccounts`).
    async fn request_accounts(&self) -> GatewayResult<Vec<String>>;

    /// Native balance of `address` in wei.
    async fn get_balance(&self, address: &str) -> GatewayResult<U256>;

    /// Submit a raw value transfer and return its hash.
    async fn send_transfer(&self, request: &TransferRequest) -> GatewayResult<String>;

    /// Stream of account lists pushed whenever the authorized accounts change.
    /// The stream ends when the receiver is dropped.
    async fn subscribe_accounts(&self) -> GatewayResult<mpsc::Receiver<Vec<String>>>;
}

/// Narrow view of the transfer-ledger contract.
#[async_trait]
pub trait ContractGateway: Send + Sync {
    async fn get_all_transactions(&self) -> GatewayResult<Vec<RawTransfer>>;

    /// Record a transfer on the contract, sent from `from`.
    async fn add_to_blockchain(
        &self,
        from: &str,
        to: &str,
        amount_wei: U256,
        message: &str,
        keyword: &str,
    ) -> GatewayResult<PendingWrite>;

    /// Resolve once the write is mined; errors if it reverted.
    async fn wait_for_confirmation(&self, pending: &PendingWrite) -> GatewayResult<()>;

    async fn get_transaction_count(&self) -> GatewayResult<u64>;
}

/// Source of the ETH/USD quote.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch_quote(&self) -> GatewayResult<PriceQuote>;

    /// Extended market figures. Sources without them return `Ok(None)`.
    async fn market_data(&self) -> GatewayResult<Option<MarketData>> {
        Ok(None)
    }
}
