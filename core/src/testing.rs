//! In-memory gateway fakes for controller and command tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ethers::types::U256;
use tokio::sync::{mpsc, Notify};

use crate::gateway::{
    ContractGateway, GatewayError, GatewayResult, PendingWrite, PriceSource, RawTransfer,
    TransferRequest, WalletGateway,
};
use crate::network::MarketData;
use crate::state::PriceQuote;

pub const ALICE: &str = "0xAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";
pub const BOB: &str = "0xBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBB";
pub const ONE_ETH: u128 = 1_000_000_000_000_000_000;

#[derive(Default)]
pub struct FakeWallet {
    pub accounts: Mutex<Vec<String>>,
    pub accounts_error: Mutex<Option<GatewayError>>,
    pub request_result: Mutex<Option<GatewayResult<Vec<String>>>>,
    pub balance: Mutex<U256>,
    pub balance_error: Mutex<Option<GatewayError>>,
    /// When set, `get_balance` waits for a permit before answering.
    pub balance_gate: Mutex<Option<Arc<Notify>>>,
    pub transfer_error: Mutex<Option<GatewayError>>,
    pub transfers: Mutex<Vec<TransferRequest>>,
    pub account_events: Mutex<Option<mpsc::Sender<Vec<String>>>>,
    pub get_accounts_calls: AtomicUsize,
    pub request_calls: AtomicUsize,
    pub balance_calls: AtomicUsize,
    pub transfer_calls: AtomicUsize,
}

impl FakeWallet {
    pub fn with_account(account: &str) -> Self {
        let wallet = Self::default();
        *wallet.accounts.lock().unwrap() = vec![account.to_string()];
        *wallet.balance.lock().unwrap() = U256::from(2 * ONE_ETH);
        wallet
    }

    pub fn total_calls(&self) -> usize {
        self.get_accounts_calls.load(Ordering::SeqCst)
            + self.request_calls.load(Ordering::SeqCst)
            + self.balance_calls.load(Ordering::SeqCst)
            + self.transfer_calls.load(Ordering::SeqCst)
    }

    pub async fn push_accounts(&self, accounts: &[&str]) {
        let sender = self.account_events.lock().unwrap().clone();
        if let Some(sender) = sender {
            let list = accounts.iter().map(|a| a.to_string()).collect();
            sender.send(list).await.unwrap();
        }
    }
}

#[async_trait]
impl WalletGateway for FakeWallet {
    async fn get_accounts(&self) -> GatewayResult<Vec<String>> {
        self.get_accounts_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.accounts_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(self.accounts.lock().unwrap().clone())
    }

    async fn request_accounts(&self) -> GatewayResult<Vec<String>> {
        self.request_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(result) = self.request_result.lock().unwrap().clone() {
            return result;
        }
        Ok(self.accounts.lock().unwrap().clone())
    }

    async fn get_balance(&self, _address: &str) -> GatewayResult<U256> {
        self.balance_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.balance_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if let Some(err) = self.balance_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(*self.balance.lock().unwrap())
    }

    async fn send_transfer(&self, request: &TransferRequest) -> GatewayResult<String> {
        self.transfer_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.transfer_error.lock().unwrap().clone() {
            return Err(err);
        }
        self.transfers.lock().unwrap().push(request.clone());
        Ok(format!("0x{:064x}", self.transfer_calls.load(Ordering::SeqCst)))
    }

    async fn subscribe_accounts(&self) -> GatewayResult<mpsc::Receiver<Vec<String>>> {
        let (tx, rx) = mpsc::channel(8);
        *self.account_events.lock().unwrap() = Some(tx);
        Ok(rx)
    }
}

#[derive(Default)]
pub struct FakeContract {
    pub transfers: Mutex<Vec<RawTransfer>>,
    pub list_error: Mutex<Option<GatewayError>>,
    pub write_error: Mutex<Option<GatewayError>>,
    pub confirm_error: Mutex<Option<GatewayError>>,
    /// When set, `wait_for_confirmation` waits for a permit.
    pub confirm_gate: Mutex<Option<Arc<Notify>>>,
    pub count: Mutex<u64>,
    pub count_error: Mutex<Option<GatewayError>>,
    pub writes: Mutex<Vec<(String, String, U256, String, String)>>,
    pub list_calls: AtomicUsize,
    pub write_calls: AtomicUsize,
    pub confirm_calls: AtomicUsize,
    pub count_calls: AtomicUsize,
}

impl FakeContract {
    pub fn with_timestamps(timestamps: &[u64]) -> Self {
        let contract = Self::default();
        *contract.transfers.lock().unwrap() = timestamps
            .iter()
            .map(|ts| raw_transfer(ALICE, BOB, ONE_ETH / 10, *ts))
            .collect();
        *contract.count.lock().unwrap() = timestamps.len() as u64;
        contract
    }

    pub fn total_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
            + self.write_calls.load(Ordering::SeqCst)
            + self.confirm_calls.load(Ordering::SeqCst)
            + self.count_calls.load(Ordering::SeqCst)
    }
}

pub fn raw_transfer(from: &str, to: &str, amount_wei: u128, timestamp: u64) -> RawTransfer {
    RawTransfer {
        sender: from.to_string(),
        receiver: to.to_string(),
        amount: U256::from(amount_wei),
        message: format!("message at {timestamp}"),
        timestamp: U256::from(timestamp),
        keyword: "kw".to_string(),
    }
}

#[async_trait]
impl ContractGateway for FakeContract {
    async fn get_all_transactions(&self) -> GatewayResult<Vec<RawTransfer>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.list_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(self.transfers.lock().unwrap().clone())
    }

    async fn add_to_blockchain(
        &self,
        from: &str,
        to: &str,
        amount_wei: U256,
        message: &str,
        keyword: &str,
    ) -> GatewayResult<PendingWrite> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.write_error.lock().unwrap().clone() {
            return Err(err);
        }
        self.writes.lock().unwrap().push((
            from.to_string(),
            to.to_string(),
            amount_wei,
            message.to_string(),
            keyword.to_string(),
        ));
        Ok(PendingWrite {
            tx_hash: "0xrecord".to_string(),
        })
    }

    async fn wait_for_confirmation(&self, _pending: &PendingWrite) -> GatewayResult<()> {
        self.confirm_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.confirm_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if let Some(err) = self.confirm_error.lock().unwrap().clone() {
            return Err(err);
        }
        // Confirmed writes land in the ledger.
        let write = self.writes.lock().unwrap().last().cloned();
        if let Some((from, to, amount, message, keyword)) = write {
            let mut transfers = self.transfers.lock().unwrap();
            let timestamp = transfers.len() as u64 + 1_000;
            transfers.push(RawTransfer {
                sender: from,
                receiver: to,
                amount,
                message,
                timestamp: U256::from(timestamp),
                keyword,
            });
            *self.count.lock().unwrap() += 1;
        }
        Ok(())
    }

    async fn get_transaction_count(&self) -> GatewayResult<u64> {
        self.count_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.count_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(*self.count.lock().unwrap())
    }
}

#[derive(Default)]
pub struct FakePrice {
    pub quote: Mutex<Option<PriceQuote>>,
    pub market: Mutex<Option<MarketData>>,
    pub calls: AtomicUsize,
}

impl FakePrice {
    pub fn at(usd: f64, change_24h: f64) -> Self {
        let price = Self::default();
        *price.quote.lock().unwrap() = Some(PriceQuote { usd, change_24h });
        price
    }

    pub fn failing() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PriceSource for FakePrice {
    async fn fetch_quote(&self) -> GatewayResult<PriceQuote> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (*self.quote.lock().unwrap())
            .ok_or_else(|| GatewayError::Transport("price API unreachable".into()))
    }

    async fn market_data(&self) -> GatewayResult<Option<MarketData>> {
        Ok(self.market.lock().unwrap().clone())
    }
}
