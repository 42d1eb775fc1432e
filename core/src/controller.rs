//! Transaction state controller: the single owner of wallet-session state.
//!
//! All reads and writes to the wallet provider and the ledger contract go
//! through here. State changes are committed under a short lock and then
//! published to subscribers as a [`SessionSnapshot`].
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::sync::watch;

use crate::display;
use crate::error::{Result, SubmitStage, WalletError};
use crate::gateway::{
    ContractGateway, GatewayError, PriceSource, TransferRequest, WalletGateway, TRANSFER_GAS,
};
use crate::history::{self, TransactionQuery, TransactionStats};
use crate::network::MarketData;
use crate::scheduler::TaskSet;
use crate::state::{PriceQuote, SessionSnapshot, SubmissionState, Theme, TransactionRecord};
use crate::store::SettingsStore;
use crate::validate::{self, DraftTransaction, Field};

pub type SubscriptionId = u64;

type Listener = Arc<dyn Fn(&SessionSnapshot) + Send + Sync>;

/// Refresh cadence for the background pollers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollIntervals {
    pub balance: Duration,
    pub price: Duration,
}

impl Default for PollIntervals {
    fn default() -> Self {
        Self {
            balance: Duration::from_secs(30),
            price: Duration::from_secs(60),
        }
    }
}

/// Hashes of both legs of a completed submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitReceipt {
    pub transfer_hash: String,
    pub record_hash: String,
}

struct Session {
    snapshot: SessionSnapshot,
    /// Bumped on every account transition; refresh results from an older
    /// epoch are dropped.
    epoch: u64,
}

pub struct TransactionController {
    wallet: Arc<dyn WalletGateway>,
    contract: Arc<dyn ContractGateway>,
    price: Arc<dyn PriceSource>,
    store: Option<Mutex<SettingsStore>>,
    session: Mutex<Session>,
    listeners: Mutex<Vec<(SubscriptionId, Listener)>>,
    next_listener: AtomicU64,
    account_tx: watch::Sender<Option<String>>,
    intervals: PollIntervals,
    tasks: TaskSet,
    started: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl TransactionController {
    pub fn new(
        wallet: Arc<dyn WalletGateway>,
        contract: Arc<dyn ContractGateway>,
        price: Arc<dyn PriceSource>,
    ) -> Self {
        let (account_tx, _) = watch::channel(None);
        Self {
            wallet,
            contract,
            price,
            store: None,
            session: Mutex::new(Session {
                snapshot: SessionSnapshot::default(),
                epoch: 0,
            }),
            listeners: Mutex::new(Vec::new()),
            next_listener: AtomicU64::new(1),
            account_tx,
            intervals: PollIntervals::default(),
            tasks: TaskSet::new(),
            started: AtomicBool::new(false),
        }
    }

    /// Attach persisted settings. The stored theme and last known transaction
    /// count are loaded immediately.
    pub fn with_store(mut self, store: SettingsStore) -> Self {
        {
            let session = self
                .session
                .get_mut()
                .unwrap_or_else(PoisonError::into_inner);
            match store.theme() {
                Ok(theme) => session.snapshot.theme = theme,
                Err(e) => log::warn!("failed to read theme: {e:#}"),
            }
            match store.transaction_count() {
                Ok(count) => session.snapshot.transaction_count = count,
                Err(e) => log::warn!("failed to read transaction count: {e:#}"),
            }
        }
        self.store = Some(Mutex::new(store));
        self
    }

    pub fn with_intervals(mut self, intervals: PollIntervals) -> Self {
        self.intervals = intervals;
        self
    }

    // -- State access --

    pub fn snapshot(&self) -> SessionSnapshot {
        lock(&self.session).snapshot.clone()
    }

    pub fn account(&self) -> Option<String> {
        lock(&self.session).snapshot.account.clone()
    }

    pub fn draft(&self) -> DraftTransaction {
        lock(&self.session).snapshot.draft.clone()
    }

    pub fn theme(&self) -> Theme {
        lock(&self.session).snapshot.theme
    }

    /// Filtered and sorted view of the current transaction list.
    pub fn transactions(&self, query: &TransactionQuery) -> Vec<TransactionRecord> {
        query.apply(&lock(&self.session).snapshot.transactions)
    }

    pub fn stats(&self) -> TransactionStats {
        let session = lock(&self.session);
        let snapshot = &session.snapshot;
        TransactionStats::compute(
            &snapshot.transactions,
            snapshot.account.as_deref(),
            &snapshot.price,
        )
    }

    // -- Subscriptions --

    /// Register a listener called after every committed state change.
    /// Listeners run on the caller's task, outside the state lock.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&SessionSnapshot) + Send + Sync + 'static,
    {
        let id = self.next_listener.fetch_add(1, Ordering::Relaxed);
        lock(&self.listeners).push((id, Arc::new(listener)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = lock(&self.listeners);
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    /// Apply `change` under the lock, then notify listeners with the result.
    fn commit<R>(&self, change: impl FnOnce(&mut Session) -> R) -> R {
        let (result, snapshot) = {
            let mut session = lock(&self.session);
            let result = change(&mut session);
            (result, session.snapshot.clone())
        };
        self.notify(&snapshot);
        result
    }

    fn notify(&self, snapshot: &SessionSnapshot) {
        let listeners: Vec<Listener> = lock(&self.listeners)
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            listener(snapshot);
        }
    }

    fn current_account(&self) -> Option<(String, u64)> {
        let session = lock(&self.session);
        session
            .snapshot
            .account
            .clone()
            .map(|account| (account, session.epoch))
    }

    /// Switch the session to `account`, dropping all per-account data.
    fn set_account(&self, account: Option<String>) {
        self.commit(|session| {
            let snapshot = &mut session.snapshot;
            if snapshot.account != account {
                session.epoch += 1;
                snapshot.balance = "0".to_string();
                snapshot.transactions.clear();
            }
            snapshot.account = account.clone();
        });
        self.account_tx.send_replace(account);
    }

    // -- Connection lifecycle --

    /// Prompt the wallet for accounts and adopt the first one.
    pub async fn connect(&self) -> Result<String> {
        let accounts = self.wallet.request_accounts().await.map_err(|e| {
            if !matches!(e, GatewayError::NoProvider | GatewayError::UserRejected) {
                log::warn!("connect failed: {e}");
            }
            WalletError::from_read("Failed to connect", e)
        })?;
        let account = accounts
            .into_iter()
            .next()
            .ok_or(WalletError::UserRejected)?;

        log::info!("connected {account}");
        self.set_account(Some(account.clone()));
        if let Err(e) = self.refresh().await {
            log::warn!("refresh after connect failed: {e}");
        }
        Ok(account)
    }

    /// Local-only reset. The wallet protocol has no revoke call.
    pub fn disconnect(&self) {
        if self.account().is_some() {
            log::info!("disconnected");
        }
        self.set_account(None);
    }

    /// Restore a previous session without prompting, then load the ledger
    /// count and the first price quote.
    pub async fn initialize(&self) -> Result<Option<String>> {
        self.refresh_price().await;
        match self.refresh_transaction_count().await {
            Ok(_) | Err(WalletError::NoProvider) => {}
            Err(e) => log::warn!("{e}"),
        }

        let accounts = self
            .wallet
            .get_accounts()
            .await
            .map_err(|e| WalletError::from_read("Failed to read accounts", e))?;
        let Some(account) = accounts.into_iter().next() else {
            return Ok(None);
        };
        log::info!("restored session for {account}");
        self.set_account(Some(account.clone()));
        if let Err(e) = self.refresh().await {
            log::warn!("refresh after restore failed: {e}");
        }
        Ok(Some(account))
    }

    /// Provider-pushed account change.
    pub async fn handle_accounts_changed(&self, accounts: Vec<String>) {
        match accounts.into_iter().next() {
            Some(account) => {
                log::info!("account changed to {account}");
                self.set_account(Some(account));
                if let Err(e) = self.refresh().await {
                    log::warn!("refresh after account change failed: {e}");
                }
            }
            None => {
                log::info!("wallet locked or disconnected");
                self.disconnect();
            }
        }
    }

    // -- Refresh --

    /// Balance and transaction list, concurrently. Both run even if one fails.
    pub async fn refresh(&self) -> Result<()> {
        let (balance, transactions) =
            futures::join!(self.refresh_balance(), self.refresh_transactions());
        balance.and(transactions)
    }

    /// No-op while disconnected. On failure the previous balance stays.
    pub async fn refresh_balance(&self) -> Result<()> {
        let Some((account, epoch)) = self.current_account() else {
            return Ok(());
        };
        let wei = self.wallet.get_balance(&account).await.map_err(|e| {
            log::warn!("balance read failed: {e}");
            WalletError::from_read("Failed to read balance", e)
        })?;
        let balance = display::wei_to_eth(wei);
        self.commit(|session| {
            if session.epoch == epoch {
                session.snapshot.balance = balance;
            } else {
                log::debug!("dropping stale balance for {account}");
            }
        });
        Ok(())
    }

    /// Replace the transaction list wholesale, newest first. No-op while
    /// disconnected.
    pub async fn refresh_transactions(&self) -> Result<()> {
        let Some((account, epoch)) = self.current_account() else {
            return Ok(());
        };
        let raw = self.contract.get_all_transactions().await.map_err(|e| {
            log::warn!("transaction list read failed: {e}");
            WalletError::from_read("Failed to read transactions", e)
        })?;
        let mut records: Vec<TransactionRecord> =
            raw.into_iter().map(TransactionRecord::from).collect();
        history::sort_newest_first(&mut records);
        self.commit(|session| {
            if session.epoch == epoch {
                session.snapshot.transactions = records;
            } else {
                log::debug!("dropping stale transaction list for {account}");
            }
        });
        Ok(())
    }

    /// Never fails: an unreachable price API yields the zero quote.
    pub async fn refresh_price(&self) -> PriceQuote {
        let quote = match self.price.fetch_quote().await {
            Ok(quote) => quote,
            Err(e) => {
                log::warn!("price fetch failed: {e}");
                PriceQuote::default()
            }
        };
        self.commit(|session| session.snapshot.price = quote);
        quote
    }

    pub async fn refresh_transaction_count(&self) -> Result<u64> {
        let count = self.contract.get_transaction_count().await.map_err(|e| {
            if e != GatewayError::NoProvider {
                log::warn!("transaction count read failed: {e}");
            }
            WalletError::from_read("Failed to read transaction count", e)
        })?;
        self.commit(|session| session.snapshot.transaction_count = Some(count));
        if let Some(store) = &self.store {
            if let Err(e) = lock(store).set_transaction_count(count) {
                log::warn!("failed to persist transaction count: {e:#}");
            }
        }
        Ok(count)
    }

    /// Extended market figures, `None` when unavailable.
    pub async fn market_data(&self) -> Option<MarketData> {
        match self.price.market_data().await {
            Ok(data) => data,
            Err(e) => {
                log::warn!("market data fetch failed: {e}");
                None
            }
        }
    }

    // -- Draft and submission --

    pub fn set_draft_field(&self, field: Field, value: impl Into<String>) {
        let value = value.into();
        self.commit(|session| session.snapshot.draft.set(field, value));
    }

    pub fn clear_draft(&self) {
        self.commit(|session| session.snapshot.draft = DraftTransaction::default());
    }

    /// Submit the controller-owned draft.
    pub async fn submit_draft(&self) -> Result<SubmitReceipt> {
        let draft = self.draft();
        self.submit(&draft).await
    }

    /// Transfer value through the wallet, then record it on the contract and
    /// wait for that write to be mined.
    ///
    /// The two legs are not atomic. If the record leg fails the transfer has
    /// already happened; the error carries its hash and nothing is retried.
    pub async fn submit(&self, draft: &DraftTransaction) -> Result<SubmitReceipt> {
        let validation = validate::validate(draft);
        if !validation.valid {
            return Err(WalletError::Validation(validation.field_errors));
        }
        let account = self.account().ok_or(WalletError::NotConnected)?;
        let value_wei =
            display::parse_eth_amount(&draft.amount).map_err(WalletError::InvalidState)?;

        self.commit(|session| {
            if session.snapshot.submission != SubmissionState::Idle {
                return Err(WalletError::SubmissionInProgress);
            }
            session.snapshot.submission = SubmissionState::AwaitingWalletConfirmation;
            Ok(())
        })?;

        let outcome = self.run_submission(&account, draft, value_wei).await;
        self.commit(|session| {
            session.snapshot.submission = SubmissionState::Idle;
            if outcome.is_ok() {
                session.snapshot.draft = DraftTransaction::default();
            }
        });

        let receipt = outcome.map_err(|e| {
            log::error!("{e}");
            e
        })?;
        log::info!(
            "transfer {} recorded in {}",
            receipt.transfer_hash,
            receipt.record_hash
        );

        if let Err(e) = self.refresh_transaction_count().await {
            log::warn!("{e}");
        }
        if let Err(e) = self.refresh().await {
            log::warn!("refresh after submit failed: {e}");
        }
        Ok(receipt)
    }

    async fn run_submission(
        &self,
        account: &str,
        draft: &DraftTransaction,
        value_wei: ethers::types::U256,
    ) -> Result<SubmitReceipt> {
        let to = draft.address_to.trim();
        let request = TransferRequest {
            from: account.to_string(),
            to: to.to_string(),
            gas: TRANSFER_GAS,
            value_wei,
        };
        let transfer_hash = self
            .wallet
            .send_transfer(&request)
            .await
            .map_err(|e| WalletError::transaction_failed(SubmitStage::Transfer, e, None))?;

        let record_failed = |e: GatewayError| {
            WalletError::transaction_failed(SubmitStage::Record, e, Some(transfer_hash.clone()))
        };
        let pending = self
            .contract
            .add_to_blockchain(
                account,
                to,
                value_wei,
                draft.message.trim(),
                draft.keyword.trim(),
            )
            .await
            .map_err(record_failed)?;

        self.commit(|session| {
            session.snapshot.submission = SubmissionState::AwaitingChainConfirmation;
        });
        self.contract
            .wait_for_confirmation(&pending)
            .await
            .map_err(record_failed)?;

        Ok(SubmitReceipt {
            transfer_hash: transfer_hash.clone(),
            record_hash: pending.tx_hash,
        })
    }

    // -- Preferences --

    pub fn set_theme(&self, theme: Theme) -> Result<()> {
        if let Some(store) = &self.store {
            lock(store)
                .set_theme(theme)
                .map_err(|e| WalletError::Storage(format!("{e:#}")))?;
        }
        self.commit(|session| session.snapshot.theme = theme);
        Ok(())
    }

    pub fn toggle_theme(&self) -> Result<Theme> {
        let theme = self.theme().toggle();
        self.set_theme(theme)?;
        Ok(theme)
    }

    // -- Background tasks --

    /// Spawn the price poller, the balance poller and the account-change
    /// listener. Calling this more than once has no effect.
    pub fn start(self: &Arc<Self>) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }

        let weak = Arc::downgrade(self);
        self.tasks
            .spawn_periodic("price", self.intervals.price, move || {
                let weak = Weak::clone(&weak);
                async move {
                    match weak.upgrade() {
                        Some(controller) => {
                            controller.refresh_price().await;
                            true
                        }
                        None => false,
                    }
                }
            });

        self.tasks.spawn(balance_poller(
            Arc::downgrade(self),
            self.account_tx.subscribe(),
            self.tasks.shutdown_signal(),
            self.intervals.balance,
        ));

        self.tasks.spawn(account_listener(
            Arc::downgrade(self),
            Arc::clone(&self.wallet),
            self.tasks.shutdown_signal(),
        ));
    }

    /// Stop and join all background tasks.
    pub async fn shutdown(&self) {
        self.tasks.shutdown().await;
    }
}

/// Refresh the balance every `period` while an account is set. The interval
/// restarts whenever the account changes.
async fn balance_poller(
    controller: Weak<TransactionController>,
    mut account_rx: watch::Receiver<Option<String>>,
    mut shutdown: watch::Receiver<bool>,
    period: Duration,
) {
    loop {
        let connected = account_rx.borrow_and_update().is_some();
        if connected {
            let mut ticker =
                tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let Some(controller) = controller.upgrade() else { return };
                        if let Err(e) = controller.refresh_balance().await {
                            log::debug!("balance poll failed: {e}");
                        }
                    }
                    changed = account_rx.changed() => {
                        if changed.is_err() {
                            return;
                        }
                        break;
                    }
                    _ = shutdown.changed() => return,
                }
            }
        } else {
            tokio::select! {
                changed = account_rx.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
                _ = shutdown.changed() => return,
            }
        }
    }
}

async fn account_listener(
    controller: Weak<TransactionController>,
    wallet: Arc<dyn WalletGateway>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut events = match wallet.subscribe_accounts().await {
        Ok(events) => events,
        Err(e) => {
            log::warn!("account change subscription unavailable: {e}");
            return;
        }
    };
    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(accounts) = event else { return };
                let Some(controller) = controller.upgrade() else { return };
                controller.handle_accounts_changed(accounts).await;
            }
            _ = shutdown.changed() => return,
        }
    }
}
