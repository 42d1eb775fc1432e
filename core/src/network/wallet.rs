use std::time::Duration;

use async_trait::async_trait;
use ethers::types::U256;
use serde_json::json;
use tokio::sync::mpsc;

use super::{parse_quantity, RpcClient};
use crate::display::to_hex_quantity;
use crate::gateway::{GatewayResult, TransferRequest, WalletGateway};

const ACCOUNT_CHANNEL_CAPACITY: usize = 8;

/// Wallet gateway over an EIP-1193 style JSON-RPC endpoint.
///
/// HTTP providers cannot push events, so account changes are detected by
/// polling `eth_accounts` and emitting whenever the list differs.
pub struct RpcWalletGateway {
    rpc: RpcClient,
    account_poll_interval: Duration,
}

impl RpcWalletGateway {
    pub fn new(rpc: RpcClient, account_poll_interval: Duration) -> Self {
        Self {
            rpc,
            account_poll_interval,
        }
    }
}

#[async_trait]
impl WalletGateway for RpcWalletGateway {
    async fn get_accounts(&self) -> GatewayResult<Vec<String>> {
        self.rpc.request("eth_accounts", json!([])).await
    }

    async fn request_accounts(&self) -> GatewayResult<Vec<String>> {
        self.rpc.request("eth_requestAccounts", json!([])).await
    }

    async fn get_balance(&self, address: &str) -> GatewayResult<U256> {
        let hex: String = self
            .rpc
            .request("eth_getBalance", json!([address, "latest"]))
            .await?;
        parse_quantity(&hex)
    }

    async fn send_transfer(&self, request: &TransferRequest) -> GatewayResult<String> {
        self.rpc
            .request(
                "eth_sendTransaction",
                json!([{
                    "from": request.from,
                    "to": request.to,
                    "gas": to_hex_quantity(U256::from(request.gas)),
                    "value": to_hex_quantity(request.value_wei),
                }]),
            )
            .await
    }

    async fn subscribe_accounts(&self) -> GatewayResult<mpsc::Receiver<Vec<String>>> {
        let baseline = self.get_accounts().await?;
        let (tx, rx) = mpsc::channel(ACCOUNT_CHANNEL_CAPACITY);
        let rpc = self.rpc.clone();
        let period = self.account_poll_interval;

        tokio::spawn(async move {
            let mut last = baseline;
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = tx.closed() => break,
                }
                match rpc.request::<Vec<String>>("eth_accounts", json!([])).await {
                    Ok(accounts) if accounts != last => {
                        log::debug!("provider accounts changed: {accounts:?}");
                        last = accounts.clone();
                        if tx.send(accounts).await.is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(e) => log::debug!("account poll failed: {e}"),
                }
            }
        });

        Ok(rx)
    }
}
