use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use ethers::abi::{Abi, Function, Token};
use ethers::types::{Address, Bytes, U256};
use ethers::utils::to_checksum;
use serde_json::json;

use super::{RpcClient, TransactionReceipt};
use crate::gateway::{ContractGateway, GatewayError, GatewayResult, PendingWrite, RawTransfer};

const TRANSACTIONS_ABI: &str = include_str!("../../abi/Transactions.json");

/// Transfer ledger contract reached through the wallet provider.
///
/// Reads go through `eth_call`; writes are sent with `eth_sendTransaction`
/// so the provider signs them with the connected account.
pub struct RpcContractGateway {
    rpc: RpcClient,
    address: Address,
    abi: Abi,
    poll_interval: Duration,
    confirmation_timeout: Duration,
}

impl RpcContractGateway {
    pub fn new(
        rpc: RpcClient,
        address: &str,
        poll_interval: Duration,
        confirmation_timeout: Duration,
    ) -> Result<Self> {
        let address: Address = address
            .parse()
            .with_context(|| format!("Invalid contract address: {address}"))?;
        let abi: Abi = serde_json::from_str(TRANSACTIONS_ABI).context("Malformed contract ABI")?;
        Ok(Self {
            rpc,
            address,
            abi,
            poll_interval,
            confirmation_timeout,
        })
    }

    pub fn address(&self) -> String {
        to_checksum(&self.address, None)
    }

    fn function(&self, name: &str) -> GatewayResult<&Function> {
        self.abi
            .function(name)
            .map_err(|e| GatewayError::Decode(format!("{name}: {e}")))
    }

    async fn call(&self, name: &str) -> GatewayResult<Vec<Token>> {
        let function = self.function(name)?;
        let data = function
            .encode_input(&[])
            .map_err(|e| GatewayError::Decode(format!("{name}: {e}")))?;
        let output: Bytes = self
            .rpc
            .request(
                "eth_call",
                json!([{ "to": self.address, "data": Bytes::from(data) }, "latest"]),
            )
            .await?;
        function
            .decode_output(&output)
            .map_err(|e| GatewayError::Decode(format!("{name}: {e}")))
    }
}

fn decode_transfer(token: Token) -> GatewayResult<RawTransfer> {
    let bad = || GatewayError::Decode("malformed TransferStruct".into());
    let mut fields = token.into_tuple().ok_or_else(bad)?.into_iter();
    let mut next = || fields.next().ok_or_else(bad);

    let sender = next()?.into_address().ok_or_else(bad)?;
    let receiver = next()?.into_address().ok_or_else(bad)?;
    let amount = next()?.into_uint().ok_or_else(bad)?;
    let message = next()?.into_string().ok_or_else(bad)?;
    let timestamp = next()?.into_uint().ok_or_else(bad)?;
    let keyword = next()?.into_string().ok_or_else(bad)?;

    Ok(RawTransfer {
        sender: to_checksum(&sender, None),
        receiver: to_checksum(&receiver, None),
        amount,
        message,
        timestamp,
        keyword,
    })
}

#[async_trait]
impl ContractGateway for RpcContractGateway {
    async fn get_all_transactions(&self) -> GatewayResult<Vec<RawTransfer>> {
        let tokens = self.call("getAllTransactions").await?;
        let list = tokens
            .into_iter()
            .next()
            .and_then(Token::into_array)
            .ok_or_else(|| GatewayError::Decode("getAllTransactions: expected an array".into()))?;
        list.into_iter().map(decode_transfer).collect()
    }

    async fn add_to_blockchain(
        &self,
        from: &str,
        to: &str,
        amount_wei: U256,
        message: &str,
        keyword: &str,
    ) -> GatewayResult<PendingWrite> {
        let receiver: Address = to
            .parse()
            .map_err(|_| GatewayError::Decode(format!("invalid receiver address: {to}")))?;
        let data = self
            .function("addToBlockchain")?
            .encode_input(&[
                Token::Address(receiver),
                Token::Uint(amount_wei),
                Token::String(message.to_string()),
                Token::String(keyword.to_string()),
            ])
            .map_err(|e| GatewayError::Decode(format!("addToBlockchain: {e}")))?;

        let tx_hash: String = self
            .rpc
            .request(
                "eth_sendTransaction",
                json!([{ "from": from, "to": self.address, "data": Bytes::from(data) }]),
            )
            .await?;
        log::info!("ledger write submitted: {tx_hash}");
        Ok(PendingWrite { tx_hash })
    }

    async fn wait_for_confirmation(&self, pending: &PendingWrite) -> GatewayResult<()> {
        let deadline = tokio::time::Instant::now() + self.confirmation_timeout;
        loop {
            let receipt: Option<TransactionReceipt> = self
                .rpc
                .request("eth_getTransactionReceipt", json!([pending.tx_hash]))
                .await?;
            if let Some(receipt) = receipt.filter(|r| r.block_number.is_some()) {
                if receipt.succeeded() {
                    return Ok(());
                }
                return Err(GatewayError::Rpc {
                    code: -32000,
                    message: format!("transaction {} reverted", pending.tx_hash),
                });
            }
            if tokio::time::Instant::now() + self.poll_interval > deadline {
                return Err(GatewayError::Timeout(format!(
                    "no receipt for {} after {:?}",
                    pending.tx_hash, self.confirmation_timeout
                )));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn get_transaction_count(&self) -> GatewayResult<u64> {
        let count = self
            .call("getTransactionCount")
            .await?
            .into_iter()
            .next()
            .and_then(Token::into_uint)
            .ok_or_else(|| GatewayError::Decode("getTransactionCount: expected uint".into()))?;
        if count > U256::from(u64::MAX) {
            return Err(GatewayError::Decode(format!("transaction count overflow: {count}")));
        }
        Ok(count.as_u64())
    }
}
