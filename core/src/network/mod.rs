//! JSON-RPC transport to the wallet provider, plus the concrete gateways built on it.
mod contract;
mod price;
mod types;
mod wallet;

pub use contract::RpcContractGateway;
pub use price::{CoinGeckoClient, COINGECKO_API_URL, DEFAULT_ASSET_ID};
pub use types::*;
pub use wallet::RpcWalletGateway;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::gateway::{GatewayError, GatewayResult};

pub const FRAME_URL: &str = "http://127.0.0.1:1248";
pub const LOCALHOST_URL: &str = "http://127.0.0.1:8545";

/// Which wallet provider endpoint to talk to.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Desktop wallet exposing an EIP-1193 endpoint with user prompts.
    #[default]
    Frame,
    /// Development node with unlocked accounts.
    Localhost,
    Custom,
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::Frame => write!(f, "frame"),
            Provider::Localhost => write!(f, "localhost"),
            Provider::Custom => write!(f, "custom"),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(default)]
pub struct ProviderConfig {
    pub provider: Provider,
    pub custom_url: Option<String>,
}

impl ProviderConfig {
    /// Resolve the endpoint URL, validating custom ones.
    pub fn url(&self, allow_insecure: bool) -> Result<String> {
        match self.provider {
            Provider::Frame => Ok(FRAME_URL.to_string()),
            Provider::Localhost => Ok(LOCALHOST_URL.to_string()),
            Provider::Custom => {
                let url = self
                    .custom_url
                    .as_ref()
                    .ok_or_else(|| anyhow::anyhow!("Custom provider requires a URL"))?;
                validate_provider_url(url, allow_insecure)?;
                Ok(url.clone())
            }
        }
    }
}

/// Reject plain-HTTP provider URLs unless they point at this machine or
/// `allow_insecure` is set.
pub fn validate_provider_url(url: &str, allow_insecure: bool) -> Result<()> {
    let parsed = Url::parse(url).with_context(|| format!("Invalid provider URL: {url}"))?;
    match parsed.scheme() {
        "https" => Ok(()),
        "http" => {
            let loopback = matches!(
                parsed.host_str(),
                Some("127.0.0.1") | Some("localhost") | Some("[::1]")
            );
            if loopback || allow_insecure {
                return Ok(());
            }
            bail!("Refusing to connect over plain HTTP: {url}\nUse --insecure to allow unencrypted connections.");
        }
        _ => bail!("Invalid provider URL scheme: {url}\nExpected an https:// URL."),
    }
}

/// Minimal JSON-RPC 2.0 client. Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct RpcClient {
    http: reqwest::Client,
    url: String,
    next_id: Arc<AtomicU64>,
}

impl RpcClient {
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            http,
            url: url.to_string(),
            next_id: Arc::new(AtomicU64::new(1)),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Issue a call and deserialize its `result`. A `null` result is only
    /// accepted when `R` is an `Option`.
    pub async fn request<R: DeserializeOwned>(&self, method: &str, params: Value) -> GatewayResult<R> {
        let payload = JsonRpcRequest {
            jsonrpc: JSONRPC_VERSION,
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        let response = self
            .http
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(map_transport_error)?;
        if !response.status().is_success() {
            return Err(GatewayError::Transport(format!(
                "{method}: HTTP {}",
                response.status()
            )));
        }

        let body: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Decode(format!("{method}: {e}")))?;
        if let Some(err) = body.error {
            if err.code == USER_REJECTED_CODE {
                return Err(GatewayError::UserRejected);
            }
            return Err(GatewayError::Rpc {
                code: err.code,
                message: err.message,
            });
        }

        serde_json::from_value(body.result.unwrap_or(Value::Null))
            .map_err(|e| GatewayError::Decode(format!("{method}: {e}")))
    }
}

fn map_transport_error(err: reqwest::Error) -> GatewayError {
    if err.is_connect() {
        GatewayError::NoProvider
    } else if err.is_timeout() {
        GatewayError::Timeout(err.to_string())
    } else {
        GatewayError::Transport(err.to_string())
    }
}

/// Parse a `0x`-prefixed hex quantity.
pub(crate) fn parse_quantity(value: &str) -> GatewayResult<ethers::types::U256> {
    let hex = value
        .strip_prefix("0x")
        .ok_or_else(|| GatewayError::Decode(format!("not a hex quantity: {value}")))?;
    if hex.is_empty() {
        return Ok(ethers::types::U256::zero());
    }
    ethers::types::U256::from_str_radix(hex, 16)
        .map_err(|e| GatewayError::Decode(format!("bad quantity {value}: {e}")))
}

/// Local JSON-RPC server for gateway tests.
#[cfg(test)]
pub(crate) mod stub {
    use std::sync::{Arc, Mutex};

    use axum::extract::State;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    type Handler = Arc<dyn Fn(&str, &Value) -> Result<Value, (i64, String)> + Send + Sync>;
    type Calls = Arc<Mutex<Vec<(String, Value)>>>;

    #[derive(Clone)]
    struct StubState {
        handler: Handler,
        calls: Calls,
    }

    pub(crate) struct RpcStub {
        pub url: String,
        calls: Calls,
    }

    impl RpcStub {
        pub(crate) async fn start<F>(handler: F) -> Self
        where
            F: Fn(&str, &Value) -> Result<Value, (i64, String)> + Send + Sync + 'static,
        {
            let calls: Calls = Arc::new(Mutex::new(Vec::new()));
            let state = StubState {
                handler: Arc::new(handler),
                calls: Arc::clone(&calls),
            };
            let app = Router::new().route("/", post(handle)).with_state(state);
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                .await
                .expect("failed to bind stub");
            let addr = listener.local_addr().expect("stub has no address");
            tokio::spawn(async move {
                let _ = axum::serve(listener, app).await;
            });
            Self {
                url: format!("http://{addr}"),
                calls,
            }
        }

        pub(crate) fn calls(&self) -> Vec<(String, Value)> {
            self.calls.lock().expect("calls lock").clone()
        }

        pub(crate) fn methods(&self) -> Vec<String> {
            self.calls().into_iter().map(|(m, _)| m).collect()
        }
    }

    async fn handle(State(state): State<StubState>, Json(req): Json<Value>) -> Json<Value> {
        let method = req["method"].as_str().unwrap_or_default().to_string();
        let params = req["params"].clone();
        state
            .calls
            .lock()
            .expect("calls lock")
            .push((method.clone(), params.clone()));
        let body = match (state.handler)(&method, &params) {
            Ok(result) => json!({ "jsonrpc": "2.0", "id": req["id"], "result": result }),
            Err((code, message)) => json!({
                "jsonrpc": "2.0",
                "id": req["id"],
                "error": { "code": code, "message": message },
            }),
        };
        Json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::stub::RpcStub;
    use super::*;
    use serde_json::json;

    #[test]
    fn custom_provider_without_url_fails() {
        let config = ProviderConfig {
            provider: Provider::Custom,
            custom_url: None,
        };
        let err = config.url(false).err().expect("should fail").to_string();
        assert!(
            err.contains("Custom provider requires a URL"),
            "error should mention missing URL, got: {err}"
        );
    }

    #[test]
    fn defaults_to_frame() {
        assert_eq!(ProviderConfig::default().url(false).unwrap(), FRAME_URL);
    }

    #[test]
    fn rejects_remote_http_without_insecure() {
        let err = validate_provider_url("http://wallet.example.com:1248", false)
            .err()
            .expect("should fail");
        assert!(err.to_string().contains("--insecure"));
        assert!(validate_provider_url("http://wallet.example.com:1248", true).is_ok());
    }

    #[test]
    fn accepts_loopback_http() {
        assert!(validate_provider_url("http://localhost:8545", false).is_ok());
        assert!(validate_provider_url("http://127.0.0.1:1248", false).is_ok());
        assert!(validate_provider_url("https://rpc.example.com", false).is_ok());
    }

    #[test]
    fn rejects_invalid_url_scheme() {
        let err = validate_provider_url("ftp://example.com/rpc", false)
            .err()
            .expect("should fail");
        assert!(err.to_string().contains("Invalid provider URL scheme"));
    }

    #[test]
    fn parses_quantities() {
        assert_eq!(parse_quantity("0x5208").unwrap(), ethers::types::U256::from(21_000u64));
        assert_eq!(parse_quantity("0x").unwrap(), ethers::types::U256::zero());
        assert!(parse_quantity("5208").is_err());
    }

    #[tokio::test]
    async fn maps_user_rejection() {
        let stub = RpcStub::start(|_, _| Err((4001, "User rejected".into()))).await;
        let client = RpcClient::new(&stub.url, Duration::from_secs(5)).unwrap();
        let err = client
            .request::<Vec<String>>("eth_requestAccounts", json!([]))
            .await
            .unwrap_err();
        assert_eq!(err, GatewayError::UserRejected);
    }

    #[tokio::test]
    async fn maps_other_rpc_errors() {
        let stub = RpcStub::start(|_, _| Err((-32000, "execution reverted".into()))).await;
        let client = RpcClient::new(&stub.url, Duration::from_secs(5)).unwrap();
        let err = client.request::<String>("eth_call", json!([])).await.unwrap_err();
        assert_eq!(
            err,
            GatewayError::Rpc {
                code: -32000,
                message: "execution reverted".into()
            }
        );
    }

    #[tokio::test]
    async fn null_result_only_fits_option() {
        let stub = RpcStub::start(|_, _| Ok(Value::Null)).await;
        let client = RpcClient::new(&stub.url, Duration::from_secs(5)).unwrap();
        let none: Option<String> = client.request("eth_getTransactionReceipt", json!([])).await.unwrap();
        assert!(none.is_none());
        let err = client.request::<String>("eth_chainId", json!([])).await.unwrap_err();
        assert!(matches!(err, GatewayError::Decode(_)));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_no_provider() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let client = RpcClient::new(&format!("http://{addr}"), Duration::from_secs(5)).unwrap();
        let err = client.request::<Vec<String>>("eth_accounts", json!([])).await.unwrap_err();
        assert_eq!(err, GatewayError::NoProvider);
    }
}
