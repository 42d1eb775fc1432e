use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::MarketData;
use crate::gateway::{GatewayError, GatewayResult, PriceSource};
use crate::state::PriceQuote;

pub const COINGECKO_API_URL: &str = "https://api.coingecko.com/api/v3";
pub const DEFAULT_ASSET_ID: &str = "ethereum";

#[derive(Debug, Deserialize)]
struct SimplePrice {
    usd: f64,
    #[serde(default)]
    usd_24h_change: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct CoinResponse {
    market_data: CoinMarketData,
}

#[derive(Debug, Deserialize)]
struct UsdValue {
    usd: f64,
}

#[derive(Debug, Deserialize)]
struct CoinMarketData {
    current_price: UsdValue,
    #[serde(default)]
    price_change_percentage_24h: Option<f64>,
    high_24h: UsdValue,
    low_24h: UsdValue,
    market_cap: UsdValue,
}

/// Public price API client.
pub struct CoinGeckoClient {
    http: reqwest::Client,
    base_url: String,
    asset_id: String,
}

impl CoinGeckoClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            asset_id: DEFAULT_ASSET_ID.to_string(),
        })
    }

    pub fn with_asset(mut self, asset_id: &str) -> Self {
        self.asset_id = asset_id.to_string();
        self
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> GatewayResult<T> {
        let url = format!("{}{path}", self.base_url);
        let response = self.http.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                GatewayError::Timeout(e.to_string())
            } else {
                GatewayError::Transport(e.to_string())
            }
        })?;
        if !response.status().is_success() {
            return Err(GatewayError::Transport(format!(
                "price API returned HTTP {}",
                response.status()
            )));
        }
        response
            .json()
            .await
            .map_err(|e| GatewayError::Decode(format!("price API: {e}")))
    }
}

#[async_trait]
impl PriceSource for CoinGeckoClient {
    async fn fetch_quote(&self) -> GatewayResult<PriceQuote> {
        let path = format!(
            "/simple/price?ids={}&vs_currencies=usd&include_24hr_change=true",
            self.asset_id
        );
        let mut body: HashMap<String, SimplePrice> = self.get_json(&path).await?;
        let price = body
            .remove(&self.asset_id)
            .ok_or_else(|| GatewayError::Decode(format!("no quote for {}", self.asset_id)))?;
        Ok(PriceQuote {
            usd: price.usd,
            change_24h: price.usd_24h_change.unwrap_or_default(),
        })
    }

    async fn market_data(&self) -> GatewayResult<Option<MarketData>> {
        let path = format!(
            "/coins/{}?localization=false&tickers=false&community_data=false&developer_data=false",
            self.asset_id
        );
        let body: CoinResponse = self.get_json(&path).await?;
        let data = body.market_data;
        Ok(Some(MarketData {
            price: data.current_price.usd,
            change_24h: data.price_change_percentage_24h.unwrap_or_default(),
            high_24h: data.high_24h.usd,
            low_24h: data.low_24h.usd,
            market_cap: data.market_cap.usd,
        }))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;

    use super::*;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{addr}")
    }

    fn client(url: &str) -> CoinGeckoClient {
        CoinGeckoClient::new(url, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn parses_simple_quote() {
        let app = Router::new().route(
            "/simple/price",
            get(|| async { Json(json!({ "ethereum": { "usd": 2000.5, "usd_24h_change": -1.25 } })) }),
        );
        let url = serve(app).await;
        let quote = client(&url).fetch_quote().await.unwrap();
        assert_eq!(quote.usd, 2000.5);
        assert_eq!(quote.change_24h, -1.25);
    }

    #[tokio::test]
    async fn missing_asset_is_decode_error() {
        let app = Router::new().route("/simple/price", get(|| async { Json(json!({})) }));
        let url = serve(app).await;
        let err = client(&url).fetch_quote().await.unwrap_err();
        assert!(matches!(err, GatewayError::Decode(_)));
    }

    #[tokio::test]
    async fn http_failure_is_transport_error() {
        let app = Router::new().route(
            "/simple/price",
            get(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }),
        );
        let url = serve(app).await;
        let err = client(&url).fetch_quote().await.unwrap_err();
        assert!(matches!(err, GatewayError::Transport(_)));
    }

    #[tokio::test]
    async fn parses_market_data() {
        let app = Router::new().route(
            "/coins/ethereum",
            get(|| async {
                Json(json!({
                    "id": "ethereum",
                    "market_data": {
                        "current_price": { "usd": 2000.0, "eur": 1800.0 },
                        "price_change_percentage_24h": 3.5,
                        "high_24h": { "usd": 2100.0 },
                        "low_24h": { "usd": 1900.0 },
                        "market_cap": { "usd": 240000000000.0 }
                    }
                }))
            }),
        );
        let url = serve(app).await;
        let data = client(&url).market_data().await.unwrap().unwrap();
        assert_eq!(data.price, 2000.0);
        assert_eq!(data.change_24h, 3.5);
        assert_eq!(data.high_24h, 2100.0);
        assert_eq!(data.low_24h, 1900.0);
        assert_eq!(data.market_cap, 240_000_000_000.0);
    }

    #[tokio::test]
    async fn custom_asset_is_queried() {
        let app = Router::new().route(
            "/simple/price",
            get(|| async { Json(json!({ "wrapped-ether": { "usd": 1999.0 } })) }),
        );
        let url = serve(app).await;
        let quote = client(&url).with_asset("wrapped-ether").fetch_quote().await.unwrap();
        assert_eq!(quote.usd, 1999.0);
        assert_eq!(quote.change_24h, 0.0);
    }
}
