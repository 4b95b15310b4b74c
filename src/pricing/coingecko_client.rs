use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use reqwest::{Client, Url};
use rust_decimal::Decimal;
use serde_json::Number;

use super::{PriceSource, QUOTE_CURRENCY};
use crate::errors::PnlError;

/// `simple/price` payload: `{"ethereum": {"usd": 3120.55}}`.
pub type SimplePriceResponse = HashMap<String, HashMap<String, Number>>;

#[derive(Debug, Clone)]
pub struct CoinGeckoClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl CoinGeckoClient {
    pub fn new(http: Client, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    async fn get_simple_price(&self, symbol: &str) -> Result<SimplePriceResponse, PnlError> {
        let url = Url::parse_with_params(
            &format!("{}/simple/price", self.base_url),
            &[("ids", symbol), ("vs_currencies", QUOTE_CURRENCY)],
        )
        .map_err(|e| PnlError::price_unavailable(symbol, e))?;

        let mut req = self.http.get(url);
        if let Some(key) = &self.api_key {
            req = req.header("x-cg-demo-api-key", key);
        }

        let resp = req
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| PnlError::price_unavailable(symbol, e))?;

        resp.json::<SimplePriceResponse>()
            .await
            .map_err(|e| PnlError::price_unavailable(symbol, e))
    }
}

#[async_trait]
impl PriceSource for CoinGeckoClient {
    async fn usd_price(&self, symbol: &str) -> Result<Decimal, PnlError> {
        let body = self.get_simple_price(symbol).await?;
        extract_quote(&body, symbol)
    }
}

/// Pull the quote for `symbol` out of a `simple/price` payload.
pub fn extract_quote(body: &SimplePriceResponse, symbol: &str) -> Result<Decimal, PnlError> {
    let quotes = body
        .get(symbol)
        .ok_or_else(|| PnlError::price_unavailable(symbol, "no price data returned"))?;

    let raw = quotes
        .get(QUOTE_CURRENCY)
        .ok_or_else(|| PnlError::price_unavailable(symbol, "no USD quote returned"))?
        .to_string();

    // Small prices come back in exponent form, e.g. 3.2e-05
    Decimal::from_str(&raw)
        .or_else(|_| Decimal::from_scientific(&raw))
        .map_err(|e| PnlError::price_unavailable(symbol, format!("bad quote {raw}: {e}")))
}
