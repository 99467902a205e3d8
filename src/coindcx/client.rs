// =============================================================================
// CoinDCX REST API Client — public market data only
// =============================================================================
//
// Every endpoint used here is public and read-only, so requests carry no
// credentials.  A short per-request timeout bounds how long a single poll
// cycle can stall on a slow upstream.
// =============================================================================

use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, instrument};

use crate::market_data::models::{
    decode_candles, decode_ticker, decode_trade_pairs, decode_trades,
};
use crate::market_data::{Candle, TickerRow, Trade};

pub const DEFAULT_API_BASE: &str = "https://api.coindcx.com";
pub const DEFAULT_PUBLIC_BASE: &str = "https://public.coindcx.com";

/// CoinDCX public REST client.
#[derive(Clone)]
pub struct CoinDcxClient {
    api_base: String,
    public_base: String,
    client: reqwest::Client,
}

impl CoinDcxClient {
    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    /// Create a client against the given base URLs.
    ///
    /// # Arguments
    /// * `api_base`    — host serving `/exchange/ticker`.
    /// * `public_base` — host serving `/market_data/*`.
    /// * `timeout`     — per-request timeout.
    pub fn new(
        api_base: impl Into<String>,
        public_base: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build reqwest client")?;

        let api_base = api_base.into().trim_end_matches('/').to_string();
        let public_base = public_base.into().trim_end_matches('/').to_string();

        debug!(%api_base, %public_base, ?timeout, "CoinDcxClient initialised");

        Ok(Self {
            api_base,
            public_base,
            client,
        })
    }

    // -------------------------------------------------------------------------
    // Request builders
    // -------------------------------------------------------------------------
    //
    // Query values go through reqwest's form encoder, so a pair or interval
    // can never inject extra parameters.

    fn ticker_request(&self) -> reqwest::RequestBuilder {
        self.client.get(format!("{}/exchange/ticker", self.api_base))
    }

    fn trade_history_request(&self, pair: &str, limit: u32) -> reqwest::RequestBuilder {
        self.client
            .get(format!("{}/market_data/trade_history", self.public_base))
            .query(&[("pair", pair)])
            .query(&[("limit", limit)])
    }

    fn candles_request(&self, pair: &str, interval: &str, limit: u32) -> reqwest::RequestBuilder {
        self.client
            .get(format!("{}/market_data/candles", self.public_base))
            .query(&[("pair", pair), ("interval", interval)])
            .query(&[("limit", limit)])
    }

    fn trade_pairs_request(&self) -> reqwest::RequestBuilder {
        self.client
            .get(format!("{}/market_data/trade_pairs", self.public_base))
    }

    // -------------------------------------------------------------------------
    // Public market data
    // -------------------------------------------------------------------------

    /// GET /market_data/trade_history — most recent trades for one pair.
    #[instrument(skip(self), name = "coindcx::get_trade_history")]
    pub async fn get_trade_history(&self, pair: &str, limit: u32) -> Result<Vec<Trade>> {
        let body = self
            .get_json(self.trade_history_request(pair, limit), "/market_data/trade_history")
            .await?;
        let trades = decode_trades(&body)?;
        debug!(pair, count = trades.len(), "trade history fetched");
        Ok(trades)
    }

    /// GET /market_data/candles — OHLCV bars, returned oldest first.
    #[instrument(skip(self), name = "coindcx::get_candles")]
    pub async fn get_candles(&self, pair: &str, interval: &str, limit: u32) -> Result<Vec<Candle>> {
        let body = self
            .get_json(self.candles_request(pair, interval, limit), "/market_data/candles")
            .await?;
        let candles = decode_candles(&body)?;
        debug!(pair, interval, count = candles.len(), "candles fetched");
        Ok(candles)
    }

    /// GET /exchange/ticker — snapshot of every market.
    #[instrument(skip(self), name = "coindcx::get_ticker")]
    pub async fn get_ticker(&self) -> Result<Vec<TickerRow>> {
        let body = self.get_json(self.ticker_request(), "/exchange/ticker").await?;
        let rows = decode_ticker(&body)?;
        debug!(count = rows.len(), "ticker fetched");
        Ok(rows)
    }

    /// GET /market_data/trade_pairs — futures pairs only, sorted.
    #[instrument(skip(self), name = "coindcx::get_trade_pairs")]
    pub async fn get_trade_pairs(&self) -> Result<Vec<String>> {
        let body = self
            .get_json(self.trade_pairs_request(), "/market_data/trade_pairs")
            .await?;
        let pairs = decode_trade_pairs(&body)?;
        debug!(count = pairs.len(), "trade pairs fetched");
        Ok(pairs)
    }

    // -------------------------------------------------------------------------
    // Internal helpers
    // -------------------------------------------------------------------------

    /// Send a prepared GET and decode the body as JSON.  Any transport
    /// failure, non-2xx status or unparsable body becomes an `Err`.
    async fn get_json(
        &self,
        request: reqwest::RequestBuilder,
        endpoint: &str,
    ) -> Result<serde_json::Value> {
        let resp = request
            .send()
            .await
            .with_context(|| format!("GET {endpoint} request failed"))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .with_context(|| format!("failed to read {endpoint} response body"))?;

        if !status.is_success() {
            let snippet: String = text.chars().take(200).collect();
            anyhow::bail!("CoinDCX GET {} returned {}: {}", endpoint, status, snippet);
        }

        serde_json::from_str(&text).with_context(|| format!("failed to parse {endpoint} response"))
    }
}

impl std::fmt::Debug for CoinDcxClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoinDcxClient")
            .field("api_base", &self.api_base)
            .field("public_base", &self.public_base)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> CoinDcxClient {
        CoinDcxClient::new(
            "https://api.example.test/",
            "https://public.example.test",
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn url_of(request: reqwest::RequestBuilder) -> String {
        request.build().unwrap().url().to_string()
    }

    #[test]
    fn urls_include_query_parameters() {
        let c = client();
        assert_eq!(
            url_of(c.ticker_request()),
            "https://api.example.test/exchange/ticker"
        );
        assert_eq!(
            url_of(c.trade_history_request("B-BTC_USDT", 50)),
            "https://public.example.test/market_data/trade_history?pair=B-BTC_USDT&limit=50"
        );
        assert_eq!(
            url_of(c.candles_request("B-ETH_USDT", "1m", 50)),
            "https://public.example.test/market_data/candles?pair=B-ETH_USDT&interval=1m&limit=50"
        );
        assert_eq!(
            url_of(c.trade_pairs_request()),
            "https://public.example.test/market_data/trade_pairs"
        );
    }

    #[test]
    fn query_values_are_encoded() {
        let c = client();
        let url = url_of(c.candles_request("B-BTC USDT&limit=1", "1m#x", 50));
        assert_eq!(
            url,
            "https://public.example.test/market_data/candles?pair=B-BTC+USDT%26limit%3D1&interval=1m%23x&limit=50"
        );

        let url = reqwest::Url::parse(&url_of(c.trade_history_request("A&B", 10))).unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("pair".to_string(), "A&B".to_string()),
                ("limit".to_string(), "10".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn unreachable_host_is_an_error() {
        // Nothing listens on the discard port locally.
        let c = CoinDcxClient::new(
            "http://127.0.0.1:9",
            "http://127.0.0.1:9",
            Duration::from_millis(500),
        )
        .unwrap();
        assert!(c.get_ticker().await.is_err());
        assert!(c.get_trade_history("B-BTC_USDT", 10).await.is_err());
    }
}
