// =============================================================================
// Market Data Fetcher — cached, failure-tolerant access to CoinDCX
// =============================================================================
//
// Sits between the REST client and the pipeline.  Two rules hold for every
// call:
//   1. A failure (network, status, body) never propagates.  It becomes an
//      empty result, a `warn!` line, and an entry in the caller's
//      `FetchWarnings` so the presentation layer can show it.
//   2. Successful results are cached per endpoint, keyed by the request
//      parameters.  Failures are never cached.
// =============================================================================

use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use tracing::warn;

use crate::coindcx::CoinDcxClient;
use crate::market_data::cache::TtlCache;
use crate::market_data::{Candle, TickerRow, Trade};

// ---------------------------------------------------------------------------
// Warnings side-channel
// ---------------------------------------------------------------------------

/// One fetch failure observed during a poll cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchWarning {
    pub endpoint: &'static str,
    pub message: String,
}

/// Failures collected over a single poll cycle.
#[derive(Debug, Clone, Default)]
pub struct FetchWarnings(Vec<FetchWarning>);

impl FetchWarnings {
    pub fn push(&mut self, endpoint: &'static str, message: impl Into<String>) {
        self.0.push(FetchWarning {
            endpoint,
            message: message.into(),
        });
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn into_vec(self) -> Vec<FetchWarning> {
        self.0
    }
}

// ---------------------------------------------------------------------------
// MarketFeed — the seam the pipeline depends on
// ---------------------------------------------------------------------------

/// Source of market data for one poll cycle.  Implementations must never
/// fail: problems are reported through `warnings` and an empty result.
pub trait MarketFeed: Send + Sync + 'static {
    fn trades(
        &self,
        pair: &str,
        limit: u32,
        warnings: &mut FetchWarnings,
    ) -> impl Future<Output = Vec<Trade>> + Send;

    fn candles(
        &self,
        pair: &str,
        interval: &str,
        limit: u32,
        warnings: &mut FetchWarnings,
    ) -> impl Future<Output = Vec<Candle>> + Send;

    fn ticker(&self, warnings: &mut FetchWarnings) -> impl Future<Output = Vec<TickerRow>> + Send;

    fn trade_pairs(&self, warnings: &mut FetchWarnings)
        -> impl Future<Output = Vec<String>> + Send;
}

// ---------------------------------------------------------------------------
// Cache TTLs
// ---------------------------------------------------------------------------

/// Per-endpoint cache lifetimes.  A zero TTL means "always live".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheTtls {
    pub ticker: Duration,
    pub candles: Duration,
    pub trades: Duration,
    pub trade_pairs: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            ticker: Duration::from_secs(60),
            candles: Duration::from_secs(60),
            trades: Duration::ZERO,
            trade_pairs: Duration::from_secs(3600),
        }
    }
}

// ---------------------------------------------------------------------------
// MarketDataFetcher
// ---------------------------------------------------------------------------

/// [`MarketFeed`] backed by the CoinDCX REST client.
pub struct MarketDataFetcher {
    client: CoinDcxClient,
    ticker_cache: TtlCache<Vec<TickerRow>>,
    candle_cache: TtlCache<Vec<Candle>>,
    trade_cache: TtlCache<Vec<Trade>>,
    pairs_cache: TtlCache<Vec<String>>,
}

const TICKER_KEY: &str = "all";
const PAIRS_KEY: &str = "futures";

impl MarketDataFetcher {
    pub fn new(client: CoinDcxClient, ttls: CacheTtls) -> Self {
        Self {
            client,
            ticker_cache: TtlCache::new("ticker", ttls.ticker),
            candle_cache: TtlCache::new("candles", ttls.candles),
            trade_cache: TtlCache::new("trades", ttls.trades),
            pairs_cache: TtlCache::new("trade_pairs", ttls.trade_pairs),
        }
    }
}

impl MarketFeed for MarketDataFetcher {
    async fn trades(&self, pair: &str, limit: u32, warnings: &mut FetchWarnings) -> Vec<Trade> {
        let key = format!("{pair}?limit={limit}");
        if let Some(hit) = self.trade_cache.get(&key) {
            return hit;
        }
        match self.client.get_trade_history(pair, limit).await {
            Ok(trades) => {
                self.trade_cache.insert(key, trades.clone());
                trades
            }
            Err(e) => {
                warn!(pair, error = %format!("{e:#}"), "failed to fetch trades");
                warnings.push("trades", format!("Failed to fetch trades: {e:#}"));
                Vec::new()
            }
        }
    }

    async fn candles(
        &self,
        pair: &str,
        interval: &str,
        limit: u32,
        warnings: &mut FetchWarnings,
    ) -> Vec<Candle> {
        let key = format!("{pair}@{interval}?limit={limit}");
        if let Some(hit) = self.candle_cache.get(&key) {
            return hit;
        }
        match self.client.get_candles(pair, interval, limit).await {
            Ok(candles) => {
                self.candle_cache.insert(key, candles.clone());
                candles
            }
            Err(e) => {
                warn!(pair, interval, error = %format!("{e:#}"), "failed to fetch candles");
                warnings.push("candles", format!("Error fetching OHLCV for ADX: {e:#}"));
                Vec::new()
            }
        }
    }

    async fn ticker(&self, warnings: &mut FetchWarnings) -> Vec<TickerRow> {
        if let Some(hit) = self.ticker_cache.get(TICKER_KEY) {
            return hit;
        }
        match self.client.get_ticker().await {
            Ok(rows) => {
                self.ticker_cache.insert(TICKER_KEY, rows.clone());
                rows
            }
            Err(e) => {
                warn!(error = %format!("{e:#}"), "failed to fetch ticker");
                warnings.push("ticker", format!("Failed to fetch ticker: {e:#}"));
                Vec::new()
            }
        }
    }

    async fn trade_pairs(&self, warnings: &mut FetchWarnings) -> Vec<String> {
        if let Some(hit) = self.pairs_cache.get(PAIRS_KEY) {
            return hit;
        }
        match self.client.get_trade_pairs().await {
            Ok(pairs) => {
                self.pairs_cache.insert(PAIRS_KEY, pairs.clone());
                pairs
            }
            Err(e) => {
                warn!(error = %format!("{e:#}"), "failed to fetch trade pairs");
                warnings.push("trade_pairs", format!("Error fetching market pairs: {e:#}"));
                Vec::new()
            }
        }
    }
}

impl std::fmt::Debug for MarketDataFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketDataFetcher")
            .field("client", &self.client)
            .field("ticker_cache", &self.ticker_cache)
            .field("candle_cache", &self.candle_cache)
            .finish()
    }
}
