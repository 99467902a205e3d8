pub mod cache;
pub mod fetcher;
pub mod models;
pub mod trade_flow;

// Re-export the record types for convenient access (e.g. `use crate::market_data::Candle`).
pub use fetcher::{CacheTtls, FetchWarning, FetchWarnings, MarketDataFetcher, MarketFeed};
pub use models::{Candle, TickerRow, Trade};
pub use trade_flow::{count_trade_directions, TradeCounts};
