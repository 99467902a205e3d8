// =============================================================================
// Signals Module
// =============================================================================
//
// Derived values recomputed on every poll cycle:
// - Trend classification from ADX / +DI / -DI
// - Composite trade signal from order-flow ratio and trend

pub mod trade_signal;
pub mod trend;

use serde::{Deserialize, Serialize};

use crate::market_data::TradeCounts;

pub use trade_signal::{generate_trade_signal, TradeSignal};
pub use trend::{classify_trend, TrendLabel, TrendReading};

/// Per-cycle payload for the order-flow view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalResult {
    pub pair: String,
    pub buy_count: u64,
    pub sell_count: u64,
    pub ignored_count: u64,
    pub trend: TrendLabel,
    pub trend_label: String,
    pub signal: TradeSignal,
    pub signal_label: String,
    pub adx: Option<f64>,
    pub plus_di: Option<f64>,
    pub minus_di: Option<f64>,
}

impl SignalResult {
    pub fn new(pair: impl Into<String>, counts: TradeCounts, trend: TrendReading) -> Self {
        let signal = generate_trade_signal(counts.buy, counts.sell, trend.label);
        Self {
            pair: pair.into(),
            buy_count: counts.buy,
            sell_count: counts.sell,
            ignored_count: counts.ignored,
            trend: trend.label,
            trend_label: trend.summary(),
            signal,
            signal_label: signal.to_string(),
            adx: trend.adx,
            plus_di: trend.plus_di,
            minus_di: trend.minus_di,
        }
    }
}
