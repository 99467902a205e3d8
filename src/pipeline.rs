// =============================================================================
// Pipeline — one poll cycle: fetch -> compute -> snapshot
// =============================================================================
//
// A single parameterised pipeline covers every dashboard variant; the
// differences (direction, breakout strictness, sizing inputs) live in
// `StrategyParams`.
//
// Steps per cycle:
//   1. Futures pair list (cached for an hour) to confirm the pair exists
//   2. Recent trades -> buy/sell counts
//   3. Candles -> ADX trend reading
//   4. Counts + trend -> trade signal
//   5. Scanner mode only: ticker -> breakout candidate -> priced setup
//
// Nothing here can fail.  Fetch problems arrive as empty inputs plus
// warnings, and empty inputs flow through to NoActivity / InsufficientData
// / "No setup found".
// =============================================================================

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info};

use crate::breakout::{select_breakout, BreakoutThresholds};
use crate::market_data::{count_trade_directions, FetchWarning, FetchWarnings, MarketFeed};
use crate::risk::{plan_setup, RiskInputs, SetupPlan};
use crate::signals::{classify_trend, SignalResult};
use crate::types::{Direction, TrackerMode};

pub const NO_SETUP_MESSAGE: &str = "No setup found";

// =============================================================================
// Strategy parameters
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyParams {
    pub pair: String,
    pub mode: TrackerMode,
    pub direction: Direction,
    pub trade_limit: u32,
    pub candle_interval: String,
    pub candle_limit: u32,
    pub adx_period: usize,
    pub breakout: BreakoutThresholds,
    pub risk: RiskInputs,
}

// =============================================================================
// Cycle output
// =============================================================================

/// Everything the presentation layer shows for one cycle.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub cycle: u64,
    pub generated_at: String,
    pub mode: TrackerMode,
    pub signal: SignalResult,
    /// `None` outside scanner mode or when no row qualified.
    pub setup: Option<SetupPlan>,
    /// Set in scanner mode when `setup` is `None`.
    pub setup_message: Option<String>,
    /// Whether the configured pair appears in the futures pair list;
    /// `None` when the list could not be fetched.
    pub pair_listed: Option<bool>,
    pub warnings: Vec<FetchWarning>,
}

/// Snapshot plus the side data the server keeps outside of it.
#[derive(Debug, Clone)]
pub struct CycleOutput {
    pub snapshot: DashboardSnapshot,
    pub markets: Vec<String>,
}

// =============================================================================
// Pipeline
// =============================================================================

pub struct Pipeline<F> {
    feed: Arc<F>,
    params: StrategyParams,
}

impl<F: MarketFeed> Pipeline<F> {
    pub fn new(feed: Arc<F>, params: StrategyParams) -> Self {
        Self { feed, params }
    }

    pub fn params(&self) -> &StrategyParams {
        &self.params
    }

    /// Run one full fetch -> compute cycle.
    pub async fn run_cycle(&self, cycle: u64) -> CycleOutput {
        let p = &self.params;
        let mut warnings = FetchWarnings::default();

        // ── 1. Pair list ─────────────────────────────────────────────────
        let markets = self.feed.trade_pairs(&mut warnings).await;
        let pair_listed = if markets.is_empty() {
            None
        } else {
            Some(markets.iter().any(|m| m == &p.pair))
        };

        // ── 2. Order flow ────────────────────────────────────────────────
        let trades = self.feed.trades(&p.pair, p.trade_limit, &mut warnings).await;
        let counts = count_trade_directions(&trades);

        // ── 3. Trend ─────────────────────────────────────────────────────
        let candles = self
            .feed
            .candles(&p.pair, &p.candle_interval, p.candle_limit, &mut warnings)
            .await;
        let trend = classify_trend(&candles, p.adx_period);

        // ── 4. Signal ────────────────────────────────────────────────────
        let signal = SignalResult::new(p.pair.clone(), counts, trend);

        // ── 5. Setup scan ────────────────────────────────────────────────
        let (setup, setup_message) = match p.mode {
            TrackerMode::Tracker => (None, None),
            TrackerMode::Scanner => {
                let rows = self.feed.ticker(&mut warnings).await;
                match select_breakout(&rows, p.direction, &p.breakout) {
                    Some(candidate) => (Some(plan_setup(&candidate, p.direction, &p.risk)), None),
                    None => {
                        debug!(rows = rows.len(), direction = %p.direction, "no breakout qualified");
                        (None, Some(NO_SETUP_MESSAGE.to_string()))
                    }
                }
            }
        };

        info!(
            cycle,
            pair = %p.pair,
            buys = signal.buy_count,
            sells = signal.sell_count,
            trend = %signal.trend_label,
            signal = %signal.signal_label,
            setup = setup.as_ref().map(|s| s.symbol.as_str()).unwrap_or("-"),
            warnings = warnings.len(),
            "cycle complete"
        );

        CycleOutput {
            snapshot: DashboardSnapshot {
                cycle,
                generated_at: Utc::now().to_rfc3339(),
                mode: p.mode,
                signal,
                setup,
                setup_message,
                pair_listed,
                warnings: warnings.into_vec(),
            },
            markets,
        }
    }
}
