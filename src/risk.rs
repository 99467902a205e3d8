// =============================================================================
// Risk Metrics — reward:risk, break-even win rate, position plan
// =============================================================================
//
// All inputs are validated when `RiskInputs` is built, so every divisor used
// below is known to be strictly positive:
//   - capital, target profit   > 0
//   - reward %                 1 ..= 20
//   - risk %                   1 ..= 10
//   - leverage                 1 ..= 20
// =============================================================================

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::breakout::BreakoutCandidate;
use crate::error::ConfigError;
use crate::types::Direction;

pub const REWARD_PCT_RANGE: (f64, f64) = (1.0, 20.0);
pub const RISK_PCT_RANGE: (f64, f64) = (1.0, 10.0);
pub const LEVERAGE_RANGE: (f64, f64) = (1.0, 20.0);

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Validated sizing inputs.  Construct through [`RiskInputs::new`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RiskInputs {
    capital: f64,
    target_profit: f64,
    reward_pct: f64,
    risk_pct: f64,
    leverage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskMetrics {
    /// reward % / risk %, rounded to 2 decimals.
    pub reward_risk_ratio: f64,
    /// Minimum win rate (%) for non-negative expectancy, rounded.
    pub break_even_win_rate: f64,
    /// Winning trades needed to reach the target profit.
    pub trades_required: u64,
}

/// A fully priced trade setup ready for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetupPlan {
    pub symbol: String,
    pub direction: Direction,
    pub entry_price: f64,
    pub target_price: f64,
    pub stop_loss_price: f64,
    /// Notional exposure: capital x leverage.
    pub position_size: f64,
    /// Units of the base asset at the entry price.
    pub quantity: f64,
    /// Profit if the target is hit.
    pub expected_profit: f64,
    pub risk_metrics: RiskMetrics,
}

// ---------------------------------------------------------------------------
// RiskInputs
// ---------------------------------------------------------------------------

impl RiskInputs {
    /// Validate and build sizing inputs.
    ///
    /// # Arguments
    /// * `capital`       — margin committed per trade.
    /// * `target_profit` — total profit goal.
    /// * `reward_pct`    — take-profit distance in percent.
    /// * `risk_pct`      — stop-loss distance in percent.
    /// * `leverage`      — position multiplier.
    pub fn new(
        capital: f64,
        target_profit: f64,
        reward_pct: f64,
        risk_pct: f64,
        leverage: f64,
    ) -> Result<Self, ConfigError> {
        ConfigError::check_positive("capital", capital)?;
        ConfigError::check_positive("target_profit", target_profit)?;
        ConfigError::check_range("reward_pct", reward_pct, REWARD_PCT_RANGE.0, REWARD_PCT_RANGE.1)?;
        ConfigError::check_range("risk_pct", risk_pct, RISK_PCT_RANGE.0, RISK_PCT_RANGE.1)?;
        ConfigError::check_range("leverage", leverage, LEVERAGE_RANGE.0, LEVERAGE_RANGE.1)?;

        Ok(Self {
            capital,
            target_profit,
            reward_pct,
            risk_pct,
            leverage,
        })
    }

    /// Profit of one winning trade: capital x reward% x leverage.
    pub fn profit_per_trade(&self) -> f64 {
        self.capital * self.reward_pct * self.leverage / 100.0
    }

    pub fn metrics(&self) -> RiskMetrics {
        let reward_risk_ratio = round_to(self.reward_pct / self.risk_pct, 2);
        let break_even_win_rate = (100.0 / (1.0 + reward_risk_ratio)).round();
        let trades_required = (self.target_profit / self.profit_per_trade()).ceil() as u64;

        RiskMetrics {
            reward_risk_ratio,
            break_even_win_rate,
            trades_required,
        }
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

// ---------------------------------------------------------------------------
// Setup planning
// ---------------------------------------------------------------------------

/// Price a breakout candidate into entry, target and stop levels.
///
/// Long: target above entry, stop below.  Short: the reverse.
pub fn plan_setup(candidate: &BreakoutCandidate, direction: Direction, inputs: &RiskInputs) -> SetupPlan {
    let entry_price = candidate.close;
    let reward = inputs.reward_pct / 100.0;
    let risk = inputs.risk_pct / 100.0;

    let (target_price, stop_loss_price) = match direction {
        Direction::Long => (entry_price * (1.0 + reward), entry_price * (1.0 - risk)),
        Direction::Short => (entry_price * (1.0 - reward), entry_price * (1.0 + risk)),
    };

    let position_size = inputs.capital * inputs.leverage;
    let quantity = if entry_price > 0.0 {
        position_size / entry_price
    } else {
        0.0
    };

    let plan = SetupPlan {
        symbol: candidate.market.clone(),
        direction,
        entry_price,
        target_price,
        stop_loss_price,
        position_size,
        quantity,
        expected_profit: inputs.profit_per_trade(),
        risk_metrics: inputs.metrics(),
    };

    debug!(
        symbol = %plan.symbol,
        %direction,
        entry = plan.entry_price,
        target = plan.target_price,
        stop = plan.stop_loss_price,
        "setup planned"
    );

    plan
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(close: f64) -> BreakoutCandidate {
        BreakoutCandidate {
            market: "BTCUSDT".into(),
            open: close * 0.95,
            high: close * 1.01,
            low: close * 0.94,
            close,
            volume: 1_000_000.0,
            body_ratio: 0.7,
            change_pct: 5.0,
        }
    }

    #[test]
    fn reference_metrics() {
        let inputs = RiskInputs::new(1000.0, 10_000.0, 5.0, 2.0, 10.0).unwrap();
        let m = inputs.metrics();
        assert!((m.reward_risk_ratio - 2.5).abs() < f64::EPSILON);
        assert!((m.break_even_win_rate - 29.0).abs() < f64::EPSILON);
        assert_eq!(m.trades_required, 20);
    }

    #[test]
    fn ratio_rounds_to_two_decimals() {
        let inputs = RiskInputs::new(1000.0, 1000.0, 10.0, 3.0, 1.0).unwrap();
        let m = inputs.metrics();
        assert!((m.reward_risk_ratio - 3.33).abs() < 1e-12);
        assert!((m.break_even_win_rate - 23.0).abs() < f64::EPSILON);
    }

    #[test]
    fn trades_required_rounds_up() {
        // 1000 * 5% * 1 = 50 per trade; 120 / 50 = 2.4 -> 3.
        let inputs = RiskInputs::new(1000.0, 120.0, 5.0, 2.0, 1.0).unwrap();
        assert_eq!(inputs.metrics().trades_required, 3);
    }

    #[test]
    fn zero_inputs_are_rejected() {
        assert!(matches!(
            RiskInputs::new(0.0, 100.0, 5.0, 2.0, 1.0),
            Err(ConfigError::NotPositive { field: "capital", .. })
        ));
        assert!(matches!(
            RiskInputs::new(1000.0, 100.0, 5.0, 0.0, 1.0),
            Err(ConfigError::OutOfRange { field: "risk_pct", .. })
        ));
        assert!(RiskInputs::new(1000.0, 100.0, 0.0, 2.0, 1.0).is_err());
        assert!(RiskInputs::new(1000.0, 100.0, 5.0, 2.0, 0.0).is_err());
        assert!(RiskInputs::new(1000.0, -1.0, 5.0, 2.0, 1.0).is_err());
    }

    #[test]
    fn out_of_range_inputs_are_rejected() {
        assert!(RiskInputs::new(1000.0, 100.0, 21.0, 2.0, 1.0).is_err());
        assert!(RiskInputs::new(1000.0, 100.0, 5.0, 11.0, 1.0).is_err());
        assert!(RiskInputs::new(1000.0, 100.0, 5.0, 2.0, 25.0).is_err());
        assert!(RiskInputs::new(f64::INFINITY, 100.0, 5.0, 2.0, 1.0).is_err());
    }

    #[test]
    fn long_plan_brackets_entry() {
        let inputs = RiskInputs::new(1000.0, 10_000.0, 5.0, 2.0, 10.0).unwrap();
        let plan = plan_setup(&candidate(100.0), Direction::Long, &inputs);
        assert!((plan.target_price - 105.0).abs() < 1e-9);
        assert!((plan.stop_loss_price - 98.0).abs() < 1e-9);
        assert!((plan.position_size - 10_000.0).abs() < 1e-9);
        assert!((plan.quantity - 100.0).abs() < 1e-9);
        assert!((plan.expected_profit - 500.0).abs() < 1e-9);
        assert_eq!(plan.risk_metrics.trades_required, 20);
    }

    #[test]
    fn short_plan_inverts_levels() {
        let inputs = RiskInputs::new(500.0, 1000.0, 4.0, 2.0, 5.0).unwrap();
        let plan = plan_setup(&candidate(200.0), Direction::Short, &inputs);
        assert!(plan.target_price < plan.entry_price);
        assert!(plan.stop_loss_price > plan.entry_price);
        assert!((plan.target_price - 192.0).abs() < 1e-9);
        assert!((plan.stop_loss_price - 204.0).abs() < 1e-9);
    }
}
