// =============================================================================
// Trade Signal — order-flow ratio combined with the trend label
// =============================================================================
//
// Decision order (first match wins, all comparisons strict):
//   no classified trades                 -> NoActivity
//   Uptrend   && buy_ratio > 0.65        -> StrongBuy
//   Downtrend && buy_ratio < 0.35        -> StrongSell
//   buy_ratio > 0.55                     -> WeakBuy
//   buy_ratio < 0.45                     -> WeakSell
//   otherwise                            -> Neutral
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::signals::trend::TrendLabel;

const STRONG_BUY_RATIO: f64 = 0.65;
const STRONG_SELL_RATIO: f64 = 0.35;
const WEAK_BUY_RATIO: f64 = 0.55;
const WEAK_SELL_RATIO: f64 = 0.45;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeSignal {
    StrongBuy,
    StrongSell,
    WeakBuy,
    WeakSell,
    Neutral,
    NoActivity,
}

impl std::fmt::Display for TradeSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StrongBuy => write!(f, "Strong Buy / Long"),
            Self::StrongSell => write!(f, "Strong Sell / Short"),
            Self::WeakBuy => write!(f, "Weak Buy / Caution"),
            Self::WeakSell => write!(f, "Weak Sell / Caution"),
            Self::Neutral => write!(f, "Neutral / Wait"),
            Self::NoActivity => write!(f, "No Activity"),
        }
    }
}

pub fn generate_trade_signal(buy_count: u64, sell_count: u64, trend: TrendLabel) -> TradeSignal {
    let total = buy_count + sell_count;
    if total == 0 {
        return TradeSignal::NoActivity;
    }

    let buy_ratio = buy_count as f64 / total as f64;

    if trend == TrendLabel::Uptrend && buy_ratio > STRONG_BUY_RATIO {
        TradeSignal::StrongBuy
    } else if trend == TrendLabel::Downtrend && buy_ratio < STRONG_SELL_RATIO {
        TradeSignal::StrongSell
    } else if buy_ratio > WEAK_BUY_RATIO {
        TradeSignal::WeakBuy
    } else if buy_ratio < WEAK_SELL_RATIO {
        TradeSignal::WeakSell
    } else {
        TradeSignal::Neutral
    }
}
