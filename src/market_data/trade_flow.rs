// =============================================================================
// Trade Flow — buy/sell classification of executed trades
// =============================================================================
//
// The upstream `m` flag marks trades where the buyer was the maker, which
// means the aggressive (taker) side sold.  So `m == true` counts as a sell
// and `m == false` as a buy.  Trades with no usable flag are ignored.
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::market_data::Trade;

/// Buy/sell tally for one batch of trades.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeCounts {
    pub buy: u64,
    pub sell: u64,
    /// Trades whose maker flag was absent or not a boolean.
    pub ignored: u64,
}

/// Classify each trade by its maker flag.
pub fn count_trade_directions(trades: &[Trade]) -> TradeCounts {
    let mut counts = TradeCounts::default();
    for trade in trades {
        match trade.is_buyer_maker {
            // Buyer is maker => taker is selling.
            Some(true) => counts.sell += 1,
            // Seller is maker => taker is buying.
            Some(false) => counts.buy += 1,
            None => counts.ignored += 1,
        }
    }
    counts
}
