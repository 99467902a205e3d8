// =============================================================================
// Breakout Selector — single strongest momentum candle across all markets
// =============================================================================
//
// A row qualifies when every gate passes:
//   - Volume:     24h volume strictly above `min_volume`
//   - Body ratio: |close - open| / (high - low) strictly above
//                 `min_body_ratio` (zero range => ratio 0)
//   - Direction:  close > open for Long, close < open for Short
//   - Market:     optional quote-currency suffix filter
//
// Among qualifying rows the one with the highest volume wins.
// =============================================================================

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::market_data::TickerRow;
use crate::types::Direction;

fn default_min_volume() -> f64 {
    100_000.0
}

fn default_min_body_ratio() -> f64 {
    0.4
}

/// Tunable gates for [`select_breakout`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakoutThresholds {
    #[serde(default = "default_min_volume")]
    pub min_volume: f64,

    #[serde(default = "default_min_body_ratio")]
    pub min_body_ratio: f64,

    /// Only consider markets ending with this suffix (e.g. `"USDT"`).
    #[serde(default)]
    pub quote_suffix: Option<String>,
}

impl Default for BreakoutThresholds {
    fn default() -> Self {
        Self::relaxed()
    }
}

impl BreakoutThresholds {
    /// Looser gates: more setups, weaker conviction.
    pub fn relaxed() -> Self {
        Self {
            min_volume: default_min_volume(),
            min_body_ratio: default_min_body_ratio(),
            quote_suffix: None,
        }
    }

    /// Tighter gates: only heavy, decisive candles.
    pub fn strict() -> Self {
        Self {
            min_volume: 1_000_000.0,
            min_body_ratio: 0.6,
            quote_suffix: None,
        }
    }

    /// Resolve a preset by name (`relaxed` or `strict`, case-insensitive).
    /// The quote filter is not part of a preset and is carried over from
    /// `self`.
    pub fn with_preset(&self, name: &str) -> Result<Self, String> {
        let preset = match name.trim().to_ascii_lowercase().as_str() {
            "relaxed" => Self::relaxed(),
            "strict" => Self::strict(),
            other => return Err(format!("unknown breakout preset '{other}'")),
        };
        Ok(Self {
            quote_suffix: self.quote_suffix.clone(),
            ..preset
        })
    }
}

/// The row picked by [`select_breakout`] with its derived metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakoutCandidate {
    pub market: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub body_ratio: f64,
    pub change_pct: f64,
}

/// Candle body as a fraction of its full high-low range.
pub fn body_ratio(open: f64, high: f64, low: f64, close: f64) -> f64 {
    let range = high - low;
    if range <= 0.0 || !range.is_finite() {
        return 0.0;
    }
    (close - open).abs() / range
}

fn direction_matches(direction: Direction, open: f64, close: f64) -> bool {
    match direction {
        Direction::Long => close > open,
        Direction::Short => close < open,
    }
}

/// Pick the single highest-volume row that passes every gate, or `None`
/// when nothing qualifies.
pub fn select_breakout(
    rows: &[TickerRow],
    direction: Direction,
    thresholds: &BreakoutThresholds,
) -> Option<BreakoutCandidate> {
    let mut best: Option<(&TickerRow, f64)> = None;

    for row in rows {
        if let Some(suffix) = thresholds.quote_suffix.as_deref() {
            if !row.market.ends_with(suffix) {
                continue;
            }
        }
        if !(row.volume > thresholds.min_volume) {
            continue;
        }
        let ratio = body_ratio(row.open, row.high, row.low, row.last_price);
        if !(ratio > thresholds.min_body_ratio) {
            continue;
        }
        if !direction_matches(direction, row.open, row.last_price) {
            continue;
        }

        match best {
            Some((current, _)) if current.volume >= row.volume => {}
            _ => best = Some((row, ratio)),
        }
    }

    let (row, ratio) = best?;
    let change_pct = if row.open != 0.0 {
        (row.last_price - row.open) / row.open * 100.0
    } else {
        0.0
    };

    debug!(
        market = %row.market,
        volume = row.volume,
        body_ratio = ratio,
        %direction,
        "breakout candidate selected"
    );

    Some(BreakoutCandidate {
        market: row.market.clone(),
        open: row.open,
        high: row.high,
        low: row.low,
        close: row.last_price,
        volume: row.volume,
        body_ratio: ratio,
        change_pct,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(market: &str, open: f64, high: f64, low: f64, close: f64, volume: f64) -> TickerRow {
        TickerRow {
            market: market.into(),
            last_price: close,
            bid: close,
            ask: close,
            volume,
            high,
            low,
            open,
            change_24h_pct: None,
            timestamp: 0,
        }
    }

    fn thresholds() -> BreakoutThresholds {
        BreakoutThresholds {
            min_volume: 100_000.0,
            min_body_ratio: 0.4,
            quote_suffix: None,
        }
    }

    #[test]
    fn low_volume_is_excluded_regardless_of_body() {
        let rows = vec![row("AUSDT", 100.0, 110.0, 100.0, 110.0, 50_000.0)];
        assert!(select_breakout(&rows, Direction::Long, &thresholds()).is_none());
    }

    #[test]
    fn picks_highest_volume_qualifier() {
        let rows = vec![
            row("AUSDT", 100.0, 110.0, 99.0, 109.0, 200_000.0),
            row("BUSDT", 10.0, 11.0, 9.9, 10.9, 900_000.0),
            // Highest volume but a small body.
            row("CUSDT", 10.0, 12.0, 9.0, 10.1, 5_000_000.0),
        ];
        let pick = select_breakout(&rows, Direction::Long, &thresholds()).unwrap();
        assert_eq!(pick.market, "BUSDT");
        assert!(pick.body_ratio > 0.4);
    }

    #[test]
    fn direction_must_match() {
        let rows = vec![row("AUSDT", 100.0, 101.0, 90.0, 91.0, 500_000.0)];
        assert!(select_breakout(&rows, Direction::Long, &thresholds()).is_none());
        let pick = select_breakout(&rows, Direction::Short, &thresholds()).unwrap();
        assert_eq!(pick.market, "AUSDT");
        assert!(pick.change_pct < 0.0);
    }

    #[test]
    fn body_ratio_threshold_is_strict() {
        // body 4 over range 10 = 0.4 exactly.
        let rows = vec![row("AUSDT", 100.0, 106.0, 96.0, 104.0, 500_000.0)];
        assert!(select_breakout(&rows, Direction::Long, &thresholds()).is_none());
    }

    #[test]
    fn zero_range_never_qualifies() {
        let rows = vec![row("AUSDT", 100.0, 100.0, 100.0, 100.0, 500_000.0)];
        assert!(select_breakout(&rows, Direction::Long, &thresholds()).is_none());
        assert_eq!(body_ratio(1.0, 1.0, 1.0, 1.0), 0.0);
    }

    #[test]
    fn quote_suffix_filters_markets() {
        let rows = vec![
            row("AINR", 100.0, 110.0, 99.0, 109.0, 900_000.0),
            row("AUSDT", 100.0, 110.0, 99.0, 109.0, 200_000.0),
        ];
        let mut t = thresholds();
        t.quote_suffix = Some("USDT".into());
        let pick = select_breakout(&rows, Direction::Long, &t).unwrap();
        assert_eq!(pick.market, "AUSDT");
    }

    #[test]
    fn strict_preset_is_tighter_than_relaxed() {
        let rows = vec![row("AUSDT", 100.0, 110.0, 99.0, 105.0, 500_000.0)];
        assert!(select_breakout(&rows, Direction::Long, &BreakoutThresholds::relaxed()).is_some());
        assert!(select_breakout(&rows, Direction::Long, &BreakoutThresholds::strict()).is_none());
    }

    #[test]
    fn preset_keeps_quote_filter() {
        let mut base = thresholds();
        base.quote_suffix = Some("USDT".into());

        let strict = base.with_preset(" Strict ").unwrap();
        assert!((strict.min_volume - 1_000_000.0).abs() < f64::EPSILON);
        assert!((strict.min_body_ratio - 0.6).abs() < f64::EPSILON);
        assert_eq!(strict.quote_suffix.as_deref(), Some("USDT"));

        assert_eq!(strict.with_preset("relaxed").unwrap().min_volume, 100_000.0);
        assert!(base.with_preset("aggressive").is_err());
    }

    #[test]
    fn empty_table_has_no_setup() {
        assert!(select_breakout(&[], Direction::Short, &thresholds()).is_none());
    }
}
