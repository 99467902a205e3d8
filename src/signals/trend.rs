// =============================================================================
// Trend Classification — ADX strength + directional dominance
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::indicators::adx::{calculate_adx_components, min_candles};
use crate::market_data::Candle;

/// Below this many candles no indicator is computed at all.
pub const MIN_TREND_CANDLES: usize = 20;

/// ADX above this level counts as a trending market.
pub const TREND_STRENGTH_THRESHOLD: f64 = 25.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendLabel {
    InsufficientData,
    Uptrend,
    Downtrend,
    Weak,
}

impl std::fmt::Display for TrendLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InsufficientData => write!(f, "Not enough data"),
            Self::Uptrend => write!(f, "Uptrend"),
            Self::Downtrend => write!(f, "Downtrend"),
            Self::Weak => write!(f, "Weak / No trend"),
        }
    }
}

/// Trend label together with the indicator values it came from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendReading {
    pub label: TrendLabel,
    pub adx: Option<f64>,
    pub plus_di: Option<f64>,
    pub minus_di: Option<f64>,
}

impl TrendReading {
    pub fn insufficient() -> Self {
        Self {
            label: TrendLabel::InsufficientData,
            adx: None,
            plus_di: None,
            minus_di: None,
        }
    }

    /// Human-readable summary, e.g. `ADX 31.4 → Uptrend`.
    pub fn summary(&self) -> String {
        match (self.label, self.adx) {
            (TrendLabel::InsufficientData, _) => "ADX: Not enough data".to_string(),
            (label, Some(adx)) => format!("ADX {adx:.1} → {label}"),
            (label, None) => format!("ADX n/a → {label}"),
        }
    }
}

/// Classify the trend of an oldest-first candle window.
///
/// - Fewer than [`MIN_TREND_CANDLES`] candles, or too few to seed ADX for
///   `period`: `InsufficientData`.
/// - ADX > 25 with +DI > -DI: `Uptrend`; ADX > 25 otherwise: `Downtrend`.
/// - Everything else, including a window with no price range at all: `Weak`.
pub fn classify_trend(candles: &[Candle], period: usize) -> TrendReading {
    if candles.len() < MIN_TREND_CANDLES || period == 0 || candles.len() < min_candles(period) {
        return TrendReading::insufficient();
    }

    let Some(reading) = calculate_adx_components(candles, period) else {
        return TrendReading {
            label: TrendLabel::Weak,
            adx: None,
            plus_di: None,
            minus_di: None,
        };
    };

    let label = if reading.adx > TREND_STRENGTH_THRESHOLD {
        if reading.plus_di > reading.minus_di {
            TrendLabel::Uptrend
        } else {
            TrendLabel::Downtrend
        }
    } else {
        TrendLabel::Weak
    };

    TrendReading {
        label,
        adx: Some(reading.adx),
        plus_di: Some(reading.plus_di),
        minus_di: Some(reading.minus_di),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trending(n: usize, step: f64) -> Vec<Candle> {
        (0..n)
            .map(|i| {
                let base = 1000.0 + i as f64 * step;
                let high = base + 1.0 + step.max(0.0);
                let low = base - 1.0 + step.min(0.0);
                Candle::new(i as i64 * 60_000, base, high, low, base + step / 2.0, 10.0)
            })
            .collect()
    }

    #[test]
    fn fewer_than_twenty_is_insufficient() {
        for n in 0..MIN_TREND_CANDLES {
            let reading = classify_trend(&trending(n, 2.0), 14);
            assert_eq!(reading.label, TrendLabel::InsufficientData, "n = {n}");
            assert!(reading.adx.is_none());
        }
    }

    #[test]
    fn window_too_short_for_period_is_insufficient() {
        let reading = classify_trend(&trending(25, 2.0), 14);
        assert_eq!(reading.label, TrendLabel::InsufficientData);
    }

    #[test]
    fn rising_market_is_uptrend() {
        let reading = classify_trend(&trending(50, 2.0), 14);
        assert_eq!(reading.label, TrendLabel::Uptrend);
        assert!(reading.adx.unwrap() > TREND_STRENGTH_THRESHOLD);
    }

    #[test]
    fn falling_market_is_downtrend() {
        let reading = classify_trend(&trending(50, -2.0), 14);
        assert_eq!(reading.label, TrendLabel::Downtrend);
    }

    #[test]
    fn flat_market_is_weak() {
        let candles = vec![Candle::new(0, 100.0, 101.0, 99.0, 100.0, 1.0); 50];
        let reading = classify_trend(&candles, 14);
        assert_eq!(reading.label, TrendLabel::Weak);
        assert!(reading.adx.unwrap() < TREND_STRENGTH_THRESHOLD);
    }

    #[test]
    fn zero_range_window_is_weak() {
        let candles = vec![Candle::new(0, 100.0, 100.0, 100.0, 100.0, 1.0); 50];
        let reading = classify_trend(&candles, 14);
        assert_eq!(reading.label, TrendLabel::Weak);
        assert!(reading.adx.is_none());
    }

    #[test]
    fn summary_formats_adx() {
        let reading = classify_trend(&trending(50, 2.0), 14);
        assert!(reading.summary().starts_with("ADX "));
        assert!(reading.summary().ends_with("→ Uptrend"));
        assert_eq!(TrendReading::insufficient().summary(), "ADX: Not enough data");
    }
}
