// =============================================================================
// Average Directional Index (ADX) with directional indicators
// =============================================================================
//
// ADX quantifies trend **strength**; +DI / -DI give its direction.
//
// Calculation pipeline:
//   1. Compute +DM (positive directional movement) and -DM per bar.
//   2. Compute True Range (TR) per bar.
//   3. Seed Wilder's running sums, then continue with  s = s - s / period + x.
//      +DM / -DM are seeded with the first `period` transitions.  TR is
//      seeded with bars 0..period-1 (bar 0 contributes its own high - low)
//      and the TR of bar `period` is never added.  This is the `ta`
//      ADXIndicator layout; TR cancels out of DX, so only the reported DI
//      values depend on it.
//   4. Derive +DI = smoothed(+DM) / smoothed(TR) * 100
//            -DI = smoothed(-DM) / smoothed(TR) * 100
//   5. DX  = |+DI - -DI| / (+DI + -DI) * 100
//   6. ADX = mean of the first `period` DX values, then
//            adx = (adx * (period - 1) + dx) / period.
//
// ADX, +DI and -DI for the last bar agree with the `ta` ADXIndicator.
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::market_data::Candle;

/// ADX and directional indicators for the most recent bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdxReading {
    pub adx: f64,
    pub plus_di: f64,
    pub minus_di: f64,
}

/// Smallest window that yields an ADX value for `period`.
///
/// `period` transitions seed the smoothing (which needs `period + 1` bars)
/// and `period` DX values seed the ADX average.
pub fn min_candles(period: usize) -> usize {
    2 * period
}

/// Compute ADX, +DI and -DI for the last candle in `candles` (oldest first).
///
/// Returns `None` when:
/// - `period` is zero.
/// - There are fewer than [`min_candles`] candles.
/// - The smoothed true range is zero (a window of identical flat prints).
/// - Any intermediate calculation produces a non-finite result.
pub fn calculate_adx_components(candles: &[Candle], period: usize) -> Option<AdxReading> {
    if period == 0 || candles.len() < min_candles(period) {
        return None;
    }

    let period_f = period as f64;

    // ------------------------------------------------------------------
    // Step 1 & 2: Raw +DM, -DM, and True Range for each consecutive pair
    // ------------------------------------------------------------------
    let n = candles.len();
    let bar_count = n - 1;

    let mut plus_dm = Vec::with_capacity(bar_count);
    let mut minus_dm = Vec::with_capacity(bar_count);
    let mut tr_vals = Vec::with_capacity(bar_count);

    for pair in candles.windows(2) {
        let (prev, cur) = (&pair[0], &pair[1]);

        let tr = cur.high.max(prev.close) - cur.low.min(prev.close);

        let up_move = cur.high - prev.high;
        let down_move = prev.low - cur.low;

        plus_dm.push(if up_move > down_move && up_move > 0.0 {
            up_move
        } else {
            0.0
        });
        minus_dm.push(if down_move > up_move && down_move > 0.0 {
            down_move
        } else {
            0.0
        });
        tr_vals.push(tr);
    }

    // ------------------------------------------------------------------
    // Step 3: Wilder's smoothing, seeded with a plain sum
    // ------------------------------------------------------------------
    let mut smooth_plus_dm: f64 = plus_dm[..period].iter().sum();
    let mut smooth_minus_dm: f64 = minus_dm[..period].iter().sum();
    let first = &candles[0];
    let mut smooth_tr: f64 = (first.high - first.low) + tr_vals[..period - 1].iter().sum::<f64>();

    let mut last = directional(smooth_plus_dm, smooth_minus_dm, smooth_tr)?;
    let mut dx_values: Vec<f64> = Vec::with_capacity(bar_count - period + 1);
    dx_values.push(last.2);

    for i in period..bar_count {
        smooth_plus_dm = smooth_plus_dm - smooth_plus_dm / period_f + plus_dm[i];
        smooth_minus_dm = smooth_minus_dm - smooth_minus_dm / period_f + minus_dm[i];
        smooth_tr = smooth_tr - smooth_tr / period_f + tr_vals[i];

        last = directional(smooth_plus_dm, smooth_minus_dm, smooth_tr)?;
        dx_values.push(last.2);
    }

    // ------------------------------------------------------------------
    // Step 6: ADX = Wilder's smoothed average of DX
    // ------------------------------------------------------------------
    if dx_values.len() < period {
        return None;
    }

    let mut adx = dx_values[..period].iter().sum::<f64>() / period_f;
    for &dx in &dx_values[period..] {
        adx = (adx * (period_f - 1.0) + dx) / period_f;
    }

    if !adx.is_finite() {
        return None;
    }

    let (plus_di, minus_di, _) = last;
    Some(AdxReading {
        adx,
        plus_di,
        minus_di,
    })
}

// =============================================================================
// Internal helpers
// =============================================================================

/// Compute (+DI, -DI, DX) from smoothed +DM, -DM and TR.
///
/// Returns `None` if the smoothed TR is zero or the result is non-finite.
fn directional(smooth_plus_dm: f64, smooth_minus_dm: f64, smooth_tr: f64) -> Option<(f64, f64, f64)> {
    if smooth_tr == 0.0 {
        return None;
    }

    let plus_di = (smooth_plus_dm / smooth_tr) * 100.0;
    let minus_di = (smooth_minus_dm / smooth_tr) * 100.0;

    let di_sum = plus_di + minus_di;
    let dx = if di_sum == 0.0 {
        // No directional movement at all.
        0.0
    } else {
        ((plus_di - minus_di).abs() / di_sum) * 100.0
    };

    if plus_di.is_finite() && minus_di.is_finite() && dx.is_finite() {
        Some((plus_di, minus_di, dx))
    } else {
        None
    }
}
