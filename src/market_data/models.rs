// =============================================================================
// Market data records and their JSON decoders
// =============================================================================
//
// CoinDCX sends numbers either as JSON numbers or as numeric strings, and
// occasionally omits fields.  Decoders here never fail on a single bad
// entry: missing values are defaulted or synthesised, and entries that
// cannot be salvaged are skipped with a warning.  Only a body that is not
// an array at all is reported as an error.
// =============================================================================

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// One executed trade from the trade-history endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub symbol: String,
    pub price: f64,
    pub quantity: f64,
    /// The upstream `m` flag. `None` when the field is absent or not a bool.
    pub is_buyer_maker: Option<bool>,
    pub timestamp: i64,
}

/// A single OHLCV bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    pub fn new(open_time: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            open_time,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

/// One market's snapshot from the ticker endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerRow {
    pub market: String,
    pub last_price: f64,
    pub bid: f64,
    pub ask: f64,
    /// 24h volume.
    pub volume: f64,
    pub high: f64,
    pub low: f64,
    /// Either the upstream open or one synthesised from the 24h change.
    pub open: f64,
    pub change_24h_pct: Option<f64>,
    pub timestamp: i64,
}

// ---------------------------------------------------------------------------
// Field helpers
// ---------------------------------------------------------------------------

/// Read a JSON value that may be either a string or a number as `f64`.
pub(crate) fn lenient_f64(val: &Value) -> Option<f64> {
    let parsed = match val {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

fn lenient_i64(val: &Value) -> Option<i64> {
    match val {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Trades
// ---------------------------------------------------------------------------

/// Decode a trade-history body.
///
/// Expected shape:
/// ```json
/// [{ "p": 11603.88, "q": 0.024, "s": "BTCUSDT", "T": 1565163305770, "m": false }]
/// ```
pub fn decode_trades(body: &Value) -> Result<Vec<Trade>> {
    let raw = body
        .as_array()
        .context("trade history response is not an array")?;

    let mut trades = Vec::with_capacity(raw.len());
    for entry in raw {
        if !entry.is_object() {
            warn!(entry = %entry, "skipping non-object trade entry");
            continue;
        }
        trades.push(Trade {
            symbol: entry["s"].as_str().unwrap_or_default().to_string(),
            price: lenient_f64(&entry["p"]).unwrap_or(0.0),
            quantity: lenient_f64(&entry["q"]).unwrap_or(0.0),
            is_buyer_maker: entry["m"].as_bool(),
            timestamp: lenient_i64(&entry["T"]).unwrap_or(0),
        });
    }
    Ok(trades)
}

// ---------------------------------------------------------------------------
// Candles
// ---------------------------------------------------------------------------

struct RawCandle {
    open_time: Option<i64>,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: f64,
    volume: f64,
}

/// Decode a candles body into oldest-first candles.
///
/// Accepts both the object form
/// `{ "open", "high", "low", "close", "volume", "time" }` (newest first, as
/// CoinDCX sends it) and the positional form
/// `[time, open, high, low, close, volume]`.
///
/// A missing `open` is synthesised from the previous bar's close (or the
/// bar's own close for the first bar). A missing high/low falls back to the
/// extremes of open and close. Entries without a close or without a
/// timestamp are skipped; an untimed bar has no place in the ordering.
pub fn decode_candles(body: &Value) -> Result<Vec<Candle>> {
    let raw = body.as_array().context("candles response is not an array")?;

    let mut parsed: Vec<(i64, RawCandle)> = Vec::with_capacity(raw.len());
    for entry in raw {
        let candidate = if let Some(arr) = entry.as_array() {
            let field = |i: usize| arr.get(i).and_then(lenient_f64);
            let open_time = arr.first().and_then(lenient_i64);
            field(4).map(|close| RawCandle {
                open_time,
                open: field(1),
                high: field(2),
                low: field(3),
                close,
                volume: field(5).unwrap_or(0.0),
            })
        } else if entry.is_object() {
            let open_time =
                lenient_i64(&entry["time"]).or_else(|| lenient_i64(&entry["timestamp"]));
            lenient_f64(&entry["close"]).map(|close| RawCandle {
                open_time,
                open: lenient_f64(&entry["open"]),
                high: lenient_f64(&entry["high"]),
                low: lenient_f64(&entry["low"]),
                close,
                volume: lenient_f64(&entry["volume"]).unwrap_or(0.0),
            })
        } else {
            None
        };

        let Some(c) = candidate else {
            warn!(entry = %entry, "skipping candle entry without a close");
            continue;
        };
        match c.open_time.filter(|t| *t > 0) {
            Some(open_time) => parsed.push((open_time, c)),
            None => warn!(entry = %entry, "skipping candle entry without a timestamp"),
        }
    }

    // Stable sort keeps upstream order for equal timestamps.
    parsed.sort_by_key(|(open_time, _)| *open_time);

    let mut candles = Vec::with_capacity(parsed.len());
    let mut prev_close: Option<f64> = None;
    for (open_time, raw) in parsed {
        let open = raw.open.or(prev_close).unwrap_or(raw.close);
        let high = raw.high.unwrap_or_else(|| open.max(raw.close));
        let low = raw.low.unwrap_or_else(|| open.min(raw.close));
        prev_close = Some(raw.close);
        candles.push(Candle::new(open_time, open, high, low, raw.close, raw.volume));
    }
    Ok(candles)
}

// ---------------------------------------------------------------------------
// Ticker
// ---------------------------------------------------------------------------

/// Decode the all-markets ticker body.
///
/// Expected shape:
/// ```json
/// [{ "market": "BTCINR", "change_24_hour": "-1.6", "high": "1", "low": "0.9",
///    "volume": "2.34", "last_price": "0.95", "bid": "0.94", "ask": "0.96",
///    "timestamp": 1524211224 }]
/// ```
///
/// The ticker carries no open price, so it is reconstructed as
/// `last / (1 + change_24h / 100)`; without a change it equals `last`.
pub fn decode_ticker(body: &Value) -> Result<Vec<TickerRow>> {
    let raw = body.as_array().context("ticker response is not an array")?;

    let mut rows = Vec::with_capacity(raw.len());
    for entry in raw {
        let market = entry["market"].as_str();
        let last = lenient_f64(&entry["last_price"]);
        let (Some(market), Some(last_price)) = (market, last) else {
            warn!(entry = %entry, "skipping ticker entry without market or last_price");
            continue;
        };

        let change_24h_pct = lenient_f64(&entry["change_24_hour"]);
        let open = lenient_f64(&entry["open"]).unwrap_or_else(|| match change_24h_pct {
            Some(chg) if (1.0 + chg / 100.0).abs() > f64::EPSILON => {
                last_price / (1.0 + chg / 100.0)
            }
            _ => last_price,
        });

        rows.push(TickerRow {
            market: market.to_string(),
            last_price,
            bid: lenient_f64(&entry["bid"]).unwrap_or(last_price),
            ask: lenient_f64(&entry["ask"]).unwrap_or(last_price),
            volume: lenient_f64(&entry["volume"]).unwrap_or(0.0),
            high: lenient_f64(&entry["high"]).unwrap_or_else(|| open.max(last_price)),
            low: lenient_f64(&entry["low"]).unwrap_or_else(|| open.min(last_price)),
            open,
            change_24h_pct,
            timestamp: lenient_i64(&entry["timestamp"]).unwrap_or(0),
        });
    }
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Trade pairs
// ---------------------------------------------------------------------------

/// Prefix CoinDCX uses for futures pairs.
pub const FUTURES_PREFIX: &str = "B-";

/// Decode the trade-pairs body into a sorted, de-duplicated list of futures
/// pairs.
pub fn decode_trade_pairs(body: &Value) -> Result<Vec<String>> {
    let raw = body
        .as_array()
        .context("trade pairs response is not an array")?;

    let mut pairs: Vec<String> = raw
        .iter()
        .filter_map(|entry| entry["pair"].as_str())
        .filter(|pair| pair.starts_with(FUTURES_PREFIX))
        .map(str::to_string)
        .collect();
    pairs.sort();
    pairs.dedup();
    Ok(pairs)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn trades_accept_numbers_and_strings() {
        let body = json!([
            { "p": 100.5, "q": "0.2", "s": "B-BTC_USDT", "T": 1700000000000i64, "m": true },
            { "p": "101", "q": 1, "s": "B-BTC_USDT", "T": "1700000000001", "m": false },
        ]);
        let trades = decode_trades(&body).unwrap();
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].is_buyer_maker, Some(true));
        assert!((trades[0].quantity - 0.2).abs() < f64::EPSILON);
        assert!((trades[1].price - 101.0).abs() < f64::EPSILON);
        assert_eq!(trades[1].timestamp, 1_700_000_000_001);
    }

    #[test]
    fn trade_without_flag_keeps_none() {
        let body = json!([{ "p": 1.0, "q": 1.0 }, { "p": 1.0, "q": 1.0, "m": "yes" }]);
        let trades = decode_trades(&body).unwrap();
        assert_eq!(trades.len(), 2);
        assert!(trades.iter().all(|t| t.is_buyer_maker.is_none()));
    }

    #[test]
    fn non_array_body_is_an_error() {
        assert!(decode_trades(&json!({ "message": "rate limited" })).is_err());
        assert!(decode_candles(&json!(null)).is_err());
        assert!(decode_ticker(&json!("oops")).is_err());
    }

    #[test]
    fn candles_are_reordered_oldest_first() {
        let body = json!([
            { "open": 3.0, "high": 4.0, "low": 2.5, "close": 3.5, "volume": 10, "time": 3000 },
            { "open": 2.0, "high": 3.0, "low": 1.5, "close": 3.0, "volume": 10, "time": 2000 },
            { "open": 1.0, "high": 2.0, "low": 0.5, "close": 2.0, "volume": 10, "time": 1000 },
        ]);
        let candles = decode_candles(&body).unwrap();
        let times: Vec<i64> = candles.iter().map(|c| c.open_time).collect();
        assert_eq!(times, vec![1000, 2000, 3000]);
    }

    #[test]
    fn missing_open_is_synthesised_from_previous_close() {
        let body = json!([
            { "high": 2.0, "low": 0.5, "close": 1.5, "volume": 1, "time": 1 },
            { "high": 3.0, "low": 1.0, "close": 2.5, "volume": 1, "time": 2 },
        ]);
        let candles = decode_candles(&body).unwrap();
        assert!((candles[0].open - 1.5).abs() < f64::EPSILON);
        assert!((candles[1].open - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn positional_candles_are_supported() {
        let body = json!([[1000, "1.0", "2.0", "0.5", "1.5", "42"]]);
        let candles = decode_candles(&body).unwrap();
        assert_eq!(candles.len(), 1);
        assert!((candles[0].volume - 42.0).abs() < f64::EPSILON);
        assert!((candles[0].high - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn candle_without_close_is_skipped() {
        let body = json!([{ "open": 1.0, "time": 1 }, { "close": 2.0, "time": 2 }]);
        let candles = decode_candles(&body).unwrap();
        assert_eq!(candles.len(), 1);
        assert!((candles[0].open - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn untimed_candles_are_skipped() {
        // Newest first, as CoinDCX sends it; the middle bar has no time.
        let body = json!([
            { "open": 3.0, "high": 4.0, "low": 2.5, "close": 3.5, "volume": 10, "time": 3000 },
            { "open": 2.0, "high": 3.0, "low": 1.5, "close": 3.0, "volume": 10 },
            { "open": 1.0, "high": 2.0, "low": 0.5, "close": 2.0, "volume": 10, "timestamp": "1000" },
            { "open": 9.0, "high": 9.0, "low": 9.0, "close": 9.0, "volume": 10, "time": 0 },
        ]);
        let candles = decode_candles(&body).unwrap();
        let times: Vec<i64> = candles.iter().map(|c| c.open_time).collect();
        assert_eq!(times, vec![1000, 3000]);
        assert!((candles[1].close - 3.5).abs() < f64::EPSILON);

        let untimed = json!([{ "close": 1.0 }, { "close": 2.0 }]);
        assert!(decode_candles(&untimed).unwrap().is_empty());
    }

    #[test]
    fn ticker_open_is_reconstructed_from_change() {
        let body = json!([{
            "market": "BTCUSDT", "change_24_hour": "10", "high": "120", "low": "90",
            "volume": "5000", "last_price": "110", "bid": "109", "ask": "111",
            "timestamp": 1524211224
        }]);
        let rows = decode_ticker(&body).unwrap();
        assert_eq!(rows.len(), 1);
        assert!((rows[0].open - 100.0).abs() < 1e-9);
        assert_eq!(rows[0].change_24h_pct, Some(10.0));
    }

    #[test]
    fn ticker_without_change_uses_last_as_open() {
        let body = json!([{ "market": "ETHUSDT", "last_price": 50 }, { "volume": "1" }]);
        let rows = decode_ticker(&body).unwrap();
        assert_eq!(rows.len(), 1);
        assert!((rows[0].open - 50.0).abs() < f64::EPSILON);
        assert!((rows[0].volume).abs() < f64::EPSILON);
    }

    #[test]
    fn trade_pairs_keep_only_futures_sorted() {
        let body = json!([
            { "pair": "B-ETH_USDT" },
            { "pair": "I-BTC_INR" },
            { "pair": "B-BTC_USDT" },
            { "pair": "B-BTC_USDT" },
            { "symbol": "nope" },
        ]);
        let pairs = decode_trade_pairs(&body).unwrap();
        assert_eq!(pairs, vec!["B-BTC_USDT", "B-ETH_USDT"]);
    }
}
