// =============================================================================
// Configuration errors
// =============================================================================
//
// Network and data-shape failures never leave the fetcher (they degrade to
// empty results), so the only typed error the tracker exposes is the one
// raised while validating user-supplied configuration at startup.
// =============================================================================

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be a finite number, got {value}")]
    NotFinite { field: &'static str, value: f64 },

    #[error("{field} must be greater than zero, got {value}")]
    NotPositive { field: &'static str, value: f64 },

    #[error("{field} must be within {min}..={max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("market pair must not be empty")]
    EmptyPair,

    /// The candle window cannot produce a trend reading for this period.
    #[error("candle_limit {candle_limit} is too small for adx_period {adx_period} (needs at least {required})")]
    CandleWindowTooShort {
        candle_limit: u32,
        adx_period: usize,
        required: usize,
    },
}

impl ConfigError {
    /// Check that `value` is finite and inside the inclusive range.
    pub fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), Self> {
        if !value.is_finite() {
            return Err(Self::NotFinite { field, value });
        }
        if value < min || value > max {
            return Err(Self::OutOfRange {
                field,
                value,
                min,
                max,
            });
        }
        Ok(())
    }

    /// Check that `value` is finite and strictly positive.
    pub fn check_positive(field: &'static str, value: f64) -> Result<(), Self> {
        if !value.is_finite() {
            return Err(Self::NotFinite { field, value });
        }
        if value <= 0.0 {
            return Err(Self::NotPositive { field, value });
        }
        Ok(())
    }
}
