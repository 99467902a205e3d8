// =============================================================================
// Tracker Configuration — JSON file + environment overrides, validated once
// =============================================================================
//
// Every tunable lives here; it replaces the sliders and text inputs of an
// interactive dashboard.  The config is validated once at startup and the
// process refuses to start on invalid values, so no computation downstream
// ever sees a zero risk or zero capital.
//
// Persistence uses an atomic tmp + rename pattern to prevent corruption on
// crash.  All fields carry `#[serde(default)]` so that adding new fields
// never breaks loading an older config file.
// =============================================================================

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::breakout::BreakoutThresholds;
use crate::coindcx::{DEFAULT_API_BASE, DEFAULT_PUBLIC_BASE};
use crate::error::ConfigError;
use crate::indicators::adx::min_candles;
use crate::market_data::CacheTtls;
use crate::pipeline::StrategyParams;
use crate::risk::RiskInputs;
use crate::types::{Direction, TrackerMode};

pub const REFRESH_INTERVAL_RANGE: (u64, u64) = (5, 60);

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_pair() -> String {
    "B-BTC_USDT".to_string()
}

fn default_refresh_interval_secs() -> u64 {
    10
}

fn default_trade_limit() -> u32 {
    50
}

fn default_candle_interval() -> String {
    "1m".to_string()
}

fn default_candle_limit() -> u32 {
    50
}

fn default_adx_period() -> usize {
    14
}

fn default_capital() -> f64 {
    1000.0
}

fn default_target_profit() -> f64 {
    10_000.0
}

fn default_reward_pct() -> f64 {
    5.0
}

fn default_risk_pct() -> f64 {
    2.0
}

fn default_leverage() -> f64 {
    10.0
}

fn default_request_timeout_secs() -> u64 {
    5
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_public_base_url() -> String {
    DEFAULT_PUBLIC_BASE.to_string()
}

fn default_bind_addr() -> String {
    "0.0.0.0:3001".to_string()
}

fn default_ticker_ttl_secs() -> u64 {
    60
}

fn default_candles_ttl_secs() -> u64 {
    60
}

fn default_trade_pairs_ttl_secs() -> u64 {
    3600
}

// =============================================================================
// CacheSettings
// =============================================================================

/// Cache lifetimes in seconds.  Zero disables caching for that endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_ticker_ttl_secs")]
    pub ticker_ttl_secs: u64,

    #[serde(default = "default_candles_ttl_secs")]
    pub candles_ttl_secs: u64,

    /// Trade history is always live unless explicitly set.
    #[serde(default)]
    pub trades_ttl_secs: u64,

    #[serde(default = "default_trade_pairs_ttl_secs")]
    pub trade_pairs_ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ticker_ttl_secs: default_ticker_ttl_secs(),
            candles_ttl_secs: default_candles_ttl_secs(),
            trades_ttl_secs: 0,
            trade_pairs_ttl_secs: default_trade_pairs_ttl_secs(),
        }
    }
}

// =============================================================================
// TrackerConfig
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    // --- What to watch -------------------------------------------------------

    /// Futures market pair, e.g. `B-BTC_USDT`.
    #[serde(default = "default_pair")]
    pub pair: String,

    /// Tracker (order flow only) or Scanner (order flow + breakout setup).
    #[serde(default)]
    pub mode: TrackerMode,

    /// Seconds between poll cycles (5..=60).
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    /// Number of recent trades requested per cycle.
    #[serde(default = "default_trade_limit")]
    pub trade_limit: u32,

    /// Candle interval used for the trend indicator.
    #[serde(default = "default_candle_interval")]
    pub candle_interval: String,

    /// Number of candles requested per cycle.
    #[serde(default = "default_candle_limit")]
    pub candle_limit: u32,

    #[serde(default = "default_adx_period")]
    pub adx_period: usize,

    // --- Setup scanner -------------------------------------------------------

    #[serde(default)]
    pub direction: Direction,

    #[serde(default)]
    pub breakout: BreakoutThresholds,

    // --- Position sizing -----------------------------------------------------

    #[serde(default = "default_capital")]
    pub capital: f64,

    #[serde(default = "default_target_profit")]
    pub target_profit: f64,

    /// Take-profit distance in percent (1..=20).
    #[serde(default = "default_reward_pct")]
    pub reward_pct: f64,

    /// Stop-loss distance in percent (1..=10).
    #[serde(default = "default_risk_pct")]
    pub risk_pct: f64,

    /// Leverage multiplier (1..=20).
    #[serde(default = "default_leverage")]
    pub leverage: f64,

    // --- Transport -----------------------------------------------------------

    #[serde(default)]
    pub cache: CacheSettings,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,

    /// Address the HTTP/WebSocket presentation server binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            pair: default_pair(),
            mode: TrackerMode::default(),
            refresh_interval_secs: default_refresh_interval_secs(),
            trade_limit: default_trade_limit(),
            candle_interval: default_candle_interval(),
            candle_limit: default_candle_limit(),
            adx_period: default_adx_period(),
            direction: Direction::default(),
            breakout: BreakoutThresholds::default(),
            capital: default_capital(),
            target_profit: default_target_profit(),
            reward_pct: default_reward_pct(),
            risk_pct: default_risk_pct(),
            leverage: default_leverage(),
            cache: CacheSettings::default(),
            request_timeout_secs: default_request_timeout_secs(),
            api_base_url: default_api_base_url(),
            public_base_url: default_public_base_url(),
            bind_addr: default_bind_addr(),
        }
    }
}

impl TrackerConfig {
    /// Load configuration from a JSON file at `path`.  A missing or
    /// malformed file is an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read tracker config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse tracker config from {}", path.display()))?;

        info!(
            path = %path.display(),
            pair = %config.pair,
            mode = %config.mode,
            "tracker config loaded"
        );

        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to defaults with a
    /// warning.  A file that exists but cannot be read or parsed is an
    /// error; it is never silently replaced by defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            warn!(path = %path.display(), "tracker config not found, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Persist the current configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise tracker config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "tracker config saved (atomic)");
        Ok(())
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any key lookup.  Unparsable values are ignored
    /// with a warning and the existing value is kept.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(pair) = lookup("TRACKER_PAIR") {
            let pair = pair.trim().to_uppercase();
            if !pair.is_empty() {
                self.pair = pair;
            }
        }
        if let Some(raw) = lookup("TRACKER_INTERVAL_SECS") {
            match raw.trim().parse::<u64>() {
                Ok(secs) => self.refresh_interval_secs = secs,
                Err(e) => warn!(value = %raw, error = %e, "ignoring TRACKER_INTERVAL_SECS"),
            }
        }
        if let Some(raw) = lookup("TRACKER_MODE") {
            match raw.parse::<TrackerMode>() {
                Ok(mode) => self.mode = mode,
                Err(e) => warn!(value = %raw, error = %e, "ignoring TRACKER_MODE"),
            }
        }
        if let Some(raw) = lookup("TRACKER_DIRECTION") {
            match raw.parse::<Direction>() {
                Ok(direction) => self.direction = direction,
                Err(e) => warn!(value = %raw, error = %e, "ignoring TRACKER_DIRECTION"),
            }
        }
        if let Some(raw) = lookup("TRACKER_BREAKOUT_PRESET") {
            match self.breakout.with_preset(&raw) {
                Ok(breakout) => self.breakout = breakout,
                Err(e) => warn!(value = %raw, error = %e, "ignoring TRACKER_BREAKOUT_PRESET"),
            }
        }
        if let Some(addr) = lookup("TRACKER_BIND_ADDR") {
            if !addr.trim().is_empty() {
                self.bind_addr = addr.trim().to_string();
            }
        }
    }

    /// Check every user-facing input.  Called once before the poll loop
    /// starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pair.trim().is_empty() {
            return Err(ConfigError::EmptyPair);
        }
        ConfigError::check_range(
            "refresh_interval_secs",
            self.refresh_interval_secs as f64,
            REFRESH_INTERVAL_RANGE.0 as f64,
            REFRESH_INTERVAL_RANGE.1 as f64,
        )?;
        ConfigError::check_positive("request_timeout_secs", self.request_timeout_secs as f64)?;
        ConfigError::check_range("trade_limit", self.trade_limit as f64, 1.0, 5000.0)?;
        ConfigError::check_range("candle_limit", self.candle_limit as f64, 20.0, 1000.0)?;
        ConfigError::check_range("adx_period", self.adx_period as f64, 1.0, 100.0)?;
        let required = min_candles(self.adx_period);
        if (self.candle_limit as usize) < required {
            return Err(ConfigError::CandleWindowTooShort {
                candle_limit: self.candle_limit,
                adx_period: self.adx_period,
                required,
            });
        }
        ConfigError::check_range("breakout.min_volume", self.breakout.min_volume, 0.0, f64::MAX)?;
        ConfigError::check_range("breakout.min_body_ratio", self.breakout.min_body_ratio, 0.0, 1.0)?;
        self.risk_inputs()?;
        Ok(())
    }

    pub fn risk_inputs(&self) -> Result<RiskInputs, ConfigError> {
        RiskInputs::new(
            self.capital,
            self.target_profit,
            self.reward_pct,
            self.risk_pct,
            self.leverage,
        )
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn cache_ttls(&self) -> CacheTtls {
        CacheTtls {
            ticker: Duration::from_secs(self.cache.ticker_ttl_secs),
            candles: Duration::from_secs(self.cache.candles_ttl_secs),
            trades: Duration::from_secs(self.cache.trades_ttl_secs),
            trade_pairs: Duration::from_secs(self.cache.trade_pairs_ttl_secs),
        }
    }

    /// Build the pipeline parameters.  Fails only if validation would.
    pub fn strategy_params(&self) -> Result<StrategyParams, ConfigError> {
        Ok(StrategyParams {
            pair: self.pair.clone(),
            mode: self.mode,
            direction: self.direction,
            trade_limit: self.trade_limit,
            candle_interval: self.candle_interval.clone(),
            candle_limit: self.candle_limit,
            adx_period: self.adx_period,
            breakout: self.breakout.clone(),
            risk: self.risk_inputs()?,
        })
    }
}
