// =============================================================================
// Shared types used across the tracker
// =============================================================================

use serde::{Deserialize, Serialize};

/// Position direction a setup is scanned for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
}

impl Default for Direction {
    fn default() -> Self {
        Self::Long
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Long => write!(f, "Long"),
            Self::Short => write!(f, "Short"),
        }
    }
}

impl std::str::FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "long" | "buy" => Ok(Self::Long),
            "short" | "sell" => Ok(Self::Short),
            other => Err(format!("unknown direction '{other}'")),
        }
    }
}

/// Which pipeline stages run on every cycle.
///
/// `Tracker` only watches order flow and trend for one pair; `Scanner`
/// additionally scans every market for a breakout setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackerMode {
    Tracker,
    Scanner,
}

impl Default for TrackerMode {
    fn default() -> Self {
        Self::Tracker
    }
}

impl std::fmt::Display for TrackerMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tracker => write!(f, "Tracker"),
            Self::Scanner => write!(f, "Scanner"),
        }
    }
}

impl std::str::FromStr for TrackerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tracker" => Ok(Self::Tracker),
            "scanner" => Ok(Self::Scanner),
            other => Err(format!("unknown mode '{other}'")),
        }
    }
}
