// =============================================================================
// Central Application State — shared between poll loop and HTTP server
// =============================================================================
//
// The poll loop publishes each cycle on a watch channel; `run_state_sink`
// copies it in here, where REST handlers and WebSocket connections read it.
//
// Thread safety:
//   - Atomic counter for lock-free version tracking.
//   - parking_lot::RwLock for the mutable collections.
//   - Snapshots are held as `Arc` so readers clone a pointer, not the data.
// =============================================================================

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::debug;

use crate::pipeline::{CycleOutput, DashboardSnapshot};
use crate::runtime_config::TrackerConfig;
use crate::scheduler::CycleReceiver;

// =============================================================================
// Error Record
// =============================================================================

/// A fetch warning kept for the dashboard error log.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    pub endpoint: String,
    pub message: String,
    /// Poll cycle the failure happened in.
    pub cycle: u64,
    /// ISO 8601 timestamp.
    pub at: String,
}

// =============================================================================
// AppState
// =============================================================================

/// Maximum number of recent errors to retain.
const MAX_RECENT_ERRORS: usize = 50;

pub struct AppState {
    /// Incremented on every recorded cycle.  WebSocket connections compare
    /// against it to decide when to push.
    pub state_version: AtomicU64,

    /// Active configuration.  Fixed for the life of the process.
    pub config: TrackerConfig,

    pub latest: RwLock<Option<Arc<DashboardSnapshot>>>,

    /// Last non-empty futures pair list.
    pub markets: RwLock<Vec<String>>,

    pub recent_errors: RwLock<Vec<ErrorRecord>>,

    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            state_version: AtomicU64::new(0),
            config,
            latest: RwLock::new(None),
            markets: RwLock::new(Vec::new()),
            recent_errors: RwLock::new(Vec::new()),
            start_time: std::time::Instant::now(),
        }
    }

    // ── Version Management ──────────────────────────────────────────────

    pub fn increment_version(&self) -> u64 {
        self.state_version.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn current_state_version(&self) -> u64 {
        self.state_version.load(Ordering::SeqCst)
    }

    // ── Error Logging ───────────────────────────────────────────────────

    /// Record a fetch failure.  The buffer is capped at
    /// [`MAX_RECENT_ERRORS`]; oldest entries are evicted first.
    pub fn push_error(&self, endpoint: &str, message: &str, cycle: u64) {
        let record = ErrorRecord {
            endpoint: endpoint.to_string(),
            message: message.to_string(),
            cycle,
            at: Utc::now().to_rfc3339(),
        };

        let mut errors = self.recent_errors.write();
        errors.push(record);
        while errors.len() > MAX_RECENT_ERRORS {
            errors.remove(0);
        }
    }

    // ── Cycle Recording ─────────────────────────────────────────────────

    /// Absorb one published cycle: latest snapshot, pair list, warnings.
    pub fn record_cycle(&self, output: &CycleOutput) {
        let snapshot = &output.snapshot;

        for w in &snapshot.warnings {
            self.push_error(w.endpoint, &w.message, snapshot.cycle);
        }

        // An empty list means the fetch failed; keep the previous one.
        if !output.markets.is_empty() {
            *self.markets.write() = output.markets.clone();
        }

        *self.latest.write() = Some(Arc::new(snapshot.clone()));
        let version = self.increment_version();

        debug!(cycle = snapshot.cycle, version, "cycle recorded");
    }

    pub fn latest_snapshot(&self) -> Option<Arc<DashboardSnapshot>> {
        self.latest.read().clone()
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

// =============================================================================
// State sink
// =============================================================================

/// Copy every published cycle into `state` until the publisher goes away.
pub async fn run_state_sink(state: Arc<AppState>, mut cycles: CycleReceiver) {
    while cycles.changed().await.is_ok() {
        let latest = cycles.borrow_and_update().clone();
        if let Some(output) = latest {
            state.record_cycle(&output);
        }
    }
    debug!("cycle publisher closed, state sink stopping");
}
