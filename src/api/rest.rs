// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// All endpoints live under `/api/v1/` and are read-only.  Everything served
// here comes from `AppState`; no handler touches the network.
//
// Endpoints that need a completed cycle answer 503 until the first one lands.
//
// CORS is configured permissively; the dashboard is served from elsewhere.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};

use crate::app_state::AppState;
use crate::pipeline::{DashboardSnapshot, NO_SETUP_MESSAGE};
use crate::types::TrackerMode;

// =============================================================================
// Router construction
// =============================================================================

/// Build the full REST API router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/snapshot", get(snapshot))
        .route("/api/v1/signal", get(signal))
        .route("/api/v1/setup", get(setup))
        .route("/api/v1/markets", get(markets))
        .route("/api/v1/config", get(config))
        .route("/api/v1/errors", get(errors))
        // ── WebSocket (handled in ws module but mounted here) ───────
        .route("/api/v1/ws", get(crate::api::ws::ws_handler))
        // ── Middleware & State ───────────────────────────────────────
        .layer(cors)
        .with_state(state)
}

fn not_ready() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(serde_json::json!({ "error": "No poll cycle has completed yet" })),
    )
        .into_response()
}

fn with_latest(state: &AppState, f: impl FnOnce(&DashboardSnapshot) -> Response) -> Response {
    match state.latest_snapshot() {
        Some(snap) => f(&snap),
        None => not_ready(),
    }
}

// =============================================================================
// Health
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    state_version: u64,
    last_cycle: Option<u64>,
    uptime_secs: u64,
    server_time: i64,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let resp = HealthResponse {
        status: "ok",
        state_version: state.current_state_version(),
        last_cycle: state.latest_snapshot().map(|s| s.cycle),
        uptime_secs: state.uptime_secs(),
        server_time: chrono::Utc::now().timestamp_millis(),
    };
    Json(resp)
}

// =============================================================================
// Snapshot views
// =============================================================================

async fn snapshot(State(state): State<Arc<AppState>>) -> Response {
    with_latest(&state, |snap| Json(snap).into_response())
}

async fn signal(State(state): State<Arc<AppState>>) -> Response {
    with_latest(&state, |snap| {
        let s = &snap.signal;
        Json(serde_json::json!({
            "pair": s.pair,
            "buy_count": s.buy_count,
            "sell_count": s.sell_count,
            "trend_label": s.trend_label,
            "signal_label": s.signal_label,
            "cycle": snap.cycle,
            "generated_at": snap.generated_at,
        }))
        .into_response()
    })
}

async fn setup(State(state): State<Arc<AppState>>) -> Response {
    with_latest(&state, |snap| match (&snap.setup, snap.mode) {
        (Some(plan), _) => Json(serde_json::json!({ "setup": plan })).into_response(),
        (None, TrackerMode::Tracker) => Json(serde_json::json!({
            "setup": null,
            "message": "Setup scanner is disabled in tracker mode",
        }))
        .into_response(),
        (None, TrackerMode::Scanner) => {
            let message = snap.setup_message.as_deref().unwrap_or(NO_SETUP_MESSAGE);
            Json(serde_json::json!({ "setup": null, "message": message })).into_response()
        }
    })
}

// =============================================================================
// Reference data
// =============================================================================

async fn markets(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let markets = state.markets.read().clone();
    Json(serde_json::json!({
        "count": markets.len(),
        "markets": markets,
    }))
}

async fn config(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.config.clone())
}

async fn errors(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let errors = state.recent_errors.read().clone();
    Json(errors)
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_state::tests::sample_output;
    use crate::market_data::TickerRow;
    use crate::pipeline::tests::StubFeed;
    use crate::runtime_config::TrackerConfig;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let resp = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn empty_state() -> Arc<AppState> {
        Arc::new(AppState::new(TrackerConfig::default()))
    }

    #[tokio::test]
    async fn health_is_always_ok() {
        let (status, body) = get_json(router(empty_state()), "/api/v1/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert!(body["last_cycle"].is_null());
    }

    #[tokio::test]
    async fn snapshot_is_unavailable_before_first_cycle() {
        let state = empty_state();
        for uri in ["/api/v1/snapshot", "/api/v1/signal", "/api/v1/setup"] {
            let (status, _) = get_json(router(state.clone()), uri).await;
            assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE, "{uri}");
        }
    }

    #[tokio::test]
    async fn signal_and_setup_after_empty_cycle() {
        let state = empty_state();
        state.record_cycle(&sample_output(1, StubFeed::default()).await);

        let (status, body) = get_json(router(state.clone()), "/api/v1/signal").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["buy_count"], 0);
        assert_eq!(body["signal_label"], "No Activity");
        assert_eq!(body["trend_label"], "ADX: Not enough data");

        let (status, body) = get_json(router(state), "/api/v1/setup").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["setup"].is_null());
        assert_eq!(body["message"], "No setup found");
    }

    #[tokio::test]
    async fn setup_is_served_when_found() {
        let state = empty_state();
        let feed = StubFeed {
            ticker: vec![TickerRow {
                market: "ETHUSDT".into(),
                last_price: 110.0,
                bid: 110.0,
                ask: 110.0,
                volume: 500_000.0,
                high: 111.0,
                low: 99.0,
                open: 100.0,
                change_24h_pct: None,
                timestamp: 0,
            }],
            ..Default::default()
        };
        state.record_cycle(&sample_output(1, feed).await);

        let (status, body) = get_json(router(state), "/api/v1/setup").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["setup"]["symbol"], "ETHUSDT");
        assert_eq!(body["setup"]["risk_metrics"]["trades_required"], 20);
    }

    #[tokio::test]
    async fn errors_and_markets_reflect_cycles() {
        let state = empty_state();
        state.record_cycle(
            &sample_output(
                1,
                StubFeed {
                    pairs: vec!["B-BTC_USDT".into(), "B-ETH_USDT".into()],
                    ..Default::default()
                },
            )
            .await,
        );
        state.record_cycle(
            &sample_output(
                2,
                StubFeed {
                    fail: true,
                    ..Default::default()
                },
            )
            .await,
        );

        let (_, markets) = get_json(router(state.clone()), "/api/v1/markets").await;
        assert_eq!(markets["count"], 2);

        let (_, errors) = get_json(router(state), "/api/v1/errors").await;
        let errors = errors.as_array().unwrap();
        assert_eq!(errors.len(), 4);
        assert!(errors.iter().any(|e| e["endpoint"] == "ticker"));
    }

    #[tokio::test]
    async fn config_is_exposed() {
        let (status, body) = get_json(router(empty_state()), "/api/v1/config").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["pair"], "B-BTC_USDT");
        assert_eq!(body["refresh_interval_secs"], 10);
    }
}
