// =============================================================================
// WebSocket Handler — push-based snapshot updates
// =============================================================================
//
// Clients connect to `/api/v1/ws` and receive:
//   1. The latest DashboardSnapshot immediately on connect (if any).
//   2. One further snapshot each time a new cycle is recorded.
//
// The state version is checked every 500 ms, so pushes trail the poll loop
// by at most that much.  Ping frames are answered with Pong; anything else
// the client sends is ignored.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{Sink, SinkExt, StreamExt};
use tokio::time::{interval, Duration};
use tracing::{debug, info, warn};

use crate::app_state::AppState;

const PUSH_CHECK_INTERVAL: Duration = Duration::from_millis(500);

// =============================================================================
// WebSocket upgrade handler
// =============================================================================

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    info!("WebSocket connection accepted — upgrading");
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state))
}

// =============================================================================
// Connection handler
// =============================================================================

async fn handle_ws_connection(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    let mut last_sent_version = state.current_state_version();
    if let Err(e) = send_latest(&mut sender, &state).await {
        warn!(error = %e, "Failed to send initial WebSocket snapshot");
        return;
    }

    let mut push_interval = interval(PUSH_CHECK_INTERVAL);

    loop {
        tokio::select! {
            // ── Push: a new cycle has been recorded ─────────────────────
            _ = push_interval.tick() => {
                let current_version = state.current_state_version();
                if current_version != last_sent_version {
                    if let Err(e) = send_latest(&mut sender, &state).await {
                        debug!(error = %e, "WebSocket send failed — disconnecting");
                        break;
                    }
                    last_sent_version = current_version;
                }
            }

            // ── Recv: control frames only ───────────────────────────────
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Ping(data))) => {
                        if let Err(e) = sender.send(Message::Pong(data)).await {
                            debug!(error = %e, "Failed to send Pong — disconnecting");
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket receive error — disconnecting");
                        break;
                    }
                }
            }
        }
    }

    info!("WebSocket connection closed");
}

// =============================================================================
// Helpers
// =============================================================================

/// Serialize and send the latest snapshot.  Sends nothing before the first
/// cycle.
async fn send_latest<S>(sender: &mut S, state: &AppState) -> Result<(), axum::Error>
where
    S: Sink<Message, Error = axum::Error> + Unpin,
{
    let Some(snapshot) = state.latest_snapshot() else {
        return Ok(());
    };

    match serde_json::to_string(snapshot.as_ref()) {
        Ok(json) => {
            sender.send(Message::Text(json)).await?;
            debug!(cycle = snapshot.cycle, "WebSocket snapshot sent");
            Ok(())
        }
        Err(e) => {
            // Serialisation errors are not network errors; don't disconnect.
            warn!(error = %e, "Failed to serialize snapshot");
            Ok(())
        }
    }
}
