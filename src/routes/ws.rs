//! WebSocket handler: per-canvas sync relay.
//!
//! DESIGN
//! ======
//! On upgrade, generates a client ID, joins the canvas room, and enters a
//! `select!` loop:
//! - Incoming text frames → validate as `sync` → forward to the other clients
//! - Frames relayed from peers → forward to this client
//!
//! The relay keeps no drawing state. Clients persist through the REST update
//! after their broadcast goes out.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → join room
//! 2. Client sends `{"event":"sync","payload":{...}}` → relay to peers
//! 3. Close → part room (empty rooms are evicted)

#[cfg(test)]
#[path = "ws_test.rs"]
mod ws_test;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::Response;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::services::relay;
use crate::state::AppState;

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(
    State(state): State<AppState>,
    Path(canvas_id): Path<Uuid>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, state, canvas_id))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState, canvas_id: Uuid) {
    let client_id = Uuid::new_v4();

    // Per-connection channel for frames relayed from peers.
    let (client_tx, mut client_rx) = mpsc::channel::<String>(state.relay_buffer);
    relay::join(&state, canvas_id, client_id, client_tx).await;

    info!(%canvas_id, %client_id, "ws: client connected");

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(msg) = msg else { break };
                let Ok(msg) = msg else { break };
                match msg {
                    Message::Text(text) => {
                        relay_text(&state, canvas_id, client_id, text.as_str()).await;
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            Some(text) = client_rx.recv() => {
                if socket.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
        }
    }

    relay::part(&state, canvas_id, client_id).await;
    info!(%canvas_id, %client_id, "ws: client disconnected");
}

async fn relay_text(state: &AppState, canvas_id: Uuid, client_id: Uuid, text: &str) {
    match relay::validate(text) {
        Ok(cells) => {
            let delivered = relay::broadcast(state, canvas_id, text, Some(client_id)).await;
            debug!(%canvas_id, %client_id, cells, delivered, "ws: sync relayed");
        }
        Err(e) => {
            warn!(%canvas_id, %client_id, error = %e, "ws: dropped invalid frame");
        }
    }
}
