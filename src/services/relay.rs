//! Relay service: per-canvas rooms that fan sync frames out to peers.
//!
//! DESIGN
//! ======
//! Each websocket client owns a bounded channel. Joining registers the
//! sender in the canvas room; parting removes it and evicts the room once
//! empty. Broadcast is best-effort: a client whose channel is full or closed
//! misses that frame, and the sender never sees its own frame.
//!
//! Frames are validated before they are relayed. Anything that is not a
//! decodable `sync` envelope is dropped so peers only ever receive payloads
//! the canvas engine can apply.

#[cfg(test)]
#[path = "relay_test.rs"]
mod relay_test;

use canvas::sync::{SyncEnvelope, SyncError};
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

use crate::state::{AppState, CanvasRoom};

/// Add a client to a canvas room, creating the room if needed.
pub async fn join(state: &AppState, canvas_id: Uuid, client_id: Uuid, tx: mpsc::Sender<String>) {
    let mut rooms = state.rooms.write().await;
    let room = rooms.entry(canvas_id).or_insert_with(CanvasRoom::new);
    room.clients.insert(client_id, tx);
    info!(%canvas_id, %client_id, clients = room.clients.len(), "client joined canvas");
}

/// Remove a client. Empty rooms are evicted.
pub async fn part(state: &AppState, canvas_id: Uuid, client_id: Uuid) {
    let mut rooms = state.rooms.write().await;
    let Some(room) = rooms.get_mut(&canvas_id) else {
        return;
    };

    room.clients.remove(&client_id);
    info!(%canvas_id, %client_id, remaining = room.clients.len(), "client left canvas");

    if room.clients.is_empty() {
        rooms.remove(&canvas_id);
        info!(%canvas_id, "evicted canvas room");
    }
}

/// Send `text` to every client of `canvas_id` except `exclude`.
/// Returns how many clients accepted it.
pub async fn broadcast(state: &AppState, canvas_id: Uuid, text: &str, exclude: Option<Uuid>) -> usize {
    let rooms = state.rooms.read().await;
    let Some(room) = rooms.get(&canvas_id) else {
        return 0;
    };

    let mut delivered = 0;
    for (client_id, tx) in &room.clients {
        if exclude == Some(*client_id) {
            continue;
        }
        // Best-effort: if a client's channel is full, skip it.
        if tx.try_send(text.to_owned()).is_ok() {
            delivered += 1;
        }
    }
    delivered
}

/// Check that `text` is a `sync` envelope whose payload decodes.
/// Returns the number of cells it carries.
///
/// # Errors
///
/// Returns [`SyncError::Payload`] for anything else.
pub fn validate(text: &str) -> Result<usize, SyncError> {
    let payload = SyncEnvelope::parse(text)?.sync_payload()?;
    Ok(payload.pixels.len())
}
