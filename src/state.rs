//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the database pool and one relay room per canvas that currently
//! has websocket clients. Rooms carry no drawing state: cells are merged
//! into Postgres by the REST update, and the relay only fans out text frames.

use std::collections::HashMap;
use std::sync::Arc;

use sqlx::PgPool;
use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

// =============================================================================
// CANVAS ROOM
// =============================================================================

/// Clients connected to one canvas.
pub struct CanvasRoom {
    /// Connected clients: client_id -> sender for outgoing text frames.
    pub clients: HashMap<Uuid, mpsc::Sender<String>>,
}

impl CanvasRoom {
    #[must_use]
    pub fn new() -> Self {
        Self { clients: HashMap::new() }
    }
}

impl Default for CanvasRoom {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// APP STATE
// =============================================================================

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub rooms: Arc<RwLock<HashMap<Uuid, CanvasRoom>>>,
    /// Capacity of each client's outbound channel.
    pub relay_buffer: usize,
}

impl AppState {
    #[must_use]
    pub fn new(pool: PgPool, relay_buffer: usize) -> Self {
        Self { pool, rooms: Arc::new(RwLock::new(HashMap::new())), relay_buffer }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
