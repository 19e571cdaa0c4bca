//! Propagation: coalescing edit queues and the broadcast-then-persist driver.
//!
//! DESIGN
//! ======
//! Every local paint lands in two latest-wins queues keyed by cell. The
//! broadcast queue feeds low-latency `sync` messages to peers; the persistence
//! queue feeds durable storage writes. A flush cycle runs in three steps:
//!
//! 1. take the broadcast queue and publish it to peers
//! 2. if no new paint arrived meanwhile, snapshot the persistence queue
//! 3. write that snapshot to storage and drop the entries it covered
//!
//! [`PropagationManager`] is the sans-IO state for those steps and
//! [`flush_then_persist`] drives them. The driver holds the session lock
//! only between awaits: snapshot under lock, I/O unlocked, settle under lock.
//! The [`FlushPhase`] flag keeps at most one cycle in flight per session.
//!
//! ERROR HANDLING
//! ==============
//! Failures are returned in [`FlushOutcome`] and logged; nothing is retried
//! here. A failed broadcast puts its cells back (newer paints win) and leaves
//! the session dirty. A failed persist leaves the persistence queue as it was,
//! so the next cycle sends it again.

#[cfg(test)]
#[path = "propagation_test.rs"]
mod propagation_test;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::grid::{CellAddr, PixelMap, PixelRecord};
use crate::sync::{CanvasStore, PeerChannel, SYNC_EVENT, SyncError, SyncPayload};

/// Where the session is in its flush cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlushPhase {
    #[default]
    Idle,
    /// A broadcast batch is with the peer channel.
    Broadcasting,
    /// A persistence snapshot is with storage.
    Persisting,
}

/// Queues and flags for one session's outbound edits.
#[derive(Debug, Clone)]
pub struct PropagationManager {
    canvas_id: Uuid,
    broadcast_queue: PixelMap,
    persist_queue: PixelMap,
    dirty: bool,
    phase: FlushPhase,
}

impl PropagationManager {
    #[must_use]
    pub fn new(canvas_id: Uuid) -> Self {
        Self {
            canvas_id,
            broadcast_queue: PixelMap::new(),
            persist_queue: PixelMap::new(),
            dirty: false,
            phase: FlushPhase::Idle,
        }
    }

    #[must_use]
    pub fn canvas_id(&self) -> Uuid {
        self.canvas_id
    }

    /// Local edits exist that have not yet gone through a broadcast.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[must_use]
    pub fn phase(&self) -> FlushPhase {
        self.phase
    }

    #[must_use]
    pub fn broadcast_queue(&self) -> &PixelMap {
        &self.broadcast_queue
    }

    #[must_use]
    pub fn persist_queue(&self) -> &PixelMap {
        &self.persist_queue
    }

    /// Queue a painted cell for both channels, replacing any earlier value.
    pub fn enqueue(&mut self, cell: CellAddr, record: PixelRecord) {
        self.broadcast_queue.insert(cell, record.clone());
        self.persist_queue.insert(cell, record);
        self.dirty = true;
    }

    /// Start a cycle by taking the broadcast queue.
    ///
    /// Returns `None` while another cycle is in flight, when nothing is dirty,
    /// or when the broadcast queue is empty.
    pub fn begin_broadcast(&mut self) -> Option<PixelMap> {
        if self.phase != FlushPhase::Idle || !self.dirty || self.broadcast_queue.is_empty() {
            return None;
        }
        self.phase = FlushPhase::Broadcasting;
        Some(std::mem::take(&mut self.broadcast_queue))
    }

    /// The peer channel accepted the batch.
    ///
    /// If no paint arrived during the broadcast, the session is clean and the
    /// persistence snapshot is returned for writing. Otherwise the cycle ends
    /// here and the next release broadcasts the newer cells first.
    pub fn broadcast_acked(&mut self) -> Option<PixelMap> {
        if self.phase != FlushPhase::Broadcasting {
            return None;
        }
        if !self.broadcast_queue.is_empty() {
            self.phase = FlushPhase::Idle;
            return None;
        }
        self.dirty = false;
        if self.persist_queue.is_empty() {
            self.phase = FlushPhase::Idle;
            return None;
        }
        self.phase = FlushPhase::Persisting;
        Some(self.persist_queue.clone())
    }

    /// The peer channel refused the batch. Cells painted since are kept as they are.
    pub fn broadcast_failed(&mut self, batch: PixelMap) {
        for (cell, record) in batch {
            self.broadcast_queue.entry(cell).or_insert(record);
        }
        self.dirty = true;
        self.phase = FlushPhase::Idle;
    }

    /// Storage accepted `sent`. Entries repainted since the snapshot stay queued.
    pub fn persist_succeeded(&mut self, sent: &PixelMap) {
        self.persist_queue.retain(|cell, record| sent.get(cell) != Some(record));
        self.phase = FlushPhase::Idle;
    }

    pub fn persist_failed(&mut self) {
        self.phase = FlushPhase::Idle;
    }
}

/// Session state that owns a [`PropagationManager`].
pub trait Propagating: Send {
    fn propagation(&mut self) -> &mut PropagationManager;
}

impl Propagating for PropagationManager {
    fn propagation(&mut self) -> &mut PropagationManager {
        self
    }
}

/// Result of one [`flush_then_persist`] call.
#[derive(Debug)]
pub enum FlushOutcome {
    /// Nothing to send, or a cycle was already in flight.
    Skipped,
    /// Broadcast delivered; persistence deferred because newer paints are queued.
    Broadcast { cells: usize },
    /// Broadcast delivered and the persistence snapshot written.
    Persisted { broadcast: usize, persisted: usize },
    BroadcastFailed(SyncError),
    /// Broadcast delivered but the storage write failed.
    PersistFailed { broadcast: usize, error: SyncError },
}

/// Run one flush cycle: broadcast the queued cells, then persist.
///
/// Broadcast always completes before persistence starts. The session lock is
/// released across both network calls.
pub async fn flush_then_persist<S: Propagating>(
    session: &Mutex<S>,
    peer: &dyn PeerChannel,
    store: &dyn CanvasStore,
) -> FlushOutcome {
    let (canvas_id, batch) = {
        let mut guard = session.lock().await;
        let manager = guard.propagation();
        let Some(batch) = manager.begin_broadcast() else {
            return FlushOutcome::Skipped;
        };
        (manager.canvas_id(), batch)
    };

    let broadcast = batch.len();
    let payload = SyncPayload { pixels: batch };
    if let Err(error) = peer.publish(SYNC_EVENT, &payload).await {
        warn!(%canvas_id, cells = broadcast, %error, "broadcast failed; cells requeued");
        session.lock().await.propagation().broadcast_failed(payload.pixels);
        return FlushOutcome::BroadcastFailed(error);
    }
    debug!(%canvas_id, cells = broadcast, "broadcast sent");

    let Some(snapshot) = session.lock().await.propagation().broadcast_acked() else {
        debug!(%canvas_id, "newer paints queued; persistence deferred");
        return FlushOutcome::Broadcast { cells: broadcast };
    };

    match store.update_drawing(canvas_id, &snapshot).await {
        Ok(()) => {
            session.lock().await.propagation().persist_succeeded(&snapshot);
            info!(%canvas_id, broadcast, persisted = snapshot.len(), "flush complete");
            FlushOutcome::Persisted { broadcast, persisted: snapshot.len() }
        }
        Err(error) => {
            warn!(%canvas_id, cells = snapshot.len(), %error, "persist failed; queue kept");
            session.lock().await.propagation().persist_failed();
            FlushOutcome::PersistFailed { broadcast, error }
        }
    }
}
