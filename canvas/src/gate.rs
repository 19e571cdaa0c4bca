//! Access gate: decides from the user's location whether they may paint.
//!
//! A canvas lives at a fixed latitude/longitude. [`LocationGate`] keeps the
//! last few distances between the user and the canvas and opens only while
//! their average is within [`EDIT_RADIUS_M`]. Any location error closes it.
//!
//! Location fixes come from the host. [`watch`] consumes them from a channel
//! on a background task, updates a shared gate, and publishes the resulting
//! edit-access boolean. The returned [`WatchHandle`] stops the task.
//!
//! The engine only ever sees the boolean.

#[cfg(test)]
#[path = "gate_test.rs"]
mod gate_test;

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc, watch as watch_channel};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::consts::{DISTANCE_WINDOW, EARTH_RADIUS_M, EDIT_RADIUS_M, FEET_PER_METER};

/// A position on Earth in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Great-circle distance in meters (haversine).
    #[must_use]
    pub fn distance_m(self, other: GeoPoint) -> f64 {
        let (lat1, lat2) = (self.latitude.to_radians(), other.latitude.to_radians());
        let d_lat = lat2 - lat1;
        let d_lon = (other.longitude - self.longitude).to_radians();
        let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
    }
}

/// One position reading from the device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationFix {
    pub position: GeoPoint,
    /// Reported accuracy radius in meters, when known.
    pub accuracy_m: Option<f64>,
}

impl LocationFix {
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { position: GeoPoint::new(latitude, longitude), accuracy_m: None }
    }
}

/// Why a location reading failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LocationError {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("location unavailable")]
    Unavailable,
    #[error("location request timed out")]
    Timeout,
    #[error("location not supported on this device")]
    Unsupported,
}

/// Session-scoped location context for one canvas.
#[derive(Debug, Clone)]
pub struct LocationGate {
    canvas: GeoPoint,
    radius_m: f64,
    samples: VecDeque<f64>,
    edit_access: bool,
}

impl LocationGate {
    /// Gate for a canvas at `canvas` with the default edit radius.
    #[must_use]
    pub fn new(canvas: GeoPoint) -> Self {
        Self::with_radius(canvas, EDIT_RADIUS_M)
    }

    #[must_use]
    pub fn with_radius(canvas: GeoPoint, radius_m: f64) -> Self {
        Self { canvas, radius_m, samples: VecDeque::with_capacity(DISTANCE_WINDOW), edit_access: false }
    }

    /// Record a fix and re-evaluate access. Returns the new access value.
    pub fn record_fix(&mut self, fix: LocationFix) -> bool {
        let distance = fix.position.distance_m(self.canvas);
        if self.samples.len() == DISTANCE_WINDOW {
            self.samples.pop_front();
        }
        self.samples.push_back(distance);
        self.edit_access = self.distance_m().is_some_and(|avg| avg <= self.radius_m);
        debug!(distance, edit_access = self.edit_access, "location fix recorded");
        self.edit_access
    }

    /// A location error closes the gate. Earlier samples are kept.
    pub fn record_error(&mut self, error: LocationError) {
        warn!(%error, "location error; edit access revoked");
        self.edit_access = false;
    }

    #[must_use]
    pub fn edit_access(&self) -> bool {
        self.edit_access
    }

    /// Average of the recent distance samples in meters, `None` before the first fix.
    #[must_use]
    pub fn distance_m(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        let n = self.samples.len() as f64;
        Some(self.samples.iter().sum::<f64>() / n)
    }

    /// Average distance in feet, rounded to `decimals` places.
    #[must_use]
    pub fn distance_feet(&self, decimals: u8) -> Option<f64> {
        let factor = 10f64.powi(i32::from(decimals));
        self.distance_m().map(|m| (m * FEET_PER_METER * factor).round() / factor)
    }

    /// No distance has been recorded yet.
    #[must_use]
    pub fn waiting_for_location(&self) -> bool {
        self.samples.is_empty()
    }

    /// A distance is known and it keeps the gate closed.
    #[must_use]
    pub fn too_far(&self) -> bool {
        !self.edit_access && !self.samples.is_empty()
    }

    /// Forget all samples and close the gate.
    pub fn reset(&mut self) {
        self.samples.clear();
        self.edit_access = false;
    }
}

// =============================================================
// Watch task
// =============================================================

/// Stops the location watch when asked or dropped.
#[derive(Debug)]
pub struct WatchHandle {
    task: JoinHandle<()>,
    access: watch_channel::Receiver<bool>,
}

impl WatchHandle {
    /// Receiver of the edit-access value after every reading.
    #[must_use]
    pub fn access(&self) -> watch_channel::Receiver<bool> {
        self.access.clone()
    }

    pub fn stop(&self) {
        self.task.abort();
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Feed readings from `fixes` into `gate` on a background task.
///
/// The task ends when the sender side closes or the handle stops it. Must be
/// called from within a tokio runtime.
pub fn watch(
    gate: Arc<Mutex<LocationGate>>,
    mut fixes: mpsc::Receiver<Result<LocationFix, LocationError>>,
) -> WatchHandle {
    let (tx, access) = watch_channel::channel(false);
    let task = tokio::spawn(async move {
        while let Some(reading) = fixes.recv().await {
            let allowed = {
                let mut gate = gate.lock().await;
                match reading {
                    Ok(fix) => gate.record_fix(fix),
                    Err(error) => {
                        gate.record_error(error);
                        false
                    }
                }
            };
            tx.send_replace(allowed);
        }
        debug!("location watch ended");
    });
    WatchHandle { task, access }
}
