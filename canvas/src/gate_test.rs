#![allow(clippy::float_cmp)]

use super::*;

const CANVAS: GeoPoint = GeoPoint { latitude: 40.7295, longitude: -73.9965 };

/// Meters per degree of latitude on the haversine sphere.
fn meters_per_degree() -> f64 {
    EARTH_RADIUS_M * std::f64::consts::PI / 180.0
}

/// A fix `meters` due north of the canvas.
fn fix_north(meters: f64) -> LocationFix {
    LocationFix::new(CANVAS.latitude + meters / meters_per_degree(), CANVAS.longitude)
}

fn approx(a: f64, b: f64, eps: f64) -> bool {
    (a - b).abs() < eps
}

// =============================================================
// Distance
// =============================================================

#[test]
fn same_point_is_zero() {
    assert_eq!(CANVAS.distance_m(CANVAS), 0.0);
}

#[test]
fn one_degree_of_latitude() {
    let d = GeoPoint::new(0.0, 0.0).distance_m(GeoPoint::new(1.0, 0.0));
    assert!(approx(d, 111_194.93, 0.1), "got {d}");
}

#[test]
fn distance_is_symmetric() {
    let other = GeoPoint::new(40.73, -73.99);
    assert!(approx(CANVAS.distance_m(other), other.distance_m(CANVAS), 1e-9));
}

// =============================================================
// LocationGate
// =============================================================

#[test]
fn new_gate_waits_for_location() {
    let gate = LocationGate::new(CANVAS);
    assert!(!gate.edit_access());
    assert!(gate.waiting_for_location());
    assert!(!gate.too_far());
    assert_eq!(gate.distance_m(), None);
    assert_eq!(gate.distance_feet(0), None);
}

#[test]
fn nearby_fix_opens_gate() {
    let mut gate = LocationGate::new(CANVAS);
    assert!(gate.record_fix(fix_north(5.0)));
    assert!(gate.edit_access());
    assert!(!gate.waiting_for_location());
    assert!(!gate.too_far());
}

#[test]
fn distant_fix_keeps_gate_closed() {
    let mut gate = LocationGate::new(CANVAS);
    assert!(!gate.record_fix(fix_north(100.0)));
    assert!(gate.too_far());
    assert!(!gate.waiting_for_location());
}

#[test]
fn access_follows_rolling_average() {
    let mut gate = LocationGate::new(CANVAS);
    for _ in 0..5 {
        gate.record_fix(fix_north(90.0));
    }
    assert!(!gate.edit_access());

    for _ in 0..4 {
        gate.record_fix(fix_north(0.0));
    }
    // window is [90, 0, 0, 0, 0]
    assert!(approx(gate.distance_m().unwrap(), 18.0, 1e-6));
    assert!(gate.edit_access());

    gate.record_fix(fix_north(0.0));
    assert!(approx(gate.distance_m().unwrap(), 0.0, 1e-6));
}

#[test]
fn radius_boundary_is_inclusive() {
    let mut gate = LocationGate::with_radius(CANVAS, 30.0);
    let d = fix_north(30.0).position.distance_m(CANVAS);
    let mut exact = LocationGate::with_radius(CANVAS, d);
    assert!(exact.record_fix(fix_north(30.0)));
    assert!(!gate.record_fix(fix_north(31.0)));
}

#[test]
fn error_closes_gate_but_keeps_samples() {
    let mut gate = LocationGate::new(CANVAS);
    gate.record_fix(fix_north(1.0));
    gate.record_error(LocationError::Timeout);
    assert!(!gate.edit_access());
    assert!(gate.distance_m().is_some());
    assert!(gate.too_far());
}

#[test]
fn feet_rounding() {
    let mut gate = LocationGate::new(CANVAS);
    gate.record_fix(fix_north(10.0));
    assert_eq!(gate.distance_feet(0), Some(33.0));
    assert_eq!(gate.distance_feet(2), Some(32.81));
}

#[test]
fn reset_forgets_everything() {
    let mut gate = LocationGate::new(CANVAS);
    gate.record_fix(fix_north(1.0));
    gate.reset();
    assert!(!gate.edit_access());
    assert!(gate.waiting_for_location());
}

// =============================================================
// watch
// =============================================================

#[tokio::test]
async fn watch_publishes_access_changes() {
    let gate = Arc::new(Mutex::new(LocationGate::new(CANVAS)));
    let (tx, rx) = mpsc::channel(4);
    let handle = watch(gate.clone(), rx);
    let mut access = handle.access();

    tx.send(Ok(fix_north(2.0))).await.unwrap();
    access.changed().await.unwrap();
    assert!(*access.borrow());

    tx.send(Err(LocationError::PermissionDenied)).await.unwrap();
    access.changed().await.unwrap();
    assert!(!*access.borrow());
    assert!(!gate.lock().await.edit_access());
}

#[tokio::test]
async fn stop_ends_the_watch() {
    let gate = Arc::new(Mutex::new(LocationGate::new(CANVAS)));
    let (tx, rx) = mpsc::channel(4);
    let handle = watch(gate.clone(), rx);
    let mut access = handle.access();

    handle.stop();
    assert!(access.changed().await.is_err(), "sender dropped with the task");
    assert!(tx.send(Ok(fix_north(1.0))).await.is_err());
    assert!(gate.lock().await.waiting_for_location());
}

#[tokio::test]
async fn watch_ends_when_fixes_close() {
    let gate = Arc::new(Mutex::new(LocationGate::new(CANVAS)));
    let (tx, rx) = mpsc::channel(4);
    let handle = watch(gate, rx);
    let mut access = handle.access();
    drop(tx);
    assert!(access.changed().await.is_err());
}
