//! Shared numeric constants for the canvas crate.

// ── Grid ────────────────────────────────────────────────────────

/// Default number of cells along one axis of a canvas.
pub const DEFAULT_GRID_DIMENSION: u32 = 256;

/// Default size of one cell in world units at zoom 1.
pub const DEFAULT_CELL_SIZE: f64 = 1.0;

// ── Camera ──────────────────────────────────────────────────────

/// Smallest allowed zoom factor.
pub const MIN_ZOOM: f64 = 0.25;

/// Largest allowed zoom factor.
pub const MAX_ZOOM: f64 = 64.0;

/// Zoom multiplier applied per 100px of wheel delta.
pub const WHEEL_ZOOM_STEP: f64 = 1.1;

// ── Input ───────────────────────────────────────────────────────

/// Touch movement (screen pixels) at or beyond which a touch is a pan, not a paint.
pub const TOUCH_JITTER_PX: f64 = 5.0;

// ── Brush preview ───────────────────────────────────────────────

/// Inset of the preview swatch from the cell edge, in screen pixels.
pub const PREVIEW_INSET_PX: f64 = 2.0;

/// Border line width of the preview swatch, in screen pixels.
pub const PREVIEW_BORDER_PX: f64 = 2.0;

// ── Access gate ─────────────────────────────────────────────────

/// Maximum averaged distance (meters) from the canvas at which editing is allowed.
pub const EDIT_RADIUS_M: f64 = 20.0;

/// Number of recent distance samples averaged by the gate.
pub const DISTANCE_WINDOW: usize = 5;

/// Mean Earth radius in meters, for haversine distances.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Meters to feet.
pub const FEET_PER_METER: f64 = 3.280_84;
