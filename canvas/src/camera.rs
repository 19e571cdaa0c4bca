#[cfg(test)]
#[path = "camera_test.rs"]
mod camera_test;

use crate::consts::{MAX_ZOOM, MIN_ZOOM};
use crate::grid::CellAddr;

/// The camera cannot map between screen and cell space.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum TransformError {
    /// Zoom is zero, negative, or not finite.
    #[error("camera zoom must be positive and finite, got {0}")]
    NonPositiveScale(f64),
}

/// A point in either screen or world space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    #[must_use]
    pub fn distance(self, other: Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

/// Axis-aligned rectangle in screen space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    #[must_use]
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.x + self.w * 0.5, self.y + self.h * 0.5)
    }

    /// Shrink the rectangle by `by` on every side.
    #[must_use]
    pub fn inset(&self, by: f64) -> Self {
        Self { x: self.x + by, y: self.y + by, w: self.w - 2.0 * by, h: self.h - 2.0 * by }
    }
}

/// World-space limits for `pan / zoom`, one pair per axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanBounds {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl PanBounds {
    /// Bounds that never clamp.
    #[must_use]
    pub fn unbounded() -> Self {
        Self { min_x: f64::NEG_INFINITY, max_x: f64::INFINITY, min_y: f64::NEG_INFINITY, max_y: f64::INFINITY }
    }
}

impl Default for PanBounds {
    fn default() -> Self {
        Self::unbounded()
    }
}

/// Camera state for pan/zoom over the grid.
///
/// `pan_x` / `pan_y` are the screen position of the world origin (the grid
/// center) in viewport pixels. `zoom` is a scale factor (1.0 = no zoom).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub pan_x: f64,
    pub pan_y: f64,
    pub zoom: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self { pan_x: 0.0, pan_y: 0.0, zoom: 1.0 }
    }
}

impl Camera {
    /// Convert a screen-space point to world coordinates.
    #[must_use]
    pub fn screen_to_world(&self, screen: Point) -> Point {
        Point { x: (screen.x - self.pan_x) / self.zoom, y: (screen.y - self.pan_y) / self.zoom }
    }

    /// Convert a world-space point to screen coordinates.
    #[must_use]
    pub fn world_to_screen(&self, world: Point) -> Point {
        Point { x: world.x * self.zoom + self.pan_x, y: world.y * self.zoom + self.pan_y }
    }

    /// Whether the zoom can be divided by.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.zoom.is_finite() && self.zoom > 0.0
    }

    /// Map a screen point to the grid cell under it.
    ///
    /// The result is not range-checked; cells outside the grid are returned
    /// as-is and are the caller's to ignore.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::NonPositiveScale`] if `zoom <= 0` or is not finite.
    #[allow(clippy::cast_possible_truncation)]
    pub fn screen_to_cell(&self, screen: Point, cell_size: f64) -> Result<CellAddr, TransformError> {
        if !self.is_valid() {
            return Err(TransformError::NonPositiveScale(self.zoom));
        }
        let world = self.screen_to_world(screen);
        Ok(CellAddr::new((world.x / cell_size).floor() as i32, (world.y / cell_size).floor() as i32))
    }

    /// Screen rectangle a cell occupies at the current pan/zoom.
    #[must_use]
    pub fn cell_to_canvas_rect(&self, cell: CellAddr, cell_size: f64) -> Rect {
        let size = cell_size * self.zoom;
        Rect::new(f64::from(cell.x) * size + self.pan_x, f64::from(cell.y) * size + self.pan_y, size, size)
    }

    /// Move the camera by a screen-space delta, keeping `pan / zoom` within `bounds`.
    pub fn pan_by(&mut self, dx: f64, dy: f64, bounds: &PanBounds) {
        self.pan_x = clamp_axis(self.pan_x + dx, self.zoom, bounds.min_x, bounds.max_x);
        self.pan_y = clamp_axis(self.pan_y + dy, self.zoom, bounds.min_y, bounds.max_y);
    }

    /// Multiply the zoom by `factor` while keeping the world point under
    /// `anchor` fixed on screen. The result is clamped to `[MIN_ZOOM, MAX_ZOOM]`.
    pub fn zoom_at(&mut self, anchor: Point, factor: f64) {
        if !self.is_valid() || !factor.is_finite() || factor <= 0.0 {
            return;
        }
        let world = self.screen_to_world(anchor);
        self.zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        self.pan_x = anchor.x - world.x * self.zoom;
        self.pan_y = anchor.y - world.y * self.zoom;
    }
}

fn clamp_axis(pan: f64, zoom: f64, min: f64, max: f64) -> f64 {
    if pan / zoom < min {
        min * zoom
    } else if pan / zoom > max {
        max * zoom
    } else {
        pan
    }
}

/// Position of a cell in a corner-indexed `dimension × dimension` buffer.
///
/// Cell addresses are centered on the grid origin while buffers start at the
/// top-left corner, so each axis is shifted by `dimension / 2`. Returns `None`
/// for cells outside the grid.
#[must_use]
pub fn cell_to_buffer_index(cell: CellAddr, dimension: u32) -> Option<(usize, usize)> {
    let half = i64::from(dimension / 2);
    let col = i64::from(cell.x) + half;
    let row = i64::from(cell.y) + half;
    let dim = i64::from(dimension);
    if !(0..dim).contains(&col) || !(0..dim).contains(&row) {
        return None;
    }
    match (usize::try_from(col), usize::try_from(row)) {
        (Ok(col), Ok(row)) => Some((col, row)),
        _ => None,
    }
}
