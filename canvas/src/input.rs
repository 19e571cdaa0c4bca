//! Input model: pointer events, scene state, and the edit-intake gates.
//!
//! This module defines the types consumed by the engine's pointer handlers.
//! `PointerEvent` is one raw mouse or touch event in viewport coordinates.
//! `Scene` is the live view state (camera, viewport, mode, cursor) shared by
//! the transform and the renderer. `InputState` is the gesture in progress
//! between pointer-down and pointer-up, and [`check_paint`] decides whether
//! a pointer position may paint at all.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use crate::camera::{Camera, PanBounds, Point, Rect};
use crate::color::{Color, default_brush_color};
use crate::consts::TOUCH_JITTER_PX;

/// Whether the session is looking at the canvas or painting on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Pan and zoom only (default).
    #[default]
    View,
    /// Pointer presses paint cells.
    Edit,
}

/// Device that produced a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerKind {
    #[default]
    Mouse,
    Touch,
}

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Button {
    /// Left mouse button (or a single finger).
    #[default]
    Primary,
    /// Middle mouse button (scroll wheel click).
    Middle,
    /// Right mouse button.
    Secondary,
}

/// One pointer or touch event, positioned relative to the viewport's top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub position: Point,
    pub kind: PointerKind,
    /// Button that changed state (down/up). Moves report `Primary`.
    pub button: Button,
    /// Any secondary or alternate button is currently held.
    pub alternate_held: bool,
    /// Active touch points in the gesture. Zero for mouse input.
    pub touches: u32,
}

impl PointerEvent {
    /// Primary-button mouse event.
    #[must_use]
    pub fn mouse(x: f64, y: f64) -> Self {
        Self { position: Point::new(x, y), kind: PointerKind::Mouse, button: Button::Primary, alternate_held: false, touches: 0 }
    }

    /// Touch event with `touches` active points.
    #[must_use]
    pub fn touch(x: f64, y: f64, touches: u32) -> Self {
        Self { position: Point::new(x, y), kind: PointerKind::Touch, button: Button::Primary, alternate_held: false, touches }
    }

    #[must_use]
    pub fn with_button(mut self, button: Button) -> Self {
        self.button = button;
        self.alternate_held |= button != Button::Primary;
        self
    }
}

/// Live pointer state, updated on every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cursor {
    /// Last known pointer position, viewport-relative.
    pub position: Point,
    pub kind: PointerKind,
    /// Primary button or finger is down.
    pub active: bool,
    /// A secondary or alternate button is held.
    pub alternate_held: bool,
    /// Touch points in the current gesture.
    pub touches: u32,
    /// Where the current touch gesture started.
    pub touch_origin: Option<Point>,
}

/// View state for one open canvas.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub camera: Camera,
    pub pan_bounds: PanBounds,
    pub viewport_width: f64,
    pub viewport_height: f64,
    pub mode: Mode,
    pub cursor: Cursor,
}

impl Scene {
    /// Whether `p` lies inside the viewport, edges included.
    #[must_use]
    pub fn in_viewport(&self, p: Point) -> bool {
        p.x >= 0.0 && p.x <= self.viewport_width && p.y >= 0.0 && p.y <= self.viewport_height
    }

    /// Whether the brush preview should be drawn this frame.
    #[must_use]
    pub fn shows_brush_preview(&self) -> bool {
        self.mode == Mode::Edit && self.cursor.kind != PointerKind::Touch
    }
}

/// The user's paint color and whether a stroke is in progress.
#[derive(Debug, Clone, PartialEq)]
pub struct Brush {
    pub color: Color,
    pub active: bool,
}

impl Default for Brush {
    fn default() -> Self {
        Self { color: default_brush_color(), active: false }
    }
}

/// The gesture being tracked between pointer-down and pointer-up.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum InputState {
    /// No gesture in progress; waiting for the next pointer-down.
    #[default]
    Idle,
    /// Each qualifying move paints the cell under the pointer.
    Painting,
    /// The user is dragging the canvas.
    Panning {
        /// Screen-space position of the previous pointer event, used to compute pan delta.
        last_screen: Point,
    },
}

/// Why a pointer position may not paint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refusal {
    ViewMode,
    OutsideViewport,
    AlternateButton,
    NoEditAccess,
    /// Zero or several fingers down.
    TouchCount,
    /// The finger moved far enough to be a pan/zoom gesture.
    TouchMoved,
}

/// Decide whether `event` may paint given the scene and the access gate.
///
/// Touch movement is measured from `scene.cursor.touch_origin`.
///
/// # Errors
///
/// Returns the first failed condition as a [`Refusal`].
pub fn check_paint(scene: &Scene, event: &PointerEvent, edit_access: bool) -> Result<(), Refusal> {
    if scene.mode != Mode::Edit {
        return Err(Refusal::ViewMode);
    }
    if event.alternate_held || event.button == Button::Secondary {
        return Err(Refusal::AlternateButton);
    }
    if !scene.in_viewport(event.position) {
        return Err(Refusal::OutsideViewport);
    }
    if !edit_access {
        return Err(Refusal::NoEditAccess);
    }
    if event.kind == PointerKind::Touch {
        if event.touches != 1 {
            return Err(Refusal::TouchCount);
        }
        let origin = scene.cursor.touch_origin.unwrap_or(event.position);
        if origin.distance(event.position) >= TOUCH_JITTER_PX {
            return Err(Refusal::TouchMoved);
        }
    }
    Ok(())
}

/// Average position of the touch points inside `bounds` (all points when `None`).
///
/// Returns the average and the number of points counted, or `None` when no
/// point qualifies.
#[must_use]
pub fn average_touch_point(points: &[Point], bounds: Option<Rect>) -> Option<(Point, u32)> {
    let inside = |p: &&Point| bounds.is_none_or(|r| p.x >= r.x && p.x <= r.x + r.w && p.y >= r.y && p.y <= r.y + r.h);
    let (sum, count) = points
        .iter()
        .filter(inside)
        .fold((Point::new(0.0, 0.0), 0u32), |(acc, n), p| (Point::new(acc.x + p.x, acc.y + p.y), n + 1));
    if count == 0 {
        return None;
    }
    let n = f64::from(count);
    Some((Point::new(sum.x / n, sum.y / n), count))
}
