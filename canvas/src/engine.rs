use std::sync::Arc;

use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::camera::Point;
use crate::color::{Color, ColorError};
use crate::consts::WHEEL_ZOOM_STEP;
use crate::grid::{CellAddr, Grid, GridConfig, PixelMap, PixelPatch, PixelRecord};
use crate::input::{Brush, Button, InputState, Mode, PointerEvent, PointerKind, Refusal, Scene, check_paint};
use crate::propagation::{Propagating, PropagationManager};
use crate::render::{BrushPreview, GridLayer, SceneObject, Surface, draw_scene};
use crate::sync::{CanvasRecord, SyncEnvelope, SyncError, SyncPayload};

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

/// Actions returned from input handlers for the host to process.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// A local paint changed a cell. It is already queued for propagation.
    CellPainted { cell: CellAddr, record: PixelRecord },
    RenderNeeded,
    /// The stroke ended; the host should run a flush cycle.
    FlushRequested,
}

/// Who is painting. Stamped on every cell this session changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Option<Uuid>,
    pub display_name: Option<String>,
}

/// Shared handle used by the flush driver.
pub type SessionHandle = Arc<Mutex<EngineCore>>;

/// Core engine state for one open canvas.
///
/// Owned by the host's interaction loop. Input handlers mutate it directly
/// and return [`Action`]s; network I/O happens outside, through
/// [`crate::propagation::flush_then_persist`] on a [`SessionHandle`].
pub struct EngineCore {
    pub scene: Scene,
    pub brush: Brush,
    pub input: InputState,
    grid: Grid,
    identity: Identity,
    edit_access: bool,
    propagation: PropagationManager,
    grid_layer: GridLayer,
    preview: BrushPreview,
    grid_stale: bool,
}

impl EngineCore {
    /// Start a session on an empty grid.
    #[must_use]
    pub fn new(canvas_id: Uuid, config: GridConfig, identity: Identity) -> Self {
        let grid = Grid::new(config);
        let brush = Brush::default();
        Self {
            scene: Scene::default(),
            preview: BrushPreview::new(config, brush.color.rgba()),
            grid_layer: GridLayer::new(&grid),
            brush,
            input: InputState::Idle,
            grid,
            identity,
            edit_access: false,
            propagation: PropagationManager::new(canvas_id),
            grid_stale: false,
        }
    }

    /// Start a session on a stored canvas, hydrated from its drawing.
    #[must_use]
    pub fn open(record: CanvasRecord, config: GridConfig, identity: Identity) -> Self {
        let mut core = Self::new(record.id, config, identity);
        core.load_snapshot(record.drawing);
        info!(canvas_id = %record.id, title = %record.title, cells = core.grid.len(), "canvas session opened");
        core
    }

    /// Wrap the session for sharing with the flush driver.
    #[must_use]
    pub fn into_handle(self) -> SessionHandle {
        Arc::new(Mutex::new(self))
    }

    // --- Data inputs ---

    /// Replace the grid with a storage snapshot.
    pub fn load_snapshot(&mut self, snapshot: PixelMap) {
        self.grid.hydrate(snapshot);
        self.grid_stale = true;
    }

    /// Apply a peer broadcast, one cell at a time. Returns how many cells changed.
    ///
    /// The last arrival wins and is stamped with the local clock, so edit
    /// times never move backwards. Cells off this grid are skipped.
    pub fn apply_remote(&mut self, payload: SyncPayload) -> usize {
        let total = payload.pixels.len();
        let now = OffsetDateTime::now_utc();
        let mut applied = 0;
        for (cell, record) in payload.pixels {
            if self.grid.merge(cell, PixelPatch::from_record(&record), now) {
                applied += 1;
            }
        }
        if applied < total {
            debug!(dropped = total - applied, "ignored off-grid cells from peer");
        }
        if applied > 0 {
            self.grid_stale = true;
        }
        applied
    }

    /// Decode a relayed text frame and apply its `sync` payload.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Payload`] if the frame is not a valid `sync`
    /// envelope; no cell is changed in that case.
    pub fn apply_remote_text(&mut self, text: &str) -> Result<usize, SyncError> {
        let payload = SyncEnvelope::parse(text)?.sync_payload()?;
        Ok(self.apply_remote(payload))
    }

    // --- Session settings ---

    /// Switch between viewing and editing. Any gesture in progress ends.
    pub fn set_mode(&mut self, mode: Mode) -> Vec<Action> {
        self.scene.mode = mode;
        self.end_gesture();
        vec![Action::RenderNeeded]
    }

    /// Select the brush color.
    ///
    /// # Errors
    ///
    /// Returns [`ColorError::Malformed`] and keeps the previous color if `hex`
    /// is not a valid hex color.
    pub fn set_brush_color(&mut self, hex: &str) -> Result<(), ColorError> {
        let color = Color::parse(hex)?;
        self.preview.set_color(color.rgba());
        self.brush.color = color;
        Ok(())
    }

    /// Update the location-derived access signal. Closing it ends a stroke.
    pub fn set_edit_access(&mut self, allowed: bool) {
        self.edit_access = allowed;
        if !allowed && self.input == InputState::Painting {
            self.end_gesture();
        }
    }

    /// Update viewport dimensions in screen pixels.
    pub fn set_viewport(&mut self, width: f64, height: f64) -> Vec<Action> {
        self.scene.viewport_width = width.max(0.0);
        self.scene.viewport_height = height.max(0.0);
        vec![Action::RenderNeeded]
    }

    /// Put the grid center in the middle of the viewport.
    pub fn center_camera(&mut self) {
        self.scene.camera.pan_x = self.scene.viewport_width * 0.5;
        self.scene.camera.pan_y = self.scene.viewport_height * 0.5;
    }

    // --- Input events ---

    pub fn on_pointer_down(&mut self, event: &PointerEvent) -> Vec<Action> {
        self.track_cursor(event);
        self.scene.cursor.active = event.button == Button::Primary;
        if event.kind == PointerKind::Touch {
            self.scene.cursor.touch_origin = Some(event.position);
        }
        for object in self.scene_objects_mut() {
            object.on_pointer_down(event);
        }

        let mut actions = Vec::new();
        match check_paint(&self.scene, event, self.edit_access) {
            Ok(()) => {
                self.input = InputState::Painting;
                self.brush.active = true;
                actions.extend(self.paint_at(event.position));
            }
            Err(refusal) if starts_pan(refusal, event) => {
                self.input = InputState::Panning { last_screen: event.position };
            }
            Err(_) => self.end_gesture(),
        }
        actions.push(Action::RenderNeeded);
        actions
    }

    pub fn on_pointer_move(&mut self, event: &PointerEvent) -> Vec<Action> {
        self.track_cursor(event);
        for object in self.scene_objects_mut() {
            object.on_pointer_move(event);
        }

        let mut actions = Vec::new();
        match self.input {
            InputState::Painting => match check_paint(&self.scene, event, self.edit_access) {
                Ok(()) => actions.extend(self.paint_at(event.position)),
                Err(refusal @ (Refusal::TouchCount | Refusal::TouchMoved)) => {
                    debug!(?refusal, "touch became a pan gesture");
                    self.brush.active = false;
                    self.input = InputState::Panning { last_screen: event.position };
                }
                Err(_) => self.end_gesture(),
            },
            InputState::Panning { last_screen } => {
                let (dx, dy) = (event.position.x - last_screen.x, event.position.y - last_screen.y);
                self.scene.camera.pan_by(dx, dy, &self.scene.pan_bounds);
                self.input = InputState::Panning { last_screen: event.position };
            }
            InputState::Idle => {}
        }
        actions.push(Action::RenderNeeded);
        actions
    }

    pub fn on_pointer_up(&mut self, event: &PointerEvent) -> Vec<Action> {
        self.track_cursor(event);
        for object in self.scene_objects_mut() {
            object.on_pointer_up(event);
        }

        // The release point gets its own paint even when down and move never
        // qualified. Only a pan gesture is exempt.
        let mut actions = Vec::new();
        let panning = matches!(self.input, InputState::Panning { .. });
        if !panning && check_paint(&self.scene, event, self.edit_access).is_ok() {
            actions.extend(self.paint_at(event.position));
        }
        self.end_gesture();
        self.scene.cursor.active = false;
        self.scene.cursor.touch_origin = None;
        actions.push(Action::RenderNeeded);
        actions.push(Action::FlushRequested);
        actions
    }

    /// Zoom about `position`. Positive `delta_y` zooms out, one step per 100px.
    pub fn on_wheel(&mut self, position: Point, delta_y: f64) -> Vec<Action> {
        let factor = WHEEL_ZOOM_STEP.powf(-delta_y / 100.0);
        self.scene.camera.zoom_at(position, factor);
        vec![Action::RenderNeeded]
    }

    // --- Render ---

    /// Draw the grid and the brush preview onto a fresh viewport-sized surface.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn render_frame(&mut self) -> Surface {
        if self.grid_stale {
            self.grid_layer.refresh(&self.grid);
            self.grid_stale = false;
        }
        self.preview.update(&self.scene);
        let width = self.scene.viewport_width.ceil().max(0.0) as u32;
        let height = self.scene.viewport_height.ceil().max(0.0) as u32;
        let mut surface = Surface::new(width, height);
        draw_scene(&mut surface, &self.scene, &[&self.grid_layer, &self.preview]);
        surface
    }

    // --- Queries ---

    #[must_use]
    pub fn canvas_id(&self) -> Uuid {
        self.propagation.canvas_id()
    }

    #[must_use]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    #[must_use]
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    #[must_use]
    pub fn edit_access(&self) -> bool {
        self.edit_access
    }

    #[must_use]
    pub fn pending(&self) -> &PropagationManager {
        &self.propagation
    }

    /// Cell under the brush preview after the last render, if shown.
    #[must_use]
    pub fn preview_cell(&self) -> Option<CellAddr> {
        self.preview.target()
    }

    // --- Internals ---

    fn track_cursor(&mut self, event: &PointerEvent) {
        let cursor = &mut self.scene.cursor;
        cursor.position = event.position;
        cursor.kind = event.kind;
        cursor.alternate_held = event.alternate_held;
        cursor.touches = event.touches;
    }

    fn end_gesture(&mut self) {
        self.input = InputState::Idle;
        self.brush.active = false;
    }

    fn scene_objects_mut(&mut self) -> [&mut dyn SceneObject; 2] {
        [&mut self.grid_layer, &mut self.preview]
    }

    /// Paint the cell under `position` with the brush.
    ///
    /// Off-grid cells and cells already showing the brush color are left alone.
    fn paint_at(&mut self, position: Point) -> Option<Action> {
        let cell = match self.scene.camera.screen_to_cell(position, self.grid.config().cell_size) {
            Ok(cell) => cell,
            Err(error) => {
                debug!(%error, "cannot map pointer to a cell");
                return None;
            }
        };
        if !self.grid.config().contains(cell) {
            return None;
        }
        if self.grid.get(cell).is_some_and(|r| r.color == self.brush.color) {
            return None;
        }
        let patch = PixelPatch {
            color: Some(self.brush.color.clone()),
            user_id: self.identity.user_id,
            user_name: self.identity.display_name.clone(),
        };
        if !self.grid.merge(cell, patch, OffsetDateTime::now_utc()) {
            return None;
        }
        let record = self.grid.get(cell)?.clone();
        self.propagation.enqueue(cell, record.clone());
        self.grid_stale = true;
        Some(Action::CellPainted { cell, record })
    }
}

impl Propagating for EngineCore {
    fn propagation(&mut self) -> &mut PropagationManager {
        &mut self.propagation
    }
}

/// Refusals that turn a pointer-down into a pan instead of nothing.
fn starts_pan(refusal: Refusal, event: &PointerEvent) -> bool {
    match refusal {
        Refusal::ViewMode => event.button == Button::Primary && !event.alternate_held,
        Refusal::TouchCount | Refusal::TouchMoved => true,
        _ => false,
    }
}
