//! Rendering: turns the grid into pixels and draws the scene onto a surface.
//!
//! The pipeline has two stages. [`rasterize`] writes one RGBA pixel per grid
//! cell into a [`PixelBuffer`] (white where nothing is painted). The buffer is
//! then scaled onto the viewport [`Surface`] with [`blit_nearest`], which uses
//! nearest-neighbor sampling so cells stay crisp at every zoom.
//!
//! Everything drawn on the surface is a [`SceneObject`]. [`draw_scene`] clears
//! the surface and renders a list of them bottom-first. [`GridLayer`] draws the
//! grid and [`BrushPreview`] draws the hover swatch in edit mode.
//!
//! Nothing here mutates grid or session state. Colors are validated when they
//! enter the system, so drawing cannot fail.

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;

use std::ops::Range;

use crate::camera::{Camera, Rect, cell_to_buffer_index};
use crate::color::Rgba;
use crate::consts::{PREVIEW_BORDER_PX, PREVIEW_INSET_PX};
use crate::grid::{CellAddr, Grid, GridConfig};
use crate::input::{PointerEvent, Scene};

/// Color of unpainted cells.
pub const BACKGROUND: Rgba = Rgba::WHITE;

// =============================================================
// Buffers
// =============================================================

/// Square RGBA buffer with one pixel per grid cell, row-major from the top-left.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    dimension: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// A `dimension × dimension` buffer filled with [`BACKGROUND`].
    #[must_use]
    pub fn new(dimension: u32) -> Self {
        let len = (dimension as usize) * (dimension as usize);
        Self { dimension, data: BACKGROUND.to_bytes().repeat(len) }
    }

    #[must_use]
    pub fn dimension(&self) -> u32 {
        self.dimension
    }

    /// Pixel at `(col, row)`, or `None` when out of bounds.
    #[must_use]
    pub fn pixel(&self, col: usize, row: usize) -> Option<Rgba> {
        let i = self.offset(col, row)?;
        Some(Rgba::new(self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]))
    }

    /// Overwrite the pixel at `(col, row)`. Out-of-bounds writes are ignored.
    pub fn set(&mut self, col: usize, row: usize, rgba: Rgba) {
        if let Some(i) = self.offset(col, row) {
            self.data[i..i + 4].copy_from_slice(&rgba.to_bytes());
        }
    }

    /// Raw RGBA bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    fn offset(&self, col: usize, row: usize) -> Option<usize> {
        let dim = self.dimension as usize;
        (col < dim && row < dim).then(|| (row * dim + col) * 4)
    }
}

/// Viewport-sized RGBA target that scene objects draw onto.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Surface {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Surface {
    /// A transparent surface of `width × height` pixels.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        let len = (width as usize) * (height as usize);
        Self { width, height, data: Rgba::TRANSPARENT.to_bytes().repeat(len) }
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA bytes, row-major.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        let i = self.offset(x, y)?;
        Some(Rgba::new(self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]))
    }

    /// Overwrite every pixel with `rgba`.
    pub fn clear(&mut self, rgba: Rgba) {
        let bytes = rgba.to_bytes();
        for px in self.data.chunks_exact_mut(4) {
            px.copy_from_slice(&bytes);
        }
    }

    /// Fill every pixel whose center lies inside `rect`, compositing `rgba` over it.
    pub fn fill_rect(&mut self, rect: Rect, rgba: Rgba) {
        for y in span(rect.y, rect.h, self.height) {
            for x in span(rect.x, rect.w, self.width) {
                self.blend(x, y, rgba);
            }
        }
    }

    /// Stroke the outline of `rect` with a `line_width` band centered on its edge.
    pub fn stroke_rect(&mut self, rect: Rect, line_width: f64, rgba: Rgba) {
        if line_width <= 0.0 {
            return;
        }
        let half = line_width * 0.5;
        let outer = rect.inset(-half);
        let inner = rect.inset(half);
        if inner.w <= 0.0 || inner.h <= 0.0 {
            self.fill_rect(outer, rgba);
            return;
        }
        self.fill_rect(Rect::new(outer.x, outer.y, outer.w, line_width), rgba);
        self.fill_rect(Rect::new(outer.x, inner.y + inner.h, outer.w, line_width), rgba);
        self.fill_rect(Rect::new(outer.x, inner.y, line_width, inner.h), rgba);
        self.fill_rect(Rect::new(inner.x + inner.w, inner.y, line_width, inner.h), rgba);
    }

    fn offset(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.width && y < self.height).then(|| (y as usize * self.width as usize + x as usize) * 4)
    }

    /// Source-over composite of `src` onto the pixel at `(x, y)`.
    fn blend(&mut self, x: u32, y: u32, src: Rgba) {
        let Some(i) = self.offset(x, y) else {
            return;
        };
        if src.a == u8::MAX {
            self.data[i..i + 4].copy_from_slice(&src.to_bytes());
            return;
        }
        let dst = Rgba::new(self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]);
        self.data[i..i + 4].copy_from_slice(&source_over(src, dst).to_bytes());
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn source_over(src: Rgba, dst: Rgba) -> Rgba {
    let sa = src.alpha();
    let da = dst.alpha();
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        return Rgba::TRANSPARENT;
    }
    let channel = |s: u8, d: u8| {
        let v = (f64::from(s) * sa + f64::from(d) * da * (1.0 - sa)) / out_a;
        v.round().clamp(0.0, 255.0) as u8
    };
    Rgba::new(
        channel(src.r, dst.r),
        channel(src.g, dst.g),
        channel(src.b, dst.b),
        (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    )
}

/// Pixel indices along one axis whose centers fall in `[start, start + len)`,
/// clipped to `[0, limit)`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn span(start: f64, len: f64, limit: u32) -> Range<u32> {
    if !start.is_finite() || !len.is_finite() || len <= 0.0 {
        return 0..0;
    }
    let max = f64::from(limit);
    let lo = (start - 0.5).ceil().clamp(0.0, max) as u32;
    let hi = (start + len - 0.5).ceil().clamp(0.0, max) as u32;
    lo..hi.max(lo)
}

// =============================================================
// Pipeline
// =============================================================

/// Rasterize the grid: one pixel per cell, background where unpainted.
#[must_use]
pub fn rasterize(grid: &Grid) -> PixelBuffer {
    let dimension = grid.config().dimension;
    let mut buffer = PixelBuffer::new(dimension);
    for (cell, record) in grid.iter() {
        if let Some((col, row)) = cell_to_buffer_index(*cell, dimension) {
            buffer.set(col, row, record.color.rgba());
        }
    }
    buffer
}

/// Screen rectangle covered by the whole grid at the current pan/zoom.
#[must_use]
pub fn grid_dest_rect(config: &GridConfig, camera: &Camera) -> Rect {
    let cell_draw = config.cell_size * camera.zoom;
    #[allow(clippy::cast_precision_loss)]
    let min = config.min_coord() as f64;
    let size = f64::from(config.dimension) * cell_draw;
    Rect::new(min * cell_draw + camera.pan_x, min * cell_draw + camera.pan_y, size, size)
}

/// Scale `buffer` into `dest` on `surface` with nearest-neighbor sampling.
///
/// Only surface pixels whose centers fall inside `dest` are written.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn blit_nearest(buffer: &PixelBuffer, surface: &mut Surface, dest: Rect) {
    let dim = buffer.dimension();
    if dim == 0 || dest.w <= 0.0 || dest.h <= 0.0 {
        return;
    }
    let dim_f = f64::from(dim);
    let max_index = (dim - 1) as usize;
    for y in span(dest.y, dest.h, surface.height()) {
        let v = ((f64::from(y) + 0.5 - dest.y) / dest.h * dim_f).floor().max(0.0) as usize;
        let row = v.min(max_index);
        for x in span(dest.x, dest.w, surface.width()) {
            let u = ((f64::from(x) + 0.5 - dest.x) / dest.w * dim_f).floor().max(0.0) as usize;
            if let Some(rgba) = buffer.pixel(u.min(max_index), row) {
                surface.blend(x, y, rgba);
            }
        }
    }
}

// =============================================================
// Scene objects
// =============================================================

/// Anything drawn on the surface. Pointer hooks default to no-ops.
pub trait SceneObject {
    fn render(&self, surface: &mut Surface, scene: &Scene);

    /// Refresh derived state before the next frame.
    fn update(&mut self, _scene: &Scene) {}

    fn on_pointer_down(&mut self, _event: &PointerEvent) {}

    fn on_pointer_move(&mut self, _event: &PointerEvent) {}

    fn on_pointer_up(&mut self, _event: &PointerEvent) {}
}

/// Clear `surface` and render `objects` bottom-first.
pub fn draw_scene(surface: &mut Surface, scene: &Scene, objects: &[&dyn SceneObject]) {
    surface.clear(Rgba::TRANSPARENT);
    for object in objects {
        object.render(surface, scene);
    }
}

/// The painted grid, cached as a raster until the grid changes.
#[derive(Debug, Clone)]
pub struct GridLayer {
    config: GridConfig,
    buffer: PixelBuffer,
}

impl GridLayer {
    #[must_use]
    pub fn new(grid: &Grid) -> Self {
        Self { config: *grid.config(), buffer: rasterize(grid) }
    }

    /// Re-rasterize after the grid changed.
    pub fn refresh(&mut self, grid: &Grid) {
        self.config = *grid.config();
        self.buffer = rasterize(grid);
    }

    #[must_use]
    pub fn buffer(&self) -> &PixelBuffer {
        &self.buffer
    }
}

impl SceneObject for GridLayer {
    fn render(&self, surface: &mut Surface, scene: &Scene) {
        blit_nearest(&self.buffer, surface, grid_dest_rect(&self.config, &scene.camera));
    }
}

/// Hover swatch showing which cell the brush would paint.
///
/// Visible only in edit mode with non-touch input and the cursor over a cell
/// on the grid. The target is recomputed on every [`SceneObject::update`].
#[derive(Debug, Clone)]
pub struct BrushPreview {
    config: GridConfig,
    color: Rgba,
    target: Option<CellAddr>,
}

impl BrushPreview {
    #[must_use]
    pub fn new(config: GridConfig, color: Rgba) -> Self {
        Self { config, color, target: None }
    }

    pub fn set_color(&mut self, color: Rgba) {
        self.color = color;
    }

    /// Cell the preview is currently drawn over.
    #[must_use]
    pub fn target(&self) -> Option<CellAddr> {
        self.target
    }
}

impl SceneObject for BrushPreview {
    fn update(&mut self, scene: &Scene) {
        self.target = None;
        if !scene.shows_brush_preview() || !scene.in_viewport(scene.cursor.position) {
            return;
        }
        if let Ok(cell) = scene.camera.screen_to_cell(scene.cursor.position, self.config.cell_size) {
            if self.config.contains(cell) {
                self.target = Some(cell);
            }
        }
    }

    fn render(&self, surface: &mut Surface, scene: &Scene) {
        let Some(cell) = self.target else {
            return;
        };
        let bounds = scene.camera.cell_to_canvas_rect(cell, self.config.cell_size);
        let swatch = bounds.inset(PREVIEW_INSET_PX);
        if swatch.w <= 0.0 || swatch.h <= 0.0 {
            return;
        }
        // Strokes straddle their rect: black on the cell edge, white on the swatch edge.
        surface.fill_rect(swatch, self.color);
        surface.stroke_rect(bounds, PREVIEW_BORDER_PX, Rgba::BLACK);
        surface.stroke_rect(swatch, PREVIEW_BORDER_PX, Rgba::WHITE);
    }
}
