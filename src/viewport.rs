//! World/screen coordinate transform.
//!
//! World coordinates are meters with Y pointing up. Screen coordinates are
//! canvas-local pixels with Y pointing down and the origin at the canvas'
//! top-left corner. The world rectangle is fitted into the canvas with a single
//! uniform scale (the smaller of the two axis ratios) so grid cells stay
//! square; zoom is applied about the canvas center and the pan offset is added
//! last.

use crate::constants::{
    BOUNDS_PADDING_RATIO, DEGENERATE_EXTENT_M, DEGENERATE_HALF_WINDOW_M, MIN_BOUNDS_PADDING_M,
};
use eframe::egui;
use serde::{Deserialize, Serialize};

/// A point in world space (meters).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WorldPoint {
    /// X in meters
    pub x: f64,
    /// Y in meters
    pub y: f64,
}

impl WorldPoint {
    /// Creates a new world point.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A point in canvas-local screen space (pixels).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenPoint {
    /// X in pixels from the left edge
    pub x: f64,
    /// Y in pixels from the top edge
    pub y: f64,
}

impl ScreenPoint {
    /// Creates a new screen point.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Converts to an egui position, offset by the canvas origin.
    pub fn to_pos2(self, origin: egui::Pos2) -> egui::Pos2 {
        egui::pos2(origin.x + self.x as f32, origin.y + self.y as f32)
    }

    /// Converts an egui position into canvas-local coordinates.
    pub fn from_pos2(pos: egui::Pos2, origin: egui::Pos2) -> Self {
        Self::new((pos.x - origin.x) as f64, (pos.y - origin.y) as f64)
    }
}

/// Size of the rendering surface in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasSize {
    /// Width in pixels
    pub width: f64,
    /// Height in pixels
    pub height: f64,
}

impl CanvasSize {
    /// Creates a canvas size, clamping each side to at least one pixel.
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width: width.max(1.0),
            height: height.max(1.0),
        }
    }

    /// The canvas center in screen coordinates.
    pub fn center(&self) -> ScreenPoint {
        ScreenPoint::new(self.width / 2.0, self.height / 2.0)
    }

    /// Width divided by height.
    pub fn aspect(&self) -> f64 {
        self.width / self.height
    }
}

impl From<egui::Vec2> for CanvasSize {
    fn from(size: egui::Vec2) -> Self {
        Self::new(size.x as f64, size.y as f64)
    }
}

/// An axis-aligned rectangle in world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldRect {
    /// Left edge
    pub min_x: f64,
    /// Bottom edge
    pub min_y: f64,
    /// Right edge
    pub max_x: f64,
    /// Top edge
    pub max_y: f64,
}

impl Default for WorldRect {
    fn default() -> Self {
        Self::from_center(WorldPoint::default(), DEGENERATE_HALF_WINDOW_M, DEGENERATE_HALF_WINDOW_M)
    }
}

impl WorldRect {
    /// Creates a rectangle from its edges.
    pub const fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Creates a rectangle from a center point and half extents.
    pub fn from_center(center: WorldPoint, half_width: f64, half_height: f64) -> Self {
        Self::new(
            center.x - half_width,
            center.y - half_height,
            center.x + half_width,
            center.y + half_height,
        )
    }

    /// Width in meters.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height in meters.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Center point.
    pub fn center(&self) -> WorldPoint {
        WorldPoint::new((self.min_x + self.max_x) / 2.0, (self.min_y + self.max_y) / 2.0)
    }

    /// Returns true if `p` lies inside or on the edge of the rectangle.
    pub fn contains(&self, p: WorldPoint) -> bool {
        p.x >= self.min_x && p.x <= self.max_x && p.y >= self.min_y && p.y <= self.max_y
    }
}

/// Zoom and pan applied on top of the fitted base scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// Zoom factor, `1.0` shows the whole world rectangle
    pub zoom: f64,
    /// Screen-space pan offset in pixels
    pub pan: ScreenPoint,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan: ScreenPoint::default(),
        }
    }
}

/// A world rectangle fitted into a canvas of a given pixel size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// World-space rectangle that fits the canvas at zoom 1
    pub world: WorldRect,
    /// Pixel size of the canvas
    pub canvas: CanvasSize,
}

impl Viewport {
    /// Creates a new viewport.
    pub fn new(world: WorldRect, canvas: CanvasSize) -> Self {
        Self { world, canvas }
    }

    /// Pixels per meter at zoom 1, the smaller of the two axis ratios.
    pub fn base_scale(&self) -> f64 {
        let sx = self.canvas.width / self.world.width().max(f64::MIN_POSITIVE);
        let sy = self.canvas.height / self.world.height().max(f64::MIN_POSITIVE);
        sx.min(sy)
    }

    /// Pixels per meter with `transform` applied.
    pub fn scale(&self, transform: &Transform) -> f64 {
        self.base_scale() * transform.zoom
    }

    /// Maps a world point to canvas-local screen coordinates.
    pub fn world_to_screen(&self, p: WorldPoint, transform: &Transform) -> ScreenPoint {
        let scale = self.scale(transform);
        let wc = self.world.center();
        let cc = self.canvas.center();
        ScreenPoint::new(
            cc.x + (p.x - wc.x) * scale + transform.pan.x,
            cc.y - (p.y - wc.y) * scale + transform.pan.y,
        )
    }

    /// Maps canvas-local screen coordinates back to world space.
    pub fn screen_to_world(&self, s: ScreenPoint, transform: &Transform) -> WorldPoint {
        let scale = self.scale(transform);
        let wc = self.world.center();
        let cc = self.canvas.center();
        WorldPoint::new(
            wc.x + (s.x - cc.x - transform.pan.x) / scale,
            wc.y - (s.y - cc.y - transform.pan.y) / scale,
        )
    }

    /// World-space extent currently visible, grown by `margin_px` on every side.
    pub fn visible_world_rect(&self, transform: &Transform, margin_px: f64) -> WorldRect {
        let top_left = self.screen_to_world(ScreenPoint::new(-margin_px, -margin_px), transform);
        let bottom_right = self.screen_to_world(
            ScreenPoint::new(self.canvas.width + margin_px, self.canvas.height + margin_px),
            transform,
        );
        WorldRect::new(top_left.x, bottom_right.y, bottom_right.x, top_left.y)
    }
}

/// Pads `(min, max)` along one axis, falling back to a fixed window for degenerate extents.
fn padded_axis(min: f64, max: f64) -> (f64, f64) {
    let extent = max - min;
    if extent < DEGENERATE_EXTENT_M {
        let center = (min + max) / 2.0;
        return (center - DEGENERATE_HALF_WINDOW_M, center + DEGENERATE_HALF_WINDOW_M);
    }
    let pad = MIN_BOUNDS_PADDING_M.max(extent * BOUNDS_PADDING_RATIO);
    (min - pad, max + pad)
}

/// Computes padded auto-fit bounds for `points`, expanded to the canvas aspect ratio.
///
/// With no points a `±1 m` window around the origin is returned.
pub fn compute_bounds<I>(points: I, canvas: CanvasSize) -> WorldRect
where
    I: IntoIterator<Item = WorldPoint>,
{
    let mut min_x = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for p in points.into_iter().filter(|p| p.x.is_finite() && p.y.is_finite()) {
        min_x = min_x.min(p.x);
        max_x = max_x.max(p.x);
        min_y = min_y.min(p.y);
        max_y = max_y.max(p.y);
    }
    if min_x > max_x {
        return match_aspect(WorldRect::default(), canvas);
    }

    let (min_x, max_x) = padded_axis(min_x, max_x);
    let (min_y, max_y) = padded_axis(min_y, max_y);
    match_aspect(WorldRect::new(min_x, min_y, max_x, max_y), canvas)
}

/// Expands the narrower axis of `rect` about its center to match the canvas aspect ratio.
pub fn match_aspect(rect: WorldRect, canvas: CanvasSize) -> WorldRect {
    let target = canvas.aspect();
    let center = rect.center();
    let (w, h) = (rect.width(), rect.height());
    if w / h < target {
        WorldRect::from_center(center, h * target / 2.0, h / 2.0)
    } else {
        WorldRect::from_center(center, w / 2.0, w / target / 2.0)
    }
}
