//! Viewport controller: zoom/pan state driven by abstract input events.
//!
//! The controller knows nothing about egui input; the canvas translates raw
//! pointer, scroll and key events into calls to [`ViewportController::on_wheel`],
//! [`ViewportController::on_drag_delta`], [`ViewportController::on_key`] and
//! [`ViewportController::on_resize`]. Each returns the resulting [`Transform`].

use crate::constants::{
    DEFAULT_CANVAS_SIZE, KEY_PAN_STEP_PX, MAX_ZOOM, MIN_MANUAL_EXTENT_M, MIN_ZOOM,
    TARGET_TICK_SPACING_PX, VISIBLE_MARGIN_PX, WHEEL_ZOOM_STEP,
};
use crate::ticks::GridTicks;
use crate::viewport::*;

/// Keyboard commands understood by the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKey {
    /// Show more of the left side
    PanLeft,
    /// Show more of the right side
    PanRight,
    /// Show more of the top
    PanUp,
    /// Show more of the bottom
    PanDown,
    /// Zoom in about the canvas center
    ZoomIn,
    /// Zoom out about the canvas center
    ZoomOut,
    /// Return to the auto-fit view
    Reset,
}

/// Owns zoom, pan, the observed canvas size and the auto-fit bounds.
#[derive(Debug, Clone)]
pub struct ViewportController {
    transform: Transform,
    canvas: CanvasSize,
    fit_points: Vec<WorldPoint>,
    auto_bounds: WorldRect,
    manual_bounds: Option<WorldRect>,
}

impl Default for ViewportController {
    fn default() -> Self {
        let canvas = CanvasSize::new(DEFAULT_CANVAS_SIZE.0, DEFAULT_CANVAS_SIZE.1);
        Self {
            transform: Transform::default(),
            canvas,
            fit_points: Vec::new(),
            auto_bounds: compute_bounds(std::iter::empty(), canvas),
            manual_bounds: None,
        }
    }
}

impl ViewportController {
    /// Current zoom and pan.
    pub fn transform(&self) -> Transform {
        self.transform
    }

    /// Current zoom factor.
    pub fn zoom(&self) -> f64 {
        self.transform.zoom
    }

    /// Last observed canvas size.
    pub fn canvas_size(&self) -> CanvasSize {
        self.canvas
    }

    /// Manual bounds overriding auto-fit, if set.
    pub fn manual_bounds(&self) -> Option<WorldRect> {
        self.manual_bounds
    }

    /// The world rectangle fitted into the canvas at zoom 1.
    pub fn world_bounds(&self) -> WorldRect {
        match self.manual_bounds {
            Some(rect) => match_aspect(rect, self.canvas),
            None => self.auto_bounds,
        }
    }

    /// The viewport for the current bounds and canvas size.
    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.world_bounds(), self.canvas)
    }

    /// Maps a world point to canvas-local screen coordinates.
    pub fn world_to_screen(&self, p: WorldPoint) -> ScreenPoint {
        self.viewport().world_to_screen(p, &self.transform)
    }

    /// Maps canvas-local screen coordinates to world space.
    pub fn screen_to_world(&self, s: ScreenPoint) -> WorldPoint {
        self.viewport().screen_to_world(s, &self.transform)
    }

    /// World extent currently on screen, with a margin for grid lines.
    pub fn visible_world_rect(&self) -> WorldRect {
        self.viewport()
            .visible_world_rect(&self.transform, VISIBLE_MARGIN_PX)
    }

    /// Grid ticks for the visible extent.
    pub fn grid_ticks(&self) -> GridTicks {
        GridTicks::for_view(&self.visible_world_rect(), self.canvas, TARGET_TICK_SPACING_PX)
    }

    /// Multiplies the zoom by `factor`, keeping the world point under `anchor` fixed.
    pub fn zoom_at(&mut self, factor: f64, anchor: ScreenPoint) -> Transform {
        let viewport = self.viewport();
        let world = viewport.screen_to_world(anchor, &self.transform);
        let zoom = (self.transform.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        if (zoom - self.transform.zoom).abs() <= f64::EPSILON * zoom {
            return self.transform;
        }
        self.transform.zoom = zoom;
        let moved = viewport.world_to_screen(world, &self.transform);
        self.transform.pan.x += anchor.x - moved.x;
        self.transform.pan.y += anchor.y - moved.y;
        self.transform
    }

    /// Scroll input: positive `scroll_delta` zooms in, negative zooms out, anchored at `anchor`.
    pub fn on_wheel(&mut self, scroll_delta: f64, anchor: ScreenPoint) -> Transform {
        if scroll_delta > 0.0 {
            self.zoom_at(WHEEL_ZOOM_STEP, anchor)
        } else if scroll_delta < 0.0 {
            self.zoom_at(1.0 / WHEEL_ZOOM_STEP, anchor)
        } else {
            self.transform
        }
    }

    /// Pointer drag: `delta` is measured in rendered (client) pixels and converted
    /// to canvas pixels through the ratio of canvas size to `rendered` size.
    pub fn on_drag_delta(&mut self, delta: ScreenPoint, rendered: CanvasSize) -> Transform {
        self.transform.pan.x += delta.x * self.canvas.width / rendered.width;
        self.transform.pan.y += delta.y * self.canvas.height / rendered.height;
        self.transform
    }

    /// Keyboard input.
    pub fn on_key(&mut self, key: ViewKey) -> Transform {
        let center = self.canvas.center();
        match key {
            ViewKey::PanLeft => self.transform.pan.x += KEY_PAN_STEP_PX,
            ViewKey::PanRight => self.transform.pan.x -= KEY_PAN_STEP_PX,
            ViewKey::PanUp => self.transform.pan.y += KEY_PAN_STEP_PX,
            ViewKey::PanDown => self.transform.pan.y -= KEY_PAN_STEP_PX,
            ViewKey::ZoomIn => return self.zoom_at(WHEEL_ZOOM_STEP, center),
            ViewKey::ZoomOut => return self.zoom_at(1.0 / WHEEL_ZOOM_STEP, center),
            ViewKey::Reset => return self.reset(),
        }
        self.transform
    }

    /// Records the observed canvas size. Returns true if it changed.
    pub fn on_resize(&mut self, size: CanvasSize) -> bool {
        if (size.width - self.canvas.width).abs() < 0.5
            && (size.height - self.canvas.height).abs() < 0.5
        {
            return false;
        }
        self.canvas = size;
        self.auto_bounds = compute_bounds(self.fit_points.iter().copied(), size);
        true
    }

    /// Recomputes auto-fit bounds from `points` and resets zoom and pan.
    pub fn fit<I>(&mut self, points: I) -> Transform
    where
        I: IntoIterator<Item = WorldPoint>,
    {
        self.fit_points = points.into_iter().collect();
        self.auto_bounds = compute_bounds(self.fit_points.iter().copied(), self.canvas);
        self.reset()
    }

    /// Drops manual bounds and returns to identity zoom/pan over the auto-fit bounds.
    pub fn reset(&mut self) -> Transform {
        self.manual_bounds = None;
        self.transform = Transform::default();
        self.transform
    }

    /// Overrides auto-fit with a fixed world rectangle and resets zoom/pan.
    ///
    /// Sides shorter than [`MIN_MANUAL_EXTENT_M`] are widened about the center.
    pub fn set_manual_bounds(&mut self, rect: WorldRect) -> Transform {
        if rect.width() > 0.0 && rect.height() > 0.0 {
            self.manual_bounds = Some(WorldRect::from_center(
                rect.center(),
                rect.width().max(MIN_MANUAL_EXTENT_M) / 2.0,
                rect.height().max(MIN_MANUAL_EXTENT_M) / 2.0,
            ));
        }
        self.transform = Transform::default();
        self.transform
    }
}
