//! Canvas interaction and navigation functionality.
//!
//! Translates egui pointer, scroll and keyboard input into viewport controller
//! events and tracks which plotted point is under the cursor.

use super::controller::ViewKey;
use super::state::FineTuneApp;
use crate::constants::HOVER_RADIUS_PX;
use crate::viewport::{CanvasSize, ScreenPoint};
use eframe::egui;

impl FineTuneApp {
    /// Allocates the canvas, handles navigation input and renders the plot.
    pub fn draw_canvas(&mut self, ui: &mut egui::Ui) {
        let (response, painter) =
            ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
        let canvas_rect = response.rect;

        if self
            .canvas
            .controller
            .on_resize(CanvasSize::from(canvas_rect.size()))
        {
            log::trace!("Canvas resized to {:?}", canvas_rect.size());
        }

        self.handle_canvas_panning(ui, &response);
        self.handle_canvas_zoom(ui, &response);
        self.handle_canvas_keys(ui, &response);

        if response.double_clicked() {
            self.fit_view();
        }

        self.canvas.hovered = response.hover_pos().and_then(|pos| {
            if self.canvas.is_panning {
                return None;
            }
            self.find_point_near(
                ScreenPoint::from_pos2(pos, canvas_rect.min),
                HOVER_RADIUS_PX as f64,
            )
        });

        let painter = painter.with_clip_rect(canvas_rect);
        self.render_plot(&painter, canvas_rect);
    }

    /// Pans while any mouse button drag that started on the canvas is held.
    ///
    /// # Arguments
    ///
    /// * `ui` - The egui UI context
    /// * `response` - The response from the canvas widget
    pub fn handle_canvas_panning(&mut self, ui: &mut egui::Ui, response: &egui::Response) {
        let dragging = response.dragged() && ui.input(|i| i.pointer.any_down());

        if dragging {
            if let Some(current_pos) = response.interact_pointer_pos() {
                if !self.canvas.is_panning {
                    self.canvas.is_panning = true;
                    self.canvas.last_pan_pos = Some(current_pos);
                } else if let Some(last_pos) = self.canvas.last_pan_pos {
                    let delta = current_pos - last_pos;
                    // egui reports pointer positions in the same logical points the
                    // canvas is laid out in, so the rendered size is the canvas size.
                    let rendered = CanvasSize::from(response.rect.size());
                    self.canvas.controller.on_drag_delta(
                        ScreenPoint::new(delta.x as f64, delta.y as f64),
                        rendered,
                    );
                    self.canvas.last_pan_pos = Some(current_pos);
                }
            }
        } else {
            self.canvas.is_panning = false;
            self.canvas.last_pan_pos = None;
        }
    }

    /// Zooms with the scroll wheel or a pinch gesture, anchored at the cursor.
    ///
    /// Only zooms if the cursor is over the canvas.
    pub fn handle_canvas_zoom(&mut self, ui: &mut egui::Ui, response: &egui::Response) {
        let Some(mouse_pos) = response.hover_pos() else {
            return;
        };
        let anchor = ScreenPoint::from_pos2(mouse_pos, response.rect.min);
        let (scroll_delta, pinch) = ui.input(|i| (i.raw_scroll_delta.y, i.zoom_delta()));

        if scroll_delta != 0.0 {
            self.canvas.controller.on_wheel(scroll_delta as f64, anchor);
        } else if (pinch - 1.0).abs() > f32::EPSILON {
            self.canvas.controller.zoom_at(pinch as f64, anchor);
        }
    }

    /// Arrow keys pan, `+`/`-` zoom about the center, `0` or Home resets.
    ///
    /// Keys are ignored while a text field has focus or the pointer is
    /// elsewhere, so typing coordinates never moves the view.
    pub fn handle_canvas_keys(&mut self, ui: &mut egui::Ui, response: &egui::Response) {
        let text_focused = ui.ctx().memory(|m| m.focused().is_some());
        if text_focused || !response.hovered() {
            return;
        }

        let keys = ui.input(|i| {
            let mut keys = Vec::new();
            if i.key_pressed(egui::Key::ArrowLeft) {
                keys.push(ViewKey::PanLeft);
            }
            if i.key_pressed(egui::Key::ArrowRight) {
                keys.push(ViewKey::PanRight);
            }
            if i.key_pressed(egui::Key::ArrowUp) {
                keys.push(ViewKey::PanUp);
            }
            if i.key_pressed(egui::Key::ArrowDown) {
                keys.push(ViewKey::PanDown);
            }
            if i.key_pressed(egui::Key::Plus) || i.key_pressed(egui::Key::Equals) {
                keys.push(ViewKey::ZoomIn);
            }
            if i.key_pressed(egui::Key::Minus) {
                keys.push(ViewKey::ZoomOut);
            }
            if i.key_pressed(egui::Key::Num0) || i.key_pressed(egui::Key::Home) {
                keys.push(ViewKey::Reset);
            }
            keys
        });

        for key in keys {
            self.canvas.controller.on_key(key);
        }
    }
}
