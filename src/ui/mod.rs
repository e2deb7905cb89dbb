//! User interface components and rendering logic for the fine-tune tool.
//!
//! This module contains all the UI-related code including the main application struct,
//! the input and run panels, canvas rendering and user interaction handling.
//!
//! # Module Organization
//!
//! - `controller` - Zoom/pan state machine driven by abstract input events
//! - `state` - Application state structures and the main FineTuneApp
//! - `canvas` - Wiring of egui pointer, scroll and key input into the controller
//! - `rendering` - Drawing the grid, anchors, sequences and saved runs
//! - `file_ops` - Run import/export for native and WASM
//! - `export` - SVG and PNG export of the plot

mod canvas;
pub mod controller;
mod export;
mod file_ops;
mod rendering;
mod state;

pub use controller::{ViewKey, ViewportController};
pub use rendering::{PlotPoint, PlotSeries, PlotStyle, SeriesKind};
pub use state::FineTuneApp;

use self::state::PendingFileOperation;
use crate::constants::{APP_STATE_KEY, MAX_ANCHOR_POINTS};
use crate::geometry::{compute_sequence, resolve_custom_points};
use crate::input::{Field, InputUnit};
use crate::types::*;
use crate::viewport::WorldPoint;
use eframe::egui;
use std::time::Duration;

impl eframe::App for FineTuneApp {
    /// Persist preferences and flush any pending saved-run write.
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        match self.to_json() {
            Ok(json) => {
                storage.set_string(APP_STATE_KEY, json);
            }
            Err(err) => {
                log::error!("Failed to serialize app state: {err}");
            }
        }
        self.runs.flush(storage);
    }

    /// Main update function called by egui for each frame.
    ///
    /// Lays out the toolbar, the input panel and the canvas, then flushes
    /// debounced saved-run writes.
    fn update(&mut self, ctx: &egui::Context, frame: &mut eframe::Frame) {
        // Apply theme visuals
        let visuals = if self.display.dark_mode {
            egui::Visuals::dark()
        } else {
            egui::Visuals::light()
        };
        ctx.set_visuals(visuals);

        // Handle pending file operations
        self.handle_pending_operations(ctx);

        egui::TopBottomPanel::top("top_toolbar").show(ctx, |ui| {
            self.draw_toolbar(ui);
        });

        let viewport_width = ctx.input(|i| i.screen_rect().width());
        let max_width = (viewport_width * 0.6).max(240.0);
        egui::SidePanel::left("input_panel")
            .resizable(true)
            .default_width(self.panel_width.clamp(240.0, max_width))
            .show(ctx, |ui| {
                self.panel_width = ui.available_width().clamp(240.0, max_width);
                self.draw_input_panel(ui);
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.draw_canvas(ui);
        });

        if self.file.show_export_dialog {
            self.draw_export_dialog(ctx);
        }

        let now = ctx.input(|i| i.time);
        if let Some(storage) = frame.storage_mut() {
            self.runs.flush_if_due(now, storage);
        }
        if let Some(wait) = self.runs.next_flush_in(now) {
            ctx.request_repaint_after(Duration::from_secs_f64(wait));
        }
    }
}

impl FineTuneApp {
    /// Validates the form and, if it is valid, recomputes the sequence.
    ///
    /// On success the custom points are re-resolved and the viewport is reset
    /// to fit everything that is plotted. On failure the per-field errors are
    /// kept for display and the previous result is left untouched.
    pub fn compute(&mut self) -> bool {
        match self.form.validate() {
            Ok((anchors, segments)) => {
                let result = compute_sequence(&anchors, &segments);
                log::info!(
                    "Computed sequence of {} points, mean heading {:.4} deg",
                    result.sequence.len(),
                    result.statistics.mean_heading
                );
                self.field_errors.clear();
                self.anchors = anchors;
                self.result = Some(result);
                self.refresh_custom_points();
                self.fit_view();
                true
            }
            Err(errors) => {
                log::debug!("Input rejected: {} invalid fields", errors.len());
                self.field_errors = errors;
                false
            }
        }
    }

    /// Clears the form, the current result and the custom points.
    pub fn clear_inputs(&mut self) {
        self.form = Default::default();
        self.field_errors.clear();
        self.anchors.clear();
        self.result = None;
        self.custom_points.clear();
        self.fit_view();
    }

    /// Every world position currently drawn on the canvas.
    pub fn plotted_points(&self) -> Vec<WorldPoint> {
        self.plot_series()
            .iter()
            .flat_map(|s| s.points.iter().map(|p| p.position))
            .collect()
    }

    /// Recomputes auto-fit bounds from all plotted points and resets zoom/pan.
    pub fn fit_view(&mut self) {
        let points = self.plotted_points();
        self.canvas.controller.fit(points);
    }

    /// Re-resolves custom points against the current sequence.
    pub fn refresh_custom_points(&mut self) {
        let sequence = self
            .result
            .as_ref()
            .map(|r| r.sequence.as_slice())
            .unwrap_or(&[]);
        resolve_custom_points(&mut self.custom_points, sequence);
    }

    /// Adds a custom point at the first generated point.
    pub fn add_custom_point(&mut self) {
        let label = format!("C{}", self.custom_points.len() + 1);
        self.custom_points.push(CustomPoint::new(label, 0, 0.0));
        self.refresh_custom_points();
    }

    /// Removes a custom point by id.
    pub fn remove_custom_point(&mut self, id: CustomPointId) {
        self.custom_points.retain(|p| p.id != id);
    }

    /// Saves the current result as a run. Returns the new run's id, or `None`
    /// when nothing has been computed yet.
    pub fn save_current_run(&mut self, now: f64) -> Option<RunId> {
        let result = self.result.as_ref()?;
        let typed = self.run_panel.new_run_name.trim();
        let name = if typed.is_empty() {
            format!("Run {}", self.runs.len() + 1)
        } else {
            typed.to_string()
        };
        let id = self.runs.save_run(
            name,
            result,
            self.custom_points.clone(),
            chrono::Utc::now(),
            now,
        );
        self.run_panel.new_run_name.clear();
        log::info!("Saved run {id}");
        Some(id)
    }

    fn commit_run_rename(&mut self, id: RunId, now: f64) {
        let name = self.run_panel.temp_name.trim().to_string();
        if !name.is_empty() && self.runs.get(id).is_some_and(|r| r.name != name) {
            self.runs.rename(id, name, now);
        }
        self.run_panel.editing = None;
        self.run_panel.temp_name.clear();
        self.run_panel.focus_requested_for_edit = false;
    }

    /// Draws the toolbar with compute, view and file actions.
    fn draw_toolbar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if ui.button("Compute").clicked() {
                self.compute();
            }
            if ui.button("Fit view").on_hover_text("Fit all plotted points [0 / Home]").clicked() {
                self.fit_view();
            }

            ui.separator();

            ui.checkbox(&mut self.display.show_grid, "Grid");
            ui.checkbox(&mut self.display.show_labels, "Labels");
            ui.checkbox(&mut self.display.show_inputs, "Inputs");
            let theme_label = if self.display.dark_mode { "Light" } else { "Dark" };
            if ui.button(theme_label).clicked() {
                self.display.dark_mode = !self.display.dark_mode;
            }

            ui.separator();

            if ui.button("Export runs").clicked() {
                self.export_runs();
            }
            if ui.button("Import runs").clicked() {
                self.import_runs();
            }
            if ui.button("Export image…").clicked() {
                self.file.show_export_dialog = true;
            }

            ui.separator();
            ui.label(format!("Zoom {:.2}×", self.canvas.controller.zoom()));
            if let Some(status) = &self.file.status {
                ui.separator();
                ui.label(status.as_str());
            }
        });
    }

    /// Draws the left panel: inputs, statistics, custom points and saved runs.
    fn draw_input_panel(&mut self, ui: &mut egui::Ui) {
        egui::ScrollArea::vertical()
            .auto_shrink([false; 2])
            .show(ui, |ui| {
                ui.heading("Anchor points");
                self.draw_anchor_rows(ui);
                ui.separator();

                ui.heading("Statistics");
                self.draw_statistics(ui);
                ui.separator();

                ui.collapsing("View bounds", |ui| {
                    self.draw_view_bounds(ui);
                });
                ui.separator();

                ui.heading("Custom points");
                self.draw_custom_points(ui);
                ui.separator();

                ui.heading("Saved runs");
                self.draw_saved_runs(ui);
            });
    }

    fn field_error(&self, field: Field) -> Option<String> {
        self.field_errors
            .iter()
            .find(|e| e.field() == Some(field))
            .map(|e| e.to_string())
    }

    fn draw_anchor_rows(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label("Coordinates in");
            ui.radio_value(&mut self.form.unit, InputUnit::Meters, "m");
            ui.radio_value(&mut self.form.unit, InputUnit::Millimeters, "mm");
        });

        let unit = self.form.unit.label();
        let mut remove_index = None;
        let row_count = self.form.anchors.len();
        let row_errors: Vec<[Option<String>; 3]> = (0..row_count)
            .map(|i| {
                [
                    self.field_error(Field::AnchorX(i)),
                    self.field_error(Field::AnchorY(i)),
                    self.field_error(Field::AnchorHeading(i)),
                ]
            })
            .collect();
        egui::Grid::new("anchor_grid").striped(true).show(ui, |ui| {
            ui.label("#");
            ui.label(format!("x ({unit})"));
            ui.label(format!("y ({unit})"));
            ui.label("heading (°)");
            ui.end_row();

            for (i, errors) in row_errors.iter().enumerate() {
                let row = &mut self.form.anchors[i];
                ui.label(format!("{}", i + 1));
                for (text, error) in [&mut row.x, &mut row.y, &mut row.heading]
                    .into_iter()
                    .zip(errors.iter())
                {
                    let mut edit = egui::TextEdit::singleline(text).desired_width(70.0);
                    if error.is_some() {
                        edit = edit.text_color(egui::Color32::from_rgb(230, 80, 80));
                    }
                    let response = ui.add(edit);
                    if let Some(error) = error {
                        response.on_hover_text(error.as_str());
                    }
                }
                if row_count > 1 && ui.small_button("✖").on_hover_text("Remove point").clicked() {
                    remove_index = Some(i);
                }
                ui.end_row();
            }
        });

        if let Some(i) = remove_index {
            self.form.remove_anchor_row(i);
            self.field_errors.clear();
        }

        for error in &self.field_errors {
            ui.colored_label(egui::Color32::from_rgb(230, 80, 80), error.to_string());
        }

        ui.horizontal(|ui| {
            let can_add = self.form.anchors.len() < MAX_ANCHOR_POINTS;
            if ui
                .add_enabled(can_add, egui::Button::new("Add point"))
                .clicked()
            {
                self.form.add_anchor_row();
            }
            if ui.button("Clear").clicked() {
                self.clear_inputs();
            }
        });

        if !self.form.segments.is_empty() {
            ui.label("Segments (m)");
            egui::Grid::new("segment_grid").show(ui, |ui| {
                for (i, segment) in self.form.segments.iter_mut().enumerate() {
                    ui.label(format!("{} → {}", i + 1, i + 2));
                    ui.add(egui::TextEdit::singleline(segment).desired_width(70.0));
                    ui.end_row();
                }
            });
        }
    }

    fn draw_statistics(&mut self, ui: &mut egui::Ui) {
        let Some(result) = &self.result else {
            ui.label("Enter points and press Compute.");
            return;
        };
        let s = result.statistics;
        egui::Grid::new("stats_grid").striped(true).show(ui, |ui| {
            let rows = [
                ("Points", format!("{}", s.count)),
                ("Mean x", format!("{:.6} m", s.mean_x)),
                ("Mean y", format!("{:.6} m", s.mean_y)),
                ("Mean heading", format!("{:.4}°", s.mean_heading)),
                ("σ x", format!("{:.4} mm", s.std_x_mm)),
                ("σ y", format!("{:.4} mm", s.std_y_mm)),
                ("σ heading", format!("{:.4}°", s.std_heading)),
                ("σ radial", format!("{:.4} mm", s.radial_std_mm)),
            ];
            for (name, value) in rows {
                ui.label(name);
                ui.monospace(value);
                ui.end_row();
            }
        });

        ui.add_space(4.0);
        ui.label("Generated sequence");
        egui::Grid::new("sequence_grid").striped(true).show(ui, |ui| {
            ui.label("#");
            ui.label("x (m)");
            ui.label("y (m)");
            ui.label("heading (°)");
            ui.end_row();
            for (i, p) in result.sequence.iter().enumerate() {
                ui.label(format!("{}", i + 1));
                ui.monospace(format!("{:.6}", p.x));
                ui.monospace(format!("{:.6}", p.y));
                ui.monospace(format!("{:.4}", p.heading));
                ui.end_row();
            }
        });
        if ui.button("Copy sequence").clicked() {
            let text: String = result
                .sequence
                .iter()
                .map(|p| format!("{:.6}\t{:.6}\t{:.4}\n", p.x, p.y, p.heading))
                .collect();
            ui.ctx().copy_text(text);
        }
    }

    fn draw_custom_points(&mut self, ui: &mut egui::Ui) {
        let sequence_len = self.result.as_ref().map_or(0, |r| r.sequence.len());
        let mut changed = false;
        let mut remove = None;

        for point in &mut self.custom_points {
            ui.horizontal(|ui| {
                changed |= ui
                    .add(egui::TextEdit::singleline(&mut point.label).desired_width(50.0))
                    .changed();
                ui.label("at #");
                let mut display_index = point.reference_index + 1;
                if ui
                    .add(egui::DragValue::new(&mut display_index).range(1..=MAX_ANCHOR_POINTS))
                    .changed()
                {
                    point.reference_index = display_index - 1;
                    changed = true;
                }
                changed |= ui
                    .add(
                        egui::DragValue::new(&mut point.offset_mm)
                            .speed(1.0)
                            .suffix(" mm"),
                    )
                    .changed();
                if ui.small_button("✖").clicked() {
                    remove = Some(point.id);
                }
            });
            match point.resolved {
                Some(p) => {
                    ui.monospace(format!("  ({:.6}, {:.6}) m", p.x, p.y));
                    if point.reference_index >= sequence_len {
                        ui.weak(format!(
                            "  #{} not generated, using #{}",
                            point.reference_index + 1,
                            sequence_len
                        ));
                    }
                }
                None => {
                    ui.weak("  not resolved, compute first");
                }
            }
        }

        if let Some(id) = remove {
            self.remove_custom_point(id);
        }
        if changed {
            self.refresh_custom_points();
        }
        if ui.button("Add custom point").clicked() {
            self.add_custom_point();
        }
    }

    fn draw_saved_runs(&mut self, ui: &mut egui::Ui) {
        let now = ui.input(|i| i.time);
        ui.horizontal(|ui| {
            ui.add(
                egui::TextEdit::singleline(&mut self.run_panel.new_run_name)
                    .hint_text("Run name")
                    .desired_width(140.0),
            );
            if ui
                .add_enabled(self.result.is_some(), egui::Button::new("Save run"))
                .clicked()
            {
                self.save_current_run(now);
            }
        });

        if self.runs.is_empty() {
            ui.weak("No saved runs.");
            return;
        }
        ui.horizontal(|ui| {
            ui.weak(format!(
                "{} of {} shown",
                self.runs.visible_runs().count(),
                self.runs.len()
            ));
            if ui.small_button("Clear all").clicked() {
                self.runs.clear(now);
                self.run_panel.editing = None;
            }
        });

        let mut toggle = None;
        let mut delete = None;
        let mut start_edit = None;
        let mut commit = None;
        let runs: Vec<(usize, SavedRun)> = self.runs.runs().iter().cloned().enumerate().collect();
        for (index, run) in runs {
            ui.horizontal(|ui| {
                let mut visible = run.visible;
                if ui.checkbox(&mut visible, "").changed() {
                    toggle = Some(run.id);
                }
                let (swatch, _) = ui.allocate_exact_size(egui::vec2(10.0, 10.0), egui::Sense::hover());
                ui.painter()
                    .rect_filled(swatch, 2.0, rendering::run_color(index));

                if self.run_panel.editing == Some(run.id) {
                    let response = ui.add(
                        egui::TextEdit::singleline(&mut self.run_panel.temp_name).desired_width(120.0),
                    );
                    // Only request focus on the first frame of editing
                    if !self.run_panel.focus_requested_for_edit {
                        response.request_focus();
                        self.run_panel.focus_requested_for_edit = true;
                    }
                    if response.lost_focus() || ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                        commit = Some(run.id);
                    }
                } else if ui
                    .button(run.name.as_str())
                    .on_hover_text("Click to rename")
                    .clicked()
                {
                    start_edit = Some((run.id, run.name.clone()));
                }

                ui.weak(run.created_at.format("%Y-%m-%d %H:%M").to_string());
                if ui.small_button("🗑").on_hover_text("Delete run").clicked() {
                    delete = Some(run.id);
                }
            });
        }

        if let Some(id) = commit {
            self.commit_run_rename(id, now);
        }
        if let Some((id, name)) = start_edit {
            self.run_panel.editing = Some(id);
            self.run_panel.temp_name = name;
            self.run_panel.focus_requested_for_edit = false;
        }
        if let Some(id) = toggle {
            self.runs.toggle_visibility(id, now);
        }
        if let Some(id) = delete {
            self.runs.delete(id, now);
            if self.run_panel.editing == Some(id) {
                self.run_panel.editing = None;
            }
        }
    }

    /// Manual world bounds editor; "Auto" returns to fitting the plotted points.
    fn draw_view_bounds(&mut self, ui: &mut egui::Ui) {
        let bounds = &mut self.canvas.bounds_input;
        egui::Grid::new("bounds_grid").show(ui, |ui| {
            ui.label("x");
            ui.add(egui::DragValue::new(&mut bounds.min_x).speed(0.01).suffix(" m"));
            ui.add(egui::DragValue::new(&mut bounds.max_x).speed(0.01).suffix(" m"));
            ui.end_row();
            ui.label("y");
            ui.add(egui::DragValue::new(&mut bounds.min_y).speed(0.01).suffix(" m"));
            ui.add(egui::DragValue::new(&mut bounds.max_y).speed(0.01).suffix(" m"));
            ui.end_row();
        });
        ui.horizontal(|ui| {
            let valid = bounds.width() > 0.0 && bounds.height() > 0.0;
            if ui.add_enabled(valid, egui::Button::new("Apply")).clicked() {
                self.canvas.controller.set_manual_bounds(*bounds);
            }
            if ui.button("Auto").clicked() {
                self.canvas.controller.reset();
                *bounds = self.canvas.controller.world_bounds();
            }
        });
        if self.canvas.controller.manual_bounds().is_some() {
            ui.weak("Manual bounds active");
        }
    }

    /// Window with image export settings.
    fn draw_export_dialog(&mut self, ctx: &egui::Context) {
        let mut open = self.file.show_export_dialog;
        egui::Window::new("Export image")
            .open(&mut open)
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                egui::Grid::new("export_grid").show(ui, |ui| {
                    ui.label("Width (px)");
                    ui.add(egui::DragValue::new(&mut self.export.width).range(100..=8000));
                    ui.end_row();
                    ui.label("Height (px)");
                    ui.add(egui::DragValue::new(&mut self.export.height).range(100..=8000));
                    ui.end_row();
                    ui.label("PNG scale");
                    ui.add(egui::Slider::new(&mut self.export.png_scale, 0.25..=8.0));
                    ui.end_row();
                });
                ui.checkbox(&mut self.export.include_background, "Include background");
                ui.horizontal(|ui| {
                    if ui.button("Export SVG").clicked() {
                        self.file.pending_operation = Some(PendingFileOperation::ExportSvg);
                    }
                    if cfg!(not(target_arch = "wasm32")) && ui.button("Export PNG").clicked() {
                        self.file.pending_operation = Some(PendingFileOperation::ExportPng);
                    }
                });
            });
        self.file.show_export_dialog = open && self.file.pending_operation.is_none();
    }
}

#[cfg(test)]
mod tests;
