//! Canvas rendering for the grid, anchor points, sequences and saved runs.
//!
//! Everything drawn on the canvas is first collected into [`PlotSeries`] so
//! that the egui painter, hover detection, auto-fit and the SVG exporter all
//! agree on what is plotted.

use super::state::FineTuneApp;
use crate::ticks::GridTicks;
use crate::viewport::{ScreenPoint, WorldPoint};
use eframe::egui;
use eframe::epaint::StrokeKind;

/// Colors cycled through for saved-run overlays.
const RUN_COLORS: [egui::Color32; 8] = [
    egui::Color32::from_rgb(31, 119, 180),
    egui::Color32::from_rgb(255, 127, 14),
    egui::Color32::from_rgb(44, 160, 44),
    egui::Color32::from_rgb(148, 103, 189),
    egui::Color32::from_rgb(140, 86, 75),
    egui::Color32::from_rgb(227, 119, 194),
    egui::Color32::from_rgb(188, 189, 34),
    egui::Color32::from_rgb(23, 190, 207),
];

/// Overlay color for the saved run at `index`.
pub fn run_color(index: usize) -> egui::Color32 {
    RUN_COLORS[index % RUN_COLORS.len()]
}

/// Colors and sizes used when drawing the plot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotStyle {
    /// Canvas background
    pub background: egui::Color32,
    /// Grid lines
    pub grid: egui::Color32,
    /// The x = 0 and y = 0 lines
    pub axis: egui::Color32,
    /// Tick labels and point labels
    pub text: egui::Color32,
    /// Raw anchor points
    pub anchor: egui::Color32,
    /// Current generated sequence
    pub sequence: egui::Color32,
    /// Custom points
    pub custom: egui::Color32,
    /// Radius of plotted points in pixels
    pub point_radius: f32,
    /// Length of heading indicators in pixels
    pub heading_length: f32,
    /// Width of polylines in pixels
    pub line_width: f32,
    /// Tick and point label size
    pub font_size: f32,
}

impl PlotStyle {
    /// Style matching the light or dark egui theme.
    pub fn for_theme(dark_mode: bool) -> Self {
        if dark_mode {
            Self {
                background: egui::Color32::from_gray(24),
                grid: egui::Color32::from_gray(48),
                axis: egui::Color32::from_gray(110),
                text: egui::Color32::from_gray(190),
                anchor: egui::Color32::from_rgb(240, 200, 80),
                sequence: egui::Color32::from_rgb(90, 200, 255),
                custom: egui::Color32::from_rgb(255, 100, 120),
                point_radius: 4.0,
                heading_length: 16.0,
                line_width: 1.5,
                font_size: 11.0,
            }
        } else {
            Self {
                background: egui::Color32::from_gray(250),
                grid: egui::Color32::from_gray(222),
                axis: egui::Color32::from_gray(150),
                text: egui::Color32::from_gray(60),
                anchor: egui::Color32::from_rgb(200, 140, 0),
                sequence: egui::Color32::from_rgb(0, 110, 200),
                custom: egui::Color32::from_rgb(210, 30, 60),
                point_radius: 4.0,
                heading_length: 16.0,
                line_width: 1.5,
                font_size: 11.0,
            }
        }
    }
}

/// What a series represents. Decides how it is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesKind {
    /// Raw anchor points with heading indicators
    Anchors,
    /// The current generated sequence, connected and numbered
    Sequence,
    /// Custom points resolved against the current sequence
    CustomPoints,
    /// A visible saved run
    SavedRun,
}

/// One plotted point.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotPoint {
    /// Position in meters
    pub position: WorldPoint,
    /// Heading in degrees, counter-clockwise from +X
    pub heading: f64,
    /// Label drawn next to the point and shown on hover
    pub label: String,
}

/// A group of points drawn with one color.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotSeries {
    /// How to draw the series
    pub kind: SeriesKind,
    /// Display name, leads the hover text of its points
    pub name: String,
    /// Series color
    pub color: egui::Color32,
    /// Points in drawing order
    pub points: Vec<PlotPoint>,
}

impl PlotSeries {
    /// Whether consecutive points are joined by a line.
    pub fn connected(&self) -> bool {
        matches!(self.kind, SeriesKind::Sequence | SeriesKind::SavedRun)
    }

    /// Whether each point carries a heading indicator.
    pub fn shows_heading(&self) -> bool {
        matches!(self.kind, SeriesKind::Anchors | SeriesKind::Sequence)
    }
}

impl FineTuneApp {
    /// The style for the current theme.
    pub fn plot_style(&self) -> PlotStyle {
        PlotStyle::for_theme(self.display.dark_mode)
    }

    /// Collects every series to draw, back to front.
    ///
    /// Visible saved runs come first (with their own custom points), then the
    /// anchors if enabled, the current sequence and its custom points.
    pub fn plot_series(&self) -> Vec<PlotSeries> {
        let style = self.plot_style();
        let mut series = Vec::new();

        for (index, run) in self.runs.runs().iter().enumerate() {
            if !run.visible {
                continue;
            }
            let color = run_color(index);
            let points: Vec<PlotPoint> = run
                .sequence
                .iter()
                .enumerate()
                .map(|(i, p)| PlotPoint {
                    position: WorldPoint::new(p.x, p.y),
                    heading: p.heading,
                    label: format!("#{}", i + 1),
                })
                .collect();
            series.push(PlotSeries {
                kind: SeriesKind::SavedRun,
                name: run.name.clone(),
                color,
                points,
            });

            let custom: Vec<PlotPoint> = run
                .custom_points
                .iter()
                .filter_map(|c| {
                    c.resolved.map(|p| PlotPoint {
                        position: WorldPoint::new(p.x, p.y),
                        heading: p.heading,
                        label: format!("{} {}", run.name, c.label),
                    })
                })
                .collect();
            if !custom.is_empty() {
                series.push(PlotSeries {
                    kind: SeriesKind::CustomPoints,
                    name: format!("{} custom points", run.name),
                    color,
                    points: custom,
                });
            }
        }

        if self.display.show_inputs && !self.anchors.is_empty() {
            series.push(PlotSeries {
                kind: SeriesKind::Anchors,
                name: "Anchors".to_string(),
                color: style.anchor,
                points: self
                    .anchors
                    .iter()
                    .enumerate()
                    .map(|(i, a)| PlotPoint {
                        position: WorldPoint::new(a.x, a.y),
                        heading: a.heading,
                        label: format!("A{}", i + 1),
                    })
                    .collect(),
            });
        }

        if let Some(result) = &self.result {
            series.push(PlotSeries {
                kind: SeriesKind::Sequence,
                name: "Sequence".to_string(),
                color: style.sequence,
                points: result
                    .sequence
                    .iter()
                    .enumerate()
                    .map(|(i, p)| PlotPoint {
                        position: WorldPoint::new(p.x, p.y),
                        heading: p.heading,
                        label: format!("{}", i + 1),
                    })
                    .collect(),
            });
        }

        let custom: Vec<PlotPoint> = self
            .custom_points
            .iter()
            .filter_map(|c| {
                c.resolved.map(|p| PlotPoint {
                    position: WorldPoint::new(p.x, p.y),
                    heading: p.heading,
                    label: c.label.clone(),
                })
            })
            .collect();
        if !custom.is_empty() {
            series.push(PlotSeries {
                kind: SeriesKind::CustomPoints,
                name: "Custom points".to_string(),
                color: style.custom,
                points: custom,
            });
        }

        series
    }

    /// Renders the whole plot into `canvas_rect`.
    ///
    /// Layers: background, grid, axes, tick labels, series, hover text.
    pub fn render_plot(&self, painter: &egui::Painter, canvas_rect: egui::Rect) {
        let style = self.plot_style();
        painter.rect_filled(canvas_rect, 0.0, style.background);

        let ticks = self.canvas.controller.grid_ticks();
        if self.display.show_grid {
            self.draw_grid(painter, canvas_rect, &ticks, &style);
        }

        for series in self.plot_series() {
            self.draw_series(painter, canvas_rect, &series, &style);
        }

        if self.display.show_labels {
            self.draw_tick_labels(painter, canvas_rect, &ticks, &style);
        }

        if let Some(label) = &self.canvas.hovered {
            if let Some(pos) = painter.ctx().pointer_hover_pos() {
                let galley = painter.layout_no_wrap(
                    label.clone(),
                    egui::FontId::proportional(style.font_size + 1.0),
                    style.text,
                );
                let rect = egui::Rect::from_min_size(pos + egui::vec2(12.0, 12.0), galley.size())
                    .expand(3.0);
                painter.rect_filled(rect, 3.0, style.background.gamma_multiply(0.9));
                painter.rect_stroke(rect, 3.0, egui::Stroke::new(1.0, style.axis), StrokeKind::Outside);
                painter.galley(rect.min + egui::vec2(3.0, 3.0), galley, style.text);
            }
        }

        painter.rect_stroke(
            canvas_rect,
            0.0,
            egui::Stroke::new(1.0, style.grid),
            StrokeKind::Inside,
        );
    }

    fn to_screen(&self, canvas_rect: egui::Rect, p: WorldPoint) -> egui::Pos2 {
        self.canvas
            .controller
            .world_to_screen(p)
            .to_pos2(canvas_rect.min)
    }

    /// Draws grid lines at every tick, with the zero lines emphasized.
    fn draw_grid(
        &self,
        painter: &egui::Painter,
        canvas_rect: egui::Rect,
        ticks: &GridTicks,
        style: &PlotStyle,
    ) {
        let zero_tolerance = ticks.step * 1e-6;
        for &x in &ticks.xs {
            let sx = self.to_screen(canvas_rect, WorldPoint::new(x, 0.0)).x;
            if sx < canvas_rect.left() || sx > canvas_rect.right() {
                continue;
            }
            let color = if x.abs() < zero_tolerance { style.axis } else { style.grid };
            painter.line_segment(
                [egui::pos2(sx, canvas_rect.top()), egui::pos2(sx, canvas_rect.bottom())],
                egui::Stroke::new(1.0, color),
            );
        }
        for &y in &ticks.ys {
            let sy = self.to_screen(canvas_rect, WorldPoint::new(0.0, y)).y;
            if sy < canvas_rect.top() || sy > canvas_rect.bottom() {
                continue;
            }
            let color = if y.abs() < zero_tolerance { style.axis } else { style.grid };
            painter.line_segment(
                [egui::pos2(canvas_rect.left(), sy), egui::pos2(canvas_rect.right(), sy)],
                egui::Stroke::new(1.0, color),
            );
        }
    }

    /// Tick values along the bottom and left edges.
    fn draw_tick_labels(
        &self,
        painter: &egui::Painter,
        canvas_rect: egui::Rect,
        ticks: &GridTicks,
        style: &PlotStyle,
    ) {
        let font = egui::FontId::monospace(style.font_size);
        for &x in &ticks.xs {
            let sx = self.to_screen(canvas_rect, WorldPoint::new(x, 0.0)).x;
            if sx < canvas_rect.left() + 20.0 || sx > canvas_rect.right() - 20.0 {
                continue;
            }
            painter.text(
                egui::pos2(sx, canvas_rect.bottom() - 4.0),
                egui::Align2::CENTER_BOTTOM,
                ticks.label(x),
                font.clone(),
                style.text,
            );
        }
        for &y in &ticks.ys {
            let sy = self.to_screen(canvas_rect, WorldPoint::new(0.0, y)).y;
            if sy < canvas_rect.top() + 10.0 || sy > canvas_rect.bottom() - 20.0 {
                continue;
            }
            painter.text(
                egui::pos2(canvas_rect.left() + 4.0, sy),
                egui::Align2::LEFT_CENTER,
                ticks.label(y),
                font.clone(),
                style.text,
            );
        }
    }

    /// Draws one series: connecting line, points, heading ticks and labels.
    fn draw_series(
        &self,
        painter: &egui::Painter,
        canvas_rect: egui::Rect,
        series: &PlotSeries,
        style: &PlotStyle,
    ) {
        let positions: Vec<egui::Pos2> = series
            .points
            .iter()
            .map(|p| self.to_screen(canvas_rect, p.position))
            .collect();

        if series.connected() && positions.len() > 1 {
            let stroke = egui::Stroke::new(style.line_width, series.color);
            for pair in positions.windows(2) {
                painter.line_segment([pair[0], pair[1]], stroke);
            }
        }

        let font = egui::FontId::proportional(style.font_size);
        for (point, &pos) in series.points.iter().zip(&positions) {
            if !canvas_rect.expand(style.heading_length).contains(pos) {
                continue;
            }
            if series.shows_heading() {
                let tip = pos + heading_direction(point.heading) * style.heading_length;
                painter.line_segment([pos, tip], egui::Stroke::new(style.line_width, series.color));
            }
            match series.kind {
                SeriesKind::Anchors => {
                    painter.circle_stroke(pos, style.point_radius + 1.0, egui::Stroke::new(2.0, series.color));
                }
                SeriesKind::CustomPoints => {
                    let r = style.point_radius + 1.0;
                    let diamond = vec![
                        pos + egui::vec2(0.0, -r),
                        pos + egui::vec2(r, 0.0),
                        pos + egui::vec2(0.0, r),
                        pos + egui::vec2(-r, 0.0),
                    ];
                    painter.add(egui::Shape::convex_polygon(diamond, series.color, egui::Stroke::NONE));
                }
                SeriesKind::Sequence | SeriesKind::SavedRun => {
                    painter.circle_filled(pos, style.point_radius, series.color);
                }
            }
            if self.display.show_labels && series.kind != SeriesKind::SavedRun {
                painter.text(
                    pos + egui::vec2(style.point_radius + 3.0, -(style.point_radius + 3.0)),
                    egui::Align2::LEFT_BOTTOM,
                    &point.label,
                    font.clone(),
                    style.text,
                );
            }
        }
    }

    /// Label of the plotted point nearest to `pointer` within `radius` pixels.
    ///
    /// Later series are drawn on top, so they win ties.
    pub fn find_point_near(&self, pointer: ScreenPoint, radius: f64) -> Option<String> {
        let mut best: Option<(f64, String)> = None;
        for series in self.plot_series() {
            for point in &series.points {
                let s = self.canvas.controller.world_to_screen(point.position);
                let d = ((s.x - pointer.x).powi(2) + (s.y - pointer.y).powi(2)).sqrt();
                if d <= radius && best.as_ref().map_or(true, |(bd, _)| d <= *bd) {
                    let text = format!(
                        "{}: {}\n({:.6}, {:.6}) m\n{:.4}°",
                        series.name,
                        point.label,
                        point.position.x,
                        point.position.y,
                        point.heading
                    );
                    best = Some((d, text));
                }
            }
        }
        best.map(|(_, text)| text)
    }
}

/// Unit vector on screen for a world heading in degrees (screen Y points down).
pub fn heading_direction(heading_deg: f64) -> egui::Vec2 {
    let rad = heading_deg.to_radians();
    egui::vec2(rad.cos() as f32, -(rad.sin() as f32))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_direction_flips_y() {
        let east = heading_direction(0.0);
        assert!((east.x - 1.0).abs() < 1e-6 && east.y.abs() < 1e-6);
        let north = heading_direction(90.0);
        assert!(north.x.abs() < 1e-6 && (north.y + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_run_colors_cycle() {
        assert_eq!(run_color(0), run_color(RUN_COLORS.len()));
        assert_ne!(run_color(0), run_color(1));
    }

    #[test]
    fn test_series_drawing_rules() {
        let series = PlotSeries {
            kind: SeriesKind::CustomPoints,
            name: "c".into(),
            color: egui::Color32::RED,
            points: Vec::new(),
        };
        assert!(!series.connected());
        assert!(!series.shows_heading());
        let run = PlotSeries { kind: SeriesKind::SavedRun, ..series };
        assert!(run.connected());
        assert!(!run.shows_heading());
    }
}
