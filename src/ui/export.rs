//! Export utilities: render the current plot to SVG and PNG.
//!
//! Notes:
//! - SVG export is supported on all targets (native + wasm).
//! - PNG export rasterizes the SVG with resvg and is native only.
//!
//! The exported image shows the same world extent as the canvas, fitted into
//! the configured output size.

use super::rendering::{heading_direction, SeriesKind};
use super::state::FineTuneApp;
use crate::constants::TARGET_TICK_SPACING_PX;
use crate::ticks::GridTicks;
use crate::viewport::{CanvasSize, Transform, Viewport, WorldPoint};
use eframe::egui::Color32;
#[cfg(not(target_arch = "wasm32"))]
use std::sync::Arc;

/// Errors raised while rasterizing the plot.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// The generated SVG could not be parsed
    #[error("failed to parse SVG for PNG export: {0}")]
    Svg(#[from] usvg::Error),
    /// The requested raster size is zero or too large
    #[error("failed to create a {width}x{height} pixmap")]
    Pixmap {
        /// Requested width in pixels
        width: u32,
        /// Requested height in pixels
        height: u32,
    },
    /// PNG encoding failed
    #[error("failed to encode PNG: {0}")]
    Encode(String),
}

impl FineTuneApp {
    /// Viewport mapping the on-screen world extent into the export size.
    fn export_viewport(&self) -> Viewport {
        let visible = self.canvas.controller.viewport().visible_world_rect(
            &self.canvas.controller.transform(),
            0.0,
        );
        let size = CanvasSize::new(self.export.width as f64, self.export.height as f64);
        Viewport::new(visible, size)
    }

    /// Builds an SVG document of the current plot at the export size.
    pub fn build_svg(&self) -> String {
        let style = self.plot_style();
        let viewport = self.export_viewport();
        let identity = Transform::default();
        let (width, height) = (self.export.width, self.export.height);
        let to_svg = |p: WorldPoint| {
            let s = viewport.world_to_screen(p, &identity);
            (s.x, s.y)
        };

        let mut out = String::new();
        out.push_str(&format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">\n"
        ));
        if self.export.include_background {
            out.push_str(&format!(
                "<rect x=\"0\" y=\"0\" width=\"{width}\" height=\"{height}\" fill=\"{}\"/>\n",
                hex(style.background)
            ));
        }

        let visible = viewport.visible_world_rect(&identity, 0.0);
        let ticks = GridTicks::for_view(&visible, viewport.canvas, TARGET_TICK_SPACING_PX);
        let zero_tolerance = ticks.step * 1e-6;
        let font_size = style.font_size;

        if self.display.show_grid {
            out.push_str("<g stroke-width=\"1\">\n");
            for &x in &ticks.xs {
                let (sx, _) = to_svg(WorldPoint::new(x, 0.0));
                if sx < 0.0 || sx > width as f64 {
                    continue;
                }
                let color = if x.abs() < zero_tolerance { style.axis } else { style.grid };
                out.push_str(&format!(
                    "<line x1=\"{sx:.2}\" y1=\"0\" x2=\"{sx:.2}\" y2=\"{height}\" stroke=\"{}\"/>\n",
                    hex(color)
                ));
            }
            for &y in &ticks.ys {
                let (_, sy) = to_svg(WorldPoint::new(0.0, y));
                if sy < 0.0 || sy > height as f64 {
                    continue;
                }
                let color = if y.abs() < zero_tolerance { style.axis } else { style.grid };
                out.push_str(&format!(
                    "<line x1=\"0\" y1=\"{sy:.2}\" x2=\"{width}\" y2=\"{sy:.2}\" stroke=\"{}\"/>\n",
                    hex(color)
                ));
            }
            out.push_str("</g>\n");
        }

        for series in self.plot_series() {
            let color = hex(series.color);
            let points: Vec<(f64, f64)> = series.points.iter().map(|p| to_svg(p.position)).collect();

            if series.connected() && points.len() > 1 {
                let path: Vec<String> = points
                    .iter()
                    .map(|(x, y)| format!("{x:.2},{y:.2}"))
                    .collect();
                out.push_str(&format!(
                    "<polyline points=\"{}\" fill=\"none\" stroke=\"{color}\" stroke-width=\"{}\"/>\n",
                    path.join(" "),
                    style.line_width
                ));
            }

            let r = style.point_radius as f64;
            for (point, &(x, y)) in series.points.iter().zip(&points) {
                if series.shows_heading() {
                    let dir = heading_direction(point.heading);
                    let len = style.heading_length as f64;
                    out.push_str(&format!(
                        "<line x1=\"{x:.2}\" y1=\"{y:.2}\" x2=\"{:.2}\" y2=\"{:.2}\" stroke=\"{color}\" stroke-width=\"{}\"/>\n",
                        x + dir.x as f64 * len,
                        y + dir.y as f64 * len,
                        style.line_width
                    ));
                }
                match series.kind {
                    SeriesKind::Anchors => out.push_str(&format!(
                        "<circle cx=\"{x:.2}\" cy=\"{y:.2}\" r=\"{:.2}\" fill=\"none\" stroke=\"{color}\" stroke-width=\"2\"/>\n",
                        r + 1.0
                    )),
                    SeriesKind::CustomPoints => {
                        let d = r + 1.0;
                        out.push_str(&format!(
                            "<polygon points=\"{x:.2},{:.2} {:.2},{y:.2} {x:.2},{:.2} {:.2},{y:.2}\" fill=\"{color}\"/>\n",
                            y - d,
                            x + d,
                            y + d,
                            x - d
                        ));
                    }
                    SeriesKind::Sequence | SeriesKind::SavedRun => out.push_str(&format!(
                        "<circle cx=\"{x:.2}\" cy=\"{y:.2}\" r=\"{r:.2}\" fill=\"{color}\"/>\n"
                    )),
                }
                if self.display.show_labels && series.kind != SeriesKind::SavedRun {
                    out.push_str(&format!(
                        "<text x=\"{:.2}\" y=\"{:.2}\" font-family=\"sans-serif\" font-size=\"{font_size}\" fill=\"{}\">{}</text>\n",
                        x + r + 3.0,
                        y - r - 3.0,
                        hex(style.text),
                        escape_xml(&point.label)
                    ));
                }
            }
        }

        if self.display.show_labels {
            let text = hex(style.text);
            for &x in &ticks.xs {
                let (sx, _) = to_svg(WorldPoint::new(x, 0.0));
                if sx < 20.0 || sx > width as f64 - 20.0 {
                    continue;
                }
                out.push_str(&format!(
                    "<text x=\"{sx:.2}\" y=\"{}\" text-anchor=\"middle\" font-family=\"monospace\" font-size=\"{font_size}\" fill=\"{text}\">{}</text>\n",
                    height as f64 - 4.0,
                    ticks.label(x)
                ));
            }
            for &y in &ticks.ys {
                let (_, sy) = to_svg(WorldPoint::new(0.0, y));
                if sy < 10.0 || sy > height as f64 - 20.0 {
                    continue;
                }
                out.push_str(&format!(
                    "<text x=\"4\" y=\"{sy:.2}\" dominant-baseline=\"middle\" font-family=\"monospace\" font-size=\"{font_size}\" fill=\"{text}\">{}</text>\n",
                    ticks.label(y)
                ));
            }
        }

        out.push_str("</svg>\n");
        out
    }

    /// Rasterizes the SVG export into PNG bytes at `png_scale`.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn render_png(&self) -> Result<Vec<u8>, ExportError> {
        use tiny_skia::Pixmap;

        let svg = self.build_svg();

        let mut opt = usvg::Options::default();
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        opt.fontdb = Arc::new(db);
        let tree = usvg::Tree::from_data(svg.as_bytes(), &opt)?;

        let scale = self.export.png_scale.clamp(0.25, 8.0);
        let out_w = ((self.export.width as f32) * scale).round().max(1.0) as u32;
        let out_h = ((self.export.height as f32) * scale).round().max(1.0) as u32;
        let mut pixmap = Pixmap::new(out_w, out_h).ok_or(ExportError::Pixmap {
            width: out_w,
            height: out_h,
        })?;

        let transform = tiny_skia::Transform::from_scale(scale, scale);
        resvg::render(&tree, transform, &mut pixmap.as_mut());

        pixmap
            .encode_png()
            .map_err(|e| ExportError::Encode(e.to_string()))
    }
}

/// `#rrggbb` for an egui color, ignoring alpha.
fn hex(color: Color32) -> String {
    format!("#{:02x}{:02x}{:02x}", color.r(), color.g(), color.b())
}

fn escape_xml(input: &str) -> String {
    let mut s = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => s.push_str("&amp;"),
            '<' => s.push_str("&lt;"),
            '>' => s.push_str("&gt;"),
            '"' => s.push_str("&quot;"),
            '\'' => s.push_str("&apos;"),
            _ => s.push(ch),
        }
    }
    s
}
