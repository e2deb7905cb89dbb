//! # Fine-Tune Tool
//!
//! Turns a handful of measured poses (x, y, heading) into summary statistics
//! and a straight-line sequence of evenly oriented points projected from their
//! mean pose, then plots everything on an interactive canvas.
//!
//! ## Features
//! - Circular mean and spread of headings, sample spread of positions in mm
//! - Sequence generation along the mean heading with user-defined segment lengths
//! - Custom points offset along the sequence
//! - Zoomable, pannable plot with adaptive grid ticks
//! - Saved runs persisted in app storage, with JSON import/export
//! - SVG export everywhere, PNG export on native builds

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod constants;
pub mod geometry;
pub mod input;
pub mod runs;
pub mod ticks;
mod types;
mod ui;
pub mod viewport;

// Re-export public types and functions
pub use geometry::{compute_sequence, normalize_angle, resolve_custom_points};
pub use input::{FormInput, InputError, InputUnit};
pub use runs::{RunStore, RunStoreError};
pub use types::*;
pub use ui::{FineTuneApp, ViewKey, ViewportController};

/// Runs the fine-tune application with default settings.
///
/// Must be called from within a tokio runtime; file dialogs are spawned on it.
///
/// # Returns
///
/// Returns `Ok(())` if the application runs successfully, or an `eframe::Error` if
/// initialization fails.
///
/// # Example
///
/// ```no_run
/// #[tokio::main]
/// async fn main() -> Result<(), eframe::Error> {
///     finetune_tool::run_app()
/// }
/// ```
#[cfg(not(target_arch = "wasm32"))]
pub fn run_app() -> Result<(), eframe::Error> {
    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 820.0])
            .with_min_inner_size([720.0, 480.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Fine-Tune Tool",
        options,
        Box::new(|cc| Ok(Box::new(FineTuneApp::new(cc.storage)))),
    )
}

/// Starts the application on a browser canvas.
#[cfg(target_arch = "wasm32")]
pub async fn start_web(
    canvas: web_sys::HtmlCanvasElement,
) -> Result<(), eframe::wasm_bindgen::JsValue> {
    eframe::WebRunner::new()
        .start(
            canvas,
            eframe::WebOptions::default(),
            Box::new(|cc| Ok(Box::new(FineTuneApp::new(cc.storage)))),
        )
        .await
}
