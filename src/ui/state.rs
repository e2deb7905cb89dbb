//! Application state management structures.
//!
//! This module contains the state structures that track the application's
//! current UI state: the input form, the latest computation, canvas navigation,
//! saved-run editing and file operations.

use super::controller::ViewportController;
use crate::constants::APP_STATE_KEY;
use crate::input::{FormInput, InputError};
use crate::runs::RunStore;
use crate::types::*;
use crate::viewport::WorldRect;
use eframe::egui;
use serde::{Deserialize, Serialize};
use std::sync::mpsc::{channel, Receiver, Sender};

/// State related to canvas navigation.
///
/// Zoom and pan are transient: they are reset whenever a computation completes.
#[derive(Default)]
pub struct CanvasState {
    /// Zoom/pan controller and fitted bounds
    pub controller: ViewportController,
    /// Whether the user is currently panning the canvas
    pub is_panning: bool,
    /// Last mouse position during panning operation
    pub last_pan_pos: Option<egui::Pos2>,
    /// Label of the plotted point under the cursor, if any
    pub hovered: Option<String>,
    /// World bounds typed into the view bounds editor
    pub bounds_input: WorldRect,
}

/// Display toggles persisted between sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayOptions {
    /// Whether the grid should be displayed on the canvas
    pub show_grid: bool,
    /// Whether tick labels are drawn along the canvas edges
    pub show_labels: bool,
    /// Whether the raw anchor points are drawn
    pub show_inputs: bool,
    /// Whether dark mode visuals are enabled
    pub dark_mode: bool,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            show_grid: true,
            show_labels: true,
            show_inputs: true,
            dark_mode: true,
        }
    }
}

/// State of the saved-runs panel.
#[derive(Default)]
pub struct RunPanelState {
    /// Name typed for the next saved run
    pub new_run_name: String,
    /// Run currently being renamed
    pub editing: Option<RunId>,
    /// Temporary storage for the run name while editing
    pub temp_name: String,
    /// Flag to track if focus was already requested for the current edit session
    pub focus_requested_for_edit: bool,
}

/// Options for exporting the plot as an image.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// Output width in pixels
    pub width: u32,
    /// Output height in pixels
    pub height: u32,
    /// Scale factor applied to PNG output
    pub png_scale: f32,
    /// Whether to fill the background
    pub include_background: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 800,
            png_scale: 1.0,
            include_background: true,
        }
    }
}

/// State related to file operations.
///
/// Manages async file dialogs for run import/export and plot export.
pub struct FileState {
    /// Pending file operation to start on the next frame
    pub pending_operation: Option<PendingFileOperation>,
    /// Channel for receiving file operation results from async contexts
    pub file_operation_sender: Option<Sender<FileOperationResult>>,
    pub file_operation_receiver: Option<Receiver<FileOperationResult>>,
    /// Last status message shown in the toolbar
    pub status: Option<String>,
    /// Whether the export options window is open
    pub show_export_dialog: bool,
}

impl Default for FileState {
    fn default() -> Self {
        let (sender, receiver) = channel();
        Self {
            pending_operation: None,
            file_operation_sender: Some(sender),
            file_operation_receiver: Some(receiver),
            status: None,
            show_export_dialog: false,
        }
    }
}

/// File operations started from the toolbar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingFileOperation {
    /// Write all saved runs to a JSON file
    ExportRuns,
    /// Merge saved runs from a JSON file
    ImportRuns,
    /// Write the plot as SVG
    ExportSvg,
    /// Write the plot as PNG (native only)
    ExportPng,
}

/// Messages sent from async file operations back to the main app.
#[derive(Debug)]
pub enum FileOperationResult {
    /// A file was written to the given path
    SaveCompleted(String),
    /// Run file content was read from the given path
    RunsLoaded(String, String),
    /// Operation failed with an error message
    OperationFailed(String),
}

/// The main application structure containing UI state and the computation.
///
/// This struct implements the `eframe::App` trait and handles all user interface
/// rendering and interaction logic.
#[derive(Serialize, Deserialize)]
#[serde(default)]
pub struct FineTuneApp {
    /// Text contents of the input form
    pub form: FormInput,
    /// Custom points placed along the generated sequence
    pub custom_points: Vec<CustomPoint>,
    /// Display toggles
    pub display: DisplayOptions,
    /// Image export options
    pub export: ExportOptions,
    /// Remembered width of the input panel across sessions
    pub panel_width: f32,
    /// Validation errors from the last compute attempt
    #[serde(skip)]
    pub field_errors: Vec<InputError>,
    /// Anchors (in meters) the current result was computed from
    #[serde(skip)]
    pub anchors: Vec<AnchorPoint>,
    /// Latest computation, if any
    #[serde(skip)]
    pub result: Option<SequenceResult>,
    /// Saved runs and their pending storage write
    #[serde(skip)]
    pub runs: RunStore,
    /// Canvas navigation state
    #[serde(skip)]
    pub canvas: CanvasState,
    /// Saved-run panel state
    #[serde(skip)]
    pub run_panel: RunPanelState,
    /// File operations state
    #[serde(skip)]
    pub file: FileState,
}

impl Default for FineTuneApp {
    fn default() -> Self {
        Self {
            form: FormInput::default(),
            custom_points: Vec::new(),
            display: DisplayOptions::default(),
            export: ExportOptions::default(),
            panel_width: 360.0,
            field_errors: Vec::new(),
            anchors: Vec::new(),
            result: None,
            runs: RunStore::new(),
            canvas: CanvasState::default(),
            run_panel: RunPanelState::default(),
            file: FileState::default(),
        }
    }
}

impl FineTuneApp {
    /// Restores preferences and saved runs from eframe storage.
    ///
    /// Missing or unreadable state falls back to defaults.
    pub fn new(storage: Option<&dyn eframe::Storage>) -> Self {
        let mut app = storage
            .and_then(|s| s.get_string(APP_STATE_KEY))
            .and_then(|json| match Self::from_json(&json) {
                Ok(app) => Some(app),
                Err(err) => {
                    log::warn!("Ignoring unreadable app state: {err}");
                    None
                }
            })
            .unwrap_or_default();
        app.form.sync_segments();
        app.runs = RunStore::load(storage);
        app
    }

    /// Serializes the persisted part of the application state to JSON.
    ///
    /// # Returns
    ///
    /// A JSON string representation of the app state, or an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserializes application state from JSON.
    ///
    /// # Arguments
    ///
    /// * `json` - JSON string containing the serialized app state
    ///
    /// # Returns
    ///
    /// A `FineTuneApp` instance, or an error if deserialization fails.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
