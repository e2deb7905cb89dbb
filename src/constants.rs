//! Shared application-wide constants.
//! Centralizes tweakable values used across computation, the viewport and persistence.

// Input limits
/// Maximum number of anchor points accepted by the input form.
pub const MAX_ANCHOR_POINTS: usize = 10;
/// Number of anchor rows shown in a fresh form.
pub const DEFAULT_ANCHOR_ROWS: usize = 3;

// Rounding
/// Decimal places kept for coordinates (meters).
pub const COORD_DECIMALS: i32 = 6;
/// Decimal places kept for angles (degrees) and standard deviations.
pub const ANGLE_DECIMALS: i32 = 4;

// Viewport zoom/pan
/// Smallest allowed zoom factor relative to the auto-fit view.
pub const MIN_ZOOM: f64 = 0.05;
/// Largest allowed zoom factor relative to the auto-fit view.
pub const MAX_ZOOM: f64 = 500.0;
/// Multiplicative zoom step applied per wheel notch or `+`/`-` key press.
pub const WHEEL_ZOOM_STEP: f64 = 1.15;
/// Screen pixels panned per arrow key press.
pub const KEY_PAN_STEP_PX: f64 = 40.0;
/// Extra pixels around the canvas included in the visible world extent, so grid
/// lines reach past the edges while panning.
pub const VISIBLE_MARGIN_PX: f64 = 40.0;
/// Canvas size used before the first resize observation arrives.
pub const DEFAULT_CANVAS_SIZE: (f64, f64) = (800.0, 600.0);

// Auto-fit bounds
/// Minimum padding (meters) added on each side of the plotted data.
pub const MIN_BOUNDS_PADDING_M: f64 = 0.01;
/// Relative padding added on each side of the plotted data.
pub const BOUNDS_PADDING_RATIO: f64 = 0.1;
/// Extents below this (meters) are treated as a single location.
pub const DEGENERATE_EXTENT_M: f64 = 1e-9;
/// Half-width (meters) of the window used for degenerate extents.
pub const DEGENERATE_HALF_WINDOW_M: f64 = 1.0;
/// Smallest width or height (meters) accepted for manual view bounds.
pub const MIN_MANUAL_EXTENT_M: f64 = 0.02;

// Grid ticks
/// Preferred on-screen distance between neighbouring ticks.
pub const TARGET_TICK_SPACING_PX: f64 = 80.0;
/// Lower clamp on the number of ticks requested per axis.
pub const MIN_TARGET_TICKS: usize = 5;
/// Upper clamp on the number of ticks requested per axis.
pub const MAX_TARGET_TICKS: usize = 15;
/// Hard cap on ticks emitted per axis.
pub const MAX_TICKS: usize = 50;
/// Largest number of decimals shown in tick labels.
pub const MAX_LABEL_DECIMALS: usize = 9;

// Saved runs
/// eframe storage key holding the saved runs array.
pub const RUNS_STORAGE_KEY: &str = "finetune.saved_runs";
/// eframe storage key holding the UI preferences.
pub const APP_STATE_KEY: &str = "app_state";
/// Maximum number of saved runs retained.
pub const MAX_SAVED_RUNS: usize = 20;
/// Cap applied when the serialized runs exceed [`MAX_RUNS_STORAGE_BYTES`].
pub const EMERGENCY_SAVED_RUNS: usize = 5;
/// Serialized size above which runs are pruned to [`EMERGENCY_SAVED_RUNS`].
pub const MAX_RUNS_STORAGE_BYTES: usize = 1_500_000;
/// Idle delay before a pending runs write is flushed to storage.
pub const PERSIST_DEBOUNCE_SECS: f64 = 0.5;
/// Version written into exported run files.
pub const RUNS_EXPORT_VERSION: u32 = 1;

// Canvas interactions
/// Hover radius (screen pixels) for point tooltips.
pub const HOVER_RADIUS_PX: f32 = 8.0;
