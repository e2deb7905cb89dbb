//! Core data types and structures for the fine-tune tool.
//!
//! This module defines the fundamental data structures used throughout the application,
//! including measured anchor points, computed statistics, the generated point sequence,
//! user-defined custom points and persisted runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for saved runs.
pub type RunId = Uuid;

/// Unique identifier for custom points.
pub type CustomPointId = Uuid;

/// A measured pose supplied by the user.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnchorPoint {
    /// X coordinate in meters
    pub x: f64,
    /// Y coordinate in meters
    pub y: f64,
    /// Heading in degrees
    pub heading: f64,
}

impl AnchorPoint {
    /// Creates a new anchor point.
    pub fn new(x: f64, y: f64, heading: f64) -> Self {
        Self { x, y, heading }
    }
}

/// One element of the projected output sequence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeneratedPoint {
    /// X coordinate in meters
    pub x: f64,
    /// Y coordinate in meters
    pub y: f64,
    /// Heading in degrees, shared by every point of a sequence
    pub heading: f64,
}

/// Summary statistics of a set of anchor points.
///
/// Standard deviations are sample standard deviations and are reported as `0.0`
/// when fewer than two anchors were supplied.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FineTuneStatistics {
    /// Number of anchor points the statistics were computed from
    #[serde(default)]
    pub count: usize,
    /// Mean X in meters
    pub mean_x: f64,
    /// Mean Y in meters
    pub mean_y: f64,
    /// Circular mean of the headings in degrees, in `(-180, 180]`
    pub mean_heading: f64,
    /// Standard deviation of X in millimeters
    pub std_x_mm: f64,
    /// Standard deviation of Y in millimeters
    pub std_y_mm: f64,
    /// Standard deviation of the heading deviations from the circular mean, in degrees
    pub std_heading: f64,
    /// Standard deviation of each anchor's distance from the mean point, in millimeters
    #[serde(default)]
    pub radial_std_mm: f64,
}

/// Output of a single computation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SequenceResult {
    /// Statistics of the anchor points
    pub statistics: FineTuneStatistics,
    /// Points projected from the mean pose along the mean heading
    pub sequence: Vec<GeneratedPoint>,
}

/// A user-defined point placed relative to one point of the generated sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomPoint {
    /// Unique identifier for this custom point
    pub id: CustomPointId,
    /// User-displayable label
    pub label: String,
    /// Index into the generated sequence this point hangs off
    pub reference_index: usize,
    /// Signed offset along the sequence heading, in millimeters
    pub offset_mm: f64,
    /// Position resolved against the current sequence, if there is one
    #[serde(default)]
    pub resolved: Option<GeneratedPoint>,
}

impl CustomPoint {
    /// Creates an unresolved custom point anchored at `reference_index`.
    ///
    /// # Arguments
    ///
    /// * `label` - The display label
    /// * `reference_index` - Index of the generated point to measure from
    /// * `offset_mm` - Signed offset along the heading ray in millimeters
    pub fn new(label: String, reference_index: usize, offset_mm: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            label,
            reference_index,
            offset_mm,
            resolved: None,
        }
    }
}

/// A named, persisted snapshot of one computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedRun {
    /// Unique identifier for this run
    pub id: RunId,
    /// User-displayable name
    pub name: String,
    /// Statistics of the anchors the run was computed from
    pub statistics: FineTuneStatistics,
    /// The generated sequence at the time of saving
    pub sequence: Vec<GeneratedPoint>,
    /// When the run was saved
    pub created_at: DateTime<Utc>,
    /// Whether the run is drawn as an overlay in the viewport
    pub visible: bool,
    /// Custom points defined when the run was saved
    #[serde(default)]
    pub custom_points: Vec<CustomPoint>,
}

impl SavedRun {
    /// Creates a new visible run.
    ///
    /// # Arguments
    ///
    /// * `name` - The display name
    /// * `statistics` - Statistics of the computation being saved
    /// * `sequence` - The generated sequence being saved
    /// * `custom_points` - Custom points to keep alongside the sequence
    /// * `created_at` - Timestamp recorded on the run
    pub fn new(
        name: String,
        statistics: FineTuneStatistics,
        sequence: Vec<GeneratedPoint>,
        custom_points: Vec<CustomPoint>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            statistics,
            sequence,
            created_at,
            visible: true,
            custom_points,
        }
    }
}
