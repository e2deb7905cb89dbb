//! Form input model and validation.
//!
//! The UI edits anchor points and segment lengths as text; this module turns
//! that text into numeric input for the geometry engine and reports per-field
//! errors so they can be shown next to the offending input.

use crate::constants::{DEFAULT_ANCHOR_ROWS, MAX_ANCHOR_POINTS};
use crate::types::AnchorPoint;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Unit the anchor X/Y fields are typed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InputUnit {
    /// Coordinates are entered in meters
    #[default]
    Meters,
    /// Coordinates are entered in millimeters
    Millimeters,
}

impl InputUnit {
    /// Converts a value typed in this unit to meters.
    pub fn to_meters(self, value: f64) -> f64 {
        match self {
            InputUnit::Meters => value,
            InputUnit::Millimeters => value / 1000.0,
        }
    }

    /// Short label shown next to the coordinate columns.
    pub fn label(self) -> &'static str {
        match self {
            InputUnit::Meters => "m",
            InputUnit::Millimeters => "mm",
        }
    }
}

/// Identifies a single input field of the anchor table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// X coordinate of the anchor at the given row
    AnchorX(usize),
    /// Y coordinate of the anchor at the given row
    AnchorY(usize),
    /// Heading of the anchor at the given row
    AnchorHeading(usize),
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::AnchorX(i) => write!(f, "point {} x", i + 1),
            Field::AnchorY(i) => write!(f, "point {} y", i + 1),
            Field::AnchorHeading(i) => write!(f, "point {} heading", i + 1),
        }
    }
}

/// Validation failure for the input form.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    /// A required field was left blank
    #[error("{0} is required")]
    Empty(Field),
    /// A field does not hold a finite number
    #[error("{field} is not a number: {value:?}")]
    NotANumber {
        /// The offending field
        field: Field,
        /// The text that failed to parse
        value: String,
    },
    /// No anchor rows were supplied
    #[error("at least one point is required")]
    NoAnchors,
    /// More anchor rows than the tool accepts
    #[error("at most {max} points are supported, got {count}")]
    TooManyAnchors {
        /// Rows supplied
        count: usize,
        /// Maximum accepted
        max: usize,
    },
}

impl InputError {
    /// The field this error should be shown next to, if it belongs to one.
    pub fn field(&self) -> Option<Field> {
        match self {
            InputError::Empty(field) | InputError::NotANumber { field, .. } => Some(*field),
            InputError::NoAnchors | InputError::TooManyAnchors { .. } => None,
        }
    }
}

/// Text contents of one anchor row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnchorRow {
    /// X coordinate text
    pub x: String,
    /// Y coordinate text
    pub y: String,
    /// Heading text (degrees)
    pub heading: String,
}

impl AnchorRow {
    /// Creates a row from already formatted values.
    pub fn new(x: impl Into<String>, y: impl Into<String>, heading: impl Into<String>) -> Self {
        Self {
            x: x.into(),
            y: y.into(),
            heading: heading.into(),
        }
    }
}

/// The editable input form: anchor rows, segment lengths and the coordinate unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormInput {
    /// Anchor rows in entry order
    pub anchors: Vec<AnchorRow>,
    /// Segment lengths in meters, one per gap between rows
    pub segments: Vec<String>,
    /// Unit of the anchor X/Y columns
    pub unit: InputUnit,
}

impl Default for FormInput {
    fn default() -> Self {
        let mut form = Self {
            anchors: vec![AnchorRow::default(); DEFAULT_ANCHOR_ROWS],
            segments: Vec::new(),
            unit: InputUnit::Meters,
        };
        form.sync_segments();
        form
    }
}

fn parse_required(text: &str, field: Field) -> Result<f64, InputError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(InputError::Empty(field));
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(InputError::NotANumber {
            field,
            value: trimmed.to_string(),
        }),
    }
}

/// Parses a segment length, falling back to `0.0` for blank or non-numeric text.
pub fn parse_segment(text: &str) -> f64 {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

impl FormInput {
    /// Keeps exactly one segment field per gap between anchor rows.
    pub fn sync_segments(&mut self) {
        let needed = self.anchors.len().saturating_sub(1);
        self.segments.resize(needed, String::new());
    }

    /// Appends an empty anchor row. Returns `false` once the row limit is reached.
    pub fn add_anchor_row(&mut self) -> bool {
        if self.anchors.len() >= MAX_ANCHOR_POINTS {
            return false;
        }
        self.anchors.push(AnchorRow::default());
        self.sync_segments();
        true
    }

    /// Removes the anchor row at `index`, keeping at least one row.
    pub fn remove_anchor_row(&mut self, index: usize) -> bool {
        if self.anchors.len() <= 1 || index >= self.anchors.len() {
            return false;
        }
        self.anchors.remove(index);
        // Drop the segment leading into the removed row (or out of it for the first row).
        if !self.segments.is_empty() {
            let seg = index.saturating_sub(1).min(self.segments.len() - 1);
            self.segments.remove(seg);
        }
        self.sync_segments();
        true
    }

    /// Validates every field and returns anchors in meters plus parsed segments.
    ///
    /// All field errors are collected so the UI can flag each offending input at once.
    pub fn validate(&self) -> Result<(Vec<AnchorPoint>, Vec<f64>), Vec<InputError>> {
        if self.anchors.is_empty() {
            return Err(vec![InputError::NoAnchors]);
        }
        if self.anchors.len() > MAX_ANCHOR_POINTS {
            return Err(vec![InputError::TooManyAnchors {
                count: self.anchors.len(),
                max: MAX_ANCHOR_POINTS,
            }]);
        }

        let mut errors = Vec::new();
        let mut anchors = Vec::with_capacity(self.anchors.len());
        for (i, row) in self.anchors.iter().enumerate() {
            let x = parse_required(&row.x, Field::AnchorX(i));
            let y = parse_required(&row.y, Field::AnchorY(i));
            let heading = parse_required(&row.heading, Field::AnchorHeading(i));
            match (x, y, heading) {
                (Ok(x), Ok(y), Ok(heading)) => anchors.push(AnchorPoint::new(
                    self.unit.to_meters(x),
                    self.unit.to_meters(y),
                    heading,
                )),
                (x, y, heading) => {
                    errors.extend([x.err(), y.err(), heading.err()].into_iter().flatten());
                }
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }
        let segments = self.segments.iter().map(|s| parse_segment(s)).collect();
        Ok((anchors, segments))
    }
}
