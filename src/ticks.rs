//! Adaptive axis tick generation.
//!
//! Picks a "nice" step (1, 2 or 5 times a power of ten) for the visible world
//! range so ticks land roughly [`TARGET_TICK_SPACING_PX`] apart on screen, and
//! emits tick values covering the range plus one step on each side. Both axes
//! share one step so grid cells stay square.
//!
//! [`TARGET_TICK_SPACING_PX`]: crate::constants::TARGET_TICK_SPACING_PX

use crate::constants::{MAX_LABEL_DECIMALS, MAX_TARGET_TICKS, MAX_TICKS, MIN_TARGET_TICKS};
use crate::viewport::{CanvasSize, WorldRect};

/// Number of ticks to aim for along an axis `extent_px` pixels long.
pub fn target_tick_count(extent_px: f64, spacing_px: f64) -> usize {
    if !(extent_px > 0.0 && spacing_px > 0.0) {
        return MIN_TARGET_TICKS;
    }
    let count = (extent_px / spacing_px).round();
    (count as usize).clamp(MIN_TARGET_TICKS, MAX_TARGET_TICKS)
}

/// Rounds `raw` to the nearest member of `{1, 2, 5, 10} × 10^k`.
///
/// Non-positive or non-finite input yields `1.0`.
pub fn nice_step(raw: f64) -> f64 {
    if !(raw > 0.0 && raw.is_finite()) {
        return 1.0;
    }
    let magnitude = 10f64.powf(raw.log10().floor());
    let fraction = raw / magnitude;
    let nice = if fraction < 1.5 {
        1.0
    } else if fraction < 3.5 {
        2.0
    } else if fraction < 7.5 {
        5.0
    } else {
        10.0
    };
    nice * magnitude
}

/// The next larger nice step after `step`.
pub fn next_nice_step(step: f64) -> f64 {
    let magnitude = 10f64.powf(step.log10().floor());
    let fraction = (step / magnitude).round();
    if fraction < 2.0 {
        2.0 * magnitude
    } else if fraction < 5.0 {
        5.0 * magnitude
    } else {
        10.0 * magnitude
    }
}

/// Indices are clamped well inside `i64` so huge ranges cannot overflow.
fn tick_index_range(min: f64, max: f64, step: f64) -> (i64, i64) {
    let limit = (i64::MAX / 4) as f64;
    let first = ((min / step).floor() - 1.0).clamp(-limit, limit) as i64;
    let last = ((max / step).ceil() + 1.0).clamp(-limit, limit) as i64;
    (first, last)
}

fn tick_count(min: f64, max: f64, step: f64) -> usize {
    let (first, last) = tick_index_range(min, max, step);
    last.saturating_sub(first).saturating_add(1).max(0) as usize
}

/// Multiples of `step` covering `[min - step, max + step]`, at most [`MAX_TICKS`].
///
/// Returns an empty list for an invalid range or step.
pub fn generate_ticks(min: f64, max: f64, step: f64) -> Vec<f64> {
    if !(step > 0.0 && step.is_finite() && min.is_finite() && max.is_finite()) || min > max {
        return Vec::new();
    }
    let (first, last) = tick_index_range(min, max, step);
    (first..=last)
        .take(MAX_TICKS)
        .map(|i| i as f64 * step)
        .collect()
}

/// Decimal places needed to tell neighbouring ticks apart at this step.
pub fn label_decimals(step: f64) -> usize {
    if !(step > 0.0) || step >= 1.0 {
        return 0;
    }
    let decimals = (-step.log10() - 1e-9).ceil().max(0.0) as usize;
    decimals.min(MAX_LABEL_DECIMALS)
}

/// Formats a tick value with a precision derived from the step only, so labels
/// keep their width while panning.
pub fn format_tick(value: f64, step: f64) -> String {
    let value = if value.abs() < step.abs() * 1e-6 { 0.0 } else { value };
    format!("{:.*}", label_decimals(step), value)
}

/// Ticks for both axes of the visible world rectangle.
#[derive(Debug, Clone, PartialEq)]
pub struct GridTicks {
    /// Shared step in meters
    pub step: f64,
    /// Tick values along X
    pub xs: Vec<f64>,
    /// Tick values along Y
    pub ys: Vec<f64>,
}

impl GridTicks {
    /// Computes ticks for `visible`, sized for a `canvas` with ticks about `spacing_px` apart.
    ///
    /// The step comes from the larger of the two visible ranges and is raised
    /// until neither axis exceeds [`MAX_TICKS`].
    pub fn for_view(visible: &WorldRect, canvas: CanvasSize, spacing_px: f64) -> Self {
        let range = visible.width().max(visible.height());
        if !(range > 0.0 && range.is_finite()) {
            return Self {
                step: 1.0,
                xs: Vec::new(),
                ys: Vec::new(),
            };
        }

        let target = target_tick_count(canvas.width.max(canvas.height), spacing_px);
        let mut step = nice_step(range / target as f64);
        for _ in 0..64 {
            let worst = tick_count(visible.min_x, visible.max_x, step)
                .max(tick_count(visible.min_y, visible.max_y, step));
            if worst <= MAX_TICKS {
                break;
            }
            step = next_nice_step(step);
        }

        Self {
            step,
            xs: generate_ticks(visible.min_x, visible.max_x, step),
            ys: generate_ticks(visible.min_y, visible.max_y, step),
        }
    }

    /// Label for a tick on either axis.
    pub fn label(&self, value: f64) -> String {
        format_tick(value, self.step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= b.abs() * 1e-12
    }

    #[test]
    fn test_nice_step_rounds_to_nearest() {
        assert!(close(nice_step(1.2), 1.0));
        assert!(close(nice_step(1.6), 2.0));
        assert!(close(nice_step(3.0), 2.0));
        assert!(close(nice_step(4.0), 5.0));
        assert!(close(nice_step(8.0), 10.0));
        assert!(close(nice_step(0.03), 0.02));
        assert!(close(nice_step(420.0), 500.0));
        assert_eq!(nice_step(0.0), 1.0);
        assert_eq!(nice_step(f64::NAN), 1.0);
    }

    #[test]
    fn test_next_nice_step_sequence() {
        assert!(close(next_nice_step(1.0), 2.0));
        assert!(close(next_nice_step(2.0), 5.0));
        assert!(close(next_nice_step(5.0), 10.0));
        assert!(close(next_nice_step(0.05), 0.1));
    }

    #[test]
    fn test_target_tick_count_is_clamped() {
        assert_eq!(target_tick_count(100.0, 80.0), MIN_TARGET_TICKS);
        assert_eq!(target_tick_count(800.0, 80.0), 10);
        assert_eq!(target_tick_count(5000.0, 80.0), MAX_TARGET_TICKS);
        assert_eq!(target_tick_count(800.0, 0.0), MIN_TARGET_TICKS);
    }

    #[test]
    fn test_generate_ticks_covers_range_with_margin() {
        let ticks = generate_ticks(0.3, 2.7, 1.0);
        assert_eq!(ticks, vec![-1.0, 0.0, 1.0, 2.0, 3.0, 4.0]);
        assert!(generate_ticks(1.0, 0.0, 1.0).is_empty());
        assert!(generate_ticks(0.0, 1.0, 0.0).is_empty());
    }

    #[test]
    fn test_tick_count_never_exceeds_cap() {
        let canvas = CanvasSize::new(1200.0, 800.0);
        for range in [1e-7, 0.004, 1.0, 37.0, 1e5, 1e12] {
            let visible = WorldRect::new(-range, -range / 3.0, range * 2.0, range);
            let ticks = GridTicks::for_view(&visible, canvas, 1.0);
            assert!(ticks.xs.len() <= MAX_TICKS, "{range}: {}", ticks.xs.len());
            assert!(ticks.ys.len() <= MAX_TICKS, "{range}: {}", ticks.ys.len());
        }
        assert!(generate_ticks(-1e9, 1e9, 1.0).len() <= MAX_TICKS);
    }

    #[test]
    fn test_huge_ranges_do_not_overflow() {
        let ticks = generate_ticks(-1e20, 1e20, 1.0);
        assert!(!ticks.is_empty());
        assert!(ticks.len() <= MAX_TICKS);
        assert!(tick_count(-1e30, 1e30, 1e-3) > MAX_TICKS);

        let visible = WorldRect::new(-1e20, -1e20, 2e20, 2e20);
        let grid = GridTicks::for_view(&visible, CanvasSize::new(1200.0, 800.0), 1.0);
        assert!(!grid.xs.is_empty() && grid.xs.len() <= MAX_TICKS);
        assert!(grid.step.is_finite() && grid.step > 0.0);
    }

    #[test]
    fn test_axes_share_step_from_larger_range() {
        let canvas = CanvasSize::new(800.0, 800.0);
        let visible = WorldRect::new(0.0, 0.0, 10.0, 1.0);
        let ticks = GridTicks::for_view(&visible, canvas, 80.0);
        assert!(close(ticks.step, 1.0));
        assert_eq!(ticks.ys, vec![-1.0, 0.0, 1.0, 2.0]);
        assert_eq!(ticks.xs.first(), Some(&-1.0));
        assert_eq!(ticks.xs.last(), Some(&11.0));
    }

    #[test]
    fn test_label_precision_follows_step() {
        assert_eq!(label_decimals(10.0), 0);
        assert_eq!(label_decimals(1.0), 0);
        assert_eq!(label_decimals(0.5), 1);
        assert_eq!(label_decimals(0.1), 1);
        assert_eq!(label_decimals(0.05), 2);
        assert_eq!(label_decimals(0.001), 3);
        assert_eq!(label_decimals(1e-7), 7);
        assert_ne!(format_tick(1e-7, 1e-7), format_tick(2e-7, 1e-7));
        assert_eq!(format_tick(0.30000000000000004, 0.1), "0.3");
        assert_eq!(format_tick(2.0, 0.5), "2.0");
        assert_eq!(format_tick(-1e-18, 0.01), "0.00");
    }

    #[test]
    fn test_degenerate_view_yields_no_ticks() {
        let ticks = GridTicks::for_view(&WorldRect::new(1.0, 1.0, 1.0, 1.0), CanvasSize::new(100.0, 100.0), 80.0);
        assert!(ticks.xs.is_empty() && ticks.ys.is_empty());
    }
}
