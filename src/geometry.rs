//! Geometry and statistics engine.
//!
//! Averages anchor poses (arithmetic mean for coordinates, circular mean for
//! headings), reports their spread and projects a straight sequence of points
//! forward from the mean pose along the mean heading.

use crate::constants::{ANGLE_DECIMALS, COORD_DECIMALS};
use crate::types::*;

/// Normalizes an angle in degrees into `(-180, 180]`.
pub fn normalize_angle(angle_deg: f64) -> f64 {
    let wrapped = angle_deg.rem_euclid(360.0);
    if wrapped > 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}

/// Circular mean of a set of headings in degrees.
///
/// Each heading is turned into a unit vector, the vectors are summed and the
/// direction of the sum is returned, normalized into `(-180, 180]`. An empty
/// slice yields `0.0`.
pub fn circular_mean(angles_deg: &[f64]) -> f64 {
    if angles_deg.is_empty() {
        return 0.0;
    }
    let (sin_sum, cos_sum) = angles_deg.iter().fold((0.0, 0.0), |(s, c), a| {
        let rad = a.to_radians();
        (s + rad.sin(), c + rad.cos())
    });
    normalize_angle(sin_sum.atan2(cos_sum).to_degrees())
}

/// Sample standard deviation of the signed deviations of `angles_deg` from `mean_deg`.
///
/// Deviations are normalized before squaring so that values on either side of
/// the ±180° seam do not inflate the spread.
pub fn circular_std(angles_deg: &[f64], mean_deg: f64) -> f64 {
    if angles_deg.len() < 2 {
        return 0.0;
    }
    let sum_sq: f64 = angles_deg
        .iter()
        .map(|a| normalize_angle(a - mean_deg).powi(2))
        .sum();
    (sum_sq / (angles_deg.len() - 1) as f64).sqrt()
}

/// Arithmetic mean, `0.0` for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (denominator `N - 1`), `0.0` when fewer than two values.
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let sum_sq: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (sum_sq / (values.len() - 1) as f64).sqrt()
}

/// Rounds `value` to `decimals` decimal places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    let rounded = (value * factor).round() / factor;
    // Avoid printing "-0.000000" for tiny negative values.
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Pads with zeros or truncates `segments` to exactly `anchor_count - 1` entries.
pub fn fit_segments(segments: &[f64], anchor_count: usize) -> Vec<f64> {
    let needed = anchor_count.saturating_sub(1);
    let mut fitted: Vec<f64> = segments.iter().copied().take(needed).collect();
    fitted.resize(needed, 0.0);
    fitted
}

/// Rounds a heading to [`ANGLE_DECIMALS`] and keeps it inside `(-180, 180]`.
///
/// Values just above -180 round onto -180, which maps to 180.
pub fn round_angle(angle_deg: f64) -> f64 {
    let rounded = round_to(normalize_angle(angle_deg), ANGLE_DECIMALS);
    if rounded <= -180.0 {
        rounded + 360.0
    } else {
        rounded
    }
}

fn generated_point(x: f64, y: f64, heading: f64) -> GeneratedPoint {
    GeneratedPoint {
        x: round_to(x, COORD_DECIMALS),
        y: round_to(y, COORD_DECIMALS),
        heading: round_angle(heading),
    }
}

/// Computes the statistics of `anchors` and the sequence projected from their mean pose.
///
/// No validation happens here; callers are expected to pass finite values. A
/// single anchor produces a one-element sequence with zero spread, and zero
/// length segments produce a stationary sequence.
///
/// # Arguments
///
/// * `anchors` - Measured poses
/// * `segments` - Distances in meters between consecutive generated points; padded
///   with zeros or truncated to `anchors.len() - 1`
pub fn compute_sequence(anchors: &[AnchorPoint], segments: &[f64]) -> SequenceResult {
    if anchors.is_empty() {
        return SequenceResult::default();
    }

    let xs: Vec<f64> = anchors.iter().map(|a| a.x).collect();
    let ys: Vec<f64> = anchors.iter().map(|a| a.y).collect();
    let headings: Vec<f64> = anchors.iter().map(|a| a.heading).collect();

    let mean_x = mean(&xs);
    let mean_y = mean(&ys);
    let mean_heading = circular_mean(&headings);

    let radial: Vec<f64> = anchors
        .iter()
        .map(|a| (a.x - mean_x).hypot(a.y - mean_y))
        .collect();

    let statistics = FineTuneStatistics {
        count: anchors.len(),
        mean_x: round_to(mean_x, COORD_DECIMALS),
        mean_y: round_to(mean_y, COORD_DECIMALS),
        mean_heading: round_angle(mean_heading),
        std_x_mm: round_to(sample_std(&xs) * 1000.0, ANGLE_DECIMALS),
        std_y_mm: round_to(sample_std(&ys) * 1000.0, ANGLE_DECIMALS),
        std_heading: round_to(circular_std(&headings, mean_heading), ANGLE_DECIMALS),
        radial_std_mm: round_to(sample_std(&radial) * 1000.0, ANGLE_DECIMALS),
    };

    let (sin_h, cos_h) = mean_heading.to_radians().sin_cos();
    let mut current_x = mean_x;
    let mut current_y = mean_y;
    let mut sequence = Vec::with_capacity(anchors.len());
    sequence.push(generated_point(current_x, current_y, mean_heading));
    for length in fit_segments(segments, anchors.len()) {
        current_x += length * cos_h;
        current_y += length * sin_h;
        sequence.push(generated_point(current_x, current_y, mean_heading));
    }

    SequenceResult {
        statistics,
        sequence,
    }
}

/// Resolves a single custom point against `sequence`.
///
/// Returns the clamped reference index together with the resolved position,
/// or `None` when the sequence is empty.
pub fn resolve_custom_point(
    point: &CustomPoint,
    sequence: &[GeneratedPoint],
) -> Option<(usize, GeneratedPoint)> {
    let last = sequence.len().checked_sub(1)?;
    let index = point.reference_index.min(last);
    let base = sequence[index];
    let (sin_h, cos_h) = base.heading.to_radians().sin_cos();
    let offset_m = point.offset_mm / 1000.0;
    Some((
        index,
        generated_point(base.x + offset_m * cos_h, base.y + offset_m * sin_h, base.heading),
    ))
}

/// Re-resolves every custom point against `sequence`.
///
/// Out-of-range reference indices resolve against the last generated point
/// but are kept as entered, so a longer sequence later picks them up again.
pub fn resolve_custom_points(points: &mut [CustomPoint], sequence: &[GeneratedPoint]) {
    for point in points.iter_mut() {
        point.resolved = resolve_custom_point(point, sequence).map(|(_, resolved)| resolved);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    #[test]
    fn test_normalize_angle_range() {
        assert_eq!(normalize_angle(180.0), 180.0);
        assert_eq!(normalize_angle(-180.0), 180.0);
        assert_eq!(normalize_angle(181.0), -179.0);
        assert_eq!(normalize_angle(540.0), 180.0);
        assert_eq!(normalize_angle(-90.0), -90.0);
        assert_eq!(normalize_angle(0.0), 0.0);
    }

    #[test]
    fn test_circular_mean_across_seam() {
        let m = circular_mean(&[179.0, -179.0]);
        assert!(approx(m.abs(), 180.0, 1e-9), "got {m}");
    }

    #[test]
    fn test_circular_mean_simple() {
        assert!(approx(circular_mean(&[10.0, 20.0, 30.0]), 20.0, 1e-9));
        assert!(approx(circular_mean(&[350.0, 10.0]), 0.0, 1e-9));
        assert_eq!(circular_mean(&[]), 0.0);
    }

    #[test]
    fn test_circular_std_ignores_wraparound() {
        let angles = [179.0, -179.0];
        let m = circular_mean(&angles);
        let s = circular_std(&angles, m);
        // Deviations are +-1 degree, so the sample std is sqrt(2).
        assert!(approx(s, 2f64.sqrt(), 1e-6), "got {s}");
    }

    #[test]
    fn test_sample_std() {
        assert_eq!(sample_std(&[1.0]), 0.0);
        assert!(approx(sample_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]), 2.138_089_935, 1e-6));
    }

    #[test]
    fn test_fit_segments_pads_and_truncates() {
        assert_eq!(fit_segments(&[1.0], 4), vec![1.0, 0.0, 0.0]);
        assert_eq!(fit_segments(&[1.0, 2.0, 3.0], 2), vec![1.0]);
        assert!(fit_segments(&[1.0], 1).is_empty());
        assert!(fit_segments(&[], 0).is_empty());
    }

    #[test]
    fn test_scenario_three_anchors() {
        let anchors = [
            AnchorPoint::new(0.0, 0.0, 0.0),
            AnchorPoint::new(0.0, 0.002, 0.0),
            AnchorPoint::new(0.0, -0.001, 0.0),
        ];
        let result = compute_sequence(&anchors, &[1.0, 1.0]);
        let stats = result.statistics;
        assert_eq!(stats.mean_x, 0.0);
        assert_eq!(stats.mean_y, 0.000333);
        assert_eq!(stats.mean_heading, 0.0);
        assert_eq!(
            result.sequence,
            vec![
                GeneratedPoint { x: 0.0, y: 0.000333, heading: 0.0 },
                GeneratedPoint { x: 1.0, y: 0.000333, heading: 0.0 },
                GeneratedPoint { x: 2.0, y: 0.000333, heading: 0.0 },
            ]
        );
        assert!(approx(stats.std_y_mm, 1.5275, 1e-4));
        assert_eq!(stats.std_x_mm, 0.0);
        assert_eq!(stats.count, 3);
    }

    #[test]
    fn test_sequence_starts_at_mean_regardless_of_order() {
        let mut anchors = vec![
            AnchorPoint::new(1.0, 2.0, 45.0),
            AnchorPoint::new(1.2, 1.8, 47.0),
            AnchorPoint::new(0.9, 2.1, 43.0),
        ];
        let first = compute_sequence(&anchors, &[0.5, 0.5]);
        anchors.reverse();
        let second = compute_sequence(&anchors, &[0.5, 0.5]);
        for result in [&first, &second] {
            let s = result.statistics;
            assert_eq!(result.sequence[0], GeneratedPoint { x: s.mean_x, y: s.mean_y, heading: s.mean_heading });
        }
        assert_eq!(first.sequence[0], second.sequence[0]);
    }

    #[test]
    fn test_distances_increase_for_positive_segments() {
        let anchors: Vec<AnchorPoint> = (0..6).map(|i| AnchorPoint::new(i as f64 * 0.01, 0.0, 30.0)).collect();
        let result = compute_sequence(&anchors, &[0.3, 0.1, 2.0, 0.05, 1.0]);
        let origin = result.sequence[0];
        let distances: Vec<f64> = result
            .sequence
            .iter()
            .map(|p| (p.x - origin.x).hypot(p.y - origin.y))
            .collect();
        assert!(distances.windows(2).all(|w| w[1] > w[0]), "{distances:?}");
        assert!(result.sequence.iter().all(|p| p.heading == origin.heading));
    }

    #[test]
    fn test_std_non_negative_and_zero_for_single_point() {
        let single = compute_sequence(&[AnchorPoint::new(3.0, -4.0, 170.0)], &[5.0]);
        let s = single.statistics;
        assert_eq!((s.std_x_mm, s.std_y_mm, s.std_heading, s.radial_std_mm), (0.0, 0.0, 0.0, 0.0));
        assert_eq!(single.sequence.len(), 1);

        let many = compute_sequence(
            &[
                AnchorPoint::new(-1.0, 5.0, -170.0),
                AnchorPoint::new(2.0, 0.5, 175.0),
                AnchorPoint::new(0.3, -2.0, 90.0),
            ],
            &[],
        );
        let s = many.statistics;
        assert!(s.std_x_mm >= 0.0 && s.std_y_mm >= 0.0 && s.std_heading >= 0.0 && s.radial_std_mm >= 0.0);
        // Missing segments are zero: the sequence is stationary.
        assert!(many.sequence.iter().all(|p| *p == many.sequence[0]));
    }

    #[test]
    fn test_radial_std_of_symmetric_points_is_zero() {
        let anchors = [
            AnchorPoint::new(1.0, 0.0, 0.0),
            AnchorPoint::new(-1.0, 0.0, 0.0),
            AnchorPoint::new(0.0, 1.0, 0.0),
            AnchorPoint::new(0.0, -1.0, 0.0),
        ];
        let stats = compute_sequence(&anchors, &[]).statistics;
        assert_eq!(stats.radial_std_mm, 0.0);
        assert!(stats.std_x_mm > 0.0);
    }

    #[test]
    fn test_heading_projection_direction() {
        let anchors = [AnchorPoint::new(0.0, 0.0, 90.0), AnchorPoint::new(0.0, 0.0, 90.0)];
        let result = compute_sequence(&anchors, &[2.0]);
        assert_eq!(result.sequence[1], GeneratedPoint { x: 0.0, y: 2.0, heading: 90.0 });
    }

    #[test]
    fn test_empty_anchor_slice() {
        let result = compute_sequence(&[], &[1.0]);
        assert!(result.sequence.is_empty());
        assert_eq!(result.statistics, FineTuneStatistics::default());
    }

    #[test]
    fn test_custom_points_resolve_and_clamp() {
        let sequence = vec![
            GeneratedPoint { x: 0.0, y: 0.0, heading: 0.0 },
            GeneratedPoint { x: 1.0, y: 0.0, heading: 0.0 },
        ];
        let mut points = vec![
            CustomPoint::new("ahead".into(), 0, 250.0),
            CustomPoint::new("far".into(), 7, -500.0),
        ];
        resolve_custom_points(&mut points, &sequence);
        assert_eq!(points[0].resolved, Some(GeneratedPoint { x: 0.25, y: 0.0, heading: 0.0 }));
        assert_eq!(points[1].reference_index, 7);
        assert_eq!(points[1].resolved, Some(GeneratedPoint { x: 0.5, y: 0.0, heading: 0.0 }));

        resolve_custom_points(&mut points, &[]);
        assert!(points.iter().all(|p| p.resolved.is_none()));
        assert_eq!(points.len(), 2);
    }

    #[test]
    fn test_custom_point_index_survives_shorter_sequence() {
        let anchors = |n: usize| vec![AnchorPoint::new(0.0, 0.0, 0.0); n];
        let mut points = vec![CustomPoint::new("tip".into(), 5, 0.0)];

        let short = compute_sequence(&anchors(3), &[1.0, 1.0]);
        resolve_custom_points(&mut points, &short.sequence);
        assert_eq!(points[0].resolved, short.sequence.last().copied());
        assert_eq!(points[0].reference_index, 5);

        let long = compute_sequence(&anchors(6), &[1.0; 5]);
        resolve_custom_points(&mut points, &long.sequence);
        assert_eq!(points[0].resolved, Some(long.sequence[5]));
    }

    #[test]
    fn test_heading_rounding_stays_in_range() {
        assert_eq!(round_angle(-179.99996), 180.0);
        assert_eq!(round_angle(-179.99994), -179.9999);
        assert_eq!(round_angle(179.99996), 180.0);

        let result = compute_sequence(&[AnchorPoint::new(0.0, 0.0, -179.99996)], &[]);
        assert_eq!(result.statistics.mean_heading, 180.0);
        assert!(result
            .sequence
            .iter()
            .all(|p| p.heading > -180.0 && p.heading <= 180.0));
    }
}
