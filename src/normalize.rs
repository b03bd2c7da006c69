//! Stroke normalization: smoothing, arc-length resampling, rotation to a
//! canonical orientation, scale-to-square centering.
//!
//! Two paths that went through this pipeline are comparable point-by-point;
//! nothing else is. Degenerate strokes are filtered by the callers
//! ([`crate::geom::too_small`]) before they reach `normalize`, which itself
//! stays total: zero-length and near-empty input resolves to a repeated point
//! instead of panicking.

use crate::config::{RESAMPLE_POINT_COUNT, SCALE_BOX_SIZE, SMOOTH_WINDOW};
use crate::geom::{bounding_box, centroid, distance, path_length, Point};

/// A path of exactly [`RESAMPLE_POINT_COUNT`] normalized points. The length
/// lives in the type so index-wise comparison never checks it at runtime.
#[derive(Clone, Debug, PartialEq)]
pub struct NormalizedPath {
    points: [Point; RESAMPLE_POINT_COUNT],
}

impl NormalizedPath {
    pub(crate) fn from_points(points: [Point; RESAMPLE_POINT_COUNT]) -> Self {
        Self { points }
    }

    /// `None` unless the slice holds exactly the fixed point count.
    pub(crate) fn from_slice(points: &[Point]) -> Option<Self> {
        if points.len() != RESAMPLE_POINT_COUNT {
            return None;
        }
        let mut fixed = [Point::default(); RESAMPLE_POINT_COUNT];
        fixed.copy_from_slice(points);
        Some(Self { points: fixed })
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Mean per-index Euclidean distance to another normalized path.
    pub fn mean_distance_to(&self, other: &NormalizedPath) -> f32 {
        let mut sum = 0.0;
        for (a, b) in self.points.iter().zip(other.points.iter()) {
            sum += distance(*a, *b);
        }
        sum / RESAMPLE_POINT_COUNT as f32
    }
}

/// Full pipeline: smooth, resample, cancel the indicative angle, scale and
/// center. Deterministic and pure.
pub fn normalize(stroke: &[Point]) -> NormalizedPath {
    let smoothed = smooth(stroke);
    let resampled = resample(&smoothed, RESAMPLE_POINT_COUNT);
    let angle = indicative_angle(&resampled);
    let rotated = rotate_by(&resampled, -angle);
    let scaled = scale_to_square(&rotated, SCALE_BOX_SIZE);

    let mut points = [Point::default(); RESAMPLE_POINT_COUNT];
    points.copy_from_slice(&scaled);
    NormalizedPath { points }
}

/// Replace each point by the mean of its symmetric neighborhood, clamped at
/// the ends. Strokes at or below the window size pass through untouched.
pub(crate) fn smooth(points: &[Point]) -> Vec<Point> {
    if points.len() <= SMOOTH_WINDOW {
        return points.to_vec();
    }
    let half = (SMOOTH_WINDOW / 2) as isize;
    let last = points.len() as isize - 1;
    let mut out = Vec::with_capacity(points.len());
    for i in 0..=last {
        let mut sx = 0.0;
        let mut sy = 0.0;
        let mut count = 0.0;
        for j in (i - half)..=(i + half) {
            let k = j.clamp(0, last) as usize;
            sx += points[k].x;
            sy += points[k].y;
            count += 1.0;
        }
        out.push(Point::new(sx / count, sy / count));
    }
    out
}

/// Walk the path at equal arc-length steps, inserting interpolated points so
/// the output holds exactly `n` points. Undershoot from accumulated float
/// slack is padded with the final point.
pub(crate) fn resample(points: &[Point], n: usize) -> Vec<Point> {
    let Some(&first) = points.first() else {
        return vec![Point::default(); n];
    };
    let total = path_length(points);
    if total <= f32::EPSILON {
        return vec![first; n];
    }

    let interval = total / (n - 1) as f32;
    let mut pts = points.to_vec();
    let mut out = Vec::with_capacity(n);
    out.push(first);
    let mut acc = 0.0;
    let mut i = 1;
    while i < pts.len() {
        let d = distance(pts[i - 1], pts[i]);
        if acc + d >= interval {
            let t = if d > 0.0 { (interval - acc) / d } else { 0.0 };
            let q = Point::new(
                pts[i - 1].x + t * (pts[i].x - pts[i - 1].x),
                pts[i - 1].y + t * (pts[i].y - pts[i - 1].y),
            );
            out.push(q);
            // Continue the walk from the inserted point so leftover segment
            // length counts toward the next interval.
            pts.insert(i, q);
            acc = 0.0;
        } else {
            acc += d;
        }
        i += 1;
    }
    let tail = pts[pts.len() - 1];
    while out.len() < n {
        out.push(tail);
    }
    out.truncate(n);
    out
}

/// Angle from the first point to the centroid. Cancelling it removes the
/// stroke-start-direction bias between two drawings of the same shape.
pub(crate) fn indicative_angle(points: &[Point]) -> f32 {
    let Some(&first) = points.first() else {
        return 0.0;
    };
    let c = centroid(points);
    (c.y - first.y).atan2(c.x - first.x)
}

/// Rotate every point about the path centroid.
pub(crate) fn rotate_by(points: &[Point], angle: f32) -> Vec<Point> {
    let c = centroid(points);
    let (sin, cos) = angle.sin_cos();
    points
        .iter()
        .map(|p| {
            let dx = p.x - c.x;
            let dy = p.y - c.y;
            Point::new(dx * cos - dy * sin + c.x, dx * sin + dy * cos + c.y)
        })
        .collect()
}

/// Scale uniformly so the longer bounding-box side spans `size`, then center
/// the centroid on the origin. Zero-extent paths collapse to the origin.
pub(crate) fn scale_to_square(points: &[Point], size: f32) -> Vec<Point> {
    let span = bounding_box(points);
    let longest = span.width.max(span.height);
    let scale = if longest > 0.0 { size / longest } else { 1.0 };
    let scaled: Vec<Point> = points
        .iter()
        .map(|p| Point::new((p.x - span.x) * scale, (p.y - span.y) * scale))
        .collect();
    let c = centroid(&scaled);
    scaled
        .iter()
        .map(|p| Point::new(p.x - c.x, p.y - c.y))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RESAMPLE_POINT_COUNT;

    fn pt(x: f32, y: f32) -> Point {
        Point::new(x, y)
    }

    fn segment(x1: f32, y1: f32, x2: f32, y2: f32, steps: usize) -> Vec<Point> {
        (0..=steps)
            .map(|i| {
                let t = i as f32 / steps as f32;
                pt(x1 + (x2 - x1) * t, y1 + (y2 - y1) * t)
            })
            .collect()
    }

    fn close(a: f32, b: f32, eps: f32) -> bool {
        (a - b).abs() <= eps
    }

    #[test]
    fn resample_yields_exact_count() {
        for steps in [1, 3, 7, 40, 300] {
            let stroke = segment(0.0, 0.0, 120.0, 90.0, steps);
            let out = resample(&stroke, RESAMPLE_POINT_COUNT);
            assert_eq!(out.len(), RESAMPLE_POINT_COUNT);
        }
    }

    #[test]
    fn resample_spacing_is_uniform_on_a_line() {
        let stroke = segment(0.0, 0.0, 100.0, 0.0, 10);
        let out = resample(&stroke, RESAMPLE_POINT_COUNT);
        let interval = 100.0 / (RESAMPLE_POINT_COUNT - 1) as f32;
        for pair in out.windows(2).take(RESAMPLE_POINT_COUNT - 2) {
            assert!(close(distance(pair[0], pair[1]), interval, 0.01));
        }
        assert!(close(out[0].x, 0.0, 0.001));
        assert!(close(out[out.len() - 1].x, 100.0, 0.5));
    }

    #[test]
    fn resample_tolerates_degenerate_input() {
        assert_eq!(resample(&[], 8).len(), 8);
        let dot = [pt(4.0, 4.0)];
        let out = resample(&dot, 8);
        assert_eq!(out.len(), 8);
        assert!(out.iter().all(|p| *p == dot[0]));
        let repeated = [pt(4.0, 4.0); 5];
        assert!(resample(&repeated, 8).iter().all(|p| *p == repeated[0]));
    }

    #[test]
    fn smooth_passes_short_strokes_through() {
        let short = [pt(0.0, 0.0), pt(5.0, 5.0), pt(10.0, 0.0)];
        assert_eq!(smooth(&short), short.to_vec());
    }

    #[test]
    fn smooth_averages_neighbors_and_clamps_ends() {
        let stroke = [pt(0.0, 0.0), pt(10.0, 0.0), pt(20.0, 0.0), pt(30.0, 0.0)];
        let out = smooth(&stroke);
        // Ends reuse the boundary point, interior is a three-point mean.
        assert!(close(out[0].x, (0.0 + 0.0 + 10.0) / 3.0, 0.001));
        assert!(close(out[1].x, 10.0, 0.001));
        assert!(close(out[2].x, 20.0, 0.001));
        assert!(close(out[3].x, (20.0 + 30.0 + 30.0) / 3.0, 0.001));
    }

    #[test]
    fn indicative_angle_follows_first_point_to_centroid() {
        let rightward = segment(0.0, 0.0, 10.0, 0.0, 4);
        assert!(close(indicative_angle(&rightward), 0.0, 0.001));
        let downward = segment(0.0, 0.0, 0.0, 10.0, 4);
        assert!(close(
            indicative_angle(&downward),
            core::f32::consts::FRAC_PI_2,
            0.001
        ));
    }

    #[test]
    fn rotate_by_quarter_turn_about_centroid() {
        let path = [pt(-1.0, 0.0), pt(1.0, 0.0)];
        let out = rotate_by(&path, core::f32::consts::FRAC_PI_2);
        assert!(close(out[0].x, 0.0, 0.001));
        assert!(close(out[0].y, -1.0, 0.001));
        assert!(close(out[1].x, 0.0, 0.001));
        assert!(close(out[1].y, 1.0, 0.001));
    }

    #[test]
    fn scale_to_square_fits_and_centers() {
        let stroke = segment(10.0, 20.0, 110.0, 70.0, 20);
        let out = scale_to_square(&stroke, 200.0);
        let span = bounding_box(&out);
        assert!(close(span.width.max(span.height), 200.0, 0.01));
        let c = centroid(&out);
        assert!(close(c.x, 0.0, 0.01));
        assert!(close(c.y, 0.0, 0.01));
    }

    #[test]
    fn normalize_is_deterministic_and_fixed_length() {
        let stroke = segment(50.0, 10.0, 50.0, 90.0, 30);
        let a = normalize(&stroke);
        let b = normalize(&stroke);
        assert_eq!(a, b);
        assert_eq!(a.points().len(), RESAMPLE_POINT_COUNT);
    }

    #[test]
    fn normalize_cancels_translation() {
        let stroke = segment(20.0, 10.0, 60.0, 80.0, 25);
        let shifted: Vec<Point> = stroke.iter().map(|p| pt(p.x + 37.0, p.y - 12.0)).collect();
        let a = normalize(&stroke);
        let b = normalize(&shifted);
        assert!(a.mean_distance_to(&b) < 0.1);
    }

    #[test]
    fn normalize_cancels_uniform_scale() {
        let stroke = segment(20.0, 10.0, 60.0, 80.0, 25);
        let grown: Vec<Point> = stroke.iter().map(|p| pt(p.x * 2.5, p.y * 2.5)).collect();
        let a = normalize(&stroke);
        let b = normalize(&grown);
        assert!(a.mean_distance_to(&b) < 1.0);
    }

    #[test]
    fn mean_distance_is_zero_on_self_and_offset_otherwise() {
        let a = NormalizedPath::from_points([pt(0.0, 0.0); RESAMPLE_POINT_COUNT]);
        let b = NormalizedPath::from_points([pt(3.0, 4.0); RESAMPLE_POINT_COUNT]);
        assert_eq!(a.mean_distance_to(&a), 0.0);
        assert!(close(a.mean_distance_to(&b), 5.0, 0.001));
    }

    #[test]
    fn from_slice_enforces_the_fixed_length() {
        let good = vec![Point::default(); RESAMPLE_POINT_COUNT];
        assert!(NormalizedPath::from_slice(&good).is_some());
        let bad = vec![Point::default(); RESAMPLE_POINT_COUNT - 1];
        assert!(NormalizedPath::from_slice(&bad).is_none());
    }
}
