//! Geometry primitives on 2D joint positions
//!
//! All functions are total: degenerate input resolves to a defined fallback
//! value instead of an error, since such frames are routine at stream edges.

use crate::types::{Joint, Pose};

/// Bounding-box dimensions below this are treated as 1.0 during normalization
pub const BBOX_EPSILON: f64 = 1e-6;

/// Angle in degrees at `vertex` subtended by `a` and `b`.
///
/// Returns 0 when either arm has zero length.
pub fn angle_between(a: &Joint, vertex: &Joint, b: &Joint) -> f64 {
    if has_degenerate_arm(a, vertex, b) {
        return 0.0;
    }

    let (ax, ay) = (a.x - vertex.x, a.y - vertex.y);
    let (bx, by) = (b.x - vertex.x, b.y - vertex.y);
    let mag_a = ax.hypot(ay);
    let mag_b = bx.hypot(by);

    let cos = ((ax * bx + ay * by) / (mag_a * mag_b)).clamp(-1.0, 1.0);
    cos.acos().to_degrees()
}

/// True when either arm of the angle at `vertex` has zero (or non-finite)
/// length, so no meaningful angle exists
pub fn has_degenerate_arm(a: &Joint, vertex: &Joint, b: &Joint) -> bool {
    let mag_a = distance(a, vertex);
    let mag_b = distance(b, vertex);
    mag_a == 0.0 || mag_b == 0.0 || !(mag_a * mag_b).is_finite()
}

/// Euclidean distance between two joints
pub fn distance(a: &Joint, b: &Joint) -> f64 {
    (a.x - b.x).hypot(a.y - b.y)
}

/// Linear interpolation of y at `x` on the line through (x1, y1) and (x2, y2).
///
/// A vertical line (x1 == x2) yields `y1`.
pub fn interpolate_y(x1: f64, y1: f64, x2: f64, y2: f64, x: f64) -> f64 {
    if x1 == x2 {
        return y1;
    }
    y1 + (y2 - y1) * (x - x1) / (x2 - x1)
}

/// Midpoint of two joints; confidence is the weaker of the two
pub fn midpoint(a: &Joint, b: &Joint) -> Joint {
    Joint::new(
        (a.x + b.x) / 2.0,
        (a.y + b.y) / 2.0,
        a.confidence.min(b.confidence),
    )
}

/// Rescale every joint into the pose's own bounding box so coordinates fall
/// in [0,1]x[0,1]. A width or height below [`BBOX_EPSILON`] scales by 1.0.
pub fn normalize(pose: &Pose) -> Pose {
    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;

    for joint in pose.joints.values() {
        min_x = min_x.min(joint.x);
        min_y = min_y.min(joint.y);
        max_x = max_x.max(joint.x);
        max_y = max_y.max(joint.y);
    }

    if pose.is_empty() {
        return pose.clone();
    }

    let width = scale_or_unit(max_x - min_x);
    let height = scale_or_unit(max_y - min_y);

    let joints = pose
        .joints
        .iter()
        .map(|(name, joint)| {
            let scaled = Joint {
                x: (joint.x - min_x) / width,
                y: (joint.y - min_y) / height,
                confidence: joint.confidence,
            };
            (name.clone(), scaled)
        })
        .collect();

    Pose { joints }
}

fn scale_or_unit(extent: f64) -> f64 {
    if extent < BBOX_EPSILON || !extent.is_finite() {
        1.0
    } else {
        extent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn j(x: f64, y: f64) -> Joint {
        Joint::new(x, y, 1.0)
    }

    #[test]
    fn test_right_angle() {
        let angle = angle_between(&j(1.0, 0.0), &j(0.0, 0.0), &j(0.0, 1.0));
        assert!((angle - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_straight_and_folded_angles() {
        let straight = angle_between(&j(-1.0, 0.0), &j(0.0, 0.0), &j(1.0, 0.0));
        assert!((straight - 180.0).abs() < 1e-9);

        let folded = angle_between(&j(2.0, 0.0), &j(0.0, 0.0), &j(1.0, 0.0));
        assert!(folded.abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_angle_is_zero() {
        let angle = angle_between(&j(0.0, 0.0), &j(0.0, 0.0), &j(1.0, 1.0));
        assert_eq!(angle, 0.0);
        assert!(has_degenerate_arm(&j(0.0, 0.0), &j(0.0, 0.0), &j(1.0, 1.0)));

        // a genuinely folded arm is not degenerate
        assert!(!has_degenerate_arm(&j(2.0, 0.0), &j(0.0, 0.0), &j(1.0, 0.0)));
    }

    #[test]
    fn test_distance() {
        assert!((distance(&j(0.0, 0.0), &j(3.0, 4.0)) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_interpolate_y() {
        assert!((interpolate_y(0.0, 0.0, 10.0, 5.0, 4.0) - 2.0).abs() < 1e-12);
        // vertical line falls back to y1
        assert_eq!(interpolate_y(3.0, 7.0, 3.0, 9.0, 100.0), 7.0);
    }

    #[test]
    fn test_normalize_bounding_box() {
        let pose = Pose::new()
            .with_joint("a", Joint::new(100.0, 50.0, 0.8))
            .with_joint("b", Joint::new(300.0, 150.0, 0.9))
            .with_joint("c", Joint::new(200.0, 100.0, 0.7));

        let normalized = normalize(&pose);
        let a = normalized.get("a").unwrap();
        let b = normalized.get("b").unwrap();
        let c = normalized.get("c").unwrap();

        assert_eq!((a.x, a.y), (0.0, 0.0));
        assert_eq!((b.x, b.y), (1.0, 1.0));
        assert!((c.x - 0.5).abs() < 1e-12 && (c.y - 0.5).abs() < 1e-12);
        assert_eq!(c.confidence, 0.7);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let pose = Pose::new()
            .with_joint("a", j(0.0, 0.0))
            .with_joint("b", j(1.0, 1.0))
            .with_joint("c", j(0.25, 0.6));

        let once = normalize(&pose);
        let twice = normalize(&once);
        for (name, joint) in &once.joints {
            let again = twice.get(name).unwrap();
            assert!((joint.x - again.x).abs() < 1e-12);
            assert!((joint.y - again.y).abs() < 1e-12);
        }
        let c = once.get("c").unwrap();
        assert!((c.x - 0.25).abs() < 1e-12 && (c.y - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_normalize_flat_dimension_uses_unit_scale() {
        // all joints on one horizontal line: height is zero
        let pose = Pose::new()
            .with_joint("a", j(10.0, 4.0))
            .with_joint("b", j(20.0, 4.0));

        let normalized = normalize(&pose);
        let b = normalized.get("b").unwrap();
        assert_eq!(b.x, 1.0);
        assert_eq!(b.y, 0.0);
    }

    #[test]
    fn test_normalize_empty_pose() {
        assert!(normalize(&Pose::new()).is_empty());
    }
}
