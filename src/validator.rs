//! Form validation
//!
//! Two gates run before the rep state machine sees a frame:
//! - Required joints must be present with sufficient confidence
//! - Exercise-specific alignment checks must pass
//!
//! Each alignment check also contributes a penalty (0-0.5) to the frame's
//! form score, proportional to the measured deviation relative to its
//! threshold.

use crate::exercise::{
    DepthGate, FormCheck, MotionProfile, LEFT_ANKLE, LEFT_HIP, LEFT_KNEE, LEFT_SHOULDER,
    LEFT_WRIST, NOSE, RIGHT_ANKLE, RIGHT_HIP, RIGHT_KNEE, RIGHT_SHOULDER, RIGHT_WRIST,
};
use crate::geometry::{angle_between, distance, interpolate_y, midpoint, normalize};
use crate::types::{Joint, Pose};

/// Largest penalty a single check can apply
pub const MAX_CHECK_PENALTY: f64 = 0.5;

/// Body lengths below this are treated as 1.0
const MIN_SEGMENT_LENGTH: f64 = 1e-3;

/// Check that every required joint exists with `confidence >= min_confidence`.
///
/// Returns whether all joints passed and the names of those that did not, in
/// the order they were requested.
pub fn check_required_joints(
    pose: &Pose,
    required: &[&str],
    min_confidence: f64,
) -> (bool, Vec<String>) {
    let missing: Vec<String> = required
        .iter()
        .filter(|name| {
            pose.get(name)
                .map(|joint| joint.confidence < min_confidence)
                .unwrap_or(true)
        })
        .map(|name| name.to_string())
        .collect();

    (missing.is_empty(), missing)
}

/// Outcome of the alignment checks for one frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormAssessment {
    /// Human-readable issues, in check order
    pub issues: Vec<String>,
    /// Sum of check penalties
    pub penalty: f64,
}

impl FormAssessment {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Form score in 0-1
    pub fn form_score(&self) -> f64 {
        (1.0 - self.penalty).clamp(0.0, 1.0)
    }
}

struct CheckOutcome {
    issue: Option<&'static str>,
    penalty: f64,
}

/// Validator for exercise-specific alignment
pub struct FormValidator;

impl FormValidator {
    /// Run every form check of the profile against a pose whose required
    /// joints have already passed the confidence gate.
    pub fn assess(pose: &Pose, motion: &MotionProfile) -> FormAssessment {
        let normalized = normalize(pose);
        let mut assessment = FormAssessment::default();

        for check in motion.form_checks {
            let outcome = match *check {
                FormCheck::ShoulderLevel { max_x_diff } => shoulder_level(&normalized, max_x_diff),
                FormCheck::BodyLine { sag, pike } => body_line(pose, sag, pike),
                FormCheck::KneeBend {
                    min_angle,
                    max_angle,
                } => knee_bend(pose, min_angle, max_angle),
                FormCheck::TorsoSway { max_ratio } => torso_sway(pose, max_ratio),
            };

            // A check whose joints are absent is skipped
            if let Some(outcome) = outcome {
                if let Some(issue) = outcome.issue {
                    assessment.issues.push(issue.to_string());
                }
                assessment.penalty += outcome.penalty;
            }
        }

        assessment
    }
}

/// Whether a flexed frame satisfies the exercise's depth gate.
///
/// Absent joints fail the gate.
pub fn depth_gate_met(pose: &Pose, gate: &DepthGate) -> bool {
    match *gate {
        DepthGate::ChinOverBar { clearance } => {
            match (pose.get(NOSE), pair_midpoint(pose, LEFT_WRIST, RIGHT_WRIST)) {
                (Some(nose), Some(wrists)) => nose.y <= wrists.y - clearance,
                _ => false,
            }
        }
    }
}

fn pair_midpoint(pose: &Pose, left: &str, right: &str) -> Option<Joint> {
    Some(midpoint(pose.get(left)?, pose.get(right)?))
}

fn proportional_penalty(deviation: f64, threshold: f64) -> f64 {
    if threshold <= 0.0 {
        return if deviation > 0.0 { MAX_CHECK_PENALTY } else { 0.0 };
    }
    (deviation / threshold * MAX_CHECK_PENALTY).min(MAX_CHECK_PENALTY)
}

fn shoulder_level(normalized: &Pose, max_x_diff: f64) -> Option<CheckOutcome> {
    let left = normalized.get(LEFT_SHOULDER)?;
    let right = normalized.get(RIGHT_SHOULDER)?;
    let x_diff = (left.x - right.x).abs();

    Some(CheckOutcome {
        issue: (x_diff > max_x_diff).then_some("Keep shoulders level"),
        penalty: proportional_penalty(x_diff, max_x_diff),
    })
}

/// Hip height relative to the straight shoulder-ankle line, positive when the
/// hips sit below it (image Y grows downward)
pub fn hip_deviation_ratio(pose: &Pose) -> Option<f64> {
    let shoulders = pair_midpoint(pose, LEFT_SHOULDER, RIGHT_SHOULDER)?;
    let hips = pair_midpoint(pose, LEFT_HIP, RIGHT_HIP)?;
    let ankles = pair_midpoint(pose, LEFT_ANKLE, RIGHT_ANKLE)?;

    let mut body_length = distance(&shoulders, &ankles);
    if body_length < MIN_SEGMENT_LENGTH {
        body_length = 1.0;
    }

    let line_y = interpolate_y(shoulders.x, shoulders.y, ankles.x, ankles.y, hips.x);
    Some((hips.y - line_y) / body_length)
}

fn body_line(pose: &Pose, sag: f64, pike: f64) -> Option<CheckOutcome> {
    let deviation = hip_deviation_ratio(pose)?;

    let issue = if deviation > sag {
        Some("Keep hips from sagging")
    } else if deviation < -pike {
        Some("Avoid raising hips too high")
    } else {
        None
    };
    let threshold = if deviation >= 0.0 { sag } else { pike };

    Some(CheckOutcome {
        issue,
        penalty: proportional_penalty(deviation.abs(), threshold),
    })
}

fn knee_bend(pose: &Pose, min_angle: f64, max_angle: f64) -> Option<CheckOutcome> {
    let left = angle_between(pose.get(LEFT_HIP)?, pose.get(LEFT_KNEE)?, pose.get(LEFT_ANKLE)?);
    let right = angle_between(
        pose.get(RIGHT_HIP)?,
        pose.get(RIGHT_KNEE)?,
        pose.get(RIGHT_ANKLE)?,
    );
    let knee_angle = (left + right) / 2.0;

    let center = (min_angle + max_angle) / 2.0;
    let half_width = (max_angle - min_angle) / 2.0;
    let outside = knee_angle < min_angle || knee_angle > max_angle;

    Some(CheckOutcome {
        issue: outside.then_some("Keep knees bent at about 90 degrees"),
        penalty: proportional_penalty((knee_angle - center).abs(), half_width),
    })
}

fn torso_sway(pose: &Pose, max_ratio: f64) -> Option<CheckOutcome> {
    let shoulders = pair_midpoint(pose, LEFT_SHOULDER, RIGHT_SHOULDER)?;
    let hips = pair_midpoint(pose, LEFT_HIP, RIGHT_HIP)?;

    let mut torso_length = distance(&shoulders, &hips);
    if torso_length < MIN_SEGMENT_LENGTH {
        torso_length = 1.0;
    }
    let sway = (hips.x - shoulders.x).abs() / torso_length;

    Some(CheckOutcome {
        issue: (sway > max_ratio).then_some("Control your body - no swinging"),
        penalty: proportional_penalty(sway, max_ratio),
    })
}
