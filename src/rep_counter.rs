//! Rep state machine
//!
//! Consumes one pose per call plus the caller-owned [`ExerciseState`] and
//! applies hysteresis-banded phase transitions on the exercise's primary
//! angle:
//! - `angle <= down_max` → `Down`
//! - `angle >= up_min` → `Up`
//! - otherwise → `Between`
//!
//! A rep is credited when the machine settles in `Up` after its last settled
//! phase was `Down`, and only if the primary angle reached `down_max` (and
//! the exercise's depth gate, if any, held on that frame) during that
//! descent. Frames inside the band never settle a phase, so jitter near
//! either threshold cannot add or drop reps.

use crate::error::GradingError;
use crate::exercise::{ExerciseType, MotionProfile};
use crate::geometry::{angle_between, has_degenerate_arm};
use crate::types::{ExerciseState, GradingResult, Joint, Phase, Pose, NEUTRAL_ANGLE};
use crate::validator::{check_required_joints, depth_gate_met, FormValidator};

/// Grade one frame for an exercise, advancing the session state.
///
/// Fails only for exercises with no live pose path.
pub fn grade_pose(
    exercise: ExerciseType,
    pose: &Pose,
    state: &mut ExerciseState,
) -> Result<GradingResult, GradingError> {
    let motion = exercise
        .motion()
        .ok_or(GradingError::NotPoseTracked(exercise))?;
    Ok(RepCounter::new(motion).grade(pose, state))
}

/// Averaged left/right primary angle, `None` if a joint is absent or either
/// side has collapsed onto its vertex
pub fn primary_angle(pose: &Pose, motion: &MotionProfile) -> Option<f64> {
    let side = |names: &[&'static str; 3]| -> Option<f64> {
        let [a, vertex, b] = names;
        let (a, vertex, b) = (pose.get(a)?, pose.get(vertex)?, pose.get(b)?);
        if has_degenerate_arm(a, vertex, b) {
            return None;
        }
        Some(angle_between(a, vertex, b))
    };
    let left = side(&motion.primary_angle.left)?;
    let right = side(&motion.primary_angle.right)?;
    Some((left + right) / 2.0)
}

/// Phase a primary angle falls into, before any rep logic
pub fn classify(angle: f64, motion: &MotionProfile) -> Phase {
    if angle <= motion.thresholds.down_max {
        Phase::Down
    } else if angle >= motion.thresholds.up_min {
        Phase::Up
    } else {
        Phase::Between
    }
}

/// State machine bound to one exercise's motion profile
#[derive(Debug, Clone, Copy)]
pub struct RepCounter {
    motion: &'static MotionProfile,
}

impl RepCounter {
    pub fn new(motion: &'static MotionProfile) -> Self {
        Self { motion }
    }

    pub fn motion(&self) -> &'static MotionProfile {
        self.motion
    }

    /// Grade one frame. Never fails: unusable frames come back with
    /// `is_valid == false` and the session state frozen apart from the phase.
    pub fn grade(&self, pose: &Pose, state: &mut ExerciseState) -> GradingResult {
        let motion = self.motion;
        let mut result = GradingResult {
            is_valid: false,
            rep_counted: false,
            form_score: 0.0,
            feedback: String::new(),
            state: state.current_phase,
            rep_count: state.rep_count,
            primary_angle: None,
        };

        let (has_joints, missing) =
            check_required_joints(pose, motion.required_joints, motion.min_confidence);
        if !has_joints {
            result.feedback = format!("Cannot see clearly: {}", missing.join(", "));
            state.form_issues.clear();
            enter_invalid(state);
            result.state = Phase::Invalid;
            return result;
        }

        let angle = match primary_angle(pose, motion) {
            Some(angle) => angle,
            None => {
                // overlapping joints; no angle to classify
                result.feedback = motion.cues.invalid.to_string();
                state.form_issues.clear();
                enter_invalid(state);
                result.state = Phase::Invalid;
                return result;
            }
        };
        result.primary_angle = Some(angle);

        let assessment = FormValidator::assess(pose, motion);
        state.form_issues = assessment.issues.clone();
        if !assessment.is_clean() {
            result.feedback = state.form_issues.join(". ");
            enter_invalid(state);
            result.state = Phase::Invalid;
            return result;
        }

        let settled_before = state.anchor_phase;
        let phase = classify(angle, motion);
        if phase != state.current_phase {
            tracing::trace!(from = %state.current_phase, to = %phase, angle, "phase transition");
        }
        state.previous_phase = state.current_phase;
        state.current_phase = phase;

        // Track the deepest point of the current descent
        if phase == Phase::Down || (settled_before == Phase::Up && phase == Phase::Between) {
            state.min_primary_angle = state.min_primary_angle.min(angle);
        }
        if phase == Phase::Down
            && motion
                .depth_gate
                .map_or(true, |gate| depth_gate_met(pose, &gate))
        {
            state.went_low_enough = true;
        }

        if phase == Phase::Up {
            if settled_before == Phase::Down {
                if state.went_low_enough {
                    state.rep_count += 1;
                    result.rep_counted = true;
                    result.feedback = format!("Rep Counted! ({})", state.rep_count);
                    tracing::debug!(
                        rep_count = state.rep_count,
                        min_angle = state.min_primary_angle,
                        "rep counted"
                    );
                } else {
                    result.feedback = motion.cues.shallow_rep.to_string();
                }
            } else if settled_before == Phase::Up && state.min_primary_angle < NEUTRAL_ANGLE {
                // Dipped into the band and came back without reaching depth
                tracing::debug!(min_angle = state.min_primary_angle, "shallow rep rejected");
                result.feedback = motion.cues.shallow_rep.to_string();
            }
            state.reset_depth();
        }

        if phase != Phase::Between {
            state.anchor_phase = phase;
        }

        if result.feedback.is_empty() {
            result.feedback = cue_for(phase, motion).to_string();
        }

        result.is_valid = true;
        result.state = phase;
        result.rep_count = state.rep_count;
        result.form_score = assessment.form_score();
        result
    }
}

fn enter_invalid(state: &mut ExerciseState) {
    state.previous_phase = state.current_phase;
    state.current_phase = Phase::Invalid;
    state.anchor_phase = Phase::Invalid;
}

fn cue_for(phase: Phase, motion: &MotionProfile) -> &'static str {
    match phase {
        Phase::Starting => motion.cues.starting,
        Phase::Down => motion.cues.down,
        Phase::Up => motion.cues.up,
        Phase::Between => motion.cues.between,
        Phase::Invalid => motion.cues.invalid,
    }
}
