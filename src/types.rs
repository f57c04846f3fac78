//! Core types for the grading engine
//!
//! This module defines the data structures that flow through a live grading
//! session: per-frame joints and poses, the caller-owned session state, and the
//! per-frame grading result.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Primary angle value representing a fully extended joint
pub const NEUTRAL_ANGLE: f64 = 180.0;

/// A single anatomical landmark in one frame's coordinate space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "JointRepr")]
pub struct Joint {
    pub x: f64,
    pub y: f64,
    /// Detection confidence (0-1)
    pub confidence: f64,
}

#[derive(Deserialize)]
struct JointRepr {
    x: f64,
    y: f64,
    #[serde(default, alias = "visibility", alias = "score")]
    confidence: f64,
}

impl From<JointRepr> for Joint {
    fn from(repr: JointRepr) -> Self {
        Joint::new(repr.x, repr.y, repr.confidence)
    }
}

impl Joint {
    /// Create a joint, clamping confidence into 0-1 (NaN becomes 0)
    pub fn new(x: f64, y: f64, confidence: f64) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self { x, y, confidence }
    }
}

/// One frame's set of named joints
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Joints keyed by name (e.g. "leftElbow")
    pub joints: HashMap<String, Joint>,
}

impl Pose {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with_joint(mut self, name: &str, joint: Joint) -> Self {
        self.joints.insert(name.to_string(), joint);
        self
    }

    pub fn insert(&mut self, name: &str, joint: Joint) {
        self.joints.insert(name.to_string(), joint);
    }

    pub fn get(&self, name: &str) -> Option<&Joint> {
        self.joints.get(name)
    }

    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }
}

/// Movement phase of the rep state machine.
///
/// `Down` means the primary joint is flexed (angle at or below the exercise's
/// `down_max`), `Up` means it is extended (at or above `up_min`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Starting,
    Down,
    Up,
    Between,
    Invalid,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Starting => "starting",
            Phase::Down => "down",
            Phase::Up => "up",
            Phase::Between => "between",
            Phase::Invalid => "invalid",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mutable per-session state, owned by whoever drives the session.
///
/// Only the rep state machine mutates it. `rep_count` never decreases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseState {
    pub rep_count: u32,
    pub current_phase: Phase,
    pub previous_phase: Phase,
    /// Most recent phase outside the hysteresis band (never `Between`)
    #[serde(default = "default_anchor")]
    pub anchor_phase: Phase,
    /// Deepest primary angle reached during the current descent
    pub min_primary_angle: f64,
    pub went_low_enough: bool,
    #[serde(default)]
    pub form_issues: Vec<String>,
}

impl Default for ExerciseState {
    fn default() -> Self {
        Self::new()
    }
}

impl ExerciseState {
    pub fn new() -> Self {
        Self {
            rep_count: 0,
            current_phase: Phase::Starting,
            previous_phase: Phase::Starting,
            anchor_phase: Phase::Starting,
            min_primary_angle: NEUTRAL_ANGLE,
            went_low_enough: false,
            form_issues: Vec::new(),
        }
    }

    /// Clear depth tracking so the next attempt starts clean
    pub(crate) fn reset_depth(&mut self) {
        self.min_primary_angle = NEUTRAL_ANGLE;
        self.went_low_enough = false;
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

fn default_anchor() -> Phase {
    Phase::Starting
}

/// Per-frame grading output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradingResult {
    pub is_valid: bool,
    pub rep_counted: bool,
    /// Form quality for this frame (0-1), 0 when the frame is not valid
    pub form_score: f64,
    pub feedback: String,
    pub state: Phase,
    /// Session rep count after this frame
    pub rep_count: u32,
    /// Averaged primary angle in degrees, when it could be measured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_angle: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joint_confidence_clamped() {
        assert_eq!(Joint::new(0.0, 0.0, 1.7).confidence, 1.0);
        assert_eq!(Joint::new(0.0, 0.0, -0.2).confidence, 0.0);
        assert_eq!(Joint::new(0.0, 0.0, f64::NAN).confidence, 0.0);
    }

    #[test]
    fn test_joint_deserialize_accepts_visibility_alias() {
        let joint: Joint = serde_json::from_str(r#"{"x":0.5,"y":0.25,"visibility":1.4}"#).unwrap();
        assert_eq!(joint.x, 0.5);
        assert_eq!(joint.confidence, 1.0);
    }

    #[test]
    fn test_state_json_uses_camel_case() {
        let state = ExerciseState::new();
        let json = state.to_json().unwrap();
        assert!(json.contains("\"repCount\":0"));
        assert!(json.contains("\"currentPhase\":\"starting\""));

        let loaded = ExerciseState::from_json(&json).unwrap();
        assert_eq!(loaded, state);
    }

    #[test]
    fn test_pose_deserialize() {
        let pose: Pose = serde_json::from_str(
            r#"{"joints":{"leftElbow":{"x":0.1,"y":0.2,"confidence":0.9}}}"#,
        )
        .unwrap();
        assert_eq!(pose.len(), 1);
        assert!((pose.get("leftElbow").unwrap().y - 0.2).abs() < 1e-12);
    }
}
