//! Exercise registry
//!
//! A closed set of exercise types, each mapped to one immutable definition:
//! required joints, primary-angle joints, phase thresholds, form checks,
//! coaching cues and the authoritative score calibration. Adding an exercise
//! means adding a variant and one definition here.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::GradingError;
use crate::scoring::{Breakpoints, RubricTable, ScoreCalibration};

pub const NOSE: &str = "nose";
pub const LEFT_SHOULDER: &str = "leftShoulder";
pub const RIGHT_SHOULDER: &str = "rightShoulder";
pub const LEFT_ELBOW: &str = "leftElbow";
pub const RIGHT_ELBOW: &str = "rightElbow";
pub const LEFT_WRIST: &str = "leftWrist";
pub const RIGHT_WRIST: &str = "rightWrist";
pub const LEFT_HIP: &str = "leftHip";
pub const RIGHT_HIP: &str = "rightHip";
pub const LEFT_KNEE: &str = "leftKnee";
pub const RIGHT_KNEE: &str = "rightKnee";
pub const LEFT_ANKLE: &str = "leftAnkle";
pub const RIGHT_ANKLE: &str = "rightAnkle";

/// Exercise type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExerciseType {
    Pushup,
    Situp,
    Pullup,
    Run,
}

impl ExerciseType {
    pub const ALL: [ExerciseType; 4] = [
        ExerciseType::Pushup,
        ExerciseType::Situp,
        ExerciseType::Pullup,
        ExerciseType::Run,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExerciseType::Pushup => "pushup",
            ExerciseType::Situp => "situp",
            ExerciseType::Pullup => "pullup",
            ExerciseType::Run => "run",
        }
    }

    /// Registry entry for this exercise
    pub fn definition(&self) -> &'static ExerciseDefinition {
        match self {
            ExerciseType::Pushup => &PUSHUP,
            ExerciseType::Situp => &SITUP,
            ExerciseType::Pullup => &PULLUP,
            ExerciseType::Run => &RUN,
        }
    }

    /// Live pose-tracking profile, `None` for timed events
    pub fn motion(&self) -> Option<&'static MotionProfile> {
        self.definition().motion.as_ref()
    }

    pub fn is_pose_tracked(&self) -> bool {
        self.motion().is_some()
    }
}

impl fmt::Display for ExerciseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExerciseType {
    type Err = GradingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect::<String>()
            .to_ascii_lowercase();

        match key.as_str() {
            "pushup" | "pushups" => Ok(ExerciseType::Pushup),
            "situp" | "situps" => Ok(ExerciseType::Situp),
            "pullup" | "pullups" => Ok(ExerciseType::Pullup),
            "run" | "running" => Ok(ExerciseType::Run),
            _ => {
                tracing::warn!(exercise_type = s, "rejected unknown exercise type");
                Err(GradingError::UnknownExerciseType(s.to_string()))
            }
        }
    }
}

/// Joint triple (arm, vertex, arm) measured on both sides of the body
#[derive(Debug, Clone, Copy, Serialize)]
pub struct AngleDef {
    pub left: [&'static str; 3],
    pub right: [&'static str; 3],
}

/// Hysteresis thresholds on the primary angle, `down_max < up_min`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PhaseThresholds {
    pub down_max: f64,
    pub up_min: f64,
}

/// Exercise-specific alignment check run on confident joints
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum FormCheck {
    /// Normalized X difference between the shoulders
    ShoulderLevel { max_x_diff: f64 },
    /// Hip midpoint deviation from the shoulder-ankle line, relative to body
    /// length; positive beyond `sag` is sagging, negative beyond `pike` piking
    BodyLine { sag: f64, pike: f64 },
    /// Average knee angle must stay inside the range
    KneeBend { min_angle: f64, max_angle: f64 },
    /// Horizontal hip offset from the shoulders, relative to torso length
    TorsoSway { max_ratio: f64 },
}

/// Extra condition a flexed frame must meet before it counts as full depth
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "gate", rename_all = "snake_case")]
pub enum DepthGate {
    /// Nose at least `clearance` above the average wrist height (the bar)
    ChinOverBar { clearance: f64 },
}

/// Feedback shown for each phase when no rep message applies
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PhaseCues {
    pub starting: &'static str,
    pub down: &'static str,
    pub up: &'static str,
    pub between: &'static str,
    pub invalid: &'static str,
    /// Shown when a rep attempt never reached `down_max`
    pub shallow_rep: &'static str,
}

/// Everything the live path needs to grade one frame
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MotionProfile {
    pub required_joints: &'static [&'static str],
    pub min_confidence: f64,
    pub primary_angle: AngleDef,
    pub thresholds: PhaseThresholds,
    pub form_checks: &'static [FormCheck],
    pub depth_gate: Option<DepthGate>,
    pub cues: PhaseCues,
}

/// Registry entry
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ExerciseDefinition {
    pub exercise: ExerciseType,
    pub name: &'static str,
    /// Unit of the final performance value
    pub performance_unit: &'static str,
    pub motion: Option<MotionProfile>,
    pub calibration: ScoreCalibration,
}

const ELBOW_ANGLE: AngleDef = AngleDef {
    left: [LEFT_WRIST, LEFT_ELBOW, LEFT_SHOULDER],
    right: [RIGHT_WRIST, RIGHT_ELBOW, RIGHT_SHOULDER],
};

static PUSHUP: ExerciseDefinition = ExerciseDefinition {
    exercise: ExerciseType::Pushup,
    name: "Push-up",
    performance_unit: "reps",
    motion: Some(MotionProfile {
        required_joints: &[
            LEFT_SHOULDER,
            RIGHT_SHOULDER,
            LEFT_ELBOW,
            RIGHT_ELBOW,
            LEFT_WRIST,
            RIGHT_WRIST,
            LEFT_HIP,
            RIGHT_HIP,
            LEFT_KNEE,
            RIGHT_KNEE,
            LEFT_ANKLE,
            RIGHT_ANKLE,
        ],
        min_confidence: 0.5,
        primary_angle: ELBOW_ANGLE,
        thresholds: PhaseThresholds {
            down_max: 90.0,
            up_min: 160.0,
        },
        form_checks: &[
            FormCheck::ShoulderLevel { max_x_diff: 0.10 },
            FormCheck::BodyLine {
                sag: 0.10,
                pike: 0.12,
            },
        ],
        depth_gate: None,
        cues: PhaseCues {
            starting: "Begin when ready",
            down: "Push up",
            up: "Lower body",
            between: "Keep moving",
            invalid: "Fix pose",
            shallow_rep: "Push lower for rep to count",
        },
    }),
    calibration: ScoreCalibration::Rubric(RubricTable {
        entries: &PUSHUP_RUBRIC,
        lower_is_better: false,
    }),
};

static SITUP: ExerciseDefinition = ExerciseDefinition {
    exercise: ExerciseType::Situp,
    name: "Sit-up",
    performance_unit: "reps",
    motion: Some(MotionProfile {
        required_joints: &[
            LEFT_SHOULDER,
            RIGHT_SHOULDER,
            LEFT_HIP,
            RIGHT_HIP,
            LEFT_KNEE,
            RIGHT_KNEE,
            LEFT_ANKLE,
            RIGHT_ANKLE,
        ],
        min_confidence: 0.6,
        primary_angle: AngleDef {
            left: [LEFT_SHOULDER, LEFT_HIP, LEFT_KNEE],
            right: [RIGHT_SHOULDER, RIGHT_HIP, RIGHT_KNEE],
        },
        // lying back with knees at 90 degrees puts the hip near 135
        thresholds: PhaseThresholds {
            down_max: 70.0,
            up_min: 110.0,
        },
        form_checks: &[FormCheck::KneeBend {
            min_angle: 70.0,
            max_angle: 110.0,
        }],
        depth_gate: None,
        cues: PhaseCues {
            starting: "Begin when ready",
            down: "Lower back down",
            up: "Sit up",
            between: "Keep moving",
            invalid: "Fix pose",
            shallow_rep: "Sit up higher for rep to count",
        },
    }),
    calibration: ScoreCalibration::Rubric(RubricTable {
        entries: &SITUP_RUBRIC,
        lower_is_better: false,
    }),
};

static PULLUP: ExerciseDefinition = ExerciseDefinition {
    exercise: ExerciseType::Pullup,
    name: "Pull-up",
    performance_unit: "reps",
    motion: Some(MotionProfile {
        required_joints: &[
            NOSE,
            LEFT_SHOULDER,
            RIGHT_SHOULDER,
            LEFT_ELBOW,
            RIGHT_ELBOW,
            LEFT_WRIST,
            RIGHT_WRIST,
            LEFT_HIP,
            RIGHT_HIP,
        ],
        min_confidence: 0.6,
        primary_angle: ELBOW_ANGLE,
        thresholds: PhaseThresholds {
            down_max: 90.0,
            up_min: 160.0,
        },
        form_checks: &[FormCheck::TorsoSway { max_ratio: 0.10 }],
        depth_gate: Some(DepthGate::ChinOverBar { clearance: 0.05 }),
        cues: PhaseCues {
            starting: "Begin from a dead hang",
            down: "Lower to a dead hang",
            up: "Pull up",
            between: "Keep moving",
            invalid: "Fix pose",
            shallow_rep: "Pull higher for rep to count",
        },
    }),
    calibration: ScoreCalibration::Rubric(RubricTable {
        entries: &PULLUP_RUBRIC,
        lower_is_better: false,
    }),
};

/// Two-mile run: 11:00 → 100, 15:12 → 50, 19:30 → 0
static RUN: ExerciseDefinition = ExerciseDefinition {
    exercise: ExerciseType::Run,
    name: "Two-mile run",
    performance_unit: "seconds",
    motion: None,
    calibration: ScoreCalibration::Continuous(Breakpoints::new(1170.0, 912.0, 660.0)),
};

static PUSHUP_RUBRIC: [(u32, u8); 69] = [
    (0, 0), (1, 1), (2, 3), (3, 4), (4, 6), (5, 7), (6, 9), (7, 10), (8, 12), (9, 13),
    (10, 15), (11, 16), (12, 18), (13, 19), (14, 21), (15, 22), (16, 24), (17, 25), (18, 26), (19, 28),
    (20, 29), (21, 31), (22, 32), (23, 34), (24, 35), (25, 37), (26, 38), (27, 40), (28, 41), (29, 43),
    (30, 44), (31, 46), (32, 47), (33, 48), (34, 50), (35, 51), (36, 53), (37, 54), (38, 56), (39, 57),
    (40, 59), (41, 60), (42, 62), (43, 63), (44, 65), (45, 66), (46, 68), (47, 69), (48, 71), (49, 72),
    (50, 74), (51, 75), (52, 76), (53, 78), (54, 79), (55, 81), (56, 82), (57, 84), (58, 85), (59, 87),
    (60, 88), (61, 90), (62, 91), (63, 93), (64, 94), (65, 96), (66, 97), (67, 99), (68, 100),
];

static SITUP_RUBRIC: [(u32, u8); 79] = [
    (0, 0), (1, 1), (2, 2), (3, 3), (4, 4), (5, 5), (6, 6), (7, 7), (8, 8), (9, 9),
    (10, 10), (11, 11), (12, 12), (13, 13), (14, 14), (15, 15), (16, 16), (17, 17), (18, 18), (19, 19),
    (20, 20), (21, 21), (22, 22), (23, 23), (24, 24), (25, 25), (26, 26), (27, 27), (28, 28), (29, 29),
    (30, 30), (31, 31), (32, 32), (33, 33), (34, 34), (35, 35), (36, 36), (37, 37), (38, 38), (39, 39),
    (40, 40), (41, 41), (42, 42), (43, 43), (44, 44), (45, 45), (46, 46), (47, 47), (48, 48), (49, 49),
    (50, 50), (51, 52), (52, 58), (53, 60), (54, 62), (55, 64), (56, 66), (57, 68), (58, 70), (59, 72),
    (60, 74), (61, 76), (62, 78), (63, 80), (64, 82), (65, 84), (66, 86), (67, 88), (68, 90), (69, 91),
    (70, 92), (71, 93), (72, 94), (73, 95), (74, 96), (75, 97), (76, 98), (77, 99), (78, 100),
];

static PULLUP_RUBRIC: [(u32, u8); 26] = [
    (0, 0), (1, 4), (2, 8), (3, 12), (4, 16), (5, 20), (6, 24), (7, 28), (8, 32), (9, 36),
    (10, 40), (11, 44), (12, 48), (13, 52), (14, 56), (15, 60), (16, 64), (17, 68), (18, 72), (19, 76),
    (20, 80), (21, 84), (22, 88), (23, 92), (24, 96), (25, 100),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_round_trip() {
        for exercise in ExerciseType::ALL {
            let parsed: ExerciseType = exercise.as_str().parse().unwrap();
            assert_eq!(parsed, exercise);
            assert_eq!(exercise.definition().exercise, exercise);
        }
    }

    #[test]
    fn test_tag_variants_accepted() {
        assert_eq!("Push-Up".parse::<ExerciseType>().unwrap(), ExerciseType::Pushup);
        assert_eq!("sit_ups".parse::<ExerciseType>().unwrap(), ExerciseType::Situp);
        assert_eq!(" PULLUP ".parse::<ExerciseType>().unwrap(), ExerciseType::Pullup);
        assert_eq!("running".parse::<ExerciseType>().unwrap(), ExerciseType::Run);
    }

    #[test]
    fn test_unknown_tag_rejected() {
        let err = "plank".parse::<ExerciseType>().unwrap_err();
        assert!(matches!(err, GradingError::UnknownExerciseType(ref t) if t == "plank"));
    }

    #[test]
    fn test_thresholds_leave_hysteresis_band() {
        for exercise in ExerciseType::ALL {
            if let Some(motion) = exercise.motion() {
                assert!(motion.thresholds.down_max < motion.thresholds.up_min);
                for name in motion.primary_angle.left.iter().chain(&motion.primary_angle.right) {
                    assert!(
                        motion.required_joints.contains(name),
                        "{exercise}: {name} drives the primary angle but is not required"
                    );
                }
            }
        }
    }

    #[test]
    fn test_pullup_requires_chin_over_bar() {
        let motion = ExerciseType::Pullup.motion().unwrap();
        assert_eq!(
            motion.depth_gate,
            Some(DepthGate::ChinOverBar { clearance: 0.05 })
        );
        for name in [NOSE, LEFT_WRIST, RIGHT_WRIST] {
            assert!(motion.required_joints.contains(&name));
        }
        assert_eq!(ExerciseType::Pushup.motion().unwrap().depth_gate, None);
    }

    #[test]
    fn test_situp_lying_back_reaches_extension() {
        // knees at 90 degrees leave the hip angle near 135 when lying back
        let motion = ExerciseType::Situp.motion().unwrap();
        assert!(motion.thresholds.up_min <= 135.0);
    }

    #[test]
    fn test_run_is_timed_only() {
        assert!(!ExerciseType::Run.is_pose_tracked());
        assert!(ExerciseType::Pushup.is_pose_tracked());
        assert_eq!(ExerciseType::Run.definition().performance_unit, "seconds");
    }

    #[test]
    fn test_rubrics_sorted_and_bounded() {
        for table in [&PUSHUP_RUBRIC[..], &SITUP_RUBRIC[..], &PULLUP_RUBRIC[..]] {
            assert!(table.windows(2).all(|w| w[0].0 < w[1].0 && w[0].1 <= w[1].1));
            assert_eq!(table.first().map(|e| e.1), Some(0));
            assert_eq!(table.last().map(|e| e.1), Some(100));
        }
    }
}
