//! Final score calculation
//!
//! Maps a final performance value (total reps, or elapsed seconds for timed
//! events) to an integer score 0-100. Two calibration strategies exist:
//! - Continuous 3-point interpolation between breakpoints worth 0, 50 and 100
//! - Discrete rubric lookup against a fixed performance → points table
//!
//! Each exercise family carries exactly one authoritative calibration in the
//! registry (see [`crate::exercise`]).

use serde::Serialize;

use crate::error::GradingError;
use crate::exercise::ExerciseType;

/// Sentinel returned by [`score_or_sentinel`] on malformed input
pub const SCORE_SENTINEL: i32 = -1;

/// Highest possible score
pub const MAX_SCORE: u8 = 100;

/// Performance values mapped to 0, 50 and 100 points.
///
/// When `hundred < zero` lower values are better (timed events) and the
/// interpolation direction is inverted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Breakpoints {
    pub zero: f64,
    pub fifty: f64,
    pub hundred: f64,
}

impl Breakpoints {
    pub const fn new(zero: f64, fifty: f64, hundred: f64) -> Self {
        Self {
            zero,
            fifty,
            hundred,
        }
    }

    pub fn lower_is_better(&self) -> bool {
        self.hundred < self.zero
    }

    /// Unrounded piecewise-linear score
    pub fn interpolate(&self, value: f64) -> f64 {
        // Flip the axis for timed events so the same ascending formula applies
        let sign = if self.lower_is_better() { -1.0 } else { 1.0 };
        let v = sign * value;
        let (zero, fifty, hundred) = (sign * self.zero, sign * self.fifty, sign * self.hundred);

        if v <= zero {
            0.0
        } else if v >= hundred {
            100.0
        } else if v < fifty {
            50.0 * (v - zero) / (fifty - zero)
        } else {
            50.0 + 50.0 * (v - fifty) / (hundred - fifty)
        }
    }
}

/// Discrete performance → points table, sorted by ascending performance value
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RubricTable {
    pub entries: &'static [(u32, u8)],
    pub lower_is_better: bool,
}

impl RubricTable {
    /// Look up the score for a performance value.
    ///
    /// Values past the best entry score 100, values past the worst entry score
    /// 0, and untabulated values in between fall to the nearest entry on the
    /// worse side.
    pub fn lookup(&self, value: f64) -> f64 {
        let (first, last) = match (self.entries.first(), self.entries.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return 0.0,
        };

        if self.lower_is_better {
            if value < first.0 as f64 {
                return 100.0;
            }
            if value > last.0 as f64 {
                return 0.0;
            }
            // smallest tabulated value >= performance
            self.entries
                .iter()
                .find(|(perf, _)| *perf as f64 >= value)
                .map(|(_, points)| *points as f64)
                .unwrap_or(0.0)
        } else {
            if value > last.0 as f64 {
                return 100.0;
            }
            if value < first.0 as f64 {
                return 0.0;
            }
            // largest tabulated value <= performance
            self.entries
                .iter()
                .rev()
                .find(|(perf, _)| *perf as f64 <= value)
                .map(|(_, points)| *points as f64)
                .unwrap_or(0.0)
        }
    }

    pub fn best(&self) -> Option<(u32, u8)> {
        if self.lower_is_better {
            self.entries.first().copied()
        } else {
            self.entries.last().copied()
        }
    }
}

/// Scoring rule for one exercise family
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum ScoreCalibration {
    Continuous(Breakpoints),
    Rubric(RubricTable),
}

impl ScoreCalibration {
    /// Score a performance value, clamped to 0-100 and rounded
    pub fn score(&self, value: f64) -> u8 {
        let raw = match self {
            ScoreCalibration::Continuous(breakpoints) => breakpoints.interpolate(value),
            ScoreCalibration::Rubric(table) => table.lookup(value),
        };
        raw.clamp(0.0, MAX_SCORE as f64).round() as u8
    }

    pub fn strategy_name(&self) -> &'static str {
        match self {
            ScoreCalibration::Continuous(_) => "continuous",
            ScoreCalibration::Rubric(_) => "rubric",
        }
    }
}

/// Calculate the final score for an exercise.
///
/// `performance_value` is a rep count for rep exercises or elapsed seconds for
/// timed ones. Negative, NaN and infinite values are rejected.
pub fn calculate_score(exercise: ExerciseType, performance_value: f64) -> Result<u8, GradingError> {
    if !performance_value.is_finite() {
        return Err(GradingError::InvalidInput(format!(
            "performance value must be finite, got {performance_value}"
        )));
    }
    if performance_value < 0.0 {
        return Err(GradingError::InvalidInput(format!(
            "performance value must be non-negative, got {performance_value}"
        )));
    }

    Ok(exercise.definition().calibration.score(performance_value))
}

/// Calculate a score from a string exercise tag
pub fn calculate_score_for_tag(exercise_type: &str, performance_value: f64) -> Result<u8, GradingError> {
    let exercise: ExerciseType = exercise_type.parse()?;
    calculate_score(exercise, performance_value)
}

/// Embeddable entry point: score 0-100, or [`SCORE_SENTINEL`] on bad input
pub fn score_or_sentinel(exercise_type: &str, performance_value: f64) -> i32 {
    match calculate_score_for_tag(exercise_type, performance_value) {
        Ok(score) => score as i32,
        Err(_) => SCORE_SENTINEL,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RUN: Breakpoints = Breakpoints::new(1170.0, 912.0, 660.0);

    #[test]
    fn test_continuous_breakpoints_exact() {
        let bp = Breakpoints::new(0.0, 30.0, 60.0);
        assert_eq!(bp.interpolate(0.0), 0.0);
        assert_eq!(bp.interpolate(30.0), 50.0);
        assert_eq!(bp.interpolate(60.0), 100.0);
        assert!((bp.interpolate(15.0) - 25.0).abs() < 1e-12);
        assert!((bp.interpolate(45.0) - 75.0).abs() < 1e-12);
        assert_eq!(bp.interpolate(500.0), 100.0);
    }

    #[test]
    fn test_continuous_inverted_for_time() {
        assert!(RUN.lower_is_better());
        assert_eq!(RUN.interpolate(1170.0), 0.0);
        assert_eq!(RUN.interpolate(912.0), 50.0);
        assert_eq!(RUN.interpolate(660.0), 100.0);
        assert_eq!(RUN.interpolate(600.0), 100.0);
        assert_eq!(RUN.interpolate(1500.0), 0.0);
        // halfway between 912 and 660 is 786
        assert!((RUN.interpolate(786.0) - 75.0).abs() < 1e-12);
    }

    #[test]
    fn test_rubric_lookup_ascending() {
        static TABLE: [(u32, u8); 4] = [(0, 0), (1, 10), (3, 40), (5, 100)];
        let rubric = RubricTable {
            entries: &TABLE,
            lower_is_better: false,
        };
        assert_eq!(rubric.lookup(1.0), 10.0);
        // untabulated value falls to the worse neighbour
        assert_eq!(rubric.lookup(2.0), 10.0);
        assert_eq!(rubric.lookup(4.9), 40.0);
        assert_eq!(rubric.lookup(6.0), 100.0);
        assert_eq!(rubric.best(), Some((5, 100)));
    }

    #[test]
    fn test_rubric_lookup_descending() {
        static TABLE: [(u32, u8); 3] = [(600, 100), (700, 50), (800, 0)];
        let rubric = RubricTable {
            entries: &TABLE,
            lower_is_better: true,
        };
        assert_eq!(rubric.lookup(550.0), 100.0);
        assert_eq!(rubric.lookup(650.0), 50.0);
        assert_eq!(rubric.lookup(700.0), 50.0);
        assert_eq!(rubric.lookup(900.0), 0.0);
        assert_eq!(rubric.best(), Some((600, 100)));
    }

    #[test]
    fn test_score_rounds_and_clamps() {
        let calibration = ScoreCalibration::Continuous(Breakpoints::new(0.0, 3.0, 6.0));
        // 1 rep = 16.67 points
        assert_eq!(calibration.score(1.0), 17);
        assert_eq!(calibration.score(100.0), 100);
    }

    #[test]
    fn test_pushup_rubric_anchors() {
        assert_eq!(calculate_score(ExerciseType::Pushup, 0.0).unwrap(), 0);
        assert_eq!(calculate_score(ExerciseType::Pushup, 34.0).unwrap(), 50);
        assert_eq!(calculate_score(ExerciseType::Pushup, 68.0).unwrap(), 100);
        assert_eq!(calculate_score(ExerciseType::Pushup, 150.0).unwrap(), 100);
        assert_eq!(calculate_score(ExerciseType::Pushup, 48.0).unwrap(), 71);
    }

    #[test]
    fn test_situp_and_pullup_rubrics() {
        assert_eq!(calculate_score(ExerciseType::Situp, 52.0).unwrap(), 58);
        assert_eq!(calculate_score(ExerciseType::Situp, 78.0).unwrap(), 100);
        assert_eq!(calculate_score(ExerciseType::Pullup, 12.0).unwrap(), 48);
        assert_eq!(calculate_score(ExerciseType::Pullup, 25.0).unwrap(), 100);
        assert_eq!(calculate_score(ExerciseType::Pullup, 12.5).unwrap(), 48);
    }

    #[test]
    fn test_run_score_bounds() {
        assert_eq!(calculate_score(ExerciseType::Run, 600.0).unwrap(), 100);
        assert_eq!(calculate_score(ExerciseType::Run, 660.0).unwrap(), 100);
        assert_eq!(calculate_score(ExerciseType::Run, 912.0).unwrap(), 50);
        assert_eq!(calculate_score(ExerciseType::Run, 1170.0).unwrap(), 0);
        assert_eq!(calculate_score(ExerciseType::Run, 2000.0).unwrap(), 0);
    }

    #[test]
    fn test_reps_monotonic_non_decreasing() {
        for exercise in [ExerciseType::Pushup, ExerciseType::Situp, ExerciseType::Pullup] {
            let mut last = 0;
            for reps in 0..120 {
                let score = calculate_score(exercise, reps as f64).unwrap();
                assert!(score >= last, "{exercise} score dropped at {reps} reps");
                last = score;
            }
        }
    }

    #[test]
    fn test_time_monotonic_non_increasing() {
        let mut last = 100;
        for seconds in (500..1400).step_by(7) {
            let score = calculate_score(ExerciseType::Run, seconds as f64).unwrap();
            assert!(score <= last, "run score rose at {seconds}s");
            last = score;
        }
    }

    #[test]
    fn test_invalid_performance_rejected() {
        assert!(matches!(
            calculate_score(ExerciseType::Pushup, -1.0),
            Err(GradingError::InvalidInput(_))
        ));
        assert!(matches!(
            calculate_score(ExerciseType::Run, f64::NAN),
            Err(GradingError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_unknown_tag_is_error() {
        assert!(matches!(
            calculate_score_for_tag("burpee", 10.0),
            Err(GradingError::UnknownExerciseType(_))
        ));
        assert_eq!(calculate_score_for_tag("Push-Up", 34.0).unwrap(), 50);
    }

    #[test]
    fn test_sentinel_entry_point() {
        assert_eq!(score_or_sentinel("pushup", 68.0), 100);
        assert_eq!(score_or_sentinel("burpee", 10.0), SCORE_SENTINEL);
        assert_eq!(score_or_sentinel("run", -5.0), SCORE_SENTINEL);
    }
}
