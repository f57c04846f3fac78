//! Session orchestration
//!
//! This module provides the stateful public API: a [`GradingSession`] owns one
//! [`ExerciseState`] for one exercise, feeds it frames, and produces the final
//! [`SessionSummary`] with the authoritative score.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::GradingError;
use crate::exercise::ExerciseType;
use crate::rep_counter::grade_pose;
use crate::scoring::calculate_score;
use crate::types::{ExerciseState, GradingResult, Pose};

/// Final record of a completed session.
///
/// `score` depends only on `performance_value`; `average_form_score` is
/// reported for analytics and never alters it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: String,
    pub exercise: ExerciseType,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub reps: u32,
    /// Reps for rep exercises, elapsed seconds for timed ones
    pub performance_value: f64,
    pub score: u8,
    /// Mean form score over valid frames, if any were graded
    pub average_form_score: Option<f64>,
    pub frames: u64,
    pub valid_frames: u64,
}

/// Stateful grading session for one user and one exercise.
///
/// Owns its state exclusively; distinct sessions can be driven from
/// different threads without coordination.
#[derive(Debug, Clone)]
pub struct GradingSession {
    session_id: Uuid,
    exercise: ExerciseType,
    started_at: DateTime<Utc>,
    state: ExerciseState,
    frames: u64,
    valid_frames: u64,
    form_score_sum: f64,
}

impl GradingSession {
    /// Start a fresh session
    pub fn new(exercise: ExerciseType) -> Self {
        Self::with_state(exercise, ExerciseState::new())
    }

    /// Start a session from previously saved state
    pub fn with_state(exercise: ExerciseType, state: ExerciseState) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            exercise,
            started_at: Utc::now(),
            state,
            frames: 0,
            valid_frames: 0,
            form_score_sum: 0.0,
        }
    }

    /// Start a session from a string exercise tag
    pub fn for_tag(exercise_type: &str) -> Result<Self, GradingError> {
        Ok(Self::new(exercise_type.parse()?))
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn exercise(&self) -> ExerciseType {
        self.exercise
    }

    pub fn state(&self) -> &ExerciseState {
        &self.state
    }

    pub fn rep_count(&self) -> u32 {
        self.state.rep_count
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Grade one frame
    pub fn process_pose(&mut self, pose: &Pose) -> Result<GradingResult, GradingError> {
        let result = grade_pose(self.exercise, pose, &mut self.state)?;

        self.frames += 1;
        if result.is_valid {
            self.valid_frames += 1;
            self.form_score_sum += result.form_score;
        }

        Ok(result)
    }

    /// Grade one frame given as pose JSON, returning result JSON
    pub fn process_pose_json(&mut self, pose_json: &str) -> Result<String, GradingError> {
        let pose: Pose = serde_json::from_str(pose_json)?;
        let result = self.process_pose(&pose)?;
        Ok(serde_json::to_string(&result)?)
    }

    /// Save session state to JSON
    pub fn save_state(&self) -> Result<String, GradingError> {
        Ok(self.state.to_json()?)
    }

    /// Replace session state from JSON
    pub fn load_state(&mut self, json: &str) -> Result<(), GradingError> {
        self.state = ExerciseState::from_json(json)?;
        Ok(())
    }

    /// Close the session and compute the final grade.
    ///
    /// Rep exercises default to the counted reps; timed exercises require the
    /// elapsed seconds as `performance`.
    pub fn finish(&self, performance: Option<f64>) -> Result<SessionSummary, GradingError> {
        self.finish_at(performance, Utc::now())
    }

    pub fn finish_at(
        &self,
        performance: Option<f64>,
        completed_at: DateTime<Utc>,
    ) -> Result<SessionSummary, GradingError> {
        let performance_value = match performance {
            Some(value) => value,
            None if self.exercise.is_pose_tracked() => self.state.rep_count as f64,
            None => return Err(GradingError::MissingPerformance(self.exercise)),
        };

        let score = calculate_score(self.exercise, performance_value)?;
        let average_form_score =
            (self.valid_frames > 0).then(|| self.form_score_sum / self.valid_frames as f64);

        tracing::debug!(
            session_id = %self.session_id,
            exercise = %self.exercise,
            performance_value,
            score,
            "session finished"
        );

        Ok(SessionSummary {
            session_id: self.session_id.to_string(),
            exercise: self.exercise,
            started_at: self.started_at,
            completed_at,
            reps: self.state.rep_count,
            performance_value,
            score,
            average_form_score,
            frames: self.frames,
            valid_frames: self.valid_frames,
        })
    }
}
