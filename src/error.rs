//! Error types for PT Champion grading

use thiserror::Error;

use crate::exercise::ExerciseType;

/// Errors that can occur while grading or scoring
#[derive(Debug, Error)]
pub enum GradingError {
    #[error("Unknown exercise type: {0}")]
    UnknownExerciseType(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Exercise {0} is not pose-tracked")]
    NotPoseTracked(ExerciseType),

    #[error("Missing performance value for {0}")]
    MissingPerformance(ExerciseType),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),
}
