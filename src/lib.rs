//! PT Champion Grading - Embeddable rep-counting and fitness scoring engine
//!
//! Turns a stream of detected body-joint positions into live per-frame
//! feedback and a rep count, and maps a final performance value to a
//! normalized 0-100 score comparable across exercise types:
//! pose frame → form validation → rep state machine → final score.
//!
//! ## Entry Points
//!
//! - **Live path**: [`GradingSession`] or [`grade_pose`] with a caller-owned
//!   [`ExerciseState`]
//! - **Final score**: [`calculate_score`], or the C ABI `ptg_calculate_score`
//!   for hosts with no access to the rest of the system

pub mod error;
pub mod exercise;
pub mod geometry;
pub mod rep_counter;
pub mod scoring;
pub mod session;
pub mod types;
pub mod validator;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use error::GradingError;
pub use exercise::ExerciseType;
pub use rep_counter::{grade_pose, RepCounter};
pub use scoring::{calculate_score, calculate_score_for_tag, score_or_sentinel, ScoreCalibration};
pub use session::{GradingSession, SessionSummary};
pub use types::{ExerciseState, GradingResult, Joint, Phase, Pose};

/// Library version
pub const GRADING_VERSION: &str = env!("CARGO_PKG_VERSION");
