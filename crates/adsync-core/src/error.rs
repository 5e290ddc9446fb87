//! Error types for `adsync-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("user not found: {0}")]
  UserNotFound(i64),

  #[error("course not found: {0}")]
  CourseNotFound(i64),

  #[error("enrollment rule not found: {0}")]
  RuleNotFound(i64),

  #[error("enrolment instance not found: {0}")]
  InstanceNotFound(i64),

  #[error("invalid schedule field {field}: {reason}")]
  InvalidSchedule { field: &'static str, reason: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
