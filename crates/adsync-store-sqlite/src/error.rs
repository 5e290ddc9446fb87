//! Error type for `adsync-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] adsync_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),
}

impl Error {
  /// Whether this error is a core "not found" for a course.
  pub fn is_course_not_found(&self) -> bool {
    matches!(self, Self::Core(adsync_core::Error::CourseNotFound(_)))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
