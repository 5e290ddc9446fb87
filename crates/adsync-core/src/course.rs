//! Courses and the department → course enrollment rules.
//!
//! Both are managed outside the sync pipeline; the pipeline only reads them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─── Courses ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
  pub id:         i64,
  pub shortname:  String,
  pub fullname:   String,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCourse {
  pub shortname: String,
  pub fullname:  String,
}

// ─── Enrollment rules ────────────────────────────────────────────────────────

/// Department that matches every user when used as a rule's department.
pub const WILDCARD_DEPARTMENT: &str = "all";

/// Maps a directory department onto a course that new users from that
/// department are enrolled into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentRule {
  pub id:         i64,
  pub department: String,
  pub course_id:  i64,
  /// Only rules flagged `is_new` apply to freshly created accounts.
  pub is_new:     bool,
  pub is_deleted: bool,
}

impl EnrollmentRule {
  pub fn is_active(&self) -> bool { self.is_new && !self.is_deleted }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRule {
  pub department: String,
  pub course_id:  i64,
}
