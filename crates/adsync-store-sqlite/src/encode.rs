//! Encoding and decoding helpers between domain types and the plain
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, booleans as 0/1 integers.

use adsync_core::{
  course::{Course, EnrollmentRule},
  enrol::{EnrolInstance, Enrollment},
  user::{LocalUser, UserAttributes},
};
use chrono::{DateTime, Utc};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Users ───────────────────────────────────────────────────────────────────

pub const USER_COLUMNS: &str = "id, username, firstname, lastname, email, department, lang, \
                                institution, auth, confirmed, deleted, created_at, modified_at";

/// Raw values read directly from a `users` row.
pub struct RawUser {
  pub id:          i64,
  pub username:    String,
  pub firstname:   String,
  pub lastname:    String,
  pub email:       String,
  pub department:  String,
  pub lang:        String,
  pub institution: String,
  pub auth:        String,
  pub confirmed:   bool,
  pub deleted:     bool,
  pub created_at:  String,
  pub modified_at: String,
}

impl RawUser {
  /// Map a row selected with [`USER_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:          row.get(0)?,
      username:    row.get(1)?,
      firstname:   row.get(2)?,
      lastname:    row.get(3)?,
      email:       row.get(4)?,
      department:  row.get(5)?,
      lang:        row.get(6)?,
      institution: row.get(7)?,
      auth:        row.get(8)?,
      confirmed:   row.get(9)?,
      deleted:     row.get(10)?,
      created_at:  row.get(11)?,
      modified_at: row.get(12)?,
    })
  }

  pub fn into_user(self) -> Result<LocalUser> {
    Ok(LocalUser {
      id:          self.id,
      username:    self.username,
      attributes:  UserAttributes {
        firstname:   self.firstname,
        lastname:    self.lastname,
        email:       self.email,
        department:  self.department,
        lang:        self.lang,
        institution: self.institution,
        auth:        self.auth,
        confirmed:   self.confirmed,
        deleted:     self.deleted,
      },
      created_at:  decode_dt(&self.created_at)?,
      modified_at: decode_dt(&self.modified_at)?,
    })
  }
}

// ─── Courses ─────────────────────────────────────────────────────────────────

pub const COURSE_COLUMNS: &str = "id, shortname, fullname, created_at";

pub struct RawCourse {
  pub id:         i64,
  pub shortname:  String,
  pub fullname:   String,
  pub created_at: String,
}

impl RawCourse {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:         row.get(0)?,
      shortname:  row.get(1)?,
      fullname:   row.get(2)?,
      created_at: row.get(3)?,
    })
  }

  pub fn into_course(self) -> Result<Course> {
    Ok(Course {
      id:         self.id,
      shortname:  self.shortname,
      fullname:   self.fullname,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

// ─── Rules, instances, enrolments ────────────────────────────────────────────

pub const RULE_COLUMNS: &str = "id, department, course_id, is_new, is_deleted";

pub fn rule_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<EnrollmentRule> {
  Ok(EnrollmentRule {
    id:         row.get(0)?,
    department: row.get(1)?,
    course_id:  row.get(2)?,
    is_new:     row.get(3)?,
    is_deleted: row.get(4)?,
  })
}

pub fn instance_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<EnrolInstance> {
  Ok(EnrolInstance {
    id:        row.get(0)?,
    course_id: row.get(1)?,
    method:    row.get(2)?,
  })
}

/// Raw values of an `enrolments` row joined with its instance.
pub struct RawEnrollment {
  pub id:          i64,
  pub instance_id: i64,
  pub course_id:   i64,
  pub user_id:     i64,
  pub role_id:     i64,
  pub created_at:  String,
}

impl RawEnrollment {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:          row.get(0)?,
      instance_id: row.get(1)?,
      course_id:   row.get(2)?,
      user_id:     row.get(3)?,
      role_id:     row.get(4)?,
      created_at:  row.get(5)?,
    })
  }

  pub fn into_enrollment(self) -> Result<Enrollment> {
    Ok(Enrollment {
      id:          self.id,
      instance_id: self.instance_id,
      course_id:   self.course_id,
      user_id:     self.user_id,
      role_id:     self.role_id,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}
