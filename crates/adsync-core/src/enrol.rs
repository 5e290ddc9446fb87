//! Manual enrolment of users into courses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::store::UserStore;

/// The enrolment method the synchroniser enrols through.
pub const MANUAL: &str = "manual";

/// Role assigned to auto-enrolled users (the LMS "student" archetype).
pub const STUDENT_ROLE_ID: i64 = 5;

/// A course's instance of an enrolment method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrolInstance {
  pub id:        i64,
  pub course_id: i64,
  pub method:    String,
}

/// A user's enrolment in a course through one instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
  pub id:          i64,
  pub instance_id: i64,
  pub course_id:   i64,
  pub user_id:     i64,
  pub role_id:     i64,
  pub created_at:  DateTime<Utc>,
}

/// Enrol `user_id` into `course_id` through the manual method.
///
/// Returns `Ok(false)` when the manual method is disabled site-wide and
/// `Ok(true)` otherwise, whether or not a new enrolment row was written. A
/// manual instance is provisioned on the course if it has none. Calling this
/// twice for the same pair leaves exactly one enrolment.
///
/// A missing course is an error, not a `false`.
pub async fn check_enrol<S: UserStore>(
  store:     &S,
  course_id: i64,
  user_id:   i64,
  role_id:   i64,
) -> Result<bool, S::Error> {
  if !store.enrol_plugin_enabled(MANUAL).await? {
    debug!(course_id, user_id, "manual enrolment disabled");
    return Ok(false);
  }

  let course = store.require_course(course_id).await?;

  let instance = match store.find_enrol_instance(course.id, MANUAL).await? {
    Some(i) => i,
    None => {
      debug!(course_id, "provisioning manual enrolment instance");
      store.add_enrol_instance(course.id, MANUAL).await?
    }
  };

  if store.is_enrolled(course.id, user_id).await? {
    debug!(course_id, user_id, "already enrolled");
    return Ok(true);
  }

  store.enrol_user(instance.id, user_id, role_id).await?;
  debug!(course_id, user_id, role_id, "enrolled");
  Ok(true)
}
