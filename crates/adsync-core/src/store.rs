//! The `UserStore` trait: the LMS tables the synchroniser reads and writes.
//!
//! The trait is implemented by storage backends (e.g. `adsync-store-sqlite`).
//! The reconciler and the CLI depend on this abstraction, not on any concrete
//! backend.

use std::future::Future;

use crate::{
  course::{Course, EnrollmentRule, NewCourse, NewRule},
  enrol::{EnrolInstance, Enrollment},
  user::{LocalUser, NewUser, UserAttributes},
};

/// Abstraction over the host LMS user, course and enrolment tables.
///
/// All methods return `Send` futures so the trait can be used from a
/// multi-threaded tokio runtime.
pub trait UserStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Look up a user by exact username. Returns `None` if not found.
  fn find_user_by_username<'a>(
    &'a self,
    username: &'a str,
  ) -> impl Future<Output = Result<Option<LocalUser>, Self::Error>> + Send + 'a;

  fn get_user(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<LocalUser>, Self::Error>> + Send + '_;

  /// List users ordered by id. Soft-deleted users are included only when
  /// `include_deleted` is set.
  fn list_users(
    &self,
    include_deleted: bool,
  ) -> impl Future<Output = Result<Vec<LocalUser>, Self::Error>> + Send + '_;

  /// Persist a new user. Fails if the username is already taken.
  fn insert_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<LocalUser, Self::Error>> + Send + '_;

  /// Overwrite a user's attributes, including the `deleted` flag, and bump
  /// `modified_at`. Fails with a not-found error if `id` does not exist.
  fn update_user(
    &self,
    id: i64,
    attributes: UserAttributes,
  ) -> impl Future<Output = Result<LocalUser, Self::Error>> + Send + '_;

  /// Set the `deleted` flag on a user without touching other attributes.
  fn soft_delete_user(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Courses ───────────────────────────────────────────────────────────

  fn add_course(
    &self,
    input: NewCourse,
  ) -> impl Future<Output = Result<Course, Self::Error>> + Send + '_;

  fn get_course(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Course>, Self::Error>> + Send + '_;

  /// Like [`get_course`](Self::get_course), but a missing course is an error.
  fn require_course(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Course, Self::Error>> + Send + '_;

  fn list_courses(&self) -> impl Future<Output = Result<Vec<Course>, Self::Error>> + Send + '_;

  // ── Enrollment rules ──────────────────────────────────────────────────

  /// Register a rule. New rules are created with `is_new` set.
  fn add_rule(
    &self,
    input: NewRule,
  ) -> impl Future<Output = Result<EnrollmentRule, Self::Error>> + Send + '_;

  /// Mark a rule deleted. The row is kept.
  fn delete_rule(&self, id: i64) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn list_rules(
    &self,
  ) -> impl Future<Output = Result<Vec<EnrollmentRule>, Self::Error>> + Send + '_;

  /// Active rules (`is_new` and not deleted) whose department equals
  /// `department`, or equals `wildcard` when one is given.
  fn active_rules_for_department<'a>(
    &'a self,
    department: &'a str,
    wildcard: Option<&'a str>,
  ) -> impl Future<Output = Result<Vec<EnrollmentRule>, Self::Error>> + Send + 'a;

  // ── Enrolment ─────────────────────────────────────────────────────────

  /// Whether the named enrolment method is enabled site-wide.
  fn enrol_plugin_enabled<'a>(
    &'a self,
    method: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  fn set_enrol_plugin_enabled<'a>(
    &'a self,
    method: &'a str,
    enabled: bool,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  fn find_enrol_instance<'a>(
    &'a self,
    course_id: i64,
    method: &'a str,
  ) -> impl Future<Output = Result<Option<EnrolInstance>, Self::Error>> + Send + 'a;

  fn add_enrol_instance<'a>(
    &'a self,
    course_id: i64,
    method: &'a str,
  ) -> impl Future<Output = Result<EnrolInstance, Self::Error>> + Send + 'a;

  /// Whether the user holds any enrolment in the course, through any instance.
  fn is_enrolled(
    &self,
    course_id: i64,
    user_id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Enrol a user through an instance with the given role.
  ///
  /// Fails if the user already holds an enrolment through that instance.
  fn enrol_user(
    &self,
    instance_id: i64,
    user_id: i64,
    role_id: i64,
  ) -> impl Future<Output = Result<Enrollment, Self::Error>> + Send + '_;

  /// List enrolments, optionally restricted to one course.
  fn list_enrollments(
    &self,
    course_id: Option<i64>,
  ) -> impl Future<Output = Result<Vec<Enrollment>, Self::Error>> + Send + '_;
}
