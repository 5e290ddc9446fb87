//! [`SqliteStore`] — the SQLite implementation of [`UserStore`].

use std::path::Path;

use adsync_core::{
  Error as CoreError,
  course::{Course, EnrollmentRule, NewCourse, NewRule},
  enrol::{EnrolInstance, Enrollment},
  store::UserStore,
  user::{LocalUser, NewUser, UserAttributes},
};
use chrono::Utc;
use rusqlite::OptionalExtension as _;

use crate::{
  Error, Result,
  encode::{
    COURSE_COLUMNS, RULE_COLUMNS, RawCourse, RawEnrollment, RawUser, USER_COLUMNS, encode_dt,
    instance_from_row, rule_from_row,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A user store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn user_where<P>(&self, clause: &'static str, param: P) -> Result<Option<LocalUser>>
  where
    P: rusqlite::ToSql + Send + 'static,
  {
    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE {clause}"),
            rusqlite::params![param],
            RawUser::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }
}

// ─── UserStore impl ──────────────────────────────────────────────────────────

impl UserStore for SqliteStore {
  type Error = Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn find_user_by_username(&self, username: &str) -> Result<Option<LocalUser>> {
    self.user_where("username = ?1", username.to_owned()).await
  }

  async fn get_user(&self, id: i64) -> Result<Option<LocalUser>> {
    self.user_where("id = ?1", id).await
  }

  async fn list_users(&self, include_deleted: bool) -> Result<Vec<LocalUser>> {
    let raws: Vec<RawUser> = self
      .conn
      .call(move |conn| {
        let sql = if include_deleted {
          format!("SELECT {USER_COLUMNS} FROM users ORDER BY id")
        } else {
          format!("SELECT {USER_COLUMNS} FROM users WHERE deleted = 0 ORDER BY id")
        };
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([], RawUser::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawUser::into_user).collect()
  }

  async fn insert_user(&self, input: NewUser) -> Result<LocalUser> {
    let now = Utc::now();
    let at_str = encode_dt(now);
    let NewUser { username, attributes: a } = input;

    let (id, username, a) = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users (
             username, firstname, lastname, email, department, lang,
             institution, auth, confirmed, deleted, created_at, modified_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
          rusqlite::params![
            username,
            a.firstname,
            a.lastname,
            a.email,
            a.department,
            a.lang,
            a.institution,
            a.auth,
            a.confirmed,
            a.deleted,
            at_str,
          ],
        )?;
        Ok((conn.last_insert_rowid(), username, a))
      })
      .await?;

    Ok(LocalUser {
      id,
      username,
      attributes: a,
      created_at: now,
      modified_at: now,
    })
  }

  async fn update_user(&self, id: i64, attributes: UserAttributes) -> Result<LocalUser> {
    let at_str = encode_dt(Utc::now());
    let a = attributes;

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE users SET
             firstname = ?1, lastname = ?2, email = ?3, department = ?4,
             lang = ?5, institution = ?6, auth = ?7, confirmed = ?8,
             deleted = ?9, modified_at = ?10
           WHERE id = ?11",
          rusqlite::params![
            a.firstname,
            a.lastname,
            a.email,
            a.department,
            a.lang,
            a.institution,
            a.auth,
            a.confirmed,
            a.deleted,
            at_str,
            id,
          ],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(CoreError::UserNotFound(id).into());
    }
    self
      .get_user(id)
      .await?
      .ok_or_else(|| CoreError::UserNotFound(id).into())
  }

  async fn soft_delete_user(&self, id: i64) -> Result<()> {
    let at_str = encode_dt(Utc::now());
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE users SET deleted = 1, modified_at = ?1 WHERE id = ?2",
          rusqlite::params![at_str, id],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(CoreError::UserNotFound(id).into());
    }
    Ok(())
  }

  // ── Courses ───────────────────────────────────────────────────────────────

  async fn add_course(&self, input: NewCourse) -> Result<Course> {
    let now = Utc::now();
    let at_str = encode_dt(now);
    let NewCourse { shortname, fullname } = input;

    let (id, shortname, fullname) = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO courses (shortname, fullname, created_at) VALUES (?1, ?2, ?3)",
          rusqlite::params![shortname, fullname, at_str],
        )?;
        Ok((conn.last_insert_rowid(), shortname, fullname))
      })
      .await?;

    Ok(Course { id, shortname, fullname, created_at: now })
  }

  async fn get_course(&self, id: i64) -> Result<Option<Course>> {
    let raw: Option<RawCourse> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {COURSE_COLUMNS} FROM courses WHERE id = ?1"),
            rusqlite::params![id],
            RawCourse::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawCourse::into_course).transpose()
  }

  async fn require_course(&self, id: i64) -> Result<Course> {
    self
      .get_course(id)
      .await?
      .ok_or_else(|| CoreError::CourseNotFound(id).into())
  }

  async fn list_courses(&self) -> Result<Vec<Course>> {
    let raws: Vec<RawCourse> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!("SELECT {COURSE_COLUMNS} FROM courses ORDER BY id"))?;
        let rows = stmt
          .query_map([], RawCourse::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCourse::into_course).collect()
  }

  // ── Enrollment rules ──────────────────────────────────────────────────────

  async fn add_rule(&self, input: NewRule) -> Result<EnrollmentRule> {
    let NewRule { department, course_id } = input;

    let (id, department) = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO enrollment_rules (department, course_id, is_new, is_deleted)
           VALUES (?1, ?2, 1, 0)",
          rusqlite::params![department, course_id],
        )?;
        Ok((conn.last_insert_rowid(), department))
      })
      .await?;

    Ok(EnrollmentRule { id, department, course_id, is_new: true, is_deleted: false })
  }

  async fn delete_rule(&self, id: i64) -> Result<()> {
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE enrollment_rules SET is_deleted = 1 WHERE id = ?1",
          rusqlite::params![id],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(CoreError::RuleNotFound(id).into());
    }
    Ok(())
  }

  async fn list_rules(&self) -> Result<Vec<EnrollmentRule>> {
    Ok(
      self
        .conn
        .call(|conn| {
          let mut stmt =
            conn.prepare(&format!("SELECT {RULE_COLUMNS} FROM enrollment_rules ORDER BY id"))?;
          let rows = stmt
            .query_map([], rule_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  async fn active_rules_for_department(
    &self,
    department: &str,
    wildcard:   Option<&str>,
  ) -> Result<Vec<EnrollmentRule>> {
    let department = department.to_owned();
    let wildcard = wildcard.map(str::to_owned);

    Ok(
      self
        .conn
        .call(move |conn| {
          // `?2` is NULL when there is no wildcard, and `= NULL` never matches.
          let mut stmt = conn.prepare(&format!(
            "SELECT {RULE_COLUMNS} FROM enrollment_rules
             WHERE is_new = 1 AND is_deleted = 0
               AND (department = ?1 OR department = ?2)
             ORDER BY id"
          ))?;
          let rows = stmt
            .query_map(rusqlite::params![department, wildcard], rule_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  // ── Enrolment ─────────────────────────────────────────────────────────────

  async fn enrol_plugin_enabled(&self, method: &str) -> Result<bool> {
    let method = method.to_owned();
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(
            conn
              .query_row(
                "SELECT enabled FROM enrol_plugins WHERE method = ?1",
                rusqlite::params![method],
                |r| r.get::<_, bool>(0),
              )
              .optional()?
              .unwrap_or(false),
          )
        })
        .await?,
    )
  }

  async fn set_enrol_plugin_enabled(&self, method: &str, enabled: bool) -> Result<()> {
    let method = method.to_owned();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO enrol_plugins (method, enabled) VALUES (?1, ?2)
           ON CONFLICT (method) DO UPDATE SET enabled = excluded.enabled",
          rusqlite::params![method, enabled],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn find_enrol_instance(&self, course_id: i64, method: &str) -> Result<Option<EnrolInstance>> {
    let method = method.to_owned();
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(
            conn
              .query_row(
                "SELECT id, course_id, method FROM enrol_instances
                 WHERE course_id = ?1 AND method = ?2",
                rusqlite::params![course_id, method],
                instance_from_row,
              )
              .optional()?,
          )
        })
        .await?,
    )
  }

  async fn add_enrol_instance(&self, course_id: i64, method: &str) -> Result<EnrolInstance> {
    let method = method.to_owned();
    let (id, method) = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO enrol_instances (course_id, method) VALUES (?1, ?2)",
          rusqlite::params![course_id, method],
        )?;
        Ok((conn.last_insert_rowid(), method))
      })
      .await?;

    Ok(EnrolInstance { id, course_id, method })
  }

  async fn is_enrolled(&self, course_id: i64, user_id: i64) -> Result<bool> {
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(
            conn
              .query_row(
                "SELECT 1 FROM enrolments e
                 JOIN enrol_instances i ON i.id = e.instance_id
                 WHERE i.course_id = ?1 AND e.user_id = ?2
                 LIMIT 1",
                rusqlite::params![course_id, user_id],
                |_| Ok(true),
              )
              .optional()?
              .unwrap_or(false),
          )
        })
        .await?,
    )
  }

  async fn enrol_user(&self, instance_id: i64, user_id: i64, role_id: i64) -> Result<Enrollment> {
    let now = Utc::now();
    let at_str = encode_dt(now);

    let (id, course_id) = self
      .conn
      .call(move |conn| {
        let course_id: Option<i64> = conn
          .query_row(
            "SELECT course_id FROM enrol_instances WHERE id = ?1",
            rusqlite::params![instance_id],
            |r| r.get(0),
          )
          .optional()?;
        let Some(course_id) = course_id else {
          return Ok(None);
        };

        conn.execute(
          "INSERT INTO enrolments (instance_id, user_id, role_id, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![instance_id, user_id, role_id, at_str],
        )?;
        Ok(Some((conn.last_insert_rowid(), course_id)))
      })
      .await?
      .ok_or(CoreError::InstanceNotFound(instance_id))?;

    Ok(Enrollment { id, instance_id, course_id, user_id, role_id, created_at: now })
  }

  async fn list_enrollments(&self, course_id: Option<i64>) -> Result<Vec<Enrollment>> {
    let raws: Vec<RawEnrollment> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT e.id, e.instance_id, i.course_id, e.user_id, e.role_id, e.created_at
           FROM enrolments e
           JOIN enrol_instances i ON i.id = e.instance_id
           WHERE ?1 IS NULL OR i.course_id = ?1
           ORDER BY e.id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![course_id], RawEnrollment::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawEnrollment::into_enrollment).collect()
  }
}
