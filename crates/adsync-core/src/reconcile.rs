//! Folding a directory listing into the local user table.
//!
//! Every directory user is upserted by username. Accounts seen for the first
//! time are additionally enrolled into the courses their department's rules
//! point at. Existing accounts are refreshed and revived but never enrolled.
//!
//! There is no per-user isolation: the first store error aborts the run and
//! users processed before it stay committed.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::{
  course::WILDCARD_DEPARTMENT,
  directory::{DirectoryUser, PLACEHOLDER},
  enrol::{STUDENT_ROLE_ID, check_enrol},
  store::UserStore,
  user::{NewUser, UserAttributes},
};

// ─── Options ─────────────────────────────────────────────────────────────────

/// Site-level values stamped onto every synchronised account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileOptions {
  pub lang:                String,
  pub institution:         String,
  pub auth:                String,
  /// Role given to users enrolled by a rule.
  pub role_id:             i64,
  /// Rule department that applies to every user. `None` or a blank string
  /// disables it.
  pub wildcard_department: Option<String>,
  /// Lowercase principal names before using them as usernames.
  pub lowercase_usernames: bool,
}

impl Default for ReconcileOptions {
  fn default() -> Self {
    Self {
      lang:                "en".into(),
      institution:         PLACEHOLDER.into(),
      auth:                "oauth2".into(),
      role_id:             STUDENT_ROLE_ID,
      wildcard_department: Some(WILDCARD_DEPARTMENT.into()),
      lowercase_usernames: true,
    }
  }
}

impl ReconcileOptions {
  /// The wildcard department to match rules against, if enabled.
  pub fn wildcard(&self) -> Option<&str> {
    self
      .wildcard_department
      .as_deref()
      .map(str::trim)
      .filter(|w| !w.is_empty())
  }
}

// ─── Report ──────────────────────────────────────────────────────────────────

/// Counters describing one reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
  /// Directory entries handed to the reconciler, duplicates included.
  pub fetched:           usize,
  pub created:           usize,
  pub updated:           usize,
  /// Entries without a usable principal name.
  pub skipped:           usize,
  /// Rule matches for which enrolment went ahead.
  pub enrolled:          usize,
  /// Rule matches dropped because manual enrolment is disabled.
  pub enrol_unavailable: usize,
}

/// What happened to a single directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
  Created { user_id: i64, enrolled: usize, unavailable: usize },
  Updated { user_id: i64 },
  Skipped,
}

// ─── Attribute mapping ───────────────────────────────────────────────────────

/// Build the attribute set written for `user`.
///
/// Missing directory fields become [`PLACEHOLDER`]. The account is always
/// confirmed and never deleted.
pub fn build_attributes(user: &DirectoryUser, options: &ReconcileOptions) -> UserAttributes {
  UserAttributes {
    firstname:   user.given_name_or_placeholder().to_owned(),
    lastname:    user.surname_or_placeholder().to_owned(),
    email:       user.mail_or_placeholder().to_owned(),
    department:  user.department_or_placeholder().to_owned(),
    lang:        options.lang.clone(),
    institution: options.institution.clone(),
    auth:        options.auth.clone(),
    confirmed:   true,
    deleted:     false,
  }
}

// ─── Reconciler ──────────────────────────────────────────────────────────────

pub struct Reconciler<'s, S> {
  store:   &'s S,
  options: ReconcileOptions,
}

impl<'s, S: UserStore> Reconciler<'s, S> {
  pub fn new(store: &'s S, options: ReconcileOptions) -> Self { Self { store, options } }

  /// Reconcile a full directory listing, in order.
  #[instrument(skip_all, fields(entries = users.len()))]
  pub async fn reconcile(&self, users: &[DirectoryUser]) -> Result<SyncReport, S::Error> {
    let mut report = SyncReport { fetched: users.len(), ..Default::default() };

    for user in users {
      match self.reconcile_one(user).await? {
        Outcome::Created { enrolled, unavailable, .. } => {
          report.created += 1;
          report.enrolled += enrolled;
          report.enrol_unavailable += unavailable;
        }
        Outcome::Updated { .. } => report.updated += 1,
        Outcome::Skipped => report.skipped += 1,
      }
    }

    info!(
      fetched = report.fetched,
      created = report.created,
      updated = report.updated,
      skipped = report.skipped,
      enrolled = report.enrolled,
      "reconciliation finished"
    );
    Ok(report)
  }

  /// Upsert a single directory user.
  pub async fn reconcile_one(&self, user: &DirectoryUser) -> Result<Outcome, S::Error> {
    let Some(username) = user.username(self.options.lowercase_usernames) else {
      warn!(?user, "directory entry has no userPrincipalName, skipping");
      return Ok(Outcome::Skipped);
    };

    let attributes = build_attributes(user, &self.options);

    if let Some(existing) = self.store.find_user_by_username(&username).await? {
      if existing.is_deleted() {
        info!(%username, user_id = existing.id, "reviving soft-deleted user");
      }
      let updated = self.store.update_user(existing.id, attributes).await?;
      debug!(%username, user_id = updated.id, "updated user");
      return Ok(Outcome::Updated { user_id: updated.id });
    }

    let department = attributes.department.clone();
    let created = self
      .store
      .insert_user(NewUser { username: username.clone(), attributes })
      .await?;
    debug!(%username, user_id = created.id, "created user");

    let (enrolled, unavailable) = self.enrol_new_user(created.id, &department).await?;
    Ok(Outcome::Created { user_id: created.id, enrolled, unavailable })
  }

  async fn enrol_new_user(&self, user_id: i64, department: &str) -> Result<(usize, usize), S::Error> {
    let rules = self
      .store
      .active_rules_for_department(department, self.options.wildcard())
      .await?;

    let mut enrolled = 0;
    let mut unavailable = 0;
    for rule in rules {
      if check_enrol(self.store, rule.course_id, user_id, self.options.role_id).await? {
        enrolled += 1;
      } else {
        warn!(user_id, course_id = rule.course_id, "manual enrolment unavailable");
        unavailable += 1;
      }
    }
    Ok((enrolled, unavailable))
  }
}
