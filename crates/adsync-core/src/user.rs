//! Local user accounts in the host LMS.
//!
//! A local user is created the first time a principal name is seen and is
//! mutated in place afterwards. The synchroniser never deletes one; the
//! `deleted` flag is a soft delete that a later sync clears again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Profile attributes written on both insert and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAttributes {
  pub firstname:   String,
  pub lastname:    String,
  pub email:       String,
  pub department:  String,
  pub lang:        String,
  pub institution: String,
  /// Name of the authentication plugin the account logs in through.
  pub auth:        String,
  pub confirmed:   bool,
  pub deleted:     bool,
}

/// Input to [`UserStore::insert_user`](crate::store::UserStore::insert_user).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
  pub username:   String,
  pub attributes: UserAttributes,
}

/// A persisted local user row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalUser {
  pub id:          i64,
  /// Unique across the table.
  pub username:    String,
  pub attributes:  UserAttributes,
  pub created_at:  DateTime<Utc>,
  pub modified_at: DateTime<Utc>,
}

impl LocalUser {
  pub fn is_deleted(&self) -> bool { self.attributes.deleted }
}
