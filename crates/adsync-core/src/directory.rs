//! Directory users as returned by Microsoft Graph.
//!
//! A directory user is never persisted. It is fetched fresh on every run and
//! folded into the local user table by the [reconciler](crate::reconcile).

use serde::{Deserialize, Serialize};

/// Value written in place of any attribute the directory did not supply.
///
/// The host LMS expects non-null profile columns; a single space keeps
/// existing installations' data shape.
pub const PLACEHOLDER: &str = " ";

/// The subset of a Graph `user` resource that the synchroniser reads.
///
/// Every field is optional: Graph omits or nulls attributes that were never
/// set on the account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryUser {
  #[serde(default)]
  pub user_principal_name: Option<String>,
  #[serde(default)]
  pub given_name:          Option<String>,
  #[serde(default)]
  pub surname:             Option<String>,
  #[serde(default)]
  pub mail:                Option<String>,
  #[serde(default)]
  pub department:          Option<String>,
}

/// Graph `$select` list matching the fields of [`DirectoryUser`].
pub const SELECT_FIELDS: &str = "userPrincipalName,givenName,surname,mail,department";

impl DirectoryUser {
  /// The local username for this directory user, or `None` when the
  /// principal name is missing or blank.
  pub fn username(&self, lowercase: bool) -> Option<String> {
    let upn = self.user_principal_name.as_deref()?.trim();
    if upn.is_empty() {
      return None;
    }
    Some(if lowercase { upn.to_lowercase() } else { upn.to_owned() })
  }

  pub fn given_name_or_placeholder(&self) -> &str { or_placeholder(&self.given_name) }

  pub fn surname_or_placeholder(&self) -> &str { or_placeholder(&self.surname) }

  pub fn mail_or_placeholder(&self) -> &str { or_placeholder(&self.mail) }

  pub fn department_or_placeholder(&self) -> &str { or_placeholder(&self.department) }
}

fn or_placeholder(value: &Option<String>) -> &str {
  match value.as_deref() {
    Some(v) if !v.is_empty() => v,
    _ => PLACEHOLDER,
  }
}
