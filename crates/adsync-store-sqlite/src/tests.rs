//! Integration tests for `SqliteStore` against an in-memory database,
//! including the reconciler and `check_enrol` running on top of it.

use adsync_core::{
  course::{NewCourse, NewRule},
  directory::DirectoryUser,
  enrol::{MANUAL, check_enrol},
  reconcile::{Outcome, ReconcileOptions, Reconciler},
  store::UserStore,
  user::{NewUser, UserAttributes},
};

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn attrs(firstname: &str, department: &str) -> UserAttributes {
  UserAttributes {
    firstname:   firstname.into(),
    lastname:    "Liddell".into(),
    email:       "alice@example.com".into(),
    department:  department.into(),
    lang:        "en".into(),
    institution: " ".into(),
    auth:        "oauth2".into(),
    confirmed:   true,
    deleted:     false,
  }
}

fn directory_user(upn: &str, department: Option<&str>) -> DirectoryUser {
  DirectoryUser {
    user_principal_name: Some(upn.into()),
    given_name:          Some("Alice".into()),
    surname:             Some("Liddell".into()),
    mail:                Some(upn.to_lowercase()),
    department:          department.map(Into::into),
  }
}

async fn course(s: &SqliteStore, shortname: &str) -> i64 {
  s.add_course(NewCourse { shortname: shortname.into(), fullname: format!("{shortname} course") })
    .await
    .unwrap()
    .id
}

async fn rule(s: &SqliteStore, department: &str, course_id: i64) -> i64 {
  s.add_rule(NewRule { department: department.into(), course_id })
    .await
    .unwrap()
    .id
}

// ─── Users ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn insert_and_find_user() {
  let s = store().await;

  let user = s
    .insert_user(NewUser { username: "alice@example.com".into(), attributes: attrs("Alice", "Sales") })
    .await
    .unwrap();

  let found = s.find_user_by_username("alice@example.com").await.unwrap().unwrap();
  assert_eq!(found.id, user.id);
  assert_eq!(found.attributes, attrs("Alice", "Sales"));

  let by_id = s.get_user(user.id).await.unwrap().unwrap();
  assert_eq!(by_id.username, "alice@example.com");
}

#[tokio::test]
async fn find_missing_user_returns_none() {
  let s = store().await;
  assert!(s.find_user_by_username("nobody").await.unwrap().is_none());
  assert!(s.get_user(42).await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_username_is_rejected() {
  let s = store().await;
  let input = NewUser { username: "alice".into(), attributes: attrs("Alice", "Sales") };
  s.insert_user(input.clone()).await.unwrap();
  assert!(s.insert_user(input).await.is_err());
}

#[tokio::test]
async fn update_user_overwrites_attributes() {
  let s = store().await;
  let user = s
    .insert_user(NewUser { username: "alice".into(), attributes: attrs("Alice", "Sales") })
    .await
    .unwrap();

  let updated = s.update_user(user.id, attrs("Alicia", "Support")).await.unwrap();
  assert_eq!(updated.attributes.firstname, "Alicia");
  assert_eq!(updated.attributes.department, "Support");
  assert_eq!(updated.created_at, user.created_at);
  assert!(updated.modified_at >= user.modified_at);
}

#[tokio::test]
async fn update_missing_user_is_not_found() {
  let s = store().await;
  let err = s.update_user(99, attrs("x", "y")).await.unwrap_err();
  assert!(matches!(err, crate::Error::Core(adsync_core::Error::UserNotFound(99))));
}

#[tokio::test]
async fn soft_delete_hides_from_default_listing() {
  let s = store().await;
  let a = s
    .insert_user(NewUser { username: "a".into(), attributes: attrs("A", "Sales") })
    .await
    .unwrap();
  s.insert_user(NewUser { username: "b".into(), attributes: attrs("B", "Sales") })
    .await
    .unwrap();

  s.soft_delete_user(a.id).await.unwrap();

  assert_eq!(s.list_users(false).await.unwrap().len(), 1);
  let all = s.list_users(true).await.unwrap();
  assert_eq!(all.len(), 2);
  assert!(all[0].is_deleted());
}

// ─── Rules ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn active_rules_match_department_and_wildcard() {
  let s = store().await;
  let c1 = course(&s, "SALES101").await;
  let c2 = course(&s, "ONBOARD").await;
  let c3 = course(&s, "ENG101").await;
  rule(&s, "Sales", c1).await;
  rule(&s, "all", c2).await;
  rule(&s, "Engineering", c3).await;

  let with_wildcard = s.active_rules_for_department("Sales", Some("all")).await.unwrap();
  let courses: Vec<i64> = with_wildcard.iter().map(|r| r.course_id).collect();
  assert_eq!(courses, vec![c1, c2]);

  let without = s.active_rules_for_department("Sales", None).await.unwrap();
  assert_eq!(without.len(), 1);
  assert_eq!(without[0].course_id, c1);
}

#[tokio::test]
async fn deleted_rules_are_inactive() {
  let s = store().await;
  let c = course(&s, "SALES101").await;
  let id = rule(&s, "Sales", c).await;

  s.delete_rule(id).await.unwrap();

  assert!(s.active_rules_for_department("Sales", None).await.unwrap().is_empty());
  let all = s.list_rules().await.unwrap();
  assert_eq!(all.len(), 1);
  assert!(all[0].is_deleted);
}

// ─── check_enrol ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn check_enrol_provisions_instance_and_enrols() {
  let s = store().await;
  let c = course(&s, "SALES101").await;
  let u = s
    .insert_user(NewUser { username: "a".into(), attributes: attrs("A", "Sales") })
    .await
    .unwrap();

  assert!(s.find_enrol_instance(c, MANUAL).await.unwrap().is_none());
  assert!(check_enrol(&s, c, u.id, 5).await.unwrap());

  assert!(s.find_enrol_instance(c, MANUAL).await.unwrap().is_some());
  assert!(s.is_enrolled(c, u.id).await.unwrap());
  let enrolments = s.list_enrollments(Some(c)).await.unwrap();
  assert_eq!(enrolments.len(), 1);
  assert_eq!(enrolments[0].role_id, 5);
}

#[tokio::test]
async fn check_enrol_is_idempotent() {
  let s = store().await;
  let c = course(&s, "SALES101").await;
  let u = s
    .insert_user(NewUser { username: "a".into(), attributes: attrs("A", "Sales") })
    .await
    .unwrap();

  assert!(check_enrol(&s, c, u.id, 5).await.unwrap());
  assert!(check_enrol(&s, c, u.id, 5).await.unwrap());

  assert_eq!(s.list_enrollments(Some(c)).await.unwrap().len(), 1);
}

#[tokio::test]
async fn check_enrol_returns_false_when_manual_disabled() {
  let s = store().await;
  let c = course(&s, "SALES101").await;
  let u = s
    .insert_user(NewUser { username: "a".into(), attributes: attrs("A", "Sales") })
    .await
    .unwrap();
  s.set_enrol_plugin_enabled(MANUAL, false).await.unwrap();

  assert!(!check_enrol(&s, c, u.id, 5).await.unwrap());
  assert!(!s.is_enrolled(c, u.id).await.unwrap());
}

#[tokio::test]
async fn check_enrol_missing_course_is_an_error() {
  let s = store().await;
  let u = s
    .insert_user(NewUser { username: "a".into(), attributes: attrs("A", "Sales") })
    .await
    .unwrap();

  let err = check_enrol(&s, 404, u.id, 5).await.unwrap_err();
  assert!(err.is_course_not_found());
}

// ─── Reconciler ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn reconcile_creates_then_updates_without_duplicates() {
  let s = store().await;
  let reconciler = Reconciler::new(&s, ReconcileOptions::default());
  let users = vec![directory_user("Alice@Example.com", Some("Sales"))];

  let first = reconciler.reconcile(&users).await.unwrap();
  assert_eq!(first.created, 1);
  assert_eq!(first.updated, 0);

  let second = reconciler.reconcile(&users).await.unwrap();
  assert_eq!(second.created, 0);
  assert_eq!(second.updated, 1);

  let all = s.list_users(true).await.unwrap();
  assert_eq!(all.len(), 1);
  assert_eq!(all[0].username, "alice@example.com");
}

#[tokio::test]
async fn reconcile_handles_duplicate_entries_in_one_listing() {
  let s = store().await;
  let reconciler = Reconciler::new(&s, ReconcileOptions::default());
  let users = vec![
    directory_user("alice@example.com", Some("Sales")),
    directory_user("ALICE@example.com", Some("Sales")),
  ];

  let report = reconciler.reconcile(&users).await.unwrap();
  assert_eq!(report.fetched, 2);
  assert_eq!(report.created, 1);
  assert_eq!(report.updated, 1);
  assert_eq!(s.list_users(true).await.unwrap().len(), 1);
}

#[tokio::test]
async fn new_users_are_enrolled_by_department_and_wildcard() {
  let s = store().await;
  let sales = course(&s, "SALES101").await;
  let onboarding = course(&s, "ONBOARD").await;
  let eng = course(&s, "ENG101").await;
  rule(&s, "Sales", sales).await;
  rule(&s, "all", onboarding).await;
  rule(&s, "Engineering", eng).await;

  let reconciler = Reconciler::new(&s, ReconcileOptions::default());
  let outcome = reconciler
    .reconcile_one(&directory_user("alice@example.com", Some("Sales")))
    .await
    .unwrap();

  let Outcome::Created { user_id, enrolled, unavailable } = outcome else {
    panic!("expected a created user, got {outcome:?}");
  };
  assert_eq!(enrolled, 2);
  assert_eq!(unavailable, 0);
  assert!(s.is_enrolled(sales, user_id).await.unwrap());
  assert!(s.is_enrolled(onboarding, user_id).await.unwrap());
  assert!(!s.is_enrolled(eng, user_id).await.unwrap());
}

#[tokio::test]
async fn new_user_without_matching_rule_is_not_enrolled() {
  let s = store().await;
  let eng = course(&s, "ENG101").await;
  rule(&s, "Engineering", eng).await;

  let options = ReconcileOptions { wildcard_department: None, ..Default::default() };
  let reconciler = Reconciler::new(&s, options);
  let report = reconciler
    .reconcile(&[directory_user("bob@example.com", None)])
    .await
    .unwrap();

  assert_eq!(report.created, 1);
  assert_eq!(report.enrolled, 0);
  assert!(s.list_enrollments(None).await.unwrap().is_empty());

  let bob = s.find_user_by_username("bob@example.com").await.unwrap().unwrap();
  assert_eq!(bob.attributes.department, " ");
}

#[tokio::test]
async fn blank_wildcard_skips_all_rules() {
  let s = store().await;
  let onboarding = course(&s, "ONBOARD").await;
  rule(&s, "all", onboarding).await;

  let options = ReconcileOptions { wildcard_department: Some(String::new()), ..Default::default() };
  let report = Reconciler::new(&s, options)
    .reconcile(&[directory_user("carol@example.com", Some("Sales"))])
    .await
    .unwrap();

  assert_eq!(report.created, 1);
  assert_eq!(report.enrolled, 0);
  assert!(s.list_enrollments(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn existing_users_are_not_enrolled() {
  let s = store().await;
  let sales = course(&s, "SALES101").await;
  let existing = s
    .insert_user(NewUser { username: "alice@example.com".into(), attributes: attrs("A", "Sales") })
    .await
    .unwrap();
  rule(&s, "Sales", sales).await;

  let reconciler = Reconciler::new(&s, ReconcileOptions::default());
  let report = reconciler
    .reconcile(&[directory_user("alice@example.com", Some("Sales"))])
    .await
    .unwrap();

  assert_eq!(report.updated, 1);
  assert_eq!(report.enrolled, 0);
  assert!(!s.is_enrolled(sales, existing.id).await.unwrap());
}

#[tokio::test]
async fn soft_deleted_user_is_revived_and_refreshed() {
  let s = store().await;
  let sales = course(&s, "SALES101").await;
  rule(&s, "Support", sales).await;

  let existing = s
    .insert_user(NewUser { username: "alice@example.com".into(), attributes: attrs("Old", "Sales") })
    .await
    .unwrap();
  s.soft_delete_user(existing.id).await.unwrap();

  let reconciler = Reconciler::new(&s, ReconcileOptions::default());
  let outcome = reconciler
    .reconcile_one(&directory_user("alice@example.com", Some("Support")))
    .await
    .unwrap();
  assert_eq!(outcome, Outcome::Updated { user_id: existing.id });

  let revived = s.get_user(existing.id).await.unwrap().unwrap();
  assert!(!revived.is_deleted());
  assert_eq!(revived.attributes.firstname, "Alice");
  assert_eq!(revived.attributes.department, "Support");
  assert!(s.list_enrollments(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn entries_without_principal_name_are_skipped() {
  let s = store().await;
  let reconciler = Reconciler::new(&s, ReconcileOptions::default());
  let report = reconciler
    .reconcile(&[DirectoryUser { given_name: Some("Nameless".into()), ..Default::default() }])
    .await
    .unwrap();

  assert_eq!(report.skipped, 1);
  assert!(s.list_users(true).await.unwrap().is_empty());
}

#[tokio::test]
async fn manual_disabled_counts_unavailable_enrolments() {
  let s = store().await;
  let sales = course(&s, "SALES101").await;
  rule(&s, "Sales", sales).await;
  s.set_enrol_plugin_enabled(MANUAL, false).await.unwrap();

  let reconciler = Reconciler::new(&s, ReconcileOptions::default());
  let report = reconciler
    .reconcile(&[directory_user("alice@example.com", Some("Sales"))])
    .await
    .unwrap();

  assert_eq!(report.created, 1);
  assert_eq!(report.enrolled, 0);
  assert_eq!(report.enrol_unavailable, 1);
}

#[tokio::test]
async fn rule_for_missing_course_aborts_the_run() {
  let s = store().await;
  rule(&s, "Sales", 404).await;

  let reconciler = Reconciler::new(&s, ReconcileOptions::default());
  let users = vec![
    directory_user("first@example.com", Some("Support")),
    directory_user("second@example.com", Some("Sales")),
    directory_user("third@example.com", Some("Support")),
  ];

  let err = reconciler.reconcile(&users).await.unwrap_err();
  assert!(err.is_course_not_found());

  // Earlier work stays committed; later users are never reached.
  assert!(s.find_user_by_username("first@example.com").await.unwrap().is_some());
  assert!(s.find_user_by_username("second@example.com").await.unwrap().is_some());
  assert!(s.find_user_by_username("third@example.com").await.unwrap().is_none());
}
