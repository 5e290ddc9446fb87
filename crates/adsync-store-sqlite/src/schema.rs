//! SQL schema for the adsync SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    username    TEXT    NOT NULL UNIQUE,
    firstname   TEXT    NOT NULL,
    lastname    TEXT    NOT NULL,
    email       TEXT    NOT NULL,
    department  TEXT    NOT NULL,
    lang        TEXT    NOT NULL,
    institution TEXT    NOT NULL,
    auth        TEXT    NOT NULL,
    confirmed   INTEGER NOT NULL DEFAULT 0,
    deleted     INTEGER NOT NULL DEFAULT 0,   -- soft delete; rows are never removed
    created_at  TEXT    NOT NULL,             -- RFC 3339 UTC
    modified_at TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS courses (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    shortname  TEXT    NOT NULL UNIQUE,
    fullname   TEXT    NOT NULL,
    created_at TEXT    NOT NULL
);

-- No foreign key on course_id: rules are maintained by hand and may point
-- at a course that no longer exists.
CREATE TABLE IF NOT EXISTS enrollment_rules (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    department TEXT    NOT NULL,
    course_id  INTEGER NOT NULL,
    is_new     INTEGER NOT NULL DEFAULT 1,
    is_deleted INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS enrol_plugins (
    method  TEXT    PRIMARY KEY,
    enabled INTEGER NOT NULL
);

INSERT OR IGNORE INTO enrol_plugins (method, enabled) VALUES ('manual', 1);

CREATE TABLE IF NOT EXISTS enrol_instances (
    id        INTEGER PRIMARY KEY AUTOINCREMENT,
    course_id INTEGER NOT NULL REFERENCES courses(id),
    method    TEXT    NOT NULL,
    UNIQUE (course_id, method)
);

CREATE TABLE IF NOT EXISTS enrolments (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    instance_id INTEGER NOT NULL REFERENCES enrol_instances(id),
    user_id     INTEGER NOT NULL REFERENCES users(id),
    role_id     INTEGER NOT NULL,
    created_at  TEXT    NOT NULL,
    UNIQUE (instance_id, user_id)
);

CREATE INDEX IF NOT EXISTS rules_department_idx ON enrollment_rules(department);
CREATE INDEX IF NOT EXISTS enrolments_user_idx  ON enrolments(user_id);

PRAGMA user_version = 1;
";
