//! adsync binary.
//!
//! Reads `adsync.toml` (or the path given with `--config`), opens the SQLite
//! user store, and either runs a sync, runs the scheduler, or manages the
//! courses and enrollment rules the sync enrols new users into.
//!
//! ```
//! adsync sync
//! adsync run
//! adsync rule add Sales 12
//! ```

use std::path::PathBuf;

use adsync_cli::{Settings, run_scheduled, run_sync};
use adsync_core::{
  course::{NewCourse, NewRule},
  enrol::MANUAL,
  store::UserStore,
};
use adsync_store_sqlite::SqliteStore;
use anyhow::Context as _;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Azure AD to LMS user synchroniser")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "adsync.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Run one synchronisation and exit.
  Sync,
  /// Run the synchronisation on the configured schedule until interrupted.
  Run,
  /// Manage courses.
  #[command(subcommand)]
  Course(CourseCommand),
  /// Manage department → course enrollment rules.
  #[command(subcommand)]
  Rule(RuleCommand),
  /// Inspect and soft-delete local users.
  #[command(subcommand)]
  User(UserCommand),
  /// Enable or disable an enrolment method site-wide.
  EnrolPlugin {
    #[arg(value_enum)]
    action: Toggle,
    #[arg(default_value = MANUAL)]
    method: String,
  },
}

#[derive(Subcommand)]
enum CourseCommand {
  Add { shortname: String, fullname: String },
  List,
}

#[derive(Subcommand)]
enum RuleCommand {
  /// Enrol new users of `department` (or `all`) into `course_id`.
  Add { department: String, course_id: i64 },
  List,
  /// Mark a rule deleted.
  Delete { id: i64 },
}

#[derive(Subcommand)]
enum UserCommand {
  List {
    /// Include soft-deleted users.
    #[arg(long)]
    all: bool,
  },
  /// List enrolments, optionally for one course.
  Enrolments {
    #[arg(long)]
    course: Option<i64>,
  },
  /// Mark a user deleted. The next sync revives it if it is still in the
  /// directory.
  Delete { id: i64 },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum Toggle {
  Enable,
  Disable,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let settings = Settings::load(&cli.config)?;

  let store_path = settings.resolved_store_path();
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  match cli.command {
    Command::Sync => {
      let report = run_sync(settings.azure()?, &settings.sync, &store).await?;
      print_json(&report)?;
    }
    Command::Run => {
      let schedule = settings.task_schedule()?;
      run_scheduled(settings.azure()?, &settings.sync, &schedule, &store).await?;
    }
    Command::Course(CourseCommand::Add { shortname, fullname }) => {
      let course = store.add_course(NewCourse { shortname, fullname }).await?;
      print_json(&course)?;
    }
    Command::Course(CourseCommand::List) => print_json(&store.list_courses().await?)?,
    Command::Rule(RuleCommand::Add { department, course_id }) => {
      store
        .get_course(course_id)
        .await?
        .with_context(|| format!("no course with id {course_id}"))?;
      let rule = store.add_rule(NewRule { department, course_id }).await?;
      print_json(&rule)?;
    }
    Command::Rule(RuleCommand::List) => print_json(&store.list_rules().await?)?,
    Command::Rule(RuleCommand::Delete { id }) => store.delete_rule(id).await?,
    Command::User(UserCommand::List { all }) => print_json(&store.list_users(all).await?)?,
    Command::User(UserCommand::Enrolments { course }) => {
      print_json(&store.list_enrollments(course).await?)?
    }
    Command::User(UserCommand::Delete { id }) => store.soft_delete_user(id).await?,
    Command::EnrolPlugin { action, method } => {
      let enabled = matches!(action, Toggle::Enable);
      store.set_enrol_plugin_enabled(&method, enabled).await?;
      tracing::info!(%method, enabled, "enrolment method updated");
    }
  }

  Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}
