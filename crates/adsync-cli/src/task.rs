//! One synchronisation run, and the scheduler loop around it.

use std::time::Duration;

use adsync_core::{
  reconcile::{ReconcileOptions, Reconciler, SyncReport},
  schedule::TaskSchedule,
  store::UserStore,
};
use adsync_graph::{AzureConfig, DirectoryFetcher};
use anyhow::Context as _;
use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use tracing::{Instrument as _, error, info, info_span};
use uuid::Uuid;

/// Fetch the whole directory and reconcile it into `store`.
///
/// Any failure aborts the run. Users reconciled before the failure stay
/// committed.
pub async fn run_sync<S: UserStore>(
  azure:   &AzureConfig,
  options: &ReconcileOptions,
  store:   &S,
) -> anyhow::Result<SyncReport> {
  let run_id = Uuid::new_v4();

  async move {
    info!("sync started");
    let fetcher = DirectoryFetcher::new(azure).context("failed to build Graph client")?;
    let users = fetcher
      .fetch_all()
      .await
      .context("failed to fetch directory users")?;

    let report = Reconciler::new(store, options.clone())
      .reconcile(&users)
      .await
      .context("failed to reconcile directory users")?;

    info!(
      fetched = report.fetched,
      created = report.created,
      updated = report.updated,
      skipped = report.skipped,
      enrolled = report.enrolled,
      enrol_unavailable = report.enrol_unavailable,
      "sync finished"
    );
    Ok::<_, anyhow::Error>(report)
  }
  .instrument(info_span!("sync", %run_id))
  .await
}

/// Run [`run_sync`] whenever `schedule` is due, until ctrl-c.
pub async fn run_scheduled<S: UserStore>(
  azure:    &AzureConfig,
  options:  &ReconcileOptions,
  schedule: &TaskSchedule,
  store:    &S,
) -> anyhow::Result<()> {
  let ctrl_c = async {
    match tokio::signal::ctrl_c().await {
      Ok(()) => info!("received ctrl-c"),
      Err(e) => {
        error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await
      }
    }
  };
  run_scheduled_until(azure, options, schedule, store, ctrl_c).await
}

/// Run [`run_sync`] whenever `schedule` is due, until `shutdown` completes.
///
/// Runs are sequential, so a slow run delays the next check instead of
/// overlapping with it. A failed run is logged and retried at the next due
/// minute. `shutdown` is observed during a run as well as between runs; a run
/// cut short this way stops at its current await point.
pub async fn run_scheduled_until<S: UserStore>(
  azure:    &AzureConfig,
  options:  &ReconcileOptions,
  schedule: &TaskSchedule,
  store:    &S,
  shutdown: impl Future<Output = ()>,
) -> anyhow::Result<()> {
  tokio::pin!(shutdown);
  let mut last_run: Option<DateTime<Utc>> = None;
  info!("scheduler started");

  loop {
    if let Some(minute) = due_minute(schedule, Utc::now(), last_run) {
      last_run = Some(minute);
      tokio::select! {
        result = run_sync(azure, options, store) => {
          if let Err(e) = result {
            error!(error = ?e, "sync run failed");
          }
        }
        _ = &mut shutdown => {
          info!("stopping scheduler during a sync run");
          return Ok(());
        }
      }
    }

    tokio::select! {
      _ = tokio::time::sleep(until_next_minute(Utc::now())) => {}
      _ = &mut shutdown => {
        info!("stopping scheduler");
        return Ok(());
      }
    }
  }
}

/// The minute to run in, if `schedule` is due at `now` and that minute has
/// not already had a run.
pub(crate) fn due_minute(
  schedule: &TaskSchedule,
  now:      DateTime<Utc>,
  last_run: Option<DateTime<Utc>>,
) -> Option<DateTime<Utc>> {
  let minute = current_minute(now);
  (schedule.is_due(minute) && last_run != Some(minute)).then_some(minute)
}

fn current_minute(now: DateTime<Utc>) -> DateTime<Utc> {
  now.duration_trunc(TimeDelta::minutes(1)).unwrap_or(now)
}

pub(crate) fn until_next_minute(now: DateTime<Utc>) -> Duration {
  let next = current_minute(now) + TimeDelta::minutes(1);
  (next - now).to_std().unwrap_or(Duration::from_secs(1))
}
