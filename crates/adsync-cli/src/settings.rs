//! Runtime configuration, read from an optional TOML file overlaid with
//! `ADSYNC_*` environment variables.
//!
//! Nested keys use a double underscore, e.g. `ADSYNC_AZURE__CLIENT_SECRET`.

use std::path::{Path, PathBuf};

use adsync_core::{
  reconcile::ReconcileOptions,
  schedule::{TaskSchedule, TaskScheduleConfig},
};
use adsync_graph::AzureConfig;
use anyhow::{Context as _, anyhow};
use serde::Deserialize;

#[derive(Deserialize, Clone, Debug)]
pub struct Settings {
  #[serde(default = "default_store_path")]
  pub store_path: PathBuf,
  /// Required by `sync` and `run`; the admin commands work without it.
  #[serde(default)]
  pub azure:      Option<AzureConfig>,
  #[serde(default)]
  pub sync:       ReconcileOptions,
  #[serde(default)]
  pub schedule:   TaskScheduleConfig,
}

fn default_store_path() -> PathBuf { PathBuf::from("adsync.db") }

impl Settings {
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("ADSYNC")
          .prefix_separator("_")
          .separator("__")
          .try_parsing(true),
      )
      .build()
      .context("failed to read config file")?;

    settings
      .try_deserialize()
      .context("failed to deserialise Settings")
  }

  pub fn azure(&self) -> anyhow::Result<&AzureConfig> {
    self
      .azure
      .as_ref()
      .ok_or_else(|| anyhow!("missing [azure] section in configuration"))
  }

  pub fn task_schedule(&self) -> anyhow::Result<TaskSchedule> {
    TaskSchedule::from_config(&self.schedule).context("invalid [schedule] section")
  }

  /// `store_path` with a leading `~` expanded.
  pub fn resolved_store_path(&self) -> PathBuf { expand_tilde(&self.store_path) }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
