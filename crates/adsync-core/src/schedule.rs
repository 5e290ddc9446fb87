//! Cron-style task definition for the periodic sync.
//!
//! Five fields, evaluated in UTC at minute resolution. Each field accepts
//! `*`, a value, a range `a-b`, a step `*/n` or `a-b/n`, or a comma list of
//! those. As in cron, when both `day` and `dayofweek` are restricted a time
//! matches if either does.

use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Config ──────────────────────────────────────────────────────────────────

/// The raw task definition as it appears in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskScheduleConfig {
  pub minute:    String,
  pub hour:      String,
  pub day:       String,
  pub month:     String,
  pub dayofweek: String,
}

impl Default for TaskScheduleConfig {
  fn default() -> Self {
    Self {
      minute:    "0".into(),
      hour:      "*/6".into(),
      day:       "*".into(),
      month:     "*".into(),
      dayofweek: "*".into(),
    }
  }
}

// ─── Fields ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CronField {
  Any,
  Values(BTreeSet<u32>),
}

impl CronField {
  /// Parse one field whose legal values are `min..=max`.
  pub fn parse(field: &'static str, spec: &str, min: u32, max: u32) -> Result<Self> {
    let spec = spec.trim();
    if spec == "*" {
      return Ok(Self::Any);
    }

    let invalid = |reason: String| Error::InvalidSchedule { field, reason };
    let number = |s: &str| {
      s.parse::<u32>()
        .map_err(|_| invalid(format!("{s:?} is not a number")))
    };

    let mut values = BTreeSet::new();
    for part in spec.split(',') {
      let (range, step) = match part.split_once('/') {
        Some((r, s)) => (r, number(s)?),
        None => (part, 1),
      };
      if step == 0 {
        return Err(invalid("step must be positive".into()));
      }

      let (lo, hi) = if range == "*" {
        (min, max)
      } else if let Some((a, b)) = range.split_once('-') {
        (number(a)?, number(b)?)
      } else {
        let v = number(range)?;
        // `5/10` means "from 5 to the end, every 10".
        if step > 1 { (v, max) } else { (v, v) }
      };

      if lo < min || hi > max || lo > hi {
        return Err(invalid(format!("{part:?} is outside {min}-{max}")));
      }
      values.extend((lo..=hi).step_by(step as usize));
    }

    Ok(Self::Values(values))
  }

  pub fn matches(&self, value: u32) -> bool {
    match self {
      Self::Any => true,
      Self::Values(set) => set.contains(&value),
    }
  }

  pub fn is_any(&self) -> bool { matches!(self, Self::Any) }
}

// ─── Schedule ────────────────────────────────────────────────────────────────

/// A parsed, validated task definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSchedule {
  minute:    CronField,
  hour:      CronField,
  day:       CronField,
  month:     CronField,
  dayofweek: CronField,
}

impl TaskSchedule {
  pub fn from_config(config: &TaskScheduleConfig) -> Result<Self> {
    let mut dayofweek = CronField::parse("dayofweek", &config.dayofweek, 0, 7)?;
    // Both 0 and 7 mean Sunday.
    if let CronField::Values(set) = &mut dayofweek
      && set.remove(&7)
    {
      set.insert(0);
    }

    Ok(Self {
      minute: CronField::parse("minute", &config.minute, 0, 59)?,
      hour: CronField::parse("hour", &config.hour, 0, 23)?,
      day: CronField::parse("day", &config.day, 1, 31)?,
      month: CronField::parse("month", &config.month, 1, 12)?,
      dayofweek,
    })
  }

  /// Whether the task should run in the minute containing `at`.
  pub fn is_due(&self, at: DateTime<Utc>) -> bool {
    if !self.minute.matches(at.minute())
      || !self.hour.matches(at.hour())
      || !self.month.matches(at.month())
    {
      return false;
    }

    let day_ok = self.day.matches(at.day());
    let dow_ok = self.dayofweek.matches(at.weekday().num_days_from_sunday());
    if !self.day.is_any() && !self.dayofweek.is_any() {
      day_ok || dow_ok
    } else {
      day_ok && dow_ok
    }
  }
}
