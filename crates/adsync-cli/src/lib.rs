//! The adsync scheduled task: settings, a single sync run, and the
//! minute-resolution scheduler loop that drives it.

pub mod settings;
pub mod task;

pub use settings::Settings;
pub use task::{run_scheduled, run_scheduled_until, run_sync};
