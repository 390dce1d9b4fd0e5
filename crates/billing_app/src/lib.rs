//! Command-line front end for the billing table export.

mod app;
mod cli;
mod config;
mod effects;

pub use app::{exit_status, run, run_export, PARTIAL_EXIT};
pub use cli::{Cli, LogTarget};
pub use config::{load_config, AppConfig, PollSettings, DEFAULT_CONFIG_FILE, DEFAULT_PAGE_URL};
pub use effects::{completed_export, map_event, EffectRunner};
