use std::path::PathBuf;

use billing_core::ExportFormat;
use billing_logging::LogDestination;
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    #[default]
    Terminal,
    File,
    Both,
}

impl From<LogTarget> for LogDestination {
    fn from(target: LogTarget) -> Self {
        match target {
            LogTarget::Terminal => LogDestination::Terminal,
            LogTarget::File => LogDestination::File,
            LogTarget::Both => LogDestination::Both,
        }
    }
}

/// Export every page of the D-Tools Cloud billing table to CSV and/or Excel.
#[derive(Debug, Clone, Parser)]
#[command(name = "billing_export", version, about)]
pub struct Cli {
    /// RON config file. Defaults to ./billing_export.ron when present.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// WebDriver server URL.
    #[arg(long, value_name = "URL")]
    pub webdriver: Option<String>,

    /// Attach to an existing WebDriver session instead of starting one.
    #[arg(long, value_name = "ID")]
    pub session: Option<String>,

    /// Page to open before exporting.
    #[arg(long, value_name = "URL", conflicts_with = "no_navigate")]
    pub url: Option<String>,

    /// Export from whatever page the browser currently shows.
    #[arg(long)]
    pub no_navigate: bool,

    /// csv, xlsx or both.
    #[arg(long, short, value_name = "FORMAT")]
    pub format: Option<ExportFormat>,

    /// Directory for the exported files.
    #[arg(long, short, value_name = "DIR")]
    pub out: Option<PathBuf>,

    /// Start the browser without a window (new sessions only).
    #[arg(long)]
    pub headless: bool,

    /// Where log output goes.
    #[arg(long, value_enum)]
    pub log: Option<LogTarget>,

    /// Log at debug level.
    #[arg(long, short)]
    pub verbose: bool,

    /// Exit with status 2 when only part of the table was harvested.
    #[arg(long)]
    pub strict: bool,
}
