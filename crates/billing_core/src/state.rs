use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::view_model::{AppViewModel, ProgressView};

pub type JobId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Xlsx,
    Both,
}

impl ExportFormat {
    pub fn includes_csv(self) -> bool {
        matches!(self, ExportFormat::Csv | ExportFormat::Both)
    }

    pub fn includes_xlsx(self) -> bool {
        matches!(self, ExportFormat::Xlsx | ExportFormat::Both)
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Csv => write!(f, "csv"),
            ExportFormat::Xlsx => write!(f, "xlsx"),
            ExportFormat::Both => write!(f, "both"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown export format {0:?} (expected csv, xlsx or both)")]
pub struct ParseFormatError(String);

impl FromStr for ExportFormat {
    type Err = ParseFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "xlsx" | "excel" => Ok(ExportFormat::Xlsx),
            "both" => Ok(ExportFormat::Both),
            _ => Err(ParseFormatError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportResultKind {
    Complete,
    /// Harvest stopped early; the files hold the pages gathered so far.
    Partial { reason: String },
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedExport {
    pub job_id: JobId,
    pub result: ExportResultKind,
    pub rows: usize,
    pub records: usize,
    pub files: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningExport {
    pub job_id: JobId,
    pub format: ExportFormat,
    pub pages_done: u32,
    pub total_pages: Option<u32>,
    pub rows: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ExportState {
    #[default]
    Idle,
    Running(RunningExport),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    export: ExportState,
    next_job_id: JobId,
    last_export: Option<CompletedExport>,
    completed_count: usize,
    dirty: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            export: ExportState::Idle,
            next_job_id: 1,
            last_export: None,
            completed_count: 0,
            dirty: false,
        }
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn export(&self) -> &ExportState {
        &self.export
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.export, ExportState::Running(_))
    }

    pub fn view(&self) -> AppViewModel {
        let progress = match &self.export {
            ExportState::Idle => None,
            ExportState::Running(running) => Some(ProgressView {
                job_id: running.job_id,
                format: running.format,
                pages_done: running.pages_done,
                total_pages: running.total_pages,
                rows: running.rows,
            }),
        };
        AppViewModel {
            busy: self.is_busy(),
            trigger_enabled: !self.is_busy(),
            progress,
            last_export: self.last_export.clone(),
            completed_count: self.completed_count,
            dirty: self.dirty,
        }
    }

    /// Returns whether a render is pending and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn start_export(&mut self, format: ExportFormat) -> JobId {
        let job_id = self.next_job_id;
        self.next_job_id += 1;
        self.export = ExportState::Running(RunningExport {
            job_id,
            format,
            pages_done: 0,
            total_pages: None,
            rows: 0,
        });
        self.dirty = true;
        job_id
    }

    pub(crate) fn apply_progress(&mut self, job_id: JobId, page: u32, total_pages: u32, rows: usize) {
        if let ExportState::Running(running) = &mut self.export {
            if running.job_id == job_id {
                running.pages_done = page;
                running.total_pages = Some(total_pages);
                running.rows = rows;
                self.dirty = true;
            }
        }
    }

    pub(crate) fn apply_done(&mut self, completed: CompletedExport) {
        let matches_running = matches!(
            &self.export,
            ExportState::Running(running) if running.job_id == completed.job_id
        );
        if !matches_running {
            return;
        }
        self.export = ExportState::Idle;
        self.last_export = Some(completed);
        self.completed_count += 1;
        self.dirty = true;
    }
}
