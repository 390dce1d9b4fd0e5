use std::fmt;
use std::path::PathBuf;

use billing_core::{JobId, Row};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestProgress {
    pub job_id: JobId,
    pub page: u32,
    pub total_pages: u32,
    pub rows: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Progress(HarvestProgress),
    ExportCompleted {
        job_id: JobId,
        result: Result<ExportOutcome, ExportFailure>,
    },
}

/// Why a harvest stopped before the last page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartialReason {
    NextControlMissing { at_page: u32 },
    NextControlDisabled { at_page: u32 },
    NavigationFailed { at_page: u32, message: String },
    TransitionTimedOut { expected_page: u32, attempts: u32 },
    ReadFailed { page: u32, message: String },
}

impl fmt::Display for PartialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartialReason::NextControlMissing { at_page } => {
                write!(f, "next page control missing at page {at_page}")
            }
            PartialReason::NextControlDisabled { at_page } => {
                write!(f, "next page control disabled at page {at_page}")
            }
            PartialReason::NavigationFailed { at_page, message } => {
                write!(f, "navigation from page {at_page} failed: {message}")
            }
            PartialReason::TransitionTimedOut {
                expected_page,
                attempts,
            } => write!(
                f,
                "page {expected_page} did not become active after {attempts} checks"
            ),
            PartialReason::ReadFailed { page, message } => {
                write!(f, "reading page {page} failed: {message}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HarvestStatus {
    Complete,
    Partial(PartialReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestReport {
    /// Rows in page order, each page in rendered order.
    pub rows: Vec<Row>,
    pub status: HarvestStatus,
    pub total_pages: u32,
    pub pages_harvested: u32,
    /// False when navigation happened and the table could not be confirmed back on page 1.
    pub restored_to_first: bool,
}

impl HarvestReport {
    pub fn is_complete(&self) -> bool {
        self.status == HarvestStatus::Complete
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOutcome {
    pub rows: usize,
    pub records: usize,
    pub files: Vec<PathBuf>,
    pub status: HarvestStatus,
    pub total_pages: u32,
    pub pages_harvested: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl ExportFailure {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ExportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Session,
    InvalidSelector,
    TableNotFound,
    Harvest,
    Export,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Session => write!(f, "webdriver session error"),
            FailureKind::InvalidSelector => write!(f, "invalid selector"),
            FailureKind::TableNotFound => write!(f, "table not found"),
            FailureKind::Harvest => write!(f, "harvest failed"),
            FailureKind::Export => write!(f, "export failed"),
        }
    }
}
