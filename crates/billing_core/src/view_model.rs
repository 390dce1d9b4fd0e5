use crate::{CompletedExport, ExportFormat, JobId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressView {
    pub job_id: JobId,
    pub format: ExportFormat,
    pub pages_done: u32,
    pub total_pages: Option<u32>,
    pub rows: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub busy: bool,
    /// False while an export is in flight; a second request would race on the
    /// same pagination controls.
    pub trigger_enabled: bool,
    pub progress: Option<ProgressView>,
    pub last_export: Option<CompletedExport>,
    pub completed_count: usize,
    pub dirty: bool,
}
