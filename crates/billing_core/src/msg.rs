#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User triggered an export in the given format.
    ExportRequested(crate::ExportFormat),
    /// Engine finished harvesting one page of the running export.
    HarvestProgress {
        job_id: crate::JobId,
        page: u32,
        total_pages: u32,
        rows: usize,
    },
    /// Engine finished the export, successfully or not.
    ExportDone(crate::CompletedExport),
}
