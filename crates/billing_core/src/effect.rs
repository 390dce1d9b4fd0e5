#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    StartExport {
        job_id: crate::JobId,
        format: crate::ExportFormat,
    },
}
