use billing_core::{CompletedExport, Effect, ExportResultKind, JobId, Msg};
use billing_engine::{
    EngineConfig, EngineEvent, EngineHandle, ExportFailure, ExportOutcome, HarvestStatus,
};
use billing_logging::{billing_info, billing_warn};

pub struct EffectRunner {
    engine: EngineHandle,
}

impl EffectRunner {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            engine: EngineHandle::new(config),
        }
    }

    pub fn from_engine(engine: EngineHandle) -> Self {
        Self { engine }
    }

    pub fn run(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::StartExport { job_id, format } => {
                    billing_info!("StartExport job_id={} format={}", job_id, format);
                    self.engine.export(job_id, format);
                }
            }
        }
    }

    /// Waits for the next engine event. `None` means the engine stopped.
    pub fn next_msg(&self) -> Option<Msg> {
        self.engine.recv().map(map_event)
    }

    pub fn shutdown(self) {
        self.engine.shutdown();
    }
}

pub fn map_event(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::Progress(progress) => Msg::HarvestProgress {
            job_id: progress.job_id,
            page: progress.page,
            total_pages: progress.total_pages,
            rows: progress.rows,
        },
        EngineEvent::ExportCompleted { job_id, result } => {
            Msg::ExportDone(completed_export(job_id, result))
        }
    }
}

pub fn completed_export(
    job_id: JobId,
    result: Result<ExportOutcome, ExportFailure>,
) -> CompletedExport {
    match result {
        Ok(outcome) => {
            let result = match outcome.status {
                HarvestStatus::Complete => ExportResultKind::Complete,
                HarvestStatus::Partial(reason) => ExportResultKind::Partial {
                    reason: reason.to_string(),
                },
            };
            CompletedExport {
                job_id,
                result,
                rows: outcome.rows,
                records: outcome.records,
                files: outcome
                    .files
                    .iter()
                    .map(|path| path.display().to_string())
                    .collect(),
            }
        }
        Err(failure) => {
            billing_warn!("Job {} failed: {}", job_id, failure);
            CompletedExport {
                job_id,
                result: ExportResultKind::Failed {
                    message: failure.to_string(),
                },
                rows: 0,
                records: 0,
                files: Vec::new(),
            }
        }
    }
}
