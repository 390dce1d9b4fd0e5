use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use billing_core::{records_from_rows, ExportFormat, JobId};
use billing_logging::{billing_error, billing_info, billing_warn};

use crate::dom::Selectors;
use crate::dom_pager::DomPager;
use crate::driver::{PageDriver, WebDriverSession, WebDriverSettings};
use crate::export::write_exports;
use crate::harvest::{ChannelProgressSink, Harvester};
use crate::types::{EngineEvent, ExportFailure, ExportOutcome, FailureKind};
use crate::wait::{Clock, PollPolicy, TokioClock};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionMode {
    /// Start a fresh browser session.
    #[default]
    New,
    /// Drive an existing session, e.g. one where the user is already logged in.
    Attach(String),
}

#[derive(Clone)]
pub struct EngineConfig {
    pub webdriver: WebDriverSettings,
    pub session: SessionMode,
    /// Page to open before the first export; `None` uses whatever is loaded.
    pub start_url: Option<String>,
    pub selectors: Selectors,
    pub transition_poll: PollPolicy,
    pub table_poll: PollPolicy,
    pub output_dir: PathBuf,
    /// Date stamp for export filenames.
    pub today: Arc<dyn Fn() -> String + Send + Sync>,
    pub clock: Arc<dyn Clock>,
}

impl EngineConfig {
    pub fn default_with_output(output_dir: PathBuf) -> Self {
        Self {
            webdriver: WebDriverSettings::default(),
            session: SessionMode::default(),
            start_url: None,
            selectors: Selectors::default(),
            transition_poll: PollPolicy::default(),
            table_poll: PollPolicy::table_ready(),
            output_dir,
            today: Arc::new(|| chrono::Utc::now().format("%Y-%m-%d").to_string()),
            clock: Arc::new(TokioClock),
        }
    }
}

enum EngineCommand {
    Export { job_id: JobId, format: ExportFormat },
    Shutdown,
}

/// Handle to the export worker. Jobs run one at a time, in submission order.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
    worker: Option<thread::JoinHandle<()>>,
}

impl EngineHandle {
    /// Connects to WebDriver lazily, on the first export.
    pub fn new(config: EngineConfig) -> Self {
        Self::spawn(config, None)
    }

    /// Uses `driver` instead of opening a WebDriver session.
    pub fn with_driver(config: EngineConfig, driver: Arc<dyn PageDriver>) -> Self {
        Self::spawn(
            config,
            Some(DriverSlot {
                driver,
                session: None,
            }),
        )
    }

    fn spawn(config: EngineConfig, slot: Option<DriverSlot>) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();

        let worker = thread::spawn(move || {
            let runtime = match tokio::runtime::Runtime::new() {
                Ok(runtime) => runtime,
                Err(err) => {
                    billing_error!("Failed to start engine runtime: {}", err);
                    return;
                }
            };
            let mut worker = Worker { config, slot };
            while let Ok(command) = cmd_rx.recv() {
                match command {
                    EngineCommand::Export { job_id, format } => {
                        let result = runtime.block_on(worker.export(job_id, format, &event_tx));
                        if let Err(failure) = &result {
                            billing_error!("Job {} failed: {}", job_id, failure);
                        }
                        let _ = event_tx.send(EngineEvent::ExportCompleted { job_id, result });
                    }
                    EngineCommand::Shutdown => break,
                }
            }
            runtime.block_on(worker.close());
        });

        Self {
            cmd_tx,
            event_rx,
            worker: Some(worker),
        }
    }

    pub fn export(&self, job_id: JobId, format: ExportFormat) {
        let _ = self.cmd_tx.send(EngineCommand::Export { job_id, format });
    }

    /// Blocks for the next event; `None` once the worker has gone away.
    pub fn recv(&self) -> Option<EngineEvent> {
        self.event_rx.recv().ok()
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }

    /// Stops the worker after the current job and closes a session it started.
    pub fn shutdown(mut self) {
        let _ = self.cmd_tx.send(EngineCommand::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

struct DriverSlot {
    driver: Arc<dyn PageDriver>,
    session: Option<Arc<WebDriverSession>>,
}

struct Worker {
    config: EngineConfig,
    slot: Option<DriverSlot>,
}

impl Worker {
    async fn driver(&mut self) -> Result<Arc<dyn PageDriver>, ExportFailure> {
        if let Some(slot) = &self.slot {
            return Ok(slot.driver.clone());
        }

        let session = match &self.config.session {
            SessionMode::New => WebDriverSession::start(&self.config.webdriver).await,
            SessionMode::Attach(id) => WebDriverSession::attach(&self.config.webdriver, id.clone()),
        }
        .map_err(|err| ExportFailure::new(FailureKind::Session, err.to_string()))?;

        if let Some(url) = &self.config.start_url {
            session
                .navigate(url)
                .await
                .map_err(|err| ExportFailure::new(FailureKind::Session, err.to_string()))?;
        }

        let session = Arc::new(session);
        let driver: Arc<dyn PageDriver> = session.clone();
        self.slot = Some(DriverSlot {
            driver: driver.clone(),
            session: Some(session),
        });
        Ok(driver)
    }

    async fn export(
        &mut self,
        job_id: JobId,
        format: ExportFormat,
        event_tx: &mpsc::Sender<EngineEvent>,
    ) -> Result<ExportOutcome, ExportFailure> {
        billing_info!("Job {} exporting {}", job_id, format);
        let driver = self.driver().await?;
        let mut pager = DomPager::new(driver, &self.config.selectors)
            .map_err(|err| ExportFailure::new(FailureKind::InvalidSelector, err.to_string()))?;

        let clock = self.config.clock.clone();
        if let Err(attempts) = pager
            .wait_until_ready(clock.as_ref(), self.config.table_poll)
            .await
        {
            return Err(ExportFailure::new(
                FailureKind::TableNotFound,
                format!("no table rows after {attempts} checks"),
            ));
        }

        let sink = ChannelProgressSink::new(event_tx.clone());
        let report = Harvester::new(clock, self.config.transition_poll)
            .harvest(job_id, &mut pager, &sink)
            .await
            .map_err(|err| ExportFailure::new(FailureKind::Harvest, err.to_string()))?;
        if !report.restored_to_first {
            billing_warn!("Job {}: table was left away from page 1", job_id);
        }

        let records = records_from_rows(&report.rows);
        let dropped = report.rows.len() - records.len();
        if dropped > 0 {
            billing_info!("Job {}: skipped {} malformed rows", job_id, dropped);
        }

        let date = (self.config.today)();
        let files = write_exports(&self.config.output_dir, &records, format, &date)
            .map_err(|err| ExportFailure::new(FailureKind::Export, err.to_string()))?;

        Ok(ExportOutcome {
            rows: report.rows.len(),
            records: records.len(),
            files,
            status: report.status,
            total_pages: report.total_pages,
            pages_harvested: report.pages_harvested,
        })
    }

    async fn close(&self) {
        let Some(session) = self.slot.as_ref().and_then(|slot| slot.session.as_ref()) else {
            return;
        };
        if let Err(err) = session.close().await {
            billing_warn!("Failed to close webdriver session: {}", err);
        }
    }
}
