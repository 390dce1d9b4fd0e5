use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use billing_core::ExportFormat;
use billing_engine::{
    Clock, DriverError, EngineConfig, EngineEvent, EngineHandle, ExportOutcome, FailureKind,
    HarvestStatus, PageDriver, Selectors,
};
use pretty_assertions::assert_eq;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(billing_logging::initialize_for_tests);
}

#[derive(Default)]
struct CountingClock {
    sleeps: AtomicU32,
}

#[async_trait::async_trait]
impl Clock for CountingClock {
    async fn sleep(&self, _duration: Duration) {
        self.sleeps.fetch_add(1, Ordering::SeqCst);
    }
}

/// Renders a paginated billing table and reacts to pagination clicks the way
/// the live page does.
struct FakeBrowser {
    pages: Vec<usize>,
    table_loaded: bool,
    current: Mutex<usize>,
}

impl FakeBrowser {
    fn new(pages: Vec<usize>) -> Self {
        Self {
            pages,
            table_loaded: true,
            current: Mutex::new(1),
        }
    }

    fn current(&self) -> usize {
        *self.current.lock().unwrap()
    }

    fn render(&self, current: usize) -> String {
        let total = self.pages.len();
        let rows: String = (1..=self.pages[current - 1])
            .map(|row| {
                format!(
                    r#"<tr><td><div class="flex-column">Invoice</div></td>
                    <td><a href="/clients">Client p{current}r{row}</a></td>
                    <td>Project</td><td>Net 30</td><td>01/01/2024</td><td>01/31/2024</td>
                    <td>$1,000.00</td><td>$500.00</td><td>$0.00</td>
                    <td><div class="status-height-width"><span>Open</span></div></td></tr>"#
                )
            })
            .collect();
        let mut items = String::from(r#"<li class="page-item prev"><a>&laquo;</a></li>"#);
        for page in 1..=total {
            let active = if page == current { " active" } else { "" };
            items.push_str(&format!(
                r#"<li class="page-item{active}"><a>{page}</a></li>"#
            ));
        }
        let disabled = if current == total { " disabled" } else { "" };
        items.push_str(&format!(
            r#"<li class="page-item next{disabled}"><a>&raquo;</a></li>"#
        ));
        format!(
            r#"<html><body><div class="table-container"><table><tbody>{rows}</tbody></table>
            <ul class="pagination">{items}</ul></div></body></html>"#
        )
    }
}

#[async_trait::async_trait]
impl PageDriver for FakeBrowser {
    async fn page_source(&self) -> Result<String, DriverError> {
        if !self.table_loaded {
            return Ok("<html><body><div class=\"spinner\"></div></body></html>".to_string());
        }
        Ok(self.render(self.current()))
    }

    async fn click_nth(&self, css: &str, index: usize) -> Result<(), DriverError> {
        let selectors = Selectors::default();
        let total = self.pages.len();
        let mut current = self.current.lock().unwrap();
        if css == selectors.next_page {
            *current = (*current + 1).min(total);
        } else if css == selectors.page_items {
            match index {
                0 => *current = current.saturating_sub(1).max(1),
                i if i <= total => *current = i,
                _ => *current = (*current + 1).min(total),
            }
        } else {
            return Err(DriverError::NoSuchElement {
                selector: css.to_string(),
                index,
            });
        }
        Ok(())
    }
}

fn config(output_dir: &Path, clock: Arc<CountingClock>) -> EngineConfig {
    EngineConfig {
        today: Arc::new(|| "2024-02-29".to_string()),
        clock,
        ..EngineConfig::default_with_output(output_dir.to_path_buf())
    }
}

fn run_job(engine: &EngineHandle) -> (Vec<EngineEvent>, Result<ExportOutcome, billing_engine::ExportFailure>) {
    let mut progress = Vec::new();
    loop {
        match engine.recv_timeout(Duration::from_secs(10)) {
            Some(EngineEvent::ExportCompleted { result, .. }) => return (progress, result),
            Some(event) => progress.push(event),
            None => panic!("engine did not complete the export"),
        }
    }
}

#[test]
fn export_walks_all_pages_and_writes_csv() {
    init_logging();
    let temp = tempfile::TempDir::new().unwrap();
    let browser = Arc::new(FakeBrowser::new(vec![2, 2, 1]));
    let clock = Arc::new(CountingClock::default());
    let engine = EngineHandle::with_driver(config(temp.path(), clock.clone()), browser.clone());

    engine.export(1, ExportFormat::Csv);
    let (progress, result) = run_job(&engine);
    engine.shutdown();

    let outcome = result.unwrap();
    assert_eq!(outcome.status, HarvestStatus::Complete);
    assert_eq!(outcome.rows, 5);
    assert_eq!(outcome.records, 5);
    assert_eq!(outcome.total_pages, 3);
    assert_eq!(outcome.pages_harvested, 3);
    assert_eq!(progress.len(), 3);
    assert_eq!(browser.current(), 1);

    assert_eq!(outcome.files.len(), 1);
    assert_eq!(
        outcome.files[0].file_name().unwrap(),
        "d-tools-billing-2024-02-29.csv"
    );
    let text = std::fs::read_to_string(&outcome.files[0]).unwrap();
    let clients: Vec<_> = text
        .lines()
        .skip(1)
        .map(|line| line.split(',').nth(1).unwrap().to_string())
        .collect();
    assert_eq!(
        clients,
        vec![
            "Client p1r1",
            "Client p1r2",
            "Client p2r1",
            "Client p2r2",
            "Client p3r1"
        ]
    );
    assert!(text.lines().nth(1).unwrap().ends_with("1000.00,500.00,0.00,Open"));
}

#[test]
fn export_both_formats_from_single_page() {
    init_logging();
    let temp = tempfile::TempDir::new().unwrap();
    let browser = Arc::new(FakeBrowser::new(vec![3]));
    let clock = Arc::new(CountingClock::default());
    let engine = EngineHandle::with_driver(config(temp.path(), clock.clone()), browser);

    engine.export(4, ExportFormat::Both);
    let (_, result) = run_job(&engine);
    engine.shutdown();

    let outcome = result.unwrap();
    assert_eq!(outcome.records, 3);
    assert_eq!(outcome.files.len(), 2);
    assert!(outcome.files.iter().all(|path| path.is_file()));
    // Table found on the first readiness check; no page transitions.
    assert_eq!(clock.sleeps.load(Ordering::SeqCst), 1);
}

#[test]
fn missing_table_fails_after_readiness_budget() {
    init_logging();
    let temp = tempfile::TempDir::new().unwrap();
    let mut browser = FakeBrowser::new(vec![1]);
    browser.table_loaded = false;
    let clock = Arc::new(CountingClock::default());
    let engine =
        EngineHandle::with_driver(config(temp.path(), clock.clone()), Arc::new(browser));

    engine.export(2, ExportFormat::Csv);
    let (progress, result) = run_job(&engine);
    engine.shutdown();

    let failure = result.unwrap_err();
    assert_eq!(failure.kind, FailureKind::TableNotFound);
    assert!(progress.is_empty());
    assert_eq!(clock.sleeps.load(Ordering::SeqCst), 20);
    assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
}

#[test]
fn jobs_run_one_after_another() {
    init_logging();
    let temp = tempfile::TempDir::new().unwrap();
    let browser = Arc::new(FakeBrowser::new(vec![1, 1]));
    let clock = Arc::new(CountingClock::default());
    let engine = EngineHandle::with_driver(config(temp.path(), clock), browser);

    engine.export(1, ExportFormat::Csv);
    engine.export(2, ExportFormat::Xlsx);

    let mut completed = Vec::new();
    while completed.len() < 2 {
        match engine.recv_timeout(Duration::from_secs(10)) {
            Some(EngineEvent::ExportCompleted { job_id, result }) => {
                assert_eq!(result.unwrap().rows, 2);
                completed.push(job_id);
            }
            Some(EngineEvent::Progress(progress)) => {
                // Progress of job 2 never precedes completion of job 1.
                assert!(progress.job_id == 1 || completed == vec![1]);
            }
            None => panic!("engine stalled"),
        }
    }
    engine.shutdown();
    assert_eq!(completed, vec![1, 2]);
}
