use std::sync::Once;

use billing_core::{
    update, AppState, CompletedExport, Effect, ExportFormat, ExportResultKind, ExportState, Msg,
};
use pretty_assertions::assert_eq;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(billing_logging::initialize_for_tests);
}

fn done(job_id: u64, result: ExportResultKind) -> Msg {
    Msg::ExportDone(CompletedExport {
        job_id,
        result,
        rows: 5,
        records: 5,
        files: vec!["d-tools-billing-2024-01-01.csv".to_string()],
    })
}

#[test]
fn export_request_starts_job_and_disables_trigger() {
    init_logging();
    let (mut state, effects) = update(AppState::new(), Msg::ExportRequested(ExportFormat::Csv));

    assert_eq!(
        effects,
        vec![Effect::StartExport {
            job_id: 1,
            format: ExportFormat::Csv,
        }]
    );
    let view = state.view();
    assert!(view.busy);
    assert!(!view.trigger_enabled);
    assert_eq!(view.progress.as_ref().map(|p| p.job_id), Some(1));
    assert!(state.consume_dirty());
    assert!(!state.consume_dirty());
}

#[test]
fn second_request_while_running_is_ignored() {
    init_logging();
    let (mut state, _) = update(AppState::new(), Msg::ExportRequested(ExportFormat::Xlsx));
    state.consume_dirty();

    let (mut next, effects) = update(state, Msg::ExportRequested(ExportFormat::Csv));

    assert!(effects.is_empty());
    assert!(!next.consume_dirty());
    match next.export() {
        ExportState::Running(running) => {
            assert_eq!(running.job_id, 1);
            assert_eq!(running.format, ExportFormat::Xlsx);
        }
        other => panic!("expected running export, got {other:?}"),
    }
}

#[test]
fn progress_updates_running_job_only() {
    init_logging();
    let (state, _) = update(AppState::new(), Msg::ExportRequested(ExportFormat::Both));
    let (state, _) = update(
        state,
        Msg::HarvestProgress {
            job_id: 1,
            page: 2,
            total_pages: 3,
            rows: 4,
        },
    );
    let progress = state.view().progress.unwrap();
    assert_eq!(progress.pages_done, 2);
    assert_eq!(progress.total_pages, Some(3));
    assert_eq!(progress.rows, 4);

    // Stale job ids are ignored.
    let (state, _) = update(
        state,
        Msg::HarvestProgress {
            job_id: 99,
            page: 3,
            total_pages: 3,
            rows: 10,
        },
    );
    assert_eq!(state.view().progress.unwrap().rows, 4);
}

#[test]
fn done_returns_to_idle_and_reenables_trigger() {
    init_logging();
    let (state, _) = update(AppState::new(), Msg::ExportRequested(ExportFormat::Csv));
    let (state, effects) = update(
        state,
        done(
            1,
            ExportResultKind::Partial {
                reason: "next page control disabled at page 1".to_string(),
            },
        ),
    );

    assert!(effects.is_empty());
    let view = state.view();
    assert!(!view.busy);
    assert!(view.trigger_enabled);
    assert_eq!(view.completed_count, 1);
    assert!(matches!(
        view.last_export.unwrap().result,
        ExportResultKind::Partial { .. }
    ));

    let (_, effects) = update(state, Msg::ExportRequested(ExportFormat::Csv));
    assert_eq!(
        effects,
        vec![Effect::StartExport {
            job_id: 2,
            format: ExportFormat::Csv,
        }]
    );
}

#[test]
fn done_for_unknown_job_is_ignored() {
    init_logging();
    let (state, _) = update(AppState::new(), Msg::ExportRequested(ExportFormat::Csv));
    let (state, _) = update(state, done(7, ExportResultKind::Complete));

    assert!(state.is_busy());
    assert_eq!(state.view().completed_count, 0);

    let (idle, _) = update(AppState::new(), done(1, ExportResultKind::Complete));
    assert_eq!(idle, AppState::new());
}

#[test]
fn format_parses_from_cli_strings() {
    assert_eq!("csv".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
    assert_eq!(" XLSX ".parse::<ExportFormat>().unwrap(), ExportFormat::Xlsx);
    assert_eq!("excel".parse::<ExportFormat>().unwrap(), ExportFormat::Xlsx);
    assert_eq!("both".parse::<ExportFormat>().unwrap(), ExportFormat::Both);
    assert!("pdf".parse::<ExportFormat>().is_err());

    assert!(ExportFormat::Both.includes_csv());
    assert!(ExportFormat::Both.includes_xlsx());
    assert!(!ExportFormat::Csv.includes_xlsx());
}
