use std::process::ExitCode;

use anyhow::Context;
use billing_core::{
    update, AppState, AppViewModel, CompletedExport, ExportFormat, ExportResultKind, Msg,
};
use billing_logging::billing_info;
use log::LevelFilter;

use crate::cli::Cli;
use crate::config::load_config;
use crate::effects::EffectRunner;

/// Exit status for a partial harvest under `--strict`.
pub const PARTIAL_EXIT: u8 = 2;

pub fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = load_config(cli.config.as_deref())?.apply_cli(&cli);

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    billing_logging::initialize(config.log.into(), level, config.log_file.as_deref());
    billing_info!(
        "Exporting {} into {}",
        config.format,
        config.output_dir.display()
    );

    let runner = EffectRunner::new(config.engine_config());
    let completed = run_export(&runner, config.format);
    runner.shutdown();
    let completed = completed?;

    print_summary(&completed);
    Ok(ExitCode::from(exit_status(&completed.result, cli.strict)))
}

/// Requests one export and pumps engine events through the state machine
/// until it reports back.
pub fn run_export(runner: &EffectRunner, format: ExportFormat) -> anyhow::Result<CompletedExport> {
    let (mut state, effects) = update(AppState::new(), Msg::ExportRequested(format));
    runner.run(effects);

    while state.is_busy() {
        let msg = runner
            .next_msg()
            .context("export engine stopped before the export finished")?;
        let (next, effects) = update(state, msg);
        state = next;
        runner.run(effects);
        if state.consume_dirty() {
            render_progress(&state.view());
        }
    }

    state
        .view()
        .last_export
        .context("export finished without a result")
}

pub fn exit_status(result: &ExportResultKind, strict: bool) -> u8 {
    match result {
        ExportResultKind::Complete => 0,
        ExportResultKind::Partial { .. } if strict => PARTIAL_EXIT,
        ExportResultKind::Partial { .. } => 0,
        ExportResultKind::Failed { .. } => 1,
    }
}

fn render_progress(view: &AppViewModel) {
    if let Some(progress) = &view.progress {
        match progress.total_pages {
            Some(total) => eprintln!(
                "page {}/{}: {} rows so far",
                progress.pages_done, total, progress.rows
            ),
            None => eprintln!("waiting for the billing table..."),
        }
    }
}

fn print_summary(completed: &CompletedExport) {
    match &completed.result {
        ExportResultKind::Complete => {
            println!("Exported {} records.", completed.records);
        }
        ExportResultKind::Partial { reason } => {
            println!(
                "Exported {} records from a partial harvest: {}",
                completed.records, reason
            );
        }
        ExportResultKind::Failed { message } => {
            println!("Export failed: {message}");
        }
    }
    let skipped = completed.rows.saturating_sub(completed.records);
    if skipped > 0 {
        println!("Skipped {skipped} rows that did not have 10 columns.");
    }
    for file in &completed.files {
        println!("  {file}");
    }
}
