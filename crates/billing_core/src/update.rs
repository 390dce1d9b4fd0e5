use crate::{AppState, Effect, Msg};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::ExportRequested(format) => {
            // One harvest at a time: the trigger stays disabled until the
            // running export reports back.
            if state.is_busy() {
                return (state, Vec::new());
            }
            let job_id = state.start_export(format);
            vec![Effect::StartExport { job_id, format }]
        }
        Msg::HarvestProgress {
            job_id,
            page,
            total_pages,
            rows,
        } => {
            state.apply_progress(job_id, page, total_pages, rows);
            Vec::new()
        }
        Msg::ExportDone(completed) => {
            state.apply_done(completed);
            Vec::new()
        }
    };

    (state, effects)
}
