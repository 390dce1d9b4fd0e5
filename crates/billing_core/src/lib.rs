//! Billing core: table row model, record formatting and the pure export trigger state machine.
mod effect;
mod msg;
mod record;
mod state;
mod update;
mod view_model;

pub use effect::Effect;
pub use msg::Msg;
pub use record::{
    clean_text, format_currency, records_from_rows, BillingRecord, Row, COLUMN_COUNT, HEADERS,
};
pub use state::{
    AppState, CompletedExport, ExportFormat, ExportResultKind, ExportState, JobId,
    ParseFormatError, RunningExport,
};
pub use update::update;
pub use view_model::{AppViewModel, ProgressView};
