//! Billing engine: page traversal, WebDriver plumbing and export writing.
mod dom;
mod dom_pager;
mod driver;
mod engine;
mod export;
mod harvest;
mod pager;
mod persist;
mod types;
mod wait;

pub use dom::{parse_pagination, parse_table, CompiledSelectors, DomError, PageControl, Pagination, Selectors};
pub use dom_pager::DomPager;
pub use driver::{PageDriver, DriverError, WebDriverSession, WebDriverSettings};
pub use engine::{EngineConfig, EngineHandle, SessionMode};
pub use export::{build_csv, build_xlsx, export_filename, write_exports, ExportError, SHEET_NAME};
pub use harvest::{ChannelProgressSink, HarvestError, Harvester, NullProgressSink, ProgressSink};
pub use pager::{Pager, PagerError};
pub use persist::{write_atomically, PersistError};
pub use types::{
    EngineEvent, ExportFailure, ExportOutcome, FailureKind, HarvestProgress, HarvestReport,
    HarvestStatus, PartialReason,
};
pub use wait::{Clock, PollPolicy, Poller, TokioClock};
