use billing_core::Row;

use crate::driver::DriverError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PagerError {
    #[error("billing table not found in document")]
    TableMissing,
    #[error("next page control not found")]
    NextControlMissing,
    #[error("next page control is disabled")]
    NextControlDisabled,
    #[error("no control for page {0}")]
    PageControlMissing(u32),
    #[error("driver error: {0}")]
    Driver(#[from] DriverError),
}

/// Capability over a live paginated table.
///
/// Implementations read whatever page is currently rendered; navigation calls
/// only dispatch the action and return before the table re-renders.
#[async_trait::async_trait]
pub trait Pager: Send {
    /// Highest enabled page number; 1 when the table has no pagination.
    async fn total_pages(&mut self) -> Result<u32, PagerError>;

    /// Page shown as active, if the indicator can be read.
    async fn current_page(&mut self) -> Result<Option<u32>, PagerError>;

    async fn go_to_next_page(&mut self) -> Result<(), PagerError>;

    async fn go_to_page(&mut self, page: u32) -> Result<(), PagerError>;

    /// Rows of the currently rendered page, in rendered order.
    async fn read_rows(&mut self) -> Result<Vec<Row>, PagerError>;
}
