use std::sync::Arc;

use billing_core::Row;
use billing_logging::billing_debug;

use crate::dom::{parse_pagination, parse_table, CompiledSelectors, DomError, Pagination, Selectors};
use crate::driver::PageDriver;
use crate::pager::{Pager, PagerError};
use crate::wait::{Clock, PollPolicy, Poller};

/// [`Pager`] over a live document: reads by parsing the page source, navigates
/// by clicking pagination controls.
pub struct DomPager {
    driver: Arc<dyn PageDriver>,
    selectors: Selectors,
    compiled: CompiledSelectors,
}

impl DomPager {
    pub fn new(driver: Arc<dyn PageDriver>, selectors: &Selectors) -> Result<Self, DomError> {
        Ok(Self {
            driver,
            compiled: selectors.compile()?,
            selectors: selectors.clone(),
        })
    }

    /// Polls until the table is rendered with at least one body row. Returns
    /// the number of checks used, or the exhausted budget as the error.
    pub async fn wait_until_ready(&self, clock: &dyn Clock, policy: PollPolicy) -> Result<u32, u32> {
        let mut poller = Poller::new(clock, policy);
        while poller.next_attempt().await {
            match self.driver.page_source().await {
                Ok(html) => {
                    let ready = parse_table(&html, &self.compiled)
                        .is_some_and(|rows| !rows.is_empty());
                    if ready {
                        return Ok(poller.attempts());
                    }
                }
                Err(err) => billing_debug!("Table readiness check failed: {}", err),
            }
        }
        Err(poller.attempts())
    }

    async fn pagination(&self) -> Result<Pagination, PagerError> {
        let html = self.driver.page_source().await?;
        Ok(parse_pagination(&html, &self.compiled))
    }
}

#[async_trait::async_trait]
impl Pager for DomPager {
    async fn total_pages(&mut self) -> Result<u32, PagerError> {
        Ok(self.pagination().await?.total_pages())
    }

    async fn current_page(&mut self) -> Result<Option<u32>, PagerError> {
        Ok(self.pagination().await?.active_page())
    }

    async fn go_to_next_page(&mut self) -> Result<(), PagerError> {
        match self.pagination().await?.next {
            None => Err(PagerError::NextControlMissing),
            Some(true) => Err(PagerError::NextControlDisabled),
            Some(false) => {
                self.driver.click_nth(&self.selectors.next_page, 0).await?;
                Ok(())
            }
        }
    }

    async fn go_to_page(&mut self, page: u32) -> Result<(), PagerError> {
        let index = self
            .pagination()
            .await?
            .position_of(page)
            .ok_or(PagerError::PageControlMissing(page))?;
        self.driver
            .click_nth(&self.selectors.page_items, index)
            .await?;
        Ok(())
    }

    async fn read_rows(&mut self) -> Result<Vec<Row>, PagerError> {
        let html = self.driver.page_source().await?;
        parse_table(&html, &self.compiled).ok_or(PagerError::TableMissing)
    }
}
