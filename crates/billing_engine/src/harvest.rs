use std::sync::Arc;

use billing_core::JobId;
use billing_logging::{billing_debug, billing_info, billing_warn};

use crate::pager::{Pager, PagerError};
use crate::types::{EngineEvent, HarvestProgress, HarvestReport, HarvestStatus, PartialReason};
use crate::wait::{Clock, PollPolicy, Poller};

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

pub struct ChannelProgressSink {
    tx: std::sync::mpsc::Sender<EngineEvent>,
}

impl ChannelProgressSink {
    pub fn new(tx: std::sync::mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn emit(&self, _event: EngineEvent) {}
}

/// Failures that leave nothing to return. Everything after page 1 has been
/// read degrades to a partial report instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HarvestError {
    #[error("could not read page count: {0}")]
    PageCount(#[source] PagerError),
    #[error("could not navigate back to page 1 before harvesting: {0}")]
    Rewind(#[source] PagerError),
    #[error("page 1 did not become active after {attempts} checks")]
    RewindTimedOut { attempts: u32 },
    #[error("could not read page 1: {0}")]
    FirstPage(#[source] PagerError),
}

/// Walks every page of a [`Pager`], collecting rows in page order, then puts
/// the table back on page 1.
#[derive(Clone)]
pub struct Harvester {
    clock: Arc<dyn Clock>,
    transition: PollPolicy,
}

impl Harvester {
    pub fn new(clock: Arc<dyn Clock>, transition: PollPolicy) -> Self {
        Self { clock, transition }
    }

    pub async fn harvest<P: Pager + ?Sized>(
        &self,
        job_id: JobId,
        pager: &mut P,
        sink: &dyn ProgressSink,
    ) -> Result<HarvestReport, HarvestError> {
        let total_pages = pager
            .total_pages()
            .await
            .map_err(HarvestError::PageCount)?
            .max(1);

        self.rewind_if_needed(pager).await?;

        let mut rows = pager.read_rows().await.map_err(HarvestError::FirstPage)?;
        let mut pages_harvested = 1;
        let mut navigated = false;
        billing_info!(
            "Job {} page 1/{}: {} rows",
            job_id,
            total_pages,
            rows.len()
        );
        emit_progress(sink, job_id, 1, total_pages, rows.len());

        // Each iteration moves to the next page and reads it exactly once.
        let status = loop {
            if pages_harvested >= total_pages {
                break HarvestStatus::Complete;
            }
            let at_page = pages_harvested;
            let expected = at_page + 1;

            if let Err(err) = pager.go_to_next_page().await {
                let reason = match err {
                    PagerError::NextControlMissing => PartialReason::NextControlMissing { at_page },
                    PagerError::NextControlDisabled => {
                        PartialReason::NextControlDisabled { at_page }
                    }
                    other => PartialReason::NavigationFailed {
                        at_page,
                        message: other.to_string(),
                    },
                };
                break HarvestStatus::Partial(reason);
            }
            navigated = true;

            if let Err(attempts) = self.wait_for_page(pager, expected).await {
                break HarvestStatus::Partial(PartialReason::TransitionTimedOut {
                    expected_page: expected,
                    attempts,
                });
            }

            match pager.read_rows().await {
                Ok(page_rows) => {
                    billing_info!(
                        "Job {} page {}/{}: {} rows",
                        job_id,
                        expected,
                        total_pages,
                        page_rows.len()
                    );
                    rows.extend(page_rows);
                    pages_harvested = expected;
                    emit_progress(sink, job_id, expected, total_pages, rows.len());
                }
                Err(err) => {
                    break HarvestStatus::Partial(PartialReason::ReadFailed {
                        page: expected,
                        message: err.to_string(),
                    });
                }
            }
        };

        if let HarvestStatus::Partial(reason) = &status {
            billing_warn!(
                "Job {} stopped after {} of {} pages: {}",
                job_id,
                pages_harvested,
                total_pages,
                reason
            );
        }

        let restored_to_first = if navigated {
            self.restore_first_page(pager).await
        } else {
            true
        };

        Ok(HarvestReport {
            rows,
            status,
            total_pages,
            pages_harvested,
            restored_to_first,
        })
    }

    async fn rewind_if_needed<P: Pager + ?Sized>(&self, pager: &mut P) -> Result<(), HarvestError> {
        match pager.current_page().await {
            Ok(Some(page)) if page != 1 => {
                billing_info!("Table is on page {}; returning to page 1 first", page);
                pager.go_to_page(1).await.map_err(HarvestError::Rewind)?;
                self.wait_for_page(pager, 1)
                    .await
                    .map(|_| ())
                    .map_err(|attempts| HarvestError::RewindTimedOut { attempts })
            }
            Ok(_) => Ok(()),
            Err(err) => {
                billing_debug!("Active page unknown before harvest: {}", err);
                Ok(())
            }
        }
    }

    /// Best effort; failures are logged and reported, never raised.
    async fn restore_first_page<P: Pager + ?Sized>(&self, pager: &mut P) -> bool {
        if let Err(err) = pager.go_to_page(1).await {
            billing_warn!("Could not return to page 1: {}", err);
            return false;
        }
        match self.wait_for_page(pager, 1).await {
            Ok(_) => true,
            Err(attempts) => {
                billing_warn!("Page 1 did not become active after {} checks", attempts);
                false
            }
        }
    }

    /// Polls until `expected` is the active page. Returns the number of checks
    /// used, or the exhausted budget as the error.
    async fn wait_for_page<P: Pager + ?Sized>(&self, pager: &mut P, expected: u32) -> Result<u32, u32> {
        let mut poller = Poller::new(self.clock.as_ref(), self.transition);
        while poller.next_attempt().await {
            match pager.current_page().await {
                Ok(Some(page)) if page == expected => return Ok(poller.attempts()),
                Ok(_) => {}
                // The table may be mid re-render; keep polling.
                Err(err) => billing_debug!("Active page check failed: {}", err),
            }
        }
        Err(poller.attempts())
    }
}

fn emit_progress(sink: &dyn ProgressSink, job_id: JobId, page: u32, total_pages: u32, rows: usize) {
    sink.emit(EngineEvent::Progress(HarvestProgress {
        job_id,
        page,
        total_pages,
        rows,
    }));
}
