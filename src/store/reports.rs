use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use super::{apply_status, settle, FetchStatus, RequestSequence};
use crate::gateway::{
    GatewayError, PaginationState, ReportFilters, ReportGateway, ReportId, ReportStatus,
    SubmittedReport,
};
use crate::messages;

/// Everything a list view renders, swapped as one value.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportListState {
    pub records: Vec<SubmittedReport>,
    pub pagination: PaginationState,
    pub filters: ReportFilters,
    pub page: u32,
    pub status: FetchStatus,
    pub error: Option<String>,
}

impl ReportListState {
    fn new(limit: u32) -> Self {
        Self {
            records: Vec::new(),
            pagination: PaginationState::empty(limit),
            filters: ReportFilters::default(),
            page: 1,
            status: FetchStatus::Idle,
            error: None,
        }
    }
}

/// Paginated, filterable collection of submitted reports.
///
/// Failed fetches keep the previous page visible next to the error message.
/// Overlapping fetches are fenced: only the most recently issued one lands.
/// Approve and reject patch the held page in place once the server confirms.
pub struct ReportStore<G> {
    gateway: G,
    limit: u32,
    state: Mutex<ReportListState>,
    sequence: RequestSequence,
}

impl<G: ReportGateway> ReportStore<G> {
    pub fn new(gateway: G, limit: u32) -> Self {
        Self {
            gateway,
            limit,
            state: Mutex::new(ReportListState::new(limit)),
            sequence: RequestSequence::default(),
        }
    }

    pub fn snapshot(&self) -> ReportListState {
        self.lock().clone()
    }

    pub fn records(&self) -> Vec<SubmittedReport> {
        self.lock().records.clone()
    }

    pub fn error(&self) -> Option<String> {
        self.lock().error.clone()
    }

    pub fn status(&self) -> FetchStatus {
        self.lock().status
    }

    pub async fn fetch(&self, page: u32, filters: ReportFilters) -> Result<(), GatewayError> {
        let ticket = self.sequence.issue();
        let previous = {
            let mut state = self.lock();
            let previous = state.status;
            state.page = page;
            state.filters = filters.clone();
            state.status = FetchStatus::Loading;
            state.error = None;
            previous
        };

        let result = self.gateway.list_reports(page, self.limit, &filters).await;

        let mut state = self.lock();
        if !self.sequence.is_current(ticket) {
            debug!("dropping stale report page {} (ticket {})", page, ticket);
            return result.map(|_| ());
        }

        match result {
            Ok((records, pagination)) => {
                state.records = records;
                state.pagination = pagination;
                state.page = pagination.page;
                state.status = FetchStatus::Ready;
                Ok(())
            }
            Err(GatewayError::Unauthorized) => {
                state.status = settle(previous);
                Err(GatewayError::Unauthorized)
            }
            Err(err) => {
                warn!("failed to load reports page {}: {}", page, err);
                state.error = Some(err.describe(messages::LIST_FAILED));
                state.status = FetchStatus::Error;
                Err(err)
            }
        }
    }

    /// Replaces the active filters and loads their first page.
    pub async fn update_filters(&self, filters: ReportFilters) -> Result<(), GatewayError> {
        self.fetch(1, filters).await
    }

    /// Loads `page` with the active filters. The server validates the range.
    pub async fn change_page(&self, page: u32) -> Result<(), GatewayError> {
        let filters = self.lock().filters.clone();
        self.fetch(page, filters).await
    }

    pub async fn refresh(&self) -> Result<(), GatewayError> {
        let (page, filters) = {
            let state = self.lock();
            (state.page, state.filters.clone())
        };
        self.fetch(page, filters).await
    }

    pub async fn approve(&self, id: &ReportId) -> Result<(), GatewayError> {
        match self.gateway.approve(id).await {
            Ok(()) => {
                self.patch_status(id, ReportStatus::Approved);
                Ok(())
            }
            Err(err) => {
                self.record_failure(&err, messages::APPROVE_FAILED);
                Err(err)
            }
        }
    }

    pub async fn reject(&self, id: &ReportId, reason: &str) -> Result<(), GatewayError> {
        match self.gateway.reject(id, reason).await {
            Ok(()) => {
                self.patch_status(id, ReportStatus::Rejected);
                Ok(())
            }
            Err(err) => {
                self.record_failure(&err, messages::REJECT_FAILED);
                Err(err)
            }
        }
    }

    // Concurrent approve/reject on one id: whichever resolves last wins here.
    // A confirmed mutation supersedes the message of an earlier failed one.
    fn patch_status(&self, id: &ReportId, status: ReportStatus) {
        let mut state = self.lock();
        state.error = None;
        let overwrites_decision = state
            .records
            .iter()
            .any(|record| &record.id == id && record.status.is_terminal());
        if overwrites_decision {
            debug!("report {} already had a decision, overwriting locally", id);
        }
        if apply_status(&mut state.records, id, status) {
            info!("report {} marked {}", id, status.as_wire());
        } else {
            debug!("report {} is not on the held page, nothing to patch", id);
        }
    }

    fn record_failure(&self, err: &GatewayError, fallback: &str) {
        if err.is_unauthorized() {
            return;
        }
        warn!("{}: {}", fallback, err);
        self.lock().error = Some(err.describe(fallback));
    }

    fn lock(&self) -> MutexGuard<'_, ReportListState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
