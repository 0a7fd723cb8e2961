//! Client-side projections of server state: the paginated report list, the
//! statistics summary and the keyed lookups.

mod lookup;
mod patch;
mod reports;
mod stats;

#[cfg(test)]
mod tests;

pub use lookup::{
    CompaniesWithoutReport, CompaniesWithoutReportQuery, LookupQuery, LookupSource, LookupState,
    ReportDetail, ReportDetailQuery, TeachersWithoutReport, TeachersWithoutReportQuery,
};
pub use patch::{apply_patch, apply_status};
pub use reports::{ReportListState, ReportStore};
pub use stats::{StatsQuery, StatsState};

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FetchStatus {
    #[default]
    Idle,
    Loading,
    Ready,
    Error,
}

/// Monotonic ticket counter. Only the response for the most recently issued
/// ticket may be applied; anything older is stale.
#[derive(Debug, Default)]
pub(crate) struct RequestSequence(AtomicU64);

impl RequestSequence {
    pub(crate) fn issue(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub(crate) fn is_current(&self, ticket: u64) -> bool {
        self.0.load(Ordering::SeqCst) == ticket
    }
}

/// Status to fall back to when a request ends without a result to show
/// (session rejected). A superseded `Loading` is not a resting state.
pub(crate) fn settle(previous: FetchStatus) -> FetchStatus {
    match previous {
        FetchStatus::Loading => FetchStatus::Idle,
        other => other,
    }
}
