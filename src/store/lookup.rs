use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use super::{settle, FetchStatus, RequestSequence};
use crate::gateway::{
    CompanyLookup, GatewayError, ReportGateway, ReportId, SubmittedReport, TeacherLookup,
};
use crate::messages;

/// A read-only view fetched by key.
pub trait LookupSource {
    type Key: Clone + PartialEq + fmt::Display;
    type Output: Clone + Default;

    /// Message shown when the server gives none.
    const FAILURE: &'static str;

    fn fetch<G: ReportGateway>(
        gateway: &G,
        key: &Self::Key,
    ) -> impl Future<Output = Result<Self::Output, GatewayError>>;
}

/// Teachers of an internship batch who have not submitted a report.
pub struct TeachersWithoutReport;

impl LookupSource for TeachersWithoutReport {
    type Key = String;
    type Output = Vec<TeacherLookup>;

    const FAILURE: &'static str = messages::TEACHERS_FAILED;

    async fn fetch<G: ReportGateway>(
        gateway: &G,
        key: &Self::Key,
    ) -> Result<Self::Output, GatewayError> {
        gateway.teachers_without_report(key).await
    }
}

/// Host companies of an internship batch who have not submitted a report.
pub struct CompaniesWithoutReport;

impl LookupSource for CompaniesWithoutReport {
    type Key = String;
    type Output = Vec<CompanyLookup>;

    const FAILURE: &'static str = messages::COMPANIES_FAILED;

    async fn fetch<G: ReportGateway>(
        gateway: &G,
        key: &Self::Key,
    ) -> Result<Self::Output, GatewayError> {
        gateway.companies_without_report(key).await
    }
}

pub struct ReportDetail;

impl LookupSource for ReportDetail {
    type Key = ReportId;
    type Output = Option<SubmittedReport>;

    const FAILURE: &'static str = messages::DETAIL_FAILED;

    async fn fetch<G: ReportGateway>(
        gateway: &G,
        key: &Self::Key,
    ) -> Result<Self::Output, GatewayError> {
        gateway.report(key).await.map(Some)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LookupState<K, T> {
    pub key: Option<K>,
    pub data: T,
    pub status: FetchStatus,
    pub error: Option<String>,
}

impl<K, T: Default> Default for LookupState<K, T> {
    fn default() -> Self {
        Self {
            key: None,
            data: T::default(),
            status: FetchStatus::Idle,
            error: None,
        }
    }
}

/// Query driven by an optional key. Without a key it holds an empty result
/// and never touches the gateway.
pub struct LookupQuery<G, S: LookupSource> {
    gateway: G,
    state: Mutex<LookupState<S::Key, S::Output>>,
    sequence: RequestSequence,
    _source: PhantomData<S>,
}

pub type TeachersWithoutReportQuery<G> = LookupQuery<G, TeachersWithoutReport>;
pub type CompaniesWithoutReportQuery<G> = LookupQuery<G, CompaniesWithoutReport>;
pub type ReportDetailQuery<G> = LookupQuery<G, ReportDetail>;

impl<G: ReportGateway, S: LookupSource> LookupQuery<G, S> {
    pub fn new(gateway: G) -> Self {
        Self {
            gateway,
            state: Mutex::new(LookupState::default()),
            sequence: RequestSequence::default(),
            _source: PhantomData,
        }
    }

    pub fn snapshot(&self) -> LookupState<S::Key, S::Output> {
        self.lock().clone()
    }

    pub fn data(&self) -> S::Output {
        self.lock().data.clone()
    }

    /// Points the query at `key`. A new key fetches once; the current key
    /// again is a no-op; `None` clears the held result.
    pub async fn set_key(&self, key: Option<S::Key>) -> Result<(), GatewayError> {
        let ticket = {
            let mut state = self.lock();
            if state.key == key && state.status != FetchStatus::Idle {
                return Ok(());
            }

            let ticket = self.sequence.issue();
            match key {
                None => {
                    *state = LookupState {
                        status: FetchStatus::Ready,
                        ..LookupState::default()
                    };
                    return Ok(());
                }
                Some(key) => {
                    *state = LookupState {
                        key: Some(key),
                        ..LookupState::default()
                    };
                }
            }
            ticket
        };

        self.run(ticket).await
    }

    /// Re-fetches the current key. Without a key there is nothing to do.
    pub async fn refresh(&self) -> Result<(), GatewayError> {
        if self.lock().key.is_none() {
            return Ok(());
        }
        let ticket = self.sequence.issue();
        self.run(ticket).await
    }

    async fn run(&self, ticket: u64) -> Result<(), GatewayError> {
        let (key, previous) = {
            let mut state = self.lock();
            let Some(key) = state.key.clone() else {
                return Ok(());
            };
            let previous = state.status;
            state.status = FetchStatus::Loading;
            state.error = None;
            (key, previous)
        };

        let result = S::fetch(&self.gateway, &key).await;

        let mut state = self.lock();
        if !self.sequence.is_current(ticket) {
            debug!("dropping stale lookup response for {}", key);
            return result.map(|_| ());
        }

        match result {
            Ok(data) => {
                state.data = data;
                state.status = FetchStatus::Ready;
                Ok(())
            }
            Err(GatewayError::Unauthorized) => {
                state.status = settle(previous);
                Err(GatewayError::Unauthorized)
            }
            Err(err) => {
                warn!("lookup for {} failed: {}", key, err);
                state.error = Some(err.describe(S::FAILURE));
                state.status = FetchStatus::Error;
                Err(err)
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, LookupState<S::Key, S::Output>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
