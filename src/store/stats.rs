use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use super::{settle, FetchStatus, RequestSequence};
use crate::gateway::{GatewayError, ReportGateway, ReportStats};
use crate::messages;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsState {
    pub stats: Option<ReportStats>,
    pub status: FetchStatus,
    pub error: Option<String>,
}

/// Summary counts, fetched independently of the report list.
pub struct StatsQuery<G> {
    gateway: G,
    state: Mutex<StatsState>,
    sequence: RequestSequence,
}

impl<G: ReportGateway> StatsQuery<G> {
    pub fn new(gateway: G) -> Self {
        Self {
            gateway,
            state: Mutex::new(StatsState::default()),
            sequence: RequestSequence::default(),
        }
    }

    pub fn snapshot(&self) -> StatsState {
        self.lock().clone()
    }

    /// First load. Does nothing once a fetch has been started.
    pub async fn load(&self) -> Result<(), GatewayError> {
        if self.lock().status != FetchStatus::Idle {
            return Ok(());
        }
        self.refresh().await
    }

    pub async fn refresh(&self) -> Result<(), GatewayError> {
        let ticket = self.sequence.issue();
        let previous = {
            let mut state = self.lock();
            let previous = state.status;
            state.status = FetchStatus::Loading;
            state.error = None;
            previous
        };

        let result = self.gateway.stats().await;

        let mut state = self.lock();
        if !self.sequence.is_current(ticket) {
            debug!("dropping stale stats response (ticket {})", ticket);
            return result.map(|_| ());
        }

        match result {
            Ok(stats) => {
                state.stats = Some(stats);
                state.status = FetchStatus::Ready;
                Ok(())
            }
            Err(GatewayError::Unauthorized) => {
                state.status = settle(previous);
                Err(GatewayError::Unauthorized)
            }
            Err(err) => {
                warn!("failed to load report stats: {}", err);
                state.error = Some(err.describe(messages::STATS_FAILED));
                state.status = FetchStatus::Error;
                Err(err)
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, StatsState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
