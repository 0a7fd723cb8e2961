mod http;
mod models;

pub use http::HttpReportGateway;
pub use models::*;

use std::future::Future;
use std::sync::Arc;

/// Failure of a single gateway call.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("request failed: {0}")]
    Network(#[source] reqwest::Error),
    /// The session was rejected. The gateway has already cleared it.
    #[error("session expired or unauthorized")]
    Unauthorized,
    #[error("server returned {status}: {}", .message.as_deref().unwrap_or("no details"))]
    Server { status: u16, message: Option<String> },
    #[error("unreadable response: {0}")]
    Decode(String),
    #[error("http client setup failed: {0}")]
    Client(#[source] reqwest::Error),
    #[error("invalid API url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    /// An id or batch id that cannot stand as a single path segment.
    #[error("unusable path segment {0:?}")]
    InvalidSegment(String),
}

impl GatewayError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    /// Message for the user: the server's own message when it sent one,
    /// otherwise the given localized fallback.
    pub fn describe(&self, fallback: &str) -> String {
        match self {
            Self::Server {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => message.clone(),
            _ => fallback.to_string(),
        }
    }
}

/// Remote admin reports API. The store and queries are generic over this so
/// they can be exercised without a network.
pub trait ReportGateway {
    fn stats(&self) -> impl Future<Output = Result<ReportStats, GatewayError>>;

    fn list_reports(
        &self,
        page: u32,
        limit: u32,
        filters: &ReportFilters,
    ) -> impl Future<Output = Result<(Vec<SubmittedReport>, PaginationState), GatewayError>>;

    fn report(&self, id: &ReportId)
        -> impl Future<Output = Result<SubmittedReport, GatewayError>>;

    fn approve(&self, id: &ReportId) -> impl Future<Output = Result<(), GatewayError>>;

    fn reject(
        &self,
        id: &ReportId,
        reason: &str,
    ) -> impl Future<Output = Result<(), GatewayError>>;

    fn teachers_without_report(
        &self,
        batch_id: &str,
    ) -> impl Future<Output = Result<Vec<TeacherLookup>, GatewayError>>;

    fn companies_without_report(
        &self,
        batch_id: &str,
    ) -> impl Future<Output = Result<Vec<CompanyLookup>, GatewayError>>;

    fn export_reports(
        &self,
        filters: &ReportFilters,
    ) -> impl Future<Output = Result<Vec<u8>, GatewayError>>;
}

/// Lets one gateway back the store, the stats query and the lookups.
impl<G: ReportGateway> ReportGateway for Arc<G> {
    async fn stats(&self) -> Result<ReportStats, GatewayError> {
        (**self).stats().await
    }

    async fn list_reports(
        &self,
        page: u32,
        limit: u32,
        filters: &ReportFilters,
    ) -> Result<(Vec<SubmittedReport>, PaginationState), GatewayError> {
        (**self).list_reports(page, limit, filters).await
    }

    async fn report(&self, id: &ReportId) -> Result<SubmittedReport, GatewayError> {
        (**self).report(id).await
    }

    async fn approve(&self, id: &ReportId) -> Result<(), GatewayError> {
        (**self).approve(id).await
    }

    async fn reject(&self, id: &ReportId, reason: &str) -> Result<(), GatewayError> {
        (**self).reject(id, reason).await
    }

    async fn teachers_without_report(
        &self,
        batch_id: &str,
    ) -> Result<Vec<TeacherLookup>, GatewayError> {
        (**self).teachers_without_report(batch_id).await
    }

    async fn companies_without_report(
        &self,
        batch_id: &str,
    ) -> Result<Vec<CompanyLookup>, GatewayError> {
        (**self).companies_without_report(batch_id).await
    }

    async fn export_reports(&self, filters: &ReportFilters) -> Result<Vec<u8>, GatewayError> {
        (**self).export_reports(filters).await
    }
}
