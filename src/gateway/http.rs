use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use super::models::{ApiErrorBody, DataEnvelope, PageEnvelope, RejectBody};
use super::{
    CompanyLookup, GatewayError, PaginationState, ReportFilters, ReportGateway, ReportId,
    ReportStats, SubmittedReport, TeacherLookup,
};
use crate::session::SessionContext;

const REPORTS_PATH: [&str; 2] = ["admin", "reports"];

/// `ReportGateway` over the admin HTTP API.
#[derive(Debug, Clone)]
pub struct HttpReportGateway {
    client: Client,
    base_url: Url,
    session: SessionContext,
}

impl HttpReportGateway {
    pub fn new(
        api_url: &str,
        timeout: Duration,
        session: SessionContext,
    ) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(GatewayError::Client)?;

        let invalid = |reason: &str| GatewayError::InvalidUrl {
            url: api_url.to_string(),
            reason: reason.to_string(),
        };
        let mut base_url = Url::parse(api_url).map_err(|e| invalid(&e.to_string()))?;
        base_url
            .path_segments_mut()
            .map_err(|()| invalid("cannot carry a path"))?
            .pop_if_empty()
            .extend(REPORTS_PATH);

        Ok(Self {
            client,
            base_url,
            session,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Builds a request below the reports root. Each segment is encoded as a
    /// single path segment, so ids cannot reach other endpoints.
    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, GatewayError> {
        if let Some(bad) = segments
            .iter()
            .find(|segment| matches!(**segment, "" | "." | ".."))
        {
            return Err(GatewayError::InvalidSegment(bad.to_string()));
        }

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| GatewayError::InvalidUrl {
                url: self.base_url.to_string(),
                reason: "cannot carry a path".to_string(),
            })?
            .extend(segments);

        let builder = self.client.request(method, url);
        Ok(match self.session.bearer_token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    /// Sends the request and maps non-success statuses. A 401 invalidates
    /// the session before the error reaches the caller.
    async fn send(&self, builder: RequestBuilder) -> Result<Response, GatewayError> {
        let response = builder.send().await.map_err(GatewayError::Network)?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED {
            warn!("admin API rejected the session, signing out");
            self.session.invalidate();
            return Err(GatewayError::Unauthorized);
        }

        // Only a JSON `message` is shown to users; anything else is just logged.
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&text)
            .ok()
            .and_then(|body| body.message);

        warn!("admin API returned {}: {}", status, text.trim());
        Err(GatewayError::Server {
            status: status.as_u16(),
            message,
        })
    }

    async fn json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, GatewayError> {
        let response = self.send(builder).await?;
        let text = response.text().await.map_err(GatewayError::Network)?;
        serde_json::from_str(&text).map_err(|e| GatewayError::Decode(e.to_string()))
    }
}

impl ReportGateway for HttpReportGateway {
    async fn stats(&self) -> Result<ReportStats, GatewayError> {
        let envelope: DataEnvelope<ReportStats> =
            self.json(self.request(Method::GET, &["stats"])?).await?;
        Ok(envelope.data)
    }

    async fn list_reports(
        &self,
        page: u32,
        limit: u32,
        filters: &ReportFilters,
    ) -> Result<(Vec<SubmittedReport>, PaginationState), GatewayError> {
        let mut query = vec![("page", page.to_string()), ("limit", limit.to_string())];
        query.extend(filters.query_pairs());

        let envelope: PageEnvelope<SubmittedReport> = self
            .json(self.request(Method::GET, &[])?.query(&query))
            .await?;

        let pagination = envelope.pagination.normalized();
        if pagination != envelope.pagination {
            warn!(
                "server pagination {:?} was inconsistent, using {:?}",
                envelope.pagination, pagination
            );
        }

        info!(
            "loaded {} reports (page {}/{})",
            envelope.data.len(),
            pagination.page,
            pagination.pages
        );
        Ok((envelope.data, pagination))
    }

    async fn report(&self, id: &ReportId) -> Result<SubmittedReport, GatewayError> {
        let envelope: DataEnvelope<SubmittedReport> =
            self.json(self.request(Method::GET, &[id.as_str()])?).await?;
        Ok(envelope.data)
    }

    async fn approve(&self, id: &ReportId) -> Result<(), GatewayError> {
        self.send(self.request(Method::PUT, &[id.as_str(), "approve"])?)
            .await?;
        info!("approved report {}", id);
        Ok(())
    }

    async fn reject(&self, id: &ReportId, reason: &str) -> Result<(), GatewayError> {
        self.send(
            self.request(Method::PUT, &[id.as_str(), "reject"])?
                .json(&RejectBody { reason }),
        )
        .await?;
        info!("rejected report {}", id);
        Ok(())
    }

    async fn teachers_without_report(
        &self,
        batch_id: &str,
    ) -> Result<Vec<TeacherLookup>, GatewayError> {
        let envelope: DataEnvelope<Vec<TeacherLookup>> = self
            .json(self.request(Method::GET, &["missing", "teachers", batch_id])?)
            .await?;
        Ok(envelope.data)
    }

    async fn companies_without_report(
        &self,
        batch_id: &str,
    ) -> Result<Vec<CompanyLookup>, GatewayError> {
        let envelope: DataEnvelope<Vec<CompanyLookup>> = self
            .json(self.request(Method::GET, &["missing", "companies", batch_id])?)
            .await?;
        Ok(envelope.data)
    }

    async fn export_reports(&self, filters: &ReportFilters) -> Result<Vec<u8>, GatewayError> {
        let response = self
            .send(self.request(Method::GET, &["export"])?.query(&filters.query_pairs()))
            .await?;
        let bytes = response.bytes().await.map_err(GatewayError::Network)?;
        info!("received export of {} bytes", bytes.len());
        Ok(bytes.to_vec())
    }
}
