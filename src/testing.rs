//! Scripted in-memory gateway shared by the unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{Duration, TimeZone, Utc};
use tokio::sync::oneshot;

use crate::gateway::{
    CompanyLookup, GatewayError, PaginationState, ReportFilters, ReportGateway, ReportId,
    ReportStats, ReportStatus, SubmittedReport, SubmitterType, TeacherLookup,
};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Stats,
    List {
        page: u32,
        limit: u32,
        filters: ReportFilters,
    },
    Report(ReportId),
    Approve(ReportId),
    Reject(ReportId, String),
    Teachers(String),
    Companies(String),
    Export(ReportFilters),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Op {
    Stats,
    List,
    Report,
    Approve,
    Reject,
    Teachers,
    Companies,
    Export,
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum Failure {
    Server(u16),
    Unauthorized,
}

pub(crate) fn report(n: usize) -> SubmittedReport {
    let at = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap() + Duration::hours(n as i64);
    SubmittedReport {
        id: ReportId::new(format!("r{n}")),
        submitter_type: if n % 2 == 0 {
            SubmitterType::Company
        } else {
            SubmitterType::Teacher
        },
        submitter_code: format!("S{n:03}"),
        submitter_name: format!("Submitter {n}"),
        submitted_at: at,
        status: ReportStatus::Submitted,
        file_url: Some(format!("/uploads/report-{n}.pdf")),
        student_count: Some((n % 7) as u32),
        period: Some("HK2 2023-2024".to_string()),
        notes: None,
        created_at: at,
        updated_at: at,
    }
}

#[derive(Default)]
pub(crate) struct FakeGateway {
    calls: Mutex<Vec<Call>>,
    reports: Vec<SubmittedReport>,
    stats: ReportStats,
    teachers: Vec<TeacherLookup>,
    companies: Vec<CompanyLookup>,
    export: Vec<u8>,
    failures: Mutex<HashMap<Op, Failure>>,
    page_gates: Mutex<HashMap<u32, oneshot::Receiver<()>>>,
    op_gates: Mutex<HashMap<Op, oneshot::Receiver<()>>>,
}

impl FakeGateway {
    /// Server holding reports `r1..=rN`.
    pub(crate) fn with_reports(count: usize) -> Self {
        Self {
            reports: (1..=count).map(report).collect(),
            stats: ReportStats {
                total_teachers: 10,
                submitted_teachers: 4,
                total_companies: 5,
                submitted_companies: 5,
                total_students: 120,
                completed_students: 90,
            },
            teachers: vec![TeacherLookup {
                code: "GV01".to_string(),
                name: "Trần Thị B".to_string(),
                email: Some("b@uni.edu.vn".to_string()),
                phone: None,
                student_count: 5,
                report_status: "chua_nop".to_string(),
            }],
            companies: vec![CompanyLookup {
                code: "DN02".to_string(),
                name: "Viettel Solutions".to_string(),
                email: None,
                phone: Some("024 1234 5678".to_string()),
                student_count: 3,
                report_status: "chua_nop".to_string(),
            }],
            export: b"PK\x03\x04fake-xlsx".to_vec(),
            ..Self::default()
        }
    }

    pub(crate) fn fail(&self, op: Op, failure: Failure) {
        self.failures.lock().unwrap().insert(op, failure);
    }

    pub(crate) fn recover(&self, op: Op) {
        self.failures.lock().unwrap().remove(&op);
    }

    /// Holds the response for `page` until the returned sender fires.
    pub(crate) fn gate_page(&self, page: u32) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.page_gates.lock().unwrap().insert(page, rx);
        tx
    }

    /// Holds the response of the next `op` call until the sender fires.
    pub(crate) fn gate(&self, op: Op) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.op_gates.lock().unwrap().insert(op, rx);
        tx
    }

    async fn hold(&self, op: Op) {
        let gate = self.op_gates.lock().unwrap().remove(&op);
        if let Some(gate) = gate {
            let _ = gate.await;
        }
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, op: Op) -> usize {
        self.calls()
            .iter()
            .filter(|call| Self::op_of(call) == op)
            .count()
    }

    pub(crate) fn last_list_call(&self) -> Option<Call> {
        self.calls()
            .into_iter()
            .rev()
            .find(|call| matches!(call, Call::List { .. }))
    }

    fn op_of(call: &Call) -> Op {
        match call {
            Call::Stats => Op::Stats,
            Call::List { .. } => Op::List,
            Call::Report(_) => Op::Report,
            Call::Approve(_) => Op::Approve,
            Call::Reject(..) => Op::Reject,
            Call::Teachers(_) => Op::Teachers,
            Call::Companies(_) => Op::Companies,
            Call::Export(_) => Op::Export,
        }
    }

    fn record(&self, call: Call) -> Result<(), GatewayError> {
        let op = Self::op_of(&call);
        self.calls.lock().unwrap().push(call);
        match self.failures.lock().unwrap().get(&op) {
            None => Ok(()),
            Some(Failure::Unauthorized) => Err(GatewayError::Unauthorized),
            Some(Failure::Server(status)) => Err(GatewayError::Server {
                status: *status,
                message: None,
            }),
        }
    }

    fn matching(&self, filters: &ReportFilters) -> Vec<SubmittedReport> {
        let search = filters.search.as_deref().filter(|s| !s.is_empty());
        self.reports
            .iter()
            .filter(|r| filters.status.map_or(true, |s| r.status == s))
            .filter(|r| filters.submitter_type.map_or(true, |t| r.submitter_type == t))
            .filter(|r| search.map_or(true, |s| r.submitter_name.contains(s)))
            .cloned()
            .collect()
    }
}

impl ReportGateway for FakeGateway {
    async fn stats(&self) -> Result<ReportStats, GatewayError> {
        let outcome = self.record(Call::Stats);
        self.hold(Op::Stats).await;
        outcome?;
        Ok(self.stats)
    }

    async fn list_reports(
        &self,
        page: u32,
        limit: u32,
        filters: &ReportFilters,
    ) -> Result<(Vec<SubmittedReport>, PaginationState), GatewayError> {
        let outcome = self.record(Call::List {
            page,
            limit,
            filters: filters.clone(),
        });

        let gate = self.page_gates.lock().unwrap().remove(&page);
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        outcome?;

        let matching = self.matching(filters);
        let pagination = PaginationState {
            page,
            limit,
            total: matching.len() as u64,
            pages: 0,
        }
        .normalized();
        let start = ((pagination.page - 1) * limit) as usize;
        let records = matching
            .into_iter()
            .skip(start)
            .take(limit as usize)
            .collect();
        Ok((records, pagination))
    }

    async fn report(&self, id: &ReportId) -> Result<SubmittedReport, GatewayError> {
        let outcome = self.record(Call::Report(id.clone()));
        self.hold(Op::Report).await;
        outcome?;
        self.reports
            .iter()
            .find(|r| &r.id == id)
            .cloned()
            .ok_or(GatewayError::Server {
                status: 404,
                message: Some("Không tìm thấy báo cáo".to_string()),
            })
    }

    async fn approve(&self, id: &ReportId) -> Result<(), GatewayError> {
        self.record(Call::Approve(id.clone()))
    }

    async fn reject(&self, id: &ReportId, reason: &str) -> Result<(), GatewayError> {
        self.record(Call::Reject(id.clone(), reason.to_string()))
    }

    async fn teachers_without_report(
        &self,
        batch_id: &str,
    ) -> Result<Vec<TeacherLookup>, GatewayError> {
        let outcome = self.record(Call::Teachers(batch_id.to_string()));
        self.hold(Op::Teachers).await;
        outcome?;
        Ok(self.teachers.clone())
    }

    async fn companies_without_report(
        &self,
        batch_id: &str,
    ) -> Result<Vec<CompanyLookup>, GatewayError> {
        let outcome = self.record(Call::Companies(batch_id.to_string()));
        self.hold(Op::Companies).await;
        outcome?;
        Ok(self.companies.clone())
    }

    async fn export_reports(&self, filters: &ReportFilters) -> Result<Vec<u8>, GatewayError> {
        self.record(Call::Export(filters.clone()))?;
        Ok(self.export.clone())
    }
}

