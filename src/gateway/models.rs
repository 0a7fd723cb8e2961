use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Opaque report identifier. The API sends either a string or a number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ReportId(String);

impl ReportId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ReportId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl<'de> Deserialize<'de> for ReportId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(i64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(text) => Self(text),
            Raw::Number(number) => Self(number.to_string()),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubmitterType {
    #[serde(rename = "giao_vien")]
    Teacher,
    #[serde(rename = "doanh_nghiep")]
    Company,
}

impl SubmitterType {
    pub fn as_wire(&self) -> &'static str {
        match self {
            Self::Teacher => "giao_vien",
            Self::Company => "doanh_nghiep",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Teacher => "Giáo viên",
            Self::Company => "Doanh nghiệp",
        }
    }
}

impl FromStr for SubmitterType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "giao_vien" | "teacher" => Ok(Self::Teacher),
            "doanh_nghiep" | "company" => Ok(Self::Company),
            other => Err(format!("unknown submitter type '{other}'")),
        }
    }
}

/// Review status. `Submitted` only ever moves to one of the terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReportStatus {
    #[serde(rename = "da_nop")]
    Submitted,
    #[serde(rename = "da_duyet")]
    Approved,
    #[serde(rename = "tu_choi")]
    Rejected,
}

impl ReportStatus {
    pub fn as_wire(&self) -> &'static str {
        match self {
            Self::Submitted => "da_nop",
            Self::Approved => "da_duyet",
            Self::Rejected => "tu_choi",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Submitted => "Đã nộp",
            Self::Approved => "Đã duyệt",
            Self::Rejected => "Từ chối",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Submitted)
    }
}

impl FromStr for ReportStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "da_nop" | "submitted" => Ok(Self::Submitted),
            "da_duyet" | "approved" => Ok(Self::Approved),
            "tu_choi" | "rejected" => Ok(Self::Rejected),
            other => Err(format!("unknown report status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedReport {
    pub id: ReportId,
    pub submitter_type: SubmitterType,
    pub submitter_code: String,
    pub submitter_name: String,
    pub submitted_at: DateTime<Utc>,
    pub status: ReportStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Optional constraints for listing and export. `None` means unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportFilters {
    pub submitter_type: Option<SubmitterType>,
    pub status: Option<ReportStatus>,
    pub search: Option<String>,
}

impl ReportFilters {
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn with_status(mut self, status: ReportStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_submitter_type(mut self, submitter_type: SubmitterType) -> Self {
        self.submitter_type = Some(submitter_type);
        self
    }

    /// Query pairs for the request. Absent and empty values are left out.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(kind) = self.submitter_type {
            pairs.push(("submitterType", kind.as_wire().to_string()));
        }
        if let Some(status) = self.status {
            pairs.push(("status", status.as_wire().to_string()));
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            pairs.push(("search", search.to_string()));
        }
        pairs
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationState {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub pages: u32,
}

impl PaginationState {
    pub fn empty(limit: u32) -> Self {
        Self {
            page: 1,
            limit,
            total: 0,
            pages: 0,
        }
    }

    /// Recomputes `pages` from `total` and `limit` and clamps `page` into range.
    pub fn normalized(self) -> Self {
        let pages = if self.limit == 0 {
            0
        } else {
            u32::try_from(self.total.div_ceil(u64::from(self.limit))).unwrap_or(u32::MAX)
        };
        let page = self.page.clamp(1, pages.max(1));
        Self { page, pages, ..self }
    }

    pub fn has_next(&self) -> bool {
        self.page < self.pages
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }
}

/// Aggregate counts. Each field is sourced on its own server side, so a
/// missing field decodes as zero instead of failing the whole payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportStats {
    pub total_teachers: u64,
    pub submitted_teachers: u64,
    pub total_companies: u64,
    pub submitted_companies: u64,
    pub total_students: u64,
    pub completed_students: u64,
}

impl ReportStats {
    pub fn teacher_ratio(&self) -> f64 {
        ratio(self.submitted_teachers, self.total_teachers)
    }

    pub fn company_ratio(&self) -> f64 {
        ratio(self.submitted_companies, self.total_companies)
    }

    pub fn student_ratio(&self) -> f64 {
        ratio(self.completed_students, self.total_students)
    }
}

fn ratio(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherLookup {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub student_count: u32,
    pub report_status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyLookup {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub student_count: u32,
    pub report_status: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DataEnvelope<T> {
    pub data: T,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PageEnvelope<T> {
    pub data: Vec<T>,
    pub pagination: PaginationState,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RejectBody<'a> {
    pub reason: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_pairs_skip_empty_and_absent_fields() {
        let filters = ReportFilters {
            submitter_type: None,
            status: None,
            search: Some("abc".to_string()),
        };
        assert_eq!(filters.query_pairs(), vec![("search", "abc".to_string())]);

        let empty = ReportFilters::default().with_search("");
        assert!(empty.query_pairs().is_empty());
    }

    #[test]
    fn query_pairs_use_wire_values() {
        let filters = ReportFilters::default()
            .with_submitter_type(SubmitterType::Company)
            .with_status(ReportStatus::Approved);
        assert_eq!(
            filters.query_pairs(),
            vec![
                ("submitterType", "doanh_nghiep".to_string()),
                ("status", "da_duyet".to_string()),
            ]
        );
    }

    #[test]
    fn normalized_pagination_rounds_pages_up() {
        let state = PaginationState {
            page: 1,
            limit: 20,
            total: 45,
            pages: 0,
        }
        .normalized();
        assert_eq!(state.pages, 3);
        assert_eq!(state.page, 1);
    }

    #[test]
    fn normalized_pagination_clamps_page() {
        let past_end = PaginationState {
            page: 9,
            limit: 10,
            total: 25,
            pages: 9,
        }
        .normalized();
        assert_eq!(past_end.pages, 3);
        assert_eq!(past_end.page, 3);

        let empty = PaginationState {
            page: 0,
            limit: 10,
            total: 0,
            pages: 0,
        }
        .normalized();
        assert_eq!(empty.pages, 0);
        assert_eq!(empty.page, 1);
    }

    #[test]
    fn report_id_accepts_numbers() {
        let id: ReportId = serde_json::from_str("42").expect("numeric id");
        assert_eq!(id.as_str(), "42");
        let id: ReportId = serde_json::from_str("\"r1\"").expect("string id");
        assert_eq!(id.as_str(), "r1");
    }

    #[test]
    fn stats_tolerate_missing_counts() {
        let stats: ReportStats =
            serde_json::from_str(r#"{"totalTeachers": 12, "submittedTeachers": 3}"#)
                .expect("partial stats");
        assert_eq!(stats.total_teachers, 12);
        assert_eq!(stats.total_companies, 0);
        assert_eq!(stats.teacher_ratio(), 0.25);
        assert_eq!(stats.company_ratio(), 0.0);
    }

    #[test]
    fn parses_filter_values_from_either_vocabulary() {
        assert_eq!("teacher".parse::<SubmitterType>(), Ok(SubmitterType::Teacher));
        assert_eq!("doanh_nghiep".parse::<SubmitterType>(), Ok(SubmitterType::Company));
        assert_eq!("tu_choi".parse::<ReportStatus>(), Ok(ReportStatus::Rejected));
        assert!("pending".parse::<ReportStatus>().is_err());
    }
}
