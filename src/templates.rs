use std::sync::OnceLock;

use serde::Serialize;
use tera::{Context, Tera};

use crate::export::ExportOutcome;
use crate::gateway::{CompanyLookup, ReportId, SubmittedReport, TeacherLookup};
use crate::store::{FetchStatus, LookupState, ReportListState, StatsState};

const STATS: &str = r#"Báo cáo thực tập - thống kê
{% if error %}! {{ error }}
{% endif -%}
{% if rows -%}
{% for row in rows %}{{ row.label }}: {{ row.done }}/{{ row.total }} ({{ row.percent }}%)
{% endfor -%}
{% else %}(chưa có dữ liệu)
{% endif -%}
"#;

const REPORTS: &str = r#"Báo cáo đã nộp - trang {{ page }}/{{ pages }} ({{ total }} báo cáo)
{% if filters %}Lọc: {{ filters }}
{% endif -%}
{% if loading %}(đang tải...)
{% endif -%}
{% if error %}! {{ error }}
{% endif -%}
{% if rows -%}
{% for row in rows %}[{{ row.id }}] {{ row.status }} | {{ row.submitter_type }} {{ row.submitter_code }} - {{ row.submitter_name }} | nộp {{ row.submitted_at }}{% if row.period %} | {{ row.period }}{% endif %}{% if row.student_count %} | {{ row.student_count }} SV{% endif %}
{% endfor -%}
{% else %}(không có báo cáo)
{% endif -%}
{% if has_previous %}Trang trước: --page {{ page - 1 }}
{% endif -%}
{% if has_next %}Trang sau: --page {{ page + 1 }}
{% endif -%}
"#;

const REPORT: &str = r#"{% if error %}! {{ error }}
{% endif -%}
{% if report -%}
Báo cáo {{ report.id }}
  Người nộp:   {{ report.submitter_type }} {{ report.submitter_code }} - {{ report.submitter_name }}
  Trạng thái:  {{ report.status }}
  Nộp lúc:     {{ report.submitted_at }}
{% if report.period %}  Kỳ:          {{ report.period }}
{% endif -%}
{% if report.student_count %}  Sinh viên:   {{ report.student_count }}
{% endif -%}
{% if report.file_url %}  Tệp:         {{ report.file_url }}
{% endif -%}
{% if report.notes %}  Ghi chú:     {{ report.notes }}
{% endif -%}
{% else %}(không tìm thấy báo cáo)
{% endif -%}
"#;

const MISSING: &str = r#"{{ title }}{% if batch %} - đợt {{ batch }}{% endif %}
{% if error %}! {{ error }}
{% endif -%}
{% if rows -%}
{% for row in rows %}{{ row.code }} - {{ row.name }}{% if row.contact %} ({{ row.contact }}){% endif %} | {{ row.student_count }} SV | {{ row.report_status }}
{% endfor -%}
{% else %}(không có)
{% endif -%}
"#;

const EXPORT: &str = r#"{% if success %}Đã lưu {{ filename }} ({{ size }} byte) vào {{ path }}
{% else %}! {{ message }}
{% endif -%}
"#;

static TERA: OnceLock<Result<Tera, String>> = OnceLock::new();

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("templates failed to load: {0}")]
    Load(String),
    #[error("template rendering failed: {0}")]
    Render(#[from] tera::Error),
}

pub fn get_tera() -> Result<&'static Tera, RenderError> {
    TERA.get_or_init(|| {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            ("stats.txt", STATS),
            ("reports.txt", REPORTS),
            ("report.txt", REPORT),
            ("missing.txt", MISSING),
            ("export.txt", EXPORT),
        ])
        .map(|_| tera)
        .map_err(|e| e.to_string())
    })
    .as_ref()
    .map_err(|e| RenderError::Load(e.clone()))
}

fn render(name: &str, ctx: &Context) -> Result<String, RenderError> {
    Ok(get_tera()?.render(name, ctx)?)
}

#[derive(Serialize)]
struct StatRow {
    label: &'static str,
    done: u64,
    total: u64,
    percent: String,
}

pub fn render_stats(state: &StatsState) -> Result<String, RenderError> {
    let rows: Vec<StatRow> = state
        .stats
        .map(|stats| {
            vec![
                StatRow {
                    label: "Giáo viên đã nộp",
                    done: stats.submitted_teachers,
                    total: stats.total_teachers,
                    percent: format!("{:.1}", stats.teacher_ratio() * 100.0),
                },
                StatRow {
                    label: "Doanh nghiệp đã nộp",
                    done: stats.submitted_companies,
                    total: stats.total_companies,
                    percent: format!("{:.1}", stats.company_ratio() * 100.0),
                },
                StatRow {
                    label: "Sinh viên hoàn thành",
                    done: stats.completed_students,
                    total: stats.total_students,
                    percent: format!("{:.1}", stats.student_ratio() * 100.0),
                },
            ]
        })
        .unwrap_or_default();

    let mut ctx = Context::new();
    ctx.insert("rows", &rows);
    ctx.insert("error", &state.error);
    render("stats.txt", &ctx)
}

#[derive(Serialize)]
struct ReportView {
    id: String,
    submitter_type: &'static str,
    submitter_code: String,
    submitter_name: String,
    submitted_at: String,
    status: &'static str,
    period: Option<String>,
    student_count: Option<u32>,
    file_url: Option<String>,
    notes: Option<String>,
}

impl From<&SubmittedReport> for ReportView {
    fn from(report: &SubmittedReport) -> Self {
        Self {
            id: report.id.to_string(),
            submitter_type: report.submitter_type.label(),
            submitter_code: report.submitter_code.clone(),
            submitter_name: report.submitter_name.clone(),
            submitted_at: report.submitted_at.format("%Y-%m-%d %H:%M").to_string(),
            status: report.status.label(),
            period: report.period.clone(),
            student_count: report.student_count,
            file_url: report.file_url.clone(),
            notes: report.notes.clone(),
        }
    }
}

pub fn render_reports(state: &ReportListState) -> Result<String, RenderError> {
    let rows: Vec<ReportView> = state.records.iter().map(ReportView::from).collect();

    let mut ctx = Context::new();
    ctx.insert("rows", &rows);
    ctx.insert("page", &state.pagination.page);
    ctx.insert("pages", &state.pagination.pages.max(1));
    ctx.insert("total", &state.pagination.total);
    ctx.insert("filters", &describe_filters(state));
    ctx.insert("has_previous", &state.pagination.has_previous());
    ctx.insert("has_next", &state.pagination.has_next());
    ctx.insert("loading", &(state.status == FetchStatus::Loading));
    ctx.insert("error", &state.error);
    render("reports.txt", &ctx)
}

fn describe_filters(state: &ReportListState) -> String {
    state
        .filters
        .query_pairs()
        .into_iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn render_report(
    state: &LookupState<ReportId, Option<SubmittedReport>>,
) -> Result<String, RenderError> {
    let mut ctx = Context::new();
    ctx.insert("report", &state.data.as_ref().map(ReportView::from));
    ctx.insert("error", &state.error);
    render("report.txt", &ctx)
}

#[derive(Serialize)]
struct MissingRow<'a> {
    code: &'a str,
    name: &'a str,
    contact: Option<String>,
    student_count: u32,
    report_status: &'a str,
}

fn contact(email: &Option<String>, phone: &Option<String>) -> Option<String> {
    let parts: Vec<&str> = [email, phone]
        .into_iter()
        .filter_map(|part| part.as_deref())
        .filter(|part| !part.is_empty())
        .collect();
    (!parts.is_empty()).then(|| parts.join(", "))
}

fn render_missing(
    title: &str,
    batch: Option<&String>,
    rows: &[MissingRow<'_>],
    error: &Option<String>,
) -> Result<String, RenderError> {
    let mut ctx = Context::new();
    ctx.insert("title", title);
    ctx.insert("batch", &batch);
    ctx.insert("rows", rows);
    ctx.insert("error", error);
    render("missing.txt", &ctx)
}

pub fn render_missing_teachers(
    state: &LookupState<String, Vec<TeacherLookup>>,
) -> Result<String, RenderError> {
    let rows: Vec<MissingRow<'_>> = state
        .data
        .iter()
        .map(|teacher| MissingRow {
            code: &teacher.code,
            name: &teacher.name,
            contact: contact(&teacher.email, &teacher.phone),
            student_count: teacher.student_count,
            report_status: &teacher.report_status,
        })
        .collect();
    render_missing(
        "Giáo viên chưa nộp báo cáo",
        state.key.as_ref(),
        &rows,
        &state.error,
    )
}

pub fn render_missing_companies(
    state: &LookupState<String, Vec<CompanyLookup>>,
) -> Result<String, RenderError> {
    let rows: Vec<MissingRow<'_>> = state
        .data
        .iter()
        .map(|company| MissingRow {
            code: &company.code,
            name: &company.name,
            contact: contact(&company.email, &company.phone),
            student_count: company.student_count,
            report_status: &company.report_status,
        })
        .collect();
    render_missing(
        "Doanh nghiệp chưa nộp báo cáo",
        state.key.as_ref(),
        &rows,
        &state.error,
    )
}

pub fn render_export(outcome: &ExportOutcome) -> Result<String, RenderError> {
    let mut ctx = Context::new();
    match outcome {
        ExportOutcome::Success {
            filename,
            path,
            size,
        } => {
            ctx.insert("success", &true);
            ctx.insert("filename", filename);
            ctx.insert("path", &path.display().to_string());
            ctx.insert("size", size);
        }
        ExportOutcome::Failure { message } => {
            ctx.insert("success", &false);
            ctx.insert("message", message);
        }
    }
    render("export.txt", &ctx)
}
