use clap::{Args, Parser, Subcommand};
use tracing::info;

use crate::config::Config;
use crate::export::{DirectoryDownloads, ExportOrchestrator, ExportOutcome};
use crate::gateway::{GatewayError, ReportFilters, ReportId, ReportStatus, SubmitterType};
use crate::messages;
use crate::session::{SessionStore, SessionUser, UserRole};
use crate::state::ConsoleState;
use crate::store::{
    CompaniesWithoutReportQuery, ReportDetailQuery, ReportStore, StatsQuery,
    TeachersWithoutReportQuery,
};
use crate::templates;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Parser, Debug)]
#[command(
    name = "report-console",
    about = "Review internship reports submitted by teachers and host companies",
    version
)]
pub struct Cli {
    /// Override REPORTS_API_URL
    #[arg(long, global = true)]
    api_url: Option<String>,
    /// Override REPORTS_PAGE_SIZE
    #[arg(long, global = true)]
    page_size: Option<u32>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submission statistics with completion ratios
    Stats,
    /// Statistics and the first page of reports, loaded side by side
    Dashboard,
    /// List submitted reports
    List(ListArgs),
    /// Show a single report
    Show { id: String },
    /// Approve a report and show the updated page
    Approve {
        id: String,
        #[command(flatten)]
        list: ListArgs,
    },
    /// Reject a report and show the updated page
    Reject {
        id: String,
        #[arg(long)]
        reason: String,
        #[command(flatten)]
        list: ListArgs,
    },
    /// Teachers of a batch who have not submitted a report
    MissingTeachers { batch: String },
    /// Host companies of a batch who have not submitted a report
    MissingCompanies { batch: String },
    /// Export matching reports to a spreadsheet in the download directory
    Export(FilterArgs),
    /// Manage the stored credentials
    Session {
        #[command(subcommand)]
        command: SessionCommand,
    },
}

#[derive(Args, Debug, Default, Clone)]
struct FilterArgs {
    /// giao_vien | doanh_nghiep (or teacher | company)
    #[arg(long)]
    submitter_type: Option<SubmitterType>,
    /// da_nop | da_duyet | tu_choi (or submitted | approved | rejected)
    #[arg(long)]
    status: Option<ReportStatus>,
    /// Free-text search on submitter code or name
    #[arg(long)]
    search: Option<String>,
}

impl From<FilterArgs> for ReportFilters {
    fn from(args: FilterArgs) -> Self {
        Self {
            submitter_type: args.submitter_type,
            status: args.status,
            search: args.search,
        }
    }
}

#[derive(Args, Debug, Clone)]
struct ListArgs {
    #[arg(long, default_value_t = 1)]
    page: u32,
    #[command(flatten)]
    filters: FilterArgs,
}

#[derive(Subcommand, Debug)]
enum SessionCommand {
    /// Store a bearer token and user identity
    Set {
        #[arg(long)]
        token: String,
        #[arg(long)]
        id: String,
        #[arg(long)]
        user_id: String,
        #[arg(long, default_value = "admin")]
        role: UserRole,
    },
    /// Print the stored identity
    Show,
    /// Forget the stored credentials
    Clear,
}

pub async fn run(cli: Cli) -> Result<(), BoxError> {
    let mut config = Config::from_env()?;
    if let Some(api_url) = cli.api_url {
        config.api_url = api_url;
    }
    if let Some(page_size) = cli.page_size.filter(|size| *size > 0) {
        config.page_size = page_size;
    }

    let state = ConsoleState::new(config)?;
    info!("using admin API at {}", state.gateway.base_url());

    match cli.command {
        Command::Stats => {
            let stats = StatsQuery::new(state.gateway.clone());
            let result = stats.load().await;
            print!("{}", templates::render_stats(&stats.snapshot())?);
            finish(result)
        }
        Command::Dashboard => {
            let stats = StatsQuery::new(state.gateway.clone());
            let store = ReportStore::new(state.gateway.clone(), state.config.page_size);
            let (stats_result, list_result) =
                tokio::join!(stats.load(), store.fetch(1, ReportFilters::default()));
            print!("{}", templates::render_stats(&stats.snapshot())?);
            println!();
            print!("{}", templates::render_reports(&store.snapshot())?);
            finish(stats_result.and(list_result))
        }
        Command::List(args) => {
            let store = ReportStore::new(state.gateway.clone(), state.config.page_size);
            let result = store.fetch(args.page, args.filters.into()).await;
            print!("{}", templates::render_reports(&store.snapshot())?);
            finish(result)
        }
        Command::Show { id } => {
            let detail = ReportDetailQuery::new(state.gateway.clone());
            let result = detail.set_key(Some(ReportId::new(id))).await;
            print!("{}", templates::render_report(&detail.snapshot())?);
            finish(result)
        }
        Command::Approve { id, list } => {
            let store = ReportStore::new(state.gateway.clone(), state.config.page_size);
            load_page(&store, &list).await?;
            let result = store.approve(&ReportId::new(id)).await;
            print!("{}", templates::render_reports(&store.snapshot())?);
            finish(result)
        }
        Command::Reject { id, reason, list } => {
            let store = ReportStore::new(state.gateway.clone(), state.config.page_size);
            load_page(&store, &list).await?;
            let result = store.reject(&ReportId::new(id), &reason).await;
            print!("{}", templates::render_reports(&store.snapshot())?);
            finish(result)
        }
        Command::MissingTeachers { batch } => {
            let query = TeachersWithoutReportQuery::new(state.gateway.clone());
            let result = query.set_key(non_empty(batch)).await;
            print!("{}", templates::render_missing_teachers(&query.snapshot())?);
            finish(result)
        }
        Command::MissingCompanies { batch } => {
            let query = CompaniesWithoutReportQuery::new(state.gateway.clone());
            let result = query.set_key(non_empty(batch)).await;
            print!("{}", templates::render_missing_companies(&query.snapshot())?);
            finish(result)
        }
        Command::Export(filters) => {
            let orchestrator = ExportOrchestrator::new(
                state.gateway.clone(),
                DirectoryDownloads::new(state.config.download_dir.clone()),
            );
            let outcome = orchestrator.export(&filters.into()).await;
            print!("{}", templates::render_export(&outcome)?);
            export_status(&outcome)
        }
        Command::Session { command } => run_session(&state, command),
    }
}

/// Loads the page a mutation is shown against. A failed load still lets the
/// mutation go through; only a rejected session stops here.
async fn load_page<G: crate::gateway::ReportGateway>(
    store: &ReportStore<G>,
    list: &ListArgs,
) -> Result<(), BoxError> {
    match store.fetch(list.page, list.filters.clone().into()).await {
        Err(GatewayError::Unauthorized) => Err(messages::SESSION_EXPIRED.into()),
        _ => Ok(()),
    }
}

fn finish(result: Result<(), GatewayError>) -> Result<(), BoxError> {
    match result {
        Ok(()) => Ok(()),
        Err(GatewayError::Unauthorized) => Err(messages::SESSION_EXPIRED.into()),
        Err(err) => Err(err.into()),
    }
}

fn export_status(outcome: &ExportOutcome) -> Result<(), BoxError> {
    match outcome.failure_message() {
        None => Ok(()),
        Some(message) => Err(message.into()),
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn run_session(state: &ConsoleState, command: SessionCommand) -> Result<(), BoxError> {
    match command {
        SessionCommand::Set {
            token,
            id,
            user_id,
            role,
        } => {
            let user = SessionUser { id, user_id, role };
            state.sessions.save(&token, &user)?;
            println!(
                "Saved session for {} ({}) to {}",
                user.user_id,
                user.role,
                state.sessions.path().display()
            );
        }
        SessionCommand::Show => match state.sessions.user() {
            Some(user) => println!(
                "{} (id {}, role {}), token {}",
                user.user_id,
                user.id,
                user.role,
                if state.sessions.token().is_some() {
                    "present"
                } else {
                    "missing"
                }
            ),
            None => println!("No stored session"),
        },
        SessionCommand::Clear => {
            state.sessions.clear()?;
            println!("Session cleared");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_failure_surfaces_its_own_message() {
        let expired = ExportOutcome::Failure {
            message: messages::SESSION_EXPIRED.to_string(),
        };
        let err = export_status(&expired).unwrap_err();
        assert_eq!(err.to_string(), messages::SESSION_EXPIRED);

        let download = ExportOutcome::Failure {
            message: messages::DOWNLOAD_FAILED.to_string(),
        };
        assert_eq!(
            export_status(&download).unwrap_err().to_string(),
            messages::DOWNLOAD_FAILED
        );

        let saved = ExportOutcome::Success {
            filename: "report-export-2024-05-02.xlsx".to_string(),
            path: std::path::PathBuf::from("downloads/report-export-2024-05-02.xlsx"),
            size: 13,
        };
        assert!(export_status(&saved).is_ok());
    }

    #[test]
    fn parses_list_filters() {
        let cli = Cli::try_parse_from([
            "report-console",
            "list",
            "--page",
            "3",
            "--status",
            "approved",
            "--submitter-type",
            "doanh_nghiep",
        ])
        .unwrap();

        match cli.command {
            Command::List(args) => {
                assert_eq!(args.page, 3);
                let filters: ReportFilters = args.filters.into();
                assert_eq!(filters.status, Some(ReportStatus::Approved));
                assert_eq!(filters.submitter_type, Some(SubmitterType::Company));
                assert_eq!(filters.search, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn reject_requires_reason() {
        assert!(Cli::try_parse_from(["report-console", "reject", "r2"]).is_err());
        assert!(
            Cli::try_parse_from(["report-console", "reject", "r2", "--reason", "thiếu hồ sơ"])
                .is_ok()
        );
    }

    #[test]
    fn blank_batch_is_no_key() {
        assert_eq!(non_empty("  ".to_string()), None);
        assert_eq!(non_empty(" 2024A ".to_string()), Some("2024A".to_string()));
    }
}
