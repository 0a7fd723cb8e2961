use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use tracing::{error, info};

use crate::gateway::{GatewayError, ReportFilters, ReportGateway};
use crate::messages;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("refusing to write download named '{0}'")]
    InvalidFilename(String),
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Where a finished export ends up (the browser download, in a web client).
pub trait DownloadSink {
    fn deliver(&self, filename: &str, content: &[u8]) -> Result<PathBuf, ExportError>;
}

/// Saves downloads into a directory, creating it on first use.
#[derive(Debug, Clone)]
pub struct DirectoryDownloads {
    dir: PathBuf,
}

impl DirectoryDownloads {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl DownloadSink for DirectoryDownloads {
    fn deliver(&self, filename: &str, content: &[u8]) -> Result<PathBuf, ExportError> {
        if filename.is_empty() || filename.contains("..") || filename.contains('/') {
            return Err(ExportError::InvalidFilename(filename.to_string()));
        }

        std::fs::create_dir_all(&self.dir).map_err(|source| ExportError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let path = self.dir.join(filename);
        std::fs::write(&path, content).map_err(|source| ExportError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Success {
        filename: String,
        path: PathBuf,
        size: usize,
    },
    Failure {
        message: String,
    },
}

impl ExportOutcome {
    /// The message shown for a failed export, `None` on success.
    pub fn failure_message(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { message } => Some(message),
        }
    }
}

pub fn export_filename(date: NaiveDate) -> String {
    format!("report-export-{}.xlsx", date.format("%Y-%m-%d"))
}

/// Requests the spreadsheet export and hands the blob to the download sink.
/// The content is passed through untouched.
pub struct ExportOrchestrator<G, D> {
    gateway: G,
    sink: D,
}

impl<G: ReportGateway, D: DownloadSink> ExportOrchestrator<G, D> {
    pub fn new(gateway: G, sink: D) -> Self {
        Self { gateway, sink }
    }

    pub async fn export(&self, filters: &ReportFilters) -> ExportOutcome {
        self.export_on(filters, Local::now().date_naive()).await
    }

    pub async fn export_on(&self, filters: &ReportFilters, date: NaiveDate) -> ExportOutcome {
        let content = match self.gateway.export_reports(filters).await {
            Ok(content) => content,
            Err(GatewayError::Unauthorized) => {
                return ExportOutcome::Failure {
                    message: messages::SESSION_EXPIRED.to_string(),
                }
            }
            Err(err) => {
                error!("report export failed: {}", err);
                return ExportOutcome::Failure {
                    message: err.describe(messages::EXPORT_FAILED),
                };
            }
        };

        let filename = export_filename(date);
        match self.sink.deliver(&filename, &content) {
            Ok(path) => {
                info!("saved report export to {}", path.display());
                ExportOutcome::Success {
                    filename,
                    path,
                    size: content.len(),
                }
            }
            Err(err) => {
                error!("could not save report export: {}", err);
                ExportOutcome::Failure {
                    message: messages::DOWNLOAD_FAILED.to_string(),
                }
            }
        }
    }
}
