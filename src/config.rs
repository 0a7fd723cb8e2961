use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} must be a positive integer, got '{value}'")]
    InvalidNumber { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub page_size: u32,
    pub http_timeout: Duration,
    pub session_file: PathBuf,
    pub download_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from any variable source; `from_env` passes the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = lookup("REPORTS_API_URL")
            .unwrap_or_else(|| "http://localhost:5000/api".to_string());

        let page_size = positive(&lookup, "REPORTS_PAGE_SIZE", 20)?;
        let timeout_secs = positive(&lookup, "REPORTS_HTTP_TIMEOUT_SECS", 30)?;

        let base_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let session_file = base_dir.join(
            lookup("REPORTS_SESSION_FILE")
                .unwrap_or_else(|| ".report-console/session.json".to_string()),
        );
        let download_dir = base_dir.join(
            lookup("REPORTS_DOWNLOAD_DIR").unwrap_or_else(|| "downloads".to_string()),
        );

        Ok(Self {
            api_url,
            page_size,
            http_timeout: Duration::from_secs(u64::from(timeout_secs)),
            session_file,
            download_dir,
        })
    }
}

fn positive<F>(lookup: &F, name: &'static str, default: u32) -> Result<u32, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => match value.trim().parse::<u32>() {
            Ok(parsed) if parsed > 0 => Ok(parsed),
            _ => Err(ConfigError::InvalidNumber { name, value }),
        },
    }
}
