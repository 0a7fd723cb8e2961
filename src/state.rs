use std::sync::Arc;

use crate::config::Config;
use crate::gateway::{GatewayError, HttpReportGateway};
use crate::session::{FileSessionStore, LogNavigator, SessionContext};

/// Shared handles for one console run.
#[derive(Clone)]
pub struct ConsoleState {
    pub config: Arc<Config>,
    pub sessions: Arc<FileSessionStore>,
    pub gateway: Arc<HttpReportGateway>,
}

impl ConsoleState {
    pub fn new(config: Config) -> Result<Self, GatewayError> {
        let sessions = Arc::new(FileSessionStore::new(config.session_file.clone()));
        let session = SessionContext::new(sessions.clone(), Arc::new(LogNavigator));
        let gateway = HttpReportGateway::new(&config.api_url, config.http_timeout, session)?;

        Ok(Self {
            config: Arc::new(config),
            sessions,
            gateway: Arc::new(gateway),
        })
    }
}
