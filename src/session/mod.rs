//! Client-side session: the bearer token and user identity the console
//! persists, plus the hooks the gateway uses to force a logout.

mod file;

pub use file::{FileSessionStore, MemorySessionStore};

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, warn};

pub const ADMIN_LOGIN_ROUTE: &str = "/admin/login";
pub const ROOT_ROUTE: &str = "/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Student,
    Teacher,
    Admin,
}

impl UserRole {
    /// Where an expired session for this role lands.
    pub fn login_route(&self) -> &'static str {
        match self {
            Self::Admin => ADMIN_LOGIN_ROUTE,
            Self::Student | Self::Teacher => ROOT_ROUTE,
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Student => "student",
            Self::Teacher => "teacher",
            Self::Admin => "admin",
        })
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "student" => Ok(Self::Student),
            "teacher" => Ok(Self::Teacher),
            "admin" => Ok(Self::Admin),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: String,
    pub user_id: String,
    pub role: UserRole,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("session file {path} is not valid JSON: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Persistent storage for the two session keys (token and user).
pub trait SessionStore: Send + Sync {
    fn token(&self) -> Option<String>;
    fn user(&self) -> Option<SessionUser>;
    fn save(&self, token: &str, user: &SessionUser) -> Result<(), SessionError>;
    fn clear(&self) -> Result<(), SessionError>;
}

/// Navigation side effect fired when the session is invalidated.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: &str);
}

/// Navigator for headless use: records nothing, only logs the redirect.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate(&self, route: &str) {
        warn!("session invalidated, redirecting to {}", route);
    }
}

/// Session handle passed to the gateway at construction.
#[derive(Clone)]
pub struct SessionContext {
    store: Arc<dyn SessionStore>,
    navigator: Arc<dyn Navigator>,
}

impl SessionContext {
    pub fn new(store: Arc<dyn SessionStore>, navigator: Arc<dyn Navigator>) -> Self {
        Self { store, navigator }
    }

    pub fn bearer_token(&self) -> Option<String> {
        self.store.token().filter(|token| !token.is_empty())
    }

    pub fn user(&self) -> Option<SessionUser> {
        self.store.user()
    }

    /// Clears the stored session and sends the user to their login route.
    /// Users without a stored identity are treated as admins.
    pub fn invalidate(&self) {
        let route = self
            .store
            .user()
            .map(|user| user.role.login_route())
            .unwrap_or(ADMIN_LOGIN_ROUTE);

        if let Err(err) = self.store.clear() {
            error!("failed to clear session: {}", err);
        }
        self.navigator.navigate(route);
    }
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionContext")
            .field("authenticated", &self.bearer_token().is_some())
            .finish()
    }
}
