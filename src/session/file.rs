use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use super::{SessionError, SessionStore, SessionUser};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoredSession {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user: Option<SessionUser>,
}

/// Session persisted as a small JSON document on disk.
///
/// Reads go to disk every time so a `session set` in another shell is picked
/// up; writes are serialized through the mutex.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<StoredSession, SessionError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(StoredSession::default())
            }
            Err(source) => {
                return Err(SessionError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        serde_json::from_str(&raw).map_err(|source| SessionError::Format {
            path: self.path.clone(),
            source,
        })
    }

    fn read_or_empty(&self) -> StoredSession {
        self.read().unwrap_or_else(|err| {
            tracing::warn!("ignoring unreadable session: {}", err);
            StoredSession::default()
        })
    }
}

impl SessionStore for FileSessionStore {
    fn token(&self) -> Option<String> {
        self.read_or_empty().token
    }

    fn user(&self) -> Option<SessionUser> {
        self.read_or_empty().user
    }

    fn save(&self, token: &str, user: &SessionUser) -> Result<(), SessionError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let io_err = |source| SessionError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let stored = StoredSession {
            token: Some(token.to_string()),
            user: Some(user.clone()),
        };
        let body = serde_json::to_string_pretty(&stored).map_err(|source| SessionError::Format {
            path: self.path.clone(),
            source,
        })?;
        std::fs::write(&self.path, body).map_err(io_err)
    }

    fn clear(&self) -> Result<(), SessionError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(SessionError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

/// In-process session, for tests and embedding.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    inner: Mutex<StoredSession>,
}

impl SessionStore for MemorySessionStore {
    fn token(&self) -> Option<String> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .token
            .clone()
    }

    fn user(&self) -> Option<SessionUser> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .user
            .clone()
    }

    fn save(&self, token: &str, user: &SessionUser) -> Result<(), SessionError> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.token = Some(token.to_string());
        inner.user = Some(user.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = StoredSession::default();
        Ok(())
    }
}
