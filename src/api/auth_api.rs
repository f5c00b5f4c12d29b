use crate::api::lockbox_api::LockboxApiClient;
use crate::api::FetchError;
use crate::utils::data::{load_from_cache, save_to_cache};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub email: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// What `/api/login` and `/api/signup` hand back
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    #[serde(default)]
    pub user: Option<User>,
}

/// The bearer session, persisted to a JSON file so it survives restarts
#[derive(Debug)]
pub struct TokenStore {
    path: PathBuf,
    session: RwLock<Option<Session>>,
}

impl TokenStore {
    /// Open the store, loading a saved session if the file exists.
    /// An unreadable session file is discarded and the store starts signed out.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let session = if path.exists() {
            match load_from_cache::<Session>(&path) {
                Ok(session) => Some(session),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "discarding unreadable session file");
                    if let Err(e) = std::fs::remove_file(&path) {
                        warn!(path = %path.display(), error = %e, "could not remove session file");
                    }
                    None
                }
            }
        } else {
            None
        };
        Self {
            path,
            session: RwLock::new(session),
        }
    }

    /// A store that never touches the disk
    pub fn in_memory() -> Self {
        Self {
            path: PathBuf::new(),
            session: RwLock::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn session(&self) -> Option<Session> {
        self.session
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn token(&self) -> Option<String> {
        self.session().map(|s| s.token)
    }

    pub fn save(&self, session: Session) -> Result<()> {
        if !self.path.as_os_str().is_empty() {
            save_to_cache(&session, &self.path).context("Failed to save session")?;
        }
        *self.session.write().unwrap_or_else(|e| e.into_inner()) = Some(session);
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        *self.session.write().unwrap_or_else(|e| e.into_inner()) = None;
        if self.path.as_os_str().is_empty() {
            return Ok(());
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).context("Failed to remove saved session"),
        }
    }
}

impl LockboxApiClient {
    /// Sign in and remember the session
    pub async fn login(&self, credentials: &Credentials) -> Result<Session, FetchError> {
        self.authenticate("/api/login", credentials).await
    }

    /// Create an account and remember the session
    pub async fn signup(&self, credentials: &Credentials) -> Result<Session, FetchError> {
        self.authenticate("/api/signup", credentials).await
    }

    async fn authenticate(
        &self,
        path: &str,
        credentials: &Credentials,
    ) -> Result<Session, FetchError> {
        let request = self.client.post(self.url(path)).json(credentials);
        let payload = match self.send_json(request).await {
            Err(FetchError::Http { status: 401 | 403 }) => return Err(FetchError::Auth),
            other => other?,
        };

        let session: Session = serde_json::from_value(payload)
            .map_err(|e| FetchError::Parse(format!("auth response: {}", e)))?;
        if session.token.is_empty() {
            return Err(FetchError::Parse("auth response: empty token".to_string()));
        }

        if let Some(store) = &self.tokens {
            if let Err(e) = store.save(session.clone()) {
                warn!(error = %e, "signed in but could not persist the session");
            }
        }
        info!(
            path,
            email = session.user.as_ref().map(|u| u.email.as_str()).unwrap_or_default(),
            "signed in"
        );
        Ok(session)
    }

    /// Forget the stored session
    pub fn logout(&self) -> Result<()> {
        match &self.tokens {
            Some(store) => store.clear(),
            None => Ok(()),
        }
    }
}
