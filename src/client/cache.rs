//! File-backed cache of the last signed-in session.
//!
//! A cached session is only ever returned when it carries a usable identity:
//! a non-empty `userID`, an email and a name. Anything else found on disk is removed.

use std::path::{Path, PathBuf};

use axum::http::{
    header::{InvalidHeaderValue, AUTHORIZATION},
    HeaderMap, HeaderValue,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("session is missing {0}")]
    Incomplete(&'static str),
    #[error("cache file: {0}")]
    Io(#[from] std::io::Error),
    #[error("cache encoding: {0}")]
    Json(#[from] serde_json::Error),
    #[error("identity is not a valid header value")]
    Header(#[from] InvalidHeaderValue),
}

/// The user record as returned by the auth endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CachedUser {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "userID", default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

fn filled(v: &Option<String>) -> bool {
    v.as_deref().is_some_and(|s| !s.trim().is_empty())
}

impl CachedUser {
    /// The same completeness rule `save` enforces.
    fn is_usable(&self) -> bool {
        filled(&self.user_id) && filled(&self.email) && filled(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedSession {
    pub user: CachedUser,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl CachedSession {
    /// Attaches the cached identity: the bearer token when there is one,
    /// otherwise the `User-ID` header.
    pub fn apply(&self, headers: &mut HeaderMap) -> Result<(), CacheError> {
        if let Some(token) = self.token.as_deref().filter(|t| !t.is_empty()) {
            headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {token}"))?);
            return Ok(());
        }
        let user_id = self
            .user
            .user_id
            .as_deref()
            .ok_or(CacheError::Incomplete("userID"))?;
        headers.insert("user-id", HeaderValue::from_str(user_id)?);
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct AuthCache {
    path: PathBuf,
}

impl AuthCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn save(&self, mut session: CachedSession) -> Result<CachedSession, CacheError> {
        if !filled(&session.user.user_id) {
            if !filled(&session.user.id) {
                return Err(CacheError::Incomplete("userID"));
            }
            debug!("using _id as userID");
            session.user.user_id = session.user.id.clone();
        }
        if !filled(&session.user.email) {
            return Err(CacheError::Incomplete("email"));
        }
        if !filled(&session.user.name) {
            return Err(CacheError::Incomplete("name"));
        }

        let bytes = serde_json::to_vec(&session)?;
        let tmp = self.path.with_extension("tmp");
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(session)
    }

    pub async fn load(&self) -> Result<Option<CachedSession>, CacheError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                warn!(error = %e, path = %self.path.display(), "unreadable session cache, clearing");
                self.clear().await?;
                return Ok(None);
            }
        };

        match serde_json::from_slice::<CachedSession>(&bytes) {
            Ok(session) if session.user.is_usable() => Ok(Some(session)),
            Ok(_) => {
                warn!("incomplete cached session, clearing");
                self.clear().await?;
                Ok(None)
            }
            Err(e) => {
                warn!(error = %e, "corrupt session cache, clearing");
                self.clear().await?;
                Ok(None)
            }
        }
    }

    /// Logout. Clearing an absent cache succeeds.
    pub async fn clear(&self) -> Result<(), CacheError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
