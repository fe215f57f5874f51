//! Persistence seam. Each domain module declares its own repository trait in
//! its `repo.rs` and implements it for both [`PgStore`] and [`MemoryStore`].

pub(crate) mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use serde::Deserialize;
use thiserror::Error;

use crate::{
    auth::repo::UserRepo, catalog::repo::CatalogRepo, history::repo::HistoryRepo,
    notes::repo::NoteRepo, reactions::repo::ReactionRepo, trials::repo::TrialRepo,
    wishlist::repo::WishlistRepo,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate key")]
    DuplicateKey,
    #[error("record not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(ref db) if db.code().as_deref() == Some("23505") => {
                StoreError::DuplicateKey
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Unavailable(e.to_string())
            }
            other => StoreError::Other(other.into()),
        }
    }
}

/// Outcome of a conditional insert that refuses to break a uniqueness rule.
#[derive(Debug, Clone, PartialEq)]
pub enum Insert<T> {
    Created(T),
    Conflict,
}

/// Outcome of an insert-or-overwrite keyed write.
#[derive(Debug, Clone, PartialEq)]
pub enum Upsert<T> {
    Inserted(T),
    Updated(T),
}

impl<T> Upsert<T> {
    pub fn into_inner(self) -> T {
        match self {
            Upsert::Inserted(v) | Upsert::Updated(v) => v,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    100
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            offset: 0,
        }
    }
}

impl Pagination {
    pub fn clamped(self) -> Self {
        Self {
            limit: self.limit.clamp(1, 500),
            offset: self.offset.max(0),
        }
    }
}

/// Everything the HTTP layer needs from a backend.
pub trait Store:
    UserRepo
    + WishlistRepo
    + NoteRepo
    + HistoryRepo
    + TrialRepo
    + ReactionRepo
    + CatalogRepo
    + Send
    + Sync
{
}

impl<T> Store for T where
    T: UserRepo
        + WishlistRepo
        + NoteRepo
        + HistoryRepo
        + TrialRepo
        + ReactionRepo
        + CatalogRepo
        + Send
        + Sync
{
}
