use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod handlers;
pub mod identity;
pub mod password;
pub mod provider;
pub mod repo;
pub mod repo_types;
pub mod services;
pub mod token;

pub use identity::{AuthUser, ResolvedIdentity};

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::auth_routes())
}
