use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use serde_json::{json, Value};
use time::OffsetDateTime;

use crate::{db::DbState, state::AppState};

pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(banner))
        .route("/health", get(health))
}

async fn banner() -> Json<Value> {
    Json(json!({ "message": "server is running" }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Health {
    pub status: &'static str,
    pub db_state: DbState,
    /// Seconds since the process started serving.
    pub uptime: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

async fn health(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "ok",
        db_state: state.connection.current(),
        uptime: state.started_at.elapsed().as_secs_f64(),
        timestamp: OffsetDateTime::now_utc(),
    })
}
