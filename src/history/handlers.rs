use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::{dto::AddHistoryRequest, repo_types::HistoryEntry};
use crate::{
    auth::identity::AuthUser,
    error::{present, ApiError, ApiJson, ApiQuery, ApiResult},
    state::AppState,
    store::Pagination,
};

pub fn history_routes() -> Router<AppState> {
    Router::new().route("/history", get(list_history).post(add_entry))
}

#[instrument(skip_all, fields(user_id = %identity.user_id))]
pub async fn list_history(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    ApiQuery(page): ApiQuery<Pagination>,
) -> ApiResult<Json<Vec<HistoryEntry>>> {
    Ok(Json(state.store.list_history(&identity.user_id, page).await?))
}

#[instrument(skip_all, fields(user_id = %identity.user_id))]
pub async fn add_entry(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    ApiJson(body): ApiJson<AddHistoryRequest>,
) -> ApiResult<(StatusCode, Json<HistoryEntry>)> {
    let item_id =
        present(&body.item_id).ok_or_else(|| ApiError::Validation("itemID is required".into()))?;
    let entry = HistoryEntry {
        id: Uuid::new_v4(),
        user_id: identity.user_id,
        item_id: item_id.to_string(),
        timestamp: body.timestamp.unwrap_or_else(OffsetDateTime::now_utc),
    };
    let entry = state.store.add_history(&entry).await?;
    debug!(entry_id = %entry.id, "history entry appended");
    Ok((StatusCode::CREATED, Json(entry)))
}
