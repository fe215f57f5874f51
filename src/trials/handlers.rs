use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument, warn};

use super::{
    dto::{CompleteTestRequest, StartTestRequest},
    repo_types::ProductTest,
};
use crate::{
    auth::identity::AuthUser,
    error::{optional_json, parse_id, present, ApiError, ApiJson, ApiResult},
    state::AppState,
    store::Insert,
};

pub fn test_routes() -> Router<AppState> {
    Router::new()
        .route("/tests", get(list_tests).post(start_test))
        .route("/tests/:id", put(complete_test))
}

#[instrument(skip_all, fields(user_id = %identity.user_id))]
pub async fn list_tests(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> ApiResult<Json<Vec<ProductTest>>> {
    Ok(Json(state.store.list_tests(&identity.user_id).await?))
}

#[instrument(skip_all, fields(user_id = %identity.user_id))]
pub async fn start_test(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    ApiJson(body): ApiJson<StartTestRequest>,
) -> ApiResult<(StatusCode, Json<ProductTest>)> {
    let item_id = present(&body.item_id)
        .ok_or_else(|| ApiError::Validation("itemID is required".into()))?;

    let test = ProductTest::begin(&identity.user_id, item_id, OffsetDateTime::now_utc());
    match state.store.start_test(&test).await? {
        Insert::Created(test) => {
            info!(test_id = %test.id, item_id = %test.item_id, "test started");
            Ok((StatusCode::CREATED, Json(test)))
        }
        Insert::Conflict => {
            warn!(item_id = %item_id, "test already in progress");
            Err(ApiError::TestInProgress)
        }
    }
}

#[instrument(skip_all, fields(user_id = %identity.user_id, test_id = %id))]
pub async fn complete_test(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<ProductTest>> {
    let id = parse_id(&id, "test")?;
    let body: CompleteTestRequest = optional_json(&body)?;
    let test = state
        .store
        .complete_test(id, &identity.user_id, body.result)
        .await?
        .ok_or(ApiError::NotFound("test"))?;
    info!(result = ?test.result, "test completed");
    Ok(Json(test))
}
