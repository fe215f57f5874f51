use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{CreateNoteRequest, UpdateNoteRequest},
    repo_types::{ProductNote, RATING_RANGE},
};
use crate::{
    auth::identity::AuthUser,
    error::{parse_id, present, ApiError, ApiJson, ApiResult},
    state::AppState,
};

pub fn note_routes() -> Router<AppState> {
    Router::new()
        .route("/productnotes", get(list_notes).post(create_note))
        .route("/productnotes/:id", put(update_note))
}

fn check_rating(rating: Option<i16>) -> ApiResult<Option<i16>> {
    match rating {
        Some(r) if !RATING_RANGE.contains(&r) => {
            Err(ApiError::Validation("rating must be between 1 and 5".into()))
        }
        other => Ok(other),
    }
}

#[instrument(skip_all, fields(user_id = %identity.user_id))]
pub async fn list_notes(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> ApiResult<Json<Vec<ProductNote>>> {
    Ok(Json(state.store.list_notes(&identity.user_id).await?))
}

#[instrument(skip_all, fields(user_id = %identity.user_id))]
pub async fn create_note(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    ApiJson(body): ApiJson<CreateNoteRequest>,
) -> ApiResult<(StatusCode, Json<ProductNote>)> {
    let (Some(product_id), Some(text)) = (present(&body.product_id), present(&body.note)) else {
        return Err(ApiError::Validation("productID and note are required".into()));
    };
    let rating = check_rating(body.rating)?;
    let now = OffsetDateTime::now_utc();
    let note = ProductNote {
        id: Uuid::new_v4(),
        product_id: product_id.to_string(),
        user_id: identity.user_id,
        note: text.to_string(),
        rating,
        created_at: now,
        updated_at: now,
    };
    let note = state.store.create_note(&note).await?;
    info!(note_id = %note.id, "note created");
    Ok((StatusCode::CREATED, Json(note)))
}

#[instrument(skip_all, fields(user_id = %identity.user_id, note_id = %id))]
pub async fn update_note(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<UpdateNoteRequest>,
) -> ApiResult<Json<ProductNote>> {
    let id = parse_id(&id, "note")?;
    let text = present(&body.note).ok_or_else(|| ApiError::Validation("note is required".into()))?;
    let rating = check_rating(body.rating)?;
    let note = state
        .store
        .update_note(id, &identity.user_id, text, rating)
        .await?
        .ok_or(ApiError::NotFound("note"))?;
    info!("note updated");
    Ok(Json(note))
}
