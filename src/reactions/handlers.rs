use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use tracing::{info, instrument};

use super::{
    dto::{DeletedResponse, IngredientReactionRequest, ProductReactionRequest, ReactionView},
    repo_types::{ReactionKind, Verdict},
};
use crate::{
    auth::identity::AuthUser,
    error::{ApiError, ApiJson, ApiResult},
    state::AppState,
    store::Upsert,
};

pub fn reaction_routes() -> Router<AppState> {
    Router::new()
        .route("/product-reactions", get(list_product).post(save_product))
        .route("/product-reactions/:product_id", delete(delete_product))
        .route("/ingredient-reactions", get(list_ingredient).post(save_ingredient))
        .route("/ingredient-reactions/:ingredient_name", delete(delete_ingredient))
}

async fn list(state: &AppState, kind: ReactionKind, user_id: &str) -> ApiResult<Json<Vec<ReactionView>>> {
    let rows = state.store.list_reactions(kind, user_id).await?;
    Ok(Json(
        rows.into_iter()
            .map(|reaction| ReactionView { kind, reaction })
            .collect(),
    ))
}

async fn save(
    state: &AppState,
    kind: ReactionKind,
    user_id: &str,
    key: Option<String>,
    reaction: Option<Verdict>,
) -> ApiResult<(StatusCode, Json<ReactionView>)> {
    let key = key
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .ok_or_else(|| ApiError::Validation(format!("{} is required", kind.key_field())))?;
    let reaction =
        reaction.ok_or_else(|| ApiError::Validation("reaction is required".into()))?;

    let (status, reaction) = match state.store.upsert_reaction(kind, user_id, key, reaction).await? {
        Upsert::Inserted(r) => (StatusCode::CREATED, r),
        Upsert::Updated(r) => (StatusCode::OK, r),
    };
    info!(user_id = %user_id, ?kind, key = %key, created = status == StatusCode::CREATED, "reaction saved");
    Ok((status, Json(ReactionView { kind, reaction })))
}

async fn remove(
    state: &AppState,
    kind: ReactionKind,
    user_id: &str,
    key: &str,
) -> ApiResult<Json<DeletedResponse>> {
    if !state.store.delete_reaction(kind, user_id, key).await? {
        return Err(ApiError::NotFound("reaction"));
    }
    Ok(Json(DeletedResponse {
        message: "reaction deleted successfully",
    }))
}

#[instrument(skip_all, fields(user_id = %identity.user_id))]
pub async fn list_product(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> ApiResult<Json<Vec<ReactionView>>> {
    list(&state, ReactionKind::Product, &identity.user_id).await
}

#[instrument(skip_all, fields(user_id = %identity.user_id))]
pub async fn save_product(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    ApiJson(body): ApiJson<ProductReactionRequest>,
) -> ApiResult<(StatusCode, Json<ReactionView>)> {
    save(&state, ReactionKind::Product, &identity.user_id, body.product_id, body.reaction).await
}

#[instrument(skip_all, fields(user_id = %identity.user_id))]
pub async fn delete_product(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(product_id): Path<String>,
) -> ApiResult<Json<DeletedResponse>> {
    remove(&state, ReactionKind::Product, &identity.user_id, &product_id).await
}

#[instrument(skip_all, fields(user_id = %identity.user_id))]
pub async fn list_ingredient(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> ApiResult<Json<Vec<ReactionView>>> {
    list(&state, ReactionKind::Ingredient, &identity.user_id).await
}

#[instrument(skip_all, fields(user_id = %identity.user_id))]
pub async fn save_ingredient(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    ApiJson(body): ApiJson<IngredientReactionRequest>,
) -> ApiResult<(StatusCode, Json<ReactionView>)> {
    save(
        &state,
        ReactionKind::Ingredient,
        &identity.user_id,
        body.ingredient_name,
        body.reaction,
    )
    .await
}

#[instrument(skip_all, fields(user_id = %identity.user_id))]
pub async fn delete_ingredient(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(ingredient_name): Path<String>,
) -> ApiResult<Json<DeletedResponse>> {
    remove(&state, ReactionKind::Ingredient, &identity.user_id, &ingredient_name).await
}
