use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{AddWishlistRequest, RemovedResponse},
    repo_types::WishlistItem,
};
use crate::{
    auth::identity::AuthUser,
    error::{parse_id, present, ApiError, ApiJson, ApiResult},
    state::AppState,
};

pub fn wishlist_routes() -> Router<AppState> {
    Router::new()
        .route("/wishlist", get(list_wishlist).post(add_item))
        .route("/wishlist/:id", delete(remove_item))
}

#[instrument(skip_all, fields(user_id = %identity.user_id))]
pub async fn list_wishlist(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> ApiResult<Json<Vec<WishlistItem>>> {
    Ok(Json(state.store.list_wishlist(&identity.user_id).await?))
}

#[instrument(skip_all, fields(user_id = %identity.user_id))]
pub async fn add_item(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    ApiJson(body): ApiJson<AddWishlistRequest>,
) -> ApiResult<(StatusCode, Json<WishlistItem>)> {
    let product_id = present(&body.product_id)
        .ok_or_else(|| ApiError::Validation("productID is required".into()))?;
    let item = WishlistItem {
        id: Uuid::new_v4(),
        user_id: identity.user_id,
        product_id: product_id.to_string(),
        added_at: OffsetDateTime::now_utc(),
    };
    let item = state.store.add_wishlist_item(&item).await?;
    info!(item_id = %item.id, "wishlist item added");
    Ok((StatusCode::CREATED, Json(item)))
}

#[instrument(skip_all, fields(user_id = %identity.user_id, item_id = %id))]
pub async fn remove_item(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<RemovedResponse>> {
    let id = parse_id(&id, "wishlist item")?;
    if !state.store.delete_wishlist_item(id, &identity.user_id).await? {
        return Err(ApiError::NotFound("wishlist item"));
    }
    info!("wishlist item removed");
    Ok(Json(RemovedResponse {
        message: "item removed from wishlist successfully",
        id,
    }))
}
