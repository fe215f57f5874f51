use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{CreateArticleRequest, CreateIngredientRequest},
    repo_types::{Article, ProductIngredient},
};
use crate::{
    auth::identity::AuthUser,
    error::{present, ApiError, ApiJson, ApiQuery, ApiResult},
    state::AppState,
    store::Pagination,
};

pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/articles", get(list_articles).post(create_article))
        .route("/productingredients", get(list_ingredients).post(create_ingredient))
}

fn optional(value: &Option<String>) -> Option<String> {
    present(value).map(str::to_string)
}

pub async fn list_articles(
    State(state): State<AppState>,
    _caller: AuthUser,
    ApiQuery(page): ApiQuery<Pagination>,
) -> ApiResult<Json<Vec<Article>>> {
    Ok(Json(state.store.list_articles(page).await?))
}

#[instrument(skip_all, fields(user_id = %identity.user_id))]
pub async fn create_article(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    ApiJson(body): ApiJson<CreateArticleRequest>,
) -> ApiResult<(StatusCode, Json<Article>)> {
    let (Some(title), Some(content)) = (present(&body.title), present(&body.content)) else {
        return Err(ApiError::Validation("title and content are required".into()));
    };
    let article = Article {
        id: Uuid::new_v4(),
        title: title.to_string(),
        content: content.to_string(),
        author: optional(&body.author),
        category: optional(&body.category),
        tags: body
            .tags
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect(),
        published_at: body.published_at.unwrap_or_else(OffsetDateTime::now_utc),
    };
    let article = state.store.create_article(&article).await?;
    info!(article_id = %article.id, "article published");
    Ok((StatusCode::CREATED, Json(article)))
}

pub async fn list_ingredients(
    State(state): State<AppState>,
    _caller: AuthUser,
    ApiQuery(page): ApiQuery<Pagination>,
) -> ApiResult<Json<Vec<ProductIngredient>>> {
    Ok(Json(state.store.list_ingredients(page).await?))
}

#[instrument(skip_all, fields(user_id = %identity.user_id))]
pub async fn create_ingredient(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    ApiJson(body): ApiJson<CreateIngredientRequest>,
) -> ApiResult<(StatusCode, Json<ProductIngredient>)> {
    let name = present(&body.name).ok_or_else(|| ApiError::Validation("name is required".into()))?;
    if let Some(props) = &body.properties {
        if !props.is_object() {
            return Err(ApiError::Validation("properties must be an object".into()));
        }
    }
    let ingredient = ProductIngredient {
        id: Uuid::new_v4(),
        name: name.to_string(),
        description: optional(&body.description),
        category: optional(&body.category),
        properties: body.properties,
        safety_level: optional(&body.safety_level),
    };
    let ingredient = state.store.create_ingredient(&ingredient).await?;
    info!(ingredient_id = %ingredient.id, "ingredient added");
    Ok((StatusCode::CREATED, Json(ingredient)))
}
