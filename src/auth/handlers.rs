use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::instrument;

use crate::{
    auth::{
        dto::{AuthResponse, GoogleLoginRequest, LoginRequest, RegisterRequest},
        identity::AuthUser,
        repo_types::User,
        services,
        token::TokenKeys,
    },
    error::{ApiJson, ApiResult},
    state::AppState,
    users::handlers::list_users,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(register).get(list_users))
        .route("/login", post(login))
        .route("/google-login", post(google_login))
        .route("/verify-token", get(verify_token))
}

fn respond(state: &AppState, message: &'static str, user: User) -> ApiResult<AuthResponse> {
    let token = TokenKeys::from_ref(state).sign(&user.user_id)?;
    Ok(AuthResponse {
        message,
        user,
        token,
    })
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let user = services::register(state.store.as_ref(), payload).await?;
    let body = respond(&state, "user registered", user)?;
    Ok((StatusCode::CREATED, Json(body)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let user = services::login(state.store.as_ref(), payload).await?;
    Ok(Json(respond(&state, "login successful", user)?))
}

#[instrument(skip(state, payload))]
pub async fn google_login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<GoogleLoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let user = services::google_login(state.store.as_ref(), state.provider.as_ref(), payload).await?;
    Ok(Json(respond(&state, "google login successful", user)?))
}

#[instrument(skip_all, fields(user_id = %identity.user_id))]
pub async fn verify_token(AuthUser(identity): AuthUser) -> Json<Value> {
    Json(json!({ "valid": true, "user": identity }))
}
