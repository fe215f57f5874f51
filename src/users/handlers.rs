use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use super::dto::{ChangePasswordRequest, MessageResponse, TrialPeriodRequest, TrialPeriodResponse};
use crate::{
    auth::{
        identity::AuthUser,
        password::{self, MIN_PASSWORD_LEN},
        repo_types::User,
    },
    error::{ApiError, ApiJson, ApiQuery, ApiResult},
    state::AppState,
    store::Pagination,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/profile", get(profile))
        .route("/change-password", post(change_password))
        .route("/update-trial-period", post(update_trial_period))
}

async fn load_self(state: &AppState, user_id: &str) -> ApiResult<User> {
    state
        .store
        .find_user_by_user_id(user_id)
        .await?
        .ok_or(ApiError::NotFound("user"))
}

/// Mounted at `GET /users` next to registration.
#[instrument(skip_all)]
pub async fn list_users(
    State(state): State<AppState>,
    AuthUser(_identity): AuthUser,
    ApiQuery(page): ApiQuery<Pagination>,
) -> ApiResult<Json<Vec<User>>> {
    let users = state.store.list_users(page.clamped()).await?;
    Ok(Json(users))
}

#[instrument(skip_all, fields(user_id = %identity.user_id))]
pub async fn profile(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> ApiResult<Json<User>> {
    Ok(Json(load_self(&state, &identity.user_id).await?))
}

#[instrument(skip_all, fields(user_id = %identity.user_id))]
pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    ApiJson(payload): ApiJson<ChangePasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let (Some(current), Some(new)) = (
        payload.current_password.as_deref().filter(|p| !p.is_empty()),
        payload.new_password.as_deref().filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::Validation(
            "currentPassword and newPassword are required".into(),
        ));
    };
    if new.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::PasswordTooShort);
    }

    let mut user = load_self(&state, &identity.user_id).await?;
    if !password::verify(current, &user.password_hash).await? {
        warn!(user_id = %user.user_id, "change password: current password mismatch");
        return Err(ApiError::InvalidCredentials);
    }

    user.password_hash = password::hash(new).await?;
    state.store.update_user(&user).await?;
    info!(user_id = %user.user_id, "password changed");
    Ok(Json(MessageResponse {
        message: "password changed successfully",
    }))
}

#[instrument(skip_all, fields(user_id = %identity.user_id))]
pub async fn update_trial_period(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    ApiJson(payload): ApiJson<TrialPeriodRequest>,
) -> ApiResult<Json<TrialPeriodResponse>> {
    let days = payload
        .trial_days
        .as_ref()
        .and_then(|v| v.as_i64())
        .filter(|d| *d >= 0)
        .and_then(|d| i32::try_from(d).ok())
        .ok_or(ApiError::InvalidTrialDays)?;

    let mut user = load_self(&state, &identity.user_id).await?;
    user.trial_period_days = days;
    let user = state.store.update_user(&user).await?;
    info!(user_id = %user.user_id, days, "trial period updated");
    Ok(Json(TrialPeriodResponse {
        message: "trial period updated successfully",
        trial_period_days: user.trial_period_days,
    }))
}
