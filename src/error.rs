use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRequest, FromRequestParts, Query,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};
use uuid::Uuid;

use crate::store::StoreError;

/// Every failure a handler can report. Rendered as `{error, message}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("name, email and password are required")]
    MissingFields,
    #[error("email format is not valid")]
    InvalidEmailFormat,
    #[error("password must be at least 8 characters long")]
    PasswordTooShort,
    #[error("email and password are required")]
    MissingCredentials,
    #[error("google sign-in data is incomplete")]
    MissingProviderData,
    #[error("invalid trial days value")]
    InvalidTrialDays,
    #[error("{0}")]
    Validation(String),
    #[error("a test is already in progress for this product")]
    TestInProgress,
    #[error("authentication required: missing user identity")]
    Unauthenticated,
    #[error("invalid or expired token")]
    InvalidToken,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("invalid user identity")]
    InvalidIdentity,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("this email is already registered")]
    EmailExists,
    #[error("a record with this data already exists")]
    Duplicate,
    #[error("database temporarily unavailable, try again later")]
    ServiceUnavailable,
    #[error("internal server error, try again later")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingFields
            | ApiError::InvalidEmailFormat
            | ApiError::PasswordTooShort
            | ApiError::MissingCredentials
            | ApiError::MissingProviderData
            | ApiError::InvalidTrialDays
            | ApiError::Validation(_)
            | ApiError::TestInProgress => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated | ApiError::InvalidToken | ApiError::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::InvalidIdentity => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::EmailExists | ApiError::Duplicate => StatusCode::CONFLICT,
            ApiError::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::MissingFields => "MISSING_REQUIRED_FIELDS",
            ApiError::InvalidEmailFormat => "INVALID_EMAIL_FORMAT",
            ApiError::PasswordTooShort => "PASSWORD_TOO_SHORT",
            ApiError::MissingCredentials => "MISSING_CREDENTIALS",
            ApiError::MissingProviderData => "MISSING_GOOGLE_DATA",
            ApiError::InvalidTrialDays => "INVALID_TRIAL_DAYS",
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::TestInProgress => "TEST_IN_PROGRESS",
            ApiError::Unauthenticated => "UNAUTHENTICATED",
            ApiError::InvalidToken => "INVALID_TOKEN",
            ApiError::InvalidCredentials => "INVALID_CREDENTIALS",
            ApiError::InvalidIdentity => "INVALID_IDENTITY",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::EmailExists => "EMAIL_ALREADY_EXISTS",
            ApiError::Duplicate => "DUPLICATE_ENTRY",
            ApiError::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            ApiError::Internal(_) => "INTERNAL_SERVER_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            ApiError::Internal(e) => error!(error = ?e, "internal error"),
            ApiError::ServiceUnavailable => warn!("request failed: store unavailable"),
            _ => {}
        }
        let body = json!({
            "error": self.code(),
            "message": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateKey => ApiError::Duplicate,
            StoreError::NotFound => ApiError::NotFound("record"),
            StoreError::Unavailable(_) => ApiError::ServiceUnavailable,
            StoreError::Other(e) => ApiError::Internal(e),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// `Json` whose rejections render through [`ApiError`].
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

impl<T: Serialize> IntoResponse for ApiJson<T> {
    fn into_response(self) -> Response {
        Json(self.0).into_response()
    }
}

/// `Query` whose rejections render through [`ApiError`].
#[derive(Debug, FromRequestParts)]
#[from_request(via(Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// Decodes a JSON body that may be left out entirely.
pub fn optional_json<T>(body: &[u8]) -> ApiResult<T>
where
    T: DeserializeOwned + Default,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| ApiError::Validation(e.to_string()))
}

/// Parses a path id. Malformed ids are reported as missing records.
pub fn parse_id(raw: &str, what: &'static str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound(what))
}

/// Treats `None` and blank strings alike.
pub fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
