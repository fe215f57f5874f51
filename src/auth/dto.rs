use serde::{Deserialize, Serialize};

use super::repo_types::User;

/// Request body for user registration. Fields are optional so that missing
/// ones surface as `MISSING_REQUIRED_FIELDS` instead of a parse error.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub language: Option<String>,
}

/// Request body for login.
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Request body for Google sign-in.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleLoginRequest {
    pub email: Option<String>,
    pub name: Option<String>,
    pub google_id: Option<String>,
    pub id_token: Option<String>,
    pub access_token: Option<String>,
}

/// Response returned after register, login or Google sign-in.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub message: &'static str,
    pub user: User,
    pub token: String,
}
