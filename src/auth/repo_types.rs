use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// How the account was created or last linked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "auth_provider", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    Local,
    Google,
}

/// User record in the database.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Uuid, // storage key
    #[serde(rename = "userID")]
    pub user_id: String, // semantic identifier handed to clients
    pub name: String,
    pub email: String, // trimmed + lowercased
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 hash, not exposed in JSON
    pub language: String,
    pub trial_period_days: i32,
    pub google_id: Option<String>,
    pub auth_provider: AuthProvider,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

pub const DEFAULT_LANGUAGE: &str = "es";
pub const DEFAULT_TRIAL_PERIOD_DAYS: i32 = 5;

/// Fresh semantic identifier, unrelated to any storage key.
pub fn new_user_id() -> String {
    Uuid::new_v4().simple().to_string()
}

impl User {
    /// A new local account. Email and name must already be normalized.
    pub fn new_local(name: String, email: String, password_hash: String, language: String) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: Uuid::new_v4(),
            user_id: new_user_id(),
            name,
            email,
            password_hash,
            language,
            trial_period_days: DEFAULT_TRIAL_PERIOD_DAYS,
            google_id: None,
            auth_provider: AuthProvider::Local,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn new_google(name: String, email: String, google_id: String, password_hash: String) -> Self {
        Self {
            google_id: Some(google_id),
            auth_provider: AuthProvider::Google,
            ..Self::new_local(name, email, password_hash, DEFAULT_LANGUAGE.to_string())
        }
    }
}
