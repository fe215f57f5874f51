use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    auth::repo_types::User,
    store::{MemoryStore, Pagination, PgStore, StoreError, StoreResult},
};

/// Credential store.
#[async_trait]
pub trait UserRepo {
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn find_user_by_user_id(&self, user_id: &str) -> StoreResult<Option<User>>;
    /// Fallback lookup by storage key.
    async fn find_user_by_key(&self, key: Uuid) -> StoreResult<Option<User>>;
    /// Fails with `DuplicateKey` when the email or semantic id is taken.
    async fn create_user(&self, user: &User) -> StoreResult<User>;
    /// Fails with `NotFound` when no record has this semantic id.
    async fn update_user(&self, user: &User) -> StoreResult<User>;
    async fn list_users(&self, page: Pagination) -> StoreResult<Vec<User>>;
}

const USER_COLUMNS: &str = "id, user_id, name, email, password_hash, language, \
     trial_period_days, google_id, auth_provider, created_at, updated_at";

#[async_trait]
impl UserRepo for PgStore {
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(self.pool())
        .await?;
        Ok(user)
    }

    async fn find_user_by_user_id(&self, user_id: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(user)
    }

    async fn find_user_by_key(&self, key: Uuid) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(key)
        .fetch_optional(self.pool())
        .await?;
        Ok(user)
    }

    async fn create_user(&self, user: &User) -> StoreResult<User> {
        let created = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, user_id, name, email, password_hash, language,
                               trial_period_days, google_id, auth_provider, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.id)
        .bind(&user.user_id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.language)
        .bind(user.trial_period_days)
        .bind(&user.google_id)
        .bind(user.auth_provider)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(self.pool())
        .await?;
        Ok(created)
    }

    async fn update_user(&self, user: &User) -> StoreResult<User> {
        let updated = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
               SET name = $2, password_hash = $3, language = $4, trial_period_days = $5,
                   google_id = $6, auth_provider = $7, updated_at = now()
             WHERE user_id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.user_id)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(&user.language)
        .bind(user.trial_period_days)
        .bind(&user.google_id)
        .bind(user.auth_provider)
        .fetch_optional(self.pool())
        .await?;
        updated.ok_or(StoreError::NotFound)
    }

    async fn list_users(&self, page: Pagination) -> StoreResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        ))
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(self.pool())
        .await?;
        Ok(users)
    }
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_user_id(&self, user_id: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.user_id == user_id).cloned())
    }

    async fn find_user_by_key(&self, key: Uuid) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id == key).cloned())
    }

    async fn create_user(&self, user: &User) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        let taken = tables
            .users
            .iter()
            .any(|u| u.email == user.email || u.user_id == user.user_id || u.id == user.id);
        if taken {
            return Err(StoreError::DuplicateKey);
        }
        tables.users.push(user.clone());
        Ok(user.clone())
    }

    async fn update_user(&self, user: &User) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        let slot = tables
            .users
            .iter_mut()
            .find(|u| u.user_id == user.user_id)
            .ok_or(StoreError::NotFound)?;
        slot.name = user.name.clone();
        slot.password_hash = user.password_hash.clone();
        slot.language = user.language.clone();
        slot.trial_period_days = user.trial_period_days;
        slot.google_id = user.google_id.clone();
        slot.auth_provider = user.auth_provider;
        slot.updated_at = time::OffsetDateTime::now_utc();
        Ok(slot.clone())
    }

    async fn list_users(&self, page: Pagination) -> StoreResult<Vec<User>> {
        let tables = self.tables.read().await;
        let mut users = tables.users.clone();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(crate::store::memory::paginate(users, page))
    }
}
