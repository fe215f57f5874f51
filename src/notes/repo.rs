use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::ProductNote;
use crate::store::{MemoryStore, PgStore, StoreResult};

#[async_trait]
pub trait NoteRepo {
    async fn list_notes(&self, user_id: &str) -> StoreResult<Vec<ProductNote>>;
    async fn create_note(&self, note: &ProductNote) -> StoreResult<ProductNote>;
    /// Rewrites the text, and the rating when given, of a note owned by `user_id`.
    async fn update_note(
        &self,
        id: Uuid,
        user_id: &str,
        text: &str,
        rating: Option<i16>,
    ) -> StoreResult<Option<ProductNote>>;
}

const NOTE_COLUMNS: &str = "id, product_id, user_id, note, rating, created_at, updated_at";

#[async_trait]
impl NoteRepo for PgStore {
    async fn list_notes(&self, user_id: &str) -> StoreResult<Vec<ProductNote>> {
        let rows = sqlx::query_as::<_, ProductNote>(&format!(
            "SELECT {NOTE_COLUMNS} FROM product_notes WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    async fn create_note(&self, note: &ProductNote) -> StoreResult<ProductNote> {
        let row = sqlx::query_as::<_, ProductNote>(&format!(
            r#"
            INSERT INTO product_notes (id, product_id, user_id, note, rating, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {NOTE_COLUMNS}
            "#
        ))
        .bind(note.id)
        .bind(&note.product_id)
        .bind(&note.user_id)
        .bind(&note.note)
        .bind(note.rating)
        .bind(note.created_at)
        .bind(note.updated_at)
        .fetch_one(self.pool())
        .await?;
        Ok(row)
    }

    async fn update_note(
        &self,
        id: Uuid,
        user_id: &str,
        text: &str,
        rating: Option<i16>,
    ) -> StoreResult<Option<ProductNote>> {
        let row = sqlx::query_as::<_, ProductNote>(&format!(
            r#"
            UPDATE product_notes
               SET note = $3, rating = COALESCE($4, rating), updated_at = now()
             WHERE id = $1 AND user_id = $2
            RETURNING {NOTE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(user_id)
        .bind(text)
        .bind(rating)
        .fetch_optional(self.pool())
        .await?;
        Ok(row)
    }
}

#[async_trait]
impl NoteRepo for MemoryStore {
    async fn list_notes(&self, user_id: &str) -> StoreResult<Vec<ProductNote>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<ProductNote> = tables
            .notes
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn create_note(&self, note: &ProductNote) -> StoreResult<ProductNote> {
        self.tables.write().await.notes.push(note.clone());
        Ok(note.clone())
    }

    async fn update_note(
        &self,
        id: Uuid,
        user_id: &str,
        text: &str,
        rating: Option<i16>,
    ) -> StoreResult<Option<ProductNote>> {
        let mut tables = self.tables.write().await;
        let Some(note) = tables
            .notes
            .iter_mut()
            .find(|n| n.id == id && n.user_id == user_id)
        else {
            return Ok(None);
        };
        note.note = text.to_owned();
        if rating.is_some() {
            note.rating = rating;
        }
        note.updated_at = OffsetDateTime::now_utc();
        Ok(Some(note.clone()))
    }
}
