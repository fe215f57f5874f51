use async_trait::async_trait;
use uuid::Uuid;

use super::repo_types::WishlistItem;
use crate::store::{MemoryStore, PgStore, StoreResult};

#[async_trait]
pub trait WishlistRepo {
    async fn list_wishlist(&self, user_id: &str) -> StoreResult<Vec<WishlistItem>>;
    async fn add_wishlist_item(&self, item: &WishlistItem) -> StoreResult<WishlistItem>;
    /// Returns whether an item owned by `user_id` was removed.
    async fn delete_wishlist_item(&self, id: Uuid, user_id: &str) -> StoreResult<bool>;
}

#[async_trait]
impl WishlistRepo for PgStore {
    async fn list_wishlist(&self, user_id: &str) -> StoreResult<Vec<WishlistItem>> {
        let rows = sqlx::query_as::<_, WishlistItem>(
            r#"
            SELECT id, user_id, product_id, added_at
              FROM wishlist
             WHERE user_id = $1
             ORDER BY added_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    async fn add_wishlist_item(&self, item: &WishlistItem) -> StoreResult<WishlistItem> {
        let row = sqlx::query_as::<_, WishlistItem>(
            r#"
            INSERT INTO wishlist (id, user_id, product_id, added_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, product_id, added_at
            "#,
        )
        .bind(item.id)
        .bind(&item.user_id)
        .bind(&item.product_id)
        .bind(item.added_at)
        .fetch_one(self.pool())
        .await?;
        Ok(row)
    }

    async fn delete_wishlist_item(&self, id: Uuid, user_id: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM wishlist WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl WishlistRepo for MemoryStore {
    async fn list_wishlist(&self, user_id: &str) -> StoreResult<Vec<WishlistItem>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<WishlistItem> = tables
            .wishlist
            .iter()
            .filter(|w| w.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.added_at.cmp(&a.added_at));
        Ok(rows)
    }

    async fn add_wishlist_item(&self, item: &WishlistItem) -> StoreResult<WishlistItem> {
        self.tables.write().await.wishlist.push(item.clone());
        Ok(item.clone())
    }

    async fn delete_wishlist_item(&self, id: Uuid, user_id: &str) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.wishlist.len();
        tables.wishlist.retain(|w| !(w.id == id && w.user_id == user_id));
        Ok(tables.wishlist.len() != before)
    }
}
