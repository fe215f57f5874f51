use async_trait::async_trait;

use super::repo_types::HistoryEntry;
use crate::store::{memory::paginate, MemoryStore, Pagination, PgStore, StoreResult};

#[async_trait]
pub trait HistoryRepo {
    /// Newest first.
    async fn list_history(&self, user_id: &str, page: Pagination) -> StoreResult<Vec<HistoryEntry>>;
    async fn add_history(&self, entry: &HistoryEntry) -> StoreResult<HistoryEntry>;
}

#[async_trait]
impl HistoryRepo for PgStore {
    async fn list_history(&self, user_id: &str, page: Pagination) -> StoreResult<Vec<HistoryEntry>> {
        let page = page.clamped();
        let rows = sqlx::query_as::<_, HistoryEntry>(
            r#"
            SELECT id, user_id, item_id, timestamp
              FROM history
             WHERE user_id = $1
             ORDER BY timestamp DESC
             LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    async fn add_history(&self, entry: &HistoryEntry) -> StoreResult<HistoryEntry> {
        let row = sqlx::query_as::<_, HistoryEntry>(
            r#"
            INSERT INTO history (id, user_id, item_id, timestamp)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, item_id, timestamp
            "#,
        )
        .bind(entry.id)
        .bind(&entry.user_id)
        .bind(&entry.item_id)
        .bind(entry.timestamp)
        .fetch_one(self.pool())
        .await?;
        Ok(row)
    }
}

#[async_trait]
impl HistoryRepo for MemoryStore {
    async fn list_history(&self, user_id: &str, page: Pagination) -> StoreResult<Vec<HistoryEntry>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<HistoryEntry> = tables
            .history
            .iter()
            .filter(|h| h.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(paginate(rows, page))
    }

    async fn add_history(&self, entry: &HistoryEntry) -> StoreResult<HistoryEntry> {
        self.tables.write().await.history.push(entry.clone());
        Ok(entry.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{Duration, OffsetDateTime};
    use uuid::Uuid;

    #[tokio::test]
    async fn history_is_newest_first_and_paged() {
        let store = MemoryStore::default();
        let base = OffsetDateTime::now_utc();
        for i in 0..5 {
            store
                .add_history(&HistoryEntry {
                    id: Uuid::new_v4(),
                    user_id: "u1".into(),
                    item_id: format!("p{i}"),
                    timestamp: base + Duration::minutes(i),
                })
                .await
                .unwrap();
        }

        let all = store.list_history("u1", Pagination::default()).await.unwrap();
        let items: Vec<_> = all.iter().map(|h| h.item_id.as_str()).collect();
        assert_eq!(items, ["p4", "p3", "p2", "p1", "p0"]);

        let page = store
            .list_history("u1", Pagination { limit: 2, offset: 1 })
            .await
            .unwrap();
        let items: Vec<_> = page.iter().map(|h| h.item_id.as_str()).collect();
        assert_eq!(items, ["p3", "p2"]);

        assert!(store.list_history("u2", Pagination::default()).await.unwrap().is_empty());
    }
}
