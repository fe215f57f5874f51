use async_trait::async_trait;
use uuid::Uuid;

use super::repo_types::ProductTest;
use crate::{
    reactions::Verdict,
    store::{Insert, MemoryStore, PgStore, StoreResult},
};

#[async_trait]
pub trait TrialRepo {
    async fn list_tests(&self, user_id: &str) -> StoreResult<Vec<ProductTest>>;
    /// Inserts unless the user already has an active test for the same item.
    async fn start_test(&self, test: &ProductTest) -> StoreResult<Insert<ProductTest>>;
    /// Completes a test owned by `user_id`; `None` when no such test exists.
    async fn complete_test(
        &self,
        id: Uuid,
        user_id: &str,
        result: Option<Verdict>,
    ) -> StoreResult<Option<ProductTest>>;
}

const TEST_COLUMNS: &str = "id, user_id, item_id, start_date, finish_date, completed, result";

#[async_trait]
impl TrialRepo for PgStore {
    async fn list_tests(&self, user_id: &str) -> StoreResult<Vec<ProductTest>> {
        let rows = sqlx::query_as::<_, ProductTest>(&format!(
            "SELECT {TEST_COLUMNS} FROM tests WHERE user_id = $1 ORDER BY start_date DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    async fn start_test(&self, test: &ProductTest) -> StoreResult<Insert<ProductTest>> {
        // tests_one_active is a partial unique index on (user_id, item_id) WHERE NOT completed
        let row = sqlx::query_as::<_, ProductTest>(&format!(
            r#"
            INSERT INTO tests (id, user_id, item_id, start_date, finish_date, completed, result)
            VALUES ($1, $2, $3, $4, $5, false, NULL)
            ON CONFLICT (user_id, item_id) WHERE NOT completed DO NOTHING
            RETURNING {TEST_COLUMNS}
            "#
        ))
        .bind(test.id)
        .bind(&test.user_id)
        .bind(&test.item_id)
        .bind(test.start_date)
        .bind(test.finish_date)
        .fetch_optional(self.pool())
        .await?;
        Ok(match row {
            Some(created) => Insert::Created(created),
            None => Insert::Conflict,
        })
    }

    async fn complete_test(
        &self,
        id: Uuid,
        user_id: &str,
        result: Option<Verdict>,
    ) -> StoreResult<Option<ProductTest>> {
        let row = sqlx::query_as::<_, ProductTest>(&format!(
            r#"
            UPDATE tests
               SET completed = true, result = COALESCE($3, result), updated_at = now()
             WHERE id = $1 AND user_id = $2
            RETURNING {TEST_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(user_id)
        .bind(result)
        .fetch_optional(self.pool())
        .await?;
        Ok(row)
    }
}

#[async_trait]
impl TrialRepo for MemoryStore {
    async fn list_tests(&self, user_id: &str) -> StoreResult<Vec<ProductTest>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<ProductTest> = tables
            .tests
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.start_date.cmp(&a.start_date));
        Ok(rows)
    }

    async fn start_test(&self, test: &ProductTest) -> StoreResult<Insert<ProductTest>> {
        let mut tables = self.tables.write().await;
        let in_progress = tables
            .tests
            .iter()
            .any(|t| t.user_id == test.user_id && t.item_id == test.item_id && t.is_active());
        if in_progress {
            return Ok(Insert::Conflict);
        }
        tables.tests.push(test.clone());
        Ok(Insert::Created(test.clone()))
    }

    async fn complete_test(
        &self,
        id: Uuid,
        user_id: &str,
        result: Option<Verdict>,
    ) -> StoreResult<Option<ProductTest>> {
        let mut tables = self.tables.write().await;
        let Some(test) = tables
            .tests
            .iter_mut()
            .find(|t| t.id == id && t.user_id == user_id)
        else {
            return Ok(None);
        };
        test.complete(result);
        Ok(Some(test.clone()))
    }
}
