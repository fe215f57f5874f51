use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{Reaction, ReactionKind, Verdict};
use crate::store::{memory::Tables, MemoryStore, PgStore, StoreResult, Upsert};

#[async_trait]
pub trait ReactionRepo {
    async fn list_reactions(&self, kind: ReactionKind, user_id: &str) -> StoreResult<Vec<Reaction>>;
    /// Single conditional write keyed by (user, key).
    async fn upsert_reaction(
        &self,
        kind: ReactionKind,
        user_id: &str,
        key: &str,
        reaction: Verdict,
    ) -> StoreResult<Upsert<Reaction>>;
    /// Returns whether a record was removed.
    async fn delete_reaction(&self, kind: ReactionKind, user_id: &str, key: &str) -> StoreResult<bool>;
}

#[derive(sqlx::FromRow)]
struct UpsertRow {
    #[sqlx(flatten)]
    reaction: Reaction,
    inserted: bool,
}

#[async_trait]
impl ReactionRepo for PgStore {
    async fn list_reactions(&self, kind: ReactionKind, user_id: &str) -> StoreResult<Vec<Reaction>> {
        let rows = sqlx::query_as::<_, Reaction>(&format!(
            r#"
            SELECT id, user_id, {key} AS key, reaction, created_at, updated_at
              FROM {table}
             WHERE user_id = $1
             ORDER BY created_at ASC
            "#,
            key = kind.key_column(),
            table = kind.table(),
        ))
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    async fn upsert_reaction(
        &self,
        kind: ReactionKind,
        user_id: &str,
        key: &str,
        reaction: Verdict,
    ) -> StoreResult<Upsert<Reaction>> {
        // xmax is zero only for a freshly inserted tuple
        let row = sqlx::query_as::<_, UpsertRow>(&format!(
            r#"
            INSERT INTO {table} (id, user_id, {key}, reaction)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, {key})
            DO UPDATE SET reaction = EXCLUDED.reaction, updated_at = now()
            RETURNING id, user_id, {key} AS key, reaction, created_at, updated_at,
                      (xmax = 0) AS inserted
            "#,
            key = kind.key_column(),
            table = kind.table(),
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(key)
        .bind(reaction)
        .fetch_one(self.pool())
        .await?;
        Ok(if row.inserted {
            Upsert::Inserted(row.reaction)
        } else {
            Upsert::Updated(row.reaction)
        })
    }

    async fn delete_reaction(&self, kind: ReactionKind, user_id: &str, key: &str) -> StoreResult<bool> {
        let result = sqlx::query(&format!(
            "DELETE FROM {table} WHERE user_id = $1 AND {key} = $2",
            key = kind.key_column(),
            table = kind.table(),
        ))
        .bind(user_id)
        .bind(key)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn collection(tables: &mut Tables, kind: ReactionKind) -> &mut Vec<Reaction> {
    match kind {
        ReactionKind::Product => &mut tables.product_reactions,
        ReactionKind::Ingredient => &mut tables.ingredient_reactions,
    }
}

#[async_trait]
impl ReactionRepo for MemoryStore {
    async fn list_reactions(&self, kind: ReactionKind, user_id: &str) -> StoreResult<Vec<Reaction>> {
        let tables = self.tables.read().await;
        let rows = match kind {
            ReactionKind::Product => &tables.product_reactions,
            ReactionKind::Ingredient => &tables.ingredient_reactions,
        };
        let mut rows: Vec<Reaction> = rows
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(rows)
    }

    async fn upsert_reaction(
        &self,
        kind: ReactionKind,
        user_id: &str,
        key: &str,
        reaction: Verdict,
    ) -> StoreResult<Upsert<Reaction>> {
        let mut tables = self.tables.write().await;
        let rows = collection(&mut tables, kind);
        let now = OffsetDateTime::now_utc();
        if let Some(existing) = rows.iter_mut().find(|r| r.user_id == user_id && r.key == key) {
            existing.reaction = reaction;
            existing.updated_at = now;
            return Ok(Upsert::Updated(existing.clone()));
        }
        let created = Reaction {
            id: Uuid::new_v4(),
            user_id: user_id.to_owned(),
            key: key.to_owned(),
            reaction,
            created_at: now,
            updated_at: now,
        };
        rows.push(created.clone());
        Ok(Upsert::Inserted(created))
    }

    async fn delete_reaction(&self, kind: ReactionKind, user_id: &str, key: &str) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let rows = collection(&mut tables, kind);
        let before = rows.len();
        rows.retain(|r| !(r.user_id == user_id && r.key == key));
        Ok(rows.len() != before)
    }
}
