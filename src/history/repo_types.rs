use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// One viewed product. History is append-only.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct HistoryEntry {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(rename = "userID")]
    pub user_id: String,
    #[serde(rename = "itemID")]
    pub item_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}
