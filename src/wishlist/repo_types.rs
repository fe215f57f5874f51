use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct WishlistItem {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(rename = "userID")]
    pub user_id: String,
    #[serde(rename = "productID")]
    pub product_id: String,
    #[serde(rename = "addedAt", with = "time::serde::rfc3339")]
    pub added_at: OffsetDateTime,
}
