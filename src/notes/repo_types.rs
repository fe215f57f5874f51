use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ProductNote {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(rename = "productID")]
    pub product_id: String,
    #[serde(rename = "userID")]
    pub user_id: String,
    pub note: String,
    pub rating: Option<i16>, // 1..=5
    #[serde(rename = "createdAt", with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(rename = "updatedAt", with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

pub const RATING_RANGE: std::ops::RangeInclusive<i16> = 1..=5;
