use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::reactions::Verdict;

/// A timed trial of one item by one user.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct ProductTest {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(rename = "userID")]
    pub user_id: String,
    #[serde(rename = "itemID")]
    pub item_id: String,
    #[serde(rename = "startDate", with = "time::serde::rfc3339")]
    pub start_date: OffsetDateTime,
    #[serde(rename = "finishDate", with = "time::serde::rfc3339")]
    pub finish_date: OffsetDateTime,
    pub completed: bool,
    pub result: Option<Verdict>,
}
