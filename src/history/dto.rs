use serde::Deserialize;
use time::OffsetDateTime;

#[derive(Debug, Default, Deserialize)]
pub struct AddHistoryRequest {
    #[serde(rename = "itemID")]
    pub item_id: Option<String>,
    /// Defaults to the time the request is handled.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub timestamp: Option<OffsetDateTime>,
}
