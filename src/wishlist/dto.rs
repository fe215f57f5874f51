use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Any `userID` the client sends is ignored.
#[derive(Debug, Default, Deserialize)]
pub struct AddWishlistRequest {
    #[serde(rename = "productID")]
    pub product_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RemovedResponse {
    pub message: &'static str,
    pub id: Uuid,
}
