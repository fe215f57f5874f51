use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct CreateNoteRequest {
    #[serde(rename = "productID")]
    pub product_id: Option<String>,
    pub note: Option<String>,
    pub rating: Option<i16>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateNoteRequest {
    pub note: Option<String>,
    pub rating: Option<i16>,
}
