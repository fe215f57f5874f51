use serde::Deserialize;

use crate::reactions::Verdict;

#[derive(Debug, Default, Deserialize)]
pub struct StartTestRequest {
    #[serde(rename = "itemID")]
    pub item_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CompleteTestRequest {
    pub result: Option<Verdict>,
}
