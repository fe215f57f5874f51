use serde::{ser::SerializeMap, Deserialize, Serialize, Serializer};
use time::format_description::well_known::Rfc3339;

use super::repo_types::{Reaction, ReactionKind, Verdict};

#[derive(Debug, Default, Deserialize)]
pub struct ProductReactionRequest {
    #[serde(rename = "productID")]
    pub product_id: Option<String>,
    pub reaction: Option<Verdict>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngredientReactionRequest {
    pub ingredient_name: Option<String>,
    pub reaction: Option<Verdict>,
}

/// A reaction rendered with the key field of its collection.
#[derive(Debug)]
pub struct ReactionView {
    pub kind: ReactionKind,
    pub reaction: Reaction,
}

impl Serialize for ReactionView {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let r = &self.reaction;
        let created = r.created_at.format(&Rfc3339).map_err(serde::ser::Error::custom)?;
        let updated = r.updated_at.format(&Rfc3339).map_err(serde::ser::Error::custom)?;
        let mut map = serializer.serialize_map(Some(6))?;
        map.serialize_entry("_id", &r.id)?;
        map.serialize_entry("userID", &r.user_id)?;
        map.serialize_entry(self.kind.key_field(), &r.key)?;
        map.serialize_entry("reaction", &r.reaction)?;
        map.serialize_entry("createdAt", &created)?;
        map.serialize_entry("updatedAt", &updated)?;
        map.end()
    }
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub message: &'static str,
}
