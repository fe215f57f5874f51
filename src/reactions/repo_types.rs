use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// How a user reacted to a product or ingredient. Also the outcome of a test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "verdict")]
pub enum Verdict {
    Critic,
    Sensitive,
    Safe,
}

/// The two reaction collections share one shape and differ only in their key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionKind {
    Product,
    Ingredient,
}

impl ReactionKind {
    pub(crate) fn table(self) -> &'static str {
        match self {
            ReactionKind::Product => "product_reactions",
            ReactionKind::Ingredient => "ingredient_reactions",
        }
    }

    pub(crate) fn key_column(self) -> &'static str {
        match self {
            ReactionKind::Product => "product_id",
            ReactionKind::Ingredient => "ingredient_name",
        }
    }

    /// Field name used on the wire.
    pub fn key_field(self) -> &'static str {
        match self {
            ReactionKind::Product => "productID",
            ReactionKind::Ingredient => "ingredientName",
        }
    }
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Reaction {
    pub id: Uuid,
    pub user_id: String,
    pub key: String,
    pub reaction: Verdict,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}
