use tokio::sync::RwLock;

use crate::{
    auth::repo_types::User,
    catalog::repo_types::{Article, ProductIngredient},
    history::repo_types::HistoryEntry,
    notes::repo_types::ProductNote,
    reactions::repo_types::Reaction,
    store::Pagination,
    trials::repo_types::ProductTest,
    wishlist::repo_types::WishlistItem,
};

/// Process-local backend used by tests and `STORE_BACKEND=memory`.
///
/// Every operation takes the lock once, so conditional writes are atomic.
#[derive(Default)]
pub struct MemoryStore {
    pub(crate) tables: RwLock<Tables>,
}

#[derive(Default)]
pub(crate) struct Tables {
    pub users: Vec<User>,
    pub wishlist: Vec<WishlistItem>,
    pub notes: Vec<ProductNote>,
    pub history: Vec<HistoryEntry>,
    pub tests: Vec<ProductTest>,
    pub product_reactions: Vec<Reaction>,
    pub ingredient_reactions: Vec<Reaction>,
    pub articles: Vec<Article>,
    pub ingredients: Vec<ProductIngredient>,
}

pub(crate) fn paginate<T>(items: Vec<T>, page: Pagination) -> Vec<T> {
    let page = page.clamped();
    items
        .into_iter()
        .skip(page.offset as usize)
        .take(page.limit as usize)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paginate_applies_offset_and_limit() {
        let items: Vec<i32> = (0..10).collect();
        let page = Pagination { limit: 3, offset: 4 };
        assert_eq!(paginate(items, page), vec![4, 5, 6]);
    }

    #[test]
    fn paginate_clamps_negative_values() {
        let items: Vec<i32> = (0..3).collect();
        let page = Pagination { limit: -1, offset: -5 };
        assert_eq!(paginate(items, page), vec![0]);
    }
}
