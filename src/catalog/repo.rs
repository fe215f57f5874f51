use async_trait::async_trait;

use super::repo_types::{Article, ProductIngredient};
use crate::store::{memory::paginate, MemoryStore, Pagination, PgStore, StoreResult};

#[async_trait]
pub trait CatalogRepo {
    async fn list_articles(&self, page: Pagination) -> StoreResult<Vec<Article>>;
    async fn create_article(&self, article: &Article) -> StoreResult<Article>;
    async fn list_ingredients(&self, page: Pagination) -> StoreResult<Vec<ProductIngredient>>;
    async fn create_ingredient(&self, ingredient: &ProductIngredient) -> StoreResult<ProductIngredient>;
}

const ARTICLE_COLUMNS: &str = "id, title, content, author, category, tags, published_at";
const INGREDIENT_COLUMNS: &str = "id, name, description, category, properties, safety_level";

#[async_trait]
impl CatalogRepo for PgStore {
    async fn list_articles(&self, page: Pagination) -> StoreResult<Vec<Article>> {
        let page = page.clamped();
        let rows = sqlx::query_as::<_, Article>(&format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles ORDER BY published_at DESC LIMIT $1 OFFSET $2"
        ))
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    async fn create_article(&self, article: &Article) -> StoreResult<Article> {
        let row = sqlx::query_as::<_, Article>(&format!(
            r#"
            INSERT INTO articles (id, title, content, author, category, tags, published_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {ARTICLE_COLUMNS}
            "#
        ))
        .bind(article.id)
        .bind(&article.title)
        .bind(&article.content)
        .bind(&article.author)
        .bind(&article.category)
        .bind(&article.tags)
        .bind(article.published_at)
        .fetch_one(self.pool())
        .await?;
        Ok(row)
    }

    async fn list_ingredients(&self, page: Pagination) -> StoreResult<Vec<ProductIngredient>> {
        let page = page.clamped();
        let rows = sqlx::query_as::<_, ProductIngredient>(&format!(
            "SELECT {INGREDIENT_COLUMNS} FROM product_ingredients ORDER BY name LIMIT $1 OFFSET $2"
        ))
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    async fn create_ingredient(&self, ingredient: &ProductIngredient) -> StoreResult<ProductIngredient> {
        let row = sqlx::query_as::<_, ProductIngredient>(&format!(
            r#"
            INSERT INTO product_ingredients (id, name, description, category, properties, safety_level)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {INGREDIENT_COLUMNS}
            "#
        ))
        .bind(ingredient.id)
        .bind(&ingredient.name)
        .bind(&ingredient.description)
        .bind(&ingredient.category)
        .bind(&ingredient.properties)
        .bind(&ingredient.safety_level)
        .fetch_one(self.pool())
        .await?;
        Ok(row)
    }
}

#[async_trait]
impl CatalogRepo for MemoryStore {
    async fn list_articles(&self, page: Pagination) -> StoreResult<Vec<Article>> {
        let mut rows = self.tables.read().await.articles.clone();
        rows.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        Ok(paginate(rows, page))
    }

    async fn create_article(&self, article: &Article) -> StoreResult<Article> {
        self.tables.write().await.articles.push(article.clone());
        Ok(article.clone())
    }

    async fn list_ingredients(&self, page: Pagination) -> StoreResult<Vec<ProductIngredient>> {
        let mut rows = self.tables.read().await.ingredients.clone();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(paginate(rows, page))
    }

    async fn create_ingredient(&self, ingredient: &ProductIngredient) -> StoreResult<ProductIngredient> {
        self.tables.write().await.ingredients.push(ingredient.clone());
        Ok(ingredient.clone())
    }
}
