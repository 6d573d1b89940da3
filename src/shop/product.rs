use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Sqlite};
use uuid::Uuid;

use crate::db::parse_timestamp;
use crate::error::{AppError, Result};

/// Products shown per index page
pub const ITEMS_PER_PAGE: i64 = 2;

type ProductRow = (String, String, f64, String, String, String, String, String);

const PRODUCT_COLUMNS: &str =
    "id, title, price, description, image_url, user_id, created_at, updated_at";

/// Catalog entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub title: String,
    pub price: f64,
    pub description: String,
    pub image_url: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    fn from_row(row: ProductRow) -> Self {
        let (id, title, price, description, image_url, user_id, created_at, updated_at) = row;
        Self {
            id,
            title,
            price,
            description,
            image_url,
            user_id,
            created_at: parse_timestamp(&created_at),
            updated_at: parse_timestamp(&updated_at),
        }
    }
}

/// Editable product fields
#[derive(Debug, Clone)]
pub struct ProductInput {
    pub title: String,
    pub price: f64,
    pub description: String,
}

/// One page of the product index
#[derive(Debug, Clone)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub current_page: i64,
    pub last_page: i64,
}

impl ProductPage {
    pub fn has_previous(&self) -> bool {
        self.current_page > 1
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.last_page
    }
}

/// Product store backed by SQLite
#[derive(Clone)]
pub struct ProductStore {
    pool: Pool<Sqlite>,
}

impl ProductStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        user_id: &str,
        input: &ProductInput,
        image_url: &str,
    ) -> Result<Product> {
        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            title: input.title.clone(),
            price: input.price,
            description: input.description.clone(),
            image_url: image_url.to_string(),
            user_id: user_id.to_string(),
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO products (id, title, price, description, image_url, user_id, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&product.id)
        .bind(&product.title)
        .bind(product.price)
        .bind(&product.description)
        .bind(&product.image_url)
        .bind(&product.user_id)
        .bind(product.created_at.to_rfc3339())
        .bind(product.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        tracing::info!("Product created: {} ({})", product.title, product.id);
        Ok(product)
    }

    pub async fn get(&self, id: &str) -> Result<Option<Product>> {
        let row: Option<ProductRow> =
            sqlx::query_as(&format!("SELECT {} FROM products WHERE id = ?1", PRODUCT_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(Product::from_row))
    }

    /// All products, oldest first
    pub async fn list(&self) -> Result<Vec<Product>> {
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {} FROM products ORDER BY created_at, id",
            PRODUCT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from_row).collect())
    }

    /// Products owned by `user_id`
    pub async fn list_by_user(&self, user_id: &str) -> Result<Vec<Product>> {
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {} FROM products WHERE user_id = ?1 ORDER BY created_at, id",
            PRODUCT_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from_row).collect())
    }

    /// Page `page` (1-based) of the index.
    ///
    /// Pages below 1 are treated as 1. Pages past the end are empty; the
    /// number is capped so the row offset always fits in an `i64`.
    pub async fn page(&self, page: i64) -> Result<ProductPage> {
        let page = page.clamp(1, i64::MAX / ITEMS_PER_PAGE);
        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {} FROM products ORDER BY created_at, id LIMIT ?1 OFFSET ?2",
            PRODUCT_COLUMNS
        ))
        .bind(ITEMS_PER_PAGE)
        .bind((page - 1) * ITEMS_PER_PAGE)
        .fetch_all(&self.pool)
        .await?;

        Ok(ProductPage {
            products: rows.into_iter().map(Product::from_row).collect(),
            current_page: page,
            last_page: ((total + ITEMS_PER_PAGE - 1) / ITEMS_PER_PAGE).max(1),
        })
    }

    /// Update a product owned by `user_id`
    ///
    /// Returns the product as it was before the update, so the caller can
    /// clean up a replaced image.
    pub async fn update(
        &self,
        id: &str,
        user_id: &str,
        input: &ProductInput,
        image_url: Option<&str>,
    ) -> Result<Product> {
        let previous = self.get_owned(id, user_id).await?;
        let image_url = image_url.unwrap_or(&previous.image_url);

        sqlx::query(
            r#"
            UPDATE products
            SET title = ?1, price = ?2, description = ?3, image_url = ?4, updated_at = ?5
            WHERE id = ?6
            "#,
        )
        .bind(&input.title)
        .bind(input.price)
        .bind(&input.description)
        .bind(image_url)
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(previous)
    }

    /// Delete a product owned by `user_id`, together with cart lines pointing at it
    pub async fn delete(&self, id: &str, user_id: &str) -> Result<Product> {
        let product = self.get_owned(id, user_id).await?;

        sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        sqlx::query("DELETE FROM cart_items WHERE product_id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        tracing::info!("Product deleted: {} ({})", product.title, product.id);
        Ok(product)
    }

    async fn get_owned(&self, id: &str, user_id: &str) -> Result<Product> {
        let product = self
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Product {}", id)))?;

        if product.user_id != user_id {
            return Err(AppError::Forbidden(format!(
                "Product {} belongs to another user",
                id
            )));
        }

        Ok(product)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use tempfile::tempdir;

    fn input(title: &str) -> ProductInput {
        ProductInput {
            title: title.to_string(),
            price: 12.5,
            description: "A fine product".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let dir = tempdir().unwrap();
        let products = ProductStore::new(test_pool(dir.path()).await);

        let book = products.create("u1", &input("Book"), "/images/book.png").await.unwrap();
        products.create("u2", &input("Lamp"), "/images/lamp.png").await.unwrap();

        let loaded = products.get(&book.id).await.unwrap().unwrap();
        assert_eq!(loaded.title, "Book");
        assert_eq!(loaded.price, 12.5);
        assert_eq!(products.list().await.unwrap().len(), 2);
        assert_eq!(products.list_by_user("u1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_pagination() {
        let dir = tempdir().unwrap();
        let products = ProductStore::new(test_pool(dir.path()).await);
        for title in ["A", "B", "C"] {
            products.create("u1", &input(title), "/images/x.png").await.unwrap();
        }

        let first = products.page(1).await.unwrap();
        assert_eq!(first.products.len(), 2);
        assert_eq!(first.last_page, 2);
        assert!(first.has_next());
        assert!(!first.has_previous());

        let second = products.page(2).await.unwrap();
        assert_eq!(second.products.len(), 1);
        assert!(!second.has_next());

        assert_eq!(products.page(0).await.unwrap().current_page, 1);
    }

    #[tokio::test]
    async fn test_page_far_past_the_end() {
        let dir = tempdir().unwrap();
        let products = ProductStore::new(test_pool(dir.path()).await);
        products.create("u1", &input("A"), "/images/x.png").await.unwrap();

        let page = products.page(i64::MAX).await.unwrap();
        assert!(page.products.is_empty());
        assert!(page.has_previous());
        assert!(!page.has_next());
    }

    #[tokio::test]
    async fn test_update_checks_owner() {
        let dir = tempdir().unwrap();
        let products = ProductStore::new(test_pool(dir.path()).await);
        let book = products.create("u1", &input("Book"), "/images/old.png").await.unwrap();

        let result = products.update(&book.id, "u2", &input("Stolen"), None).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));

        let previous = products
            .update(&book.id, "u1", &input("Better Book"), Some("/images/new.png"))
            .await
            .unwrap();
        assert_eq!(previous.image_url, "/images/old.png");

        let updated = products.get(&book.id).await.unwrap().unwrap();
        assert_eq!(updated.title, "Better Book");
        assert_eq!(updated.image_url, "/images/new.png");
    }

    #[tokio::test]
    async fn test_delete() {
        let dir = tempdir().unwrap();
        let products = ProductStore::new(test_pool(dir.path()).await);
        let book = products.create("u1", &input("Book"), "/images/book.png").await.unwrap();

        assert!(matches!(
            products.delete(&book.id, "u2").await,
            Err(AppError::Forbidden(_))
        ));
        products.delete(&book.id, "u1").await.unwrap();
        assert!(products.get(&book.id).await.unwrap().is_none());
        assert!(matches!(
            products.delete(&book.id, "u1").await,
            Err(AppError::NotFound(_))
        ));
    }
}
