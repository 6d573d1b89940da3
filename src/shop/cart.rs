use chrono::Utc;
use sqlx::{Pool, Sqlite};

use super::product::Product;
use crate::db::parse_timestamp;
use crate::error::Result;

type CartRow = (
    String,
    String,
    f64,
    String,
    String,
    String,
    String,
    String,
    i64,
);

/// A product in a user's cart
#[derive(Debug, Clone)]
pub struct CartLine {
    pub product: Product,
    pub quantity: i64,
}

impl CartLine {
    fn from_row(row: CartRow) -> Self {
        let (id, title, price, description, image_url, user_id, created_at, updated_at, quantity) =
            row;
        Self {
            product: Product {
                id,
                title,
                price,
                description,
                image_url,
                user_id,
                created_at: parse_timestamp(&created_at),
                updated_at: parse_timestamp(&updated_at),
            },
            quantity,
        }
    }

    pub fn subtotal(&self) -> f64 {
        self.product.price * self.quantity as f64
    }
}

/// Per-user carts backed by SQLite
#[derive(Clone)]
pub struct CartStore {
    pool: Pool<Sqlite>,
}

impl CartStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Add one unit of a product, creating the line if needed
    pub async fn add(&self, user_id: &str, product_id: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO cart_items (user_id, product_id, quantity, added_at)
            VALUES (?1, ?2, 1, ?3)
            ON CONFLICT(user_id, product_id) DO UPDATE SET quantity = quantity + 1
            "#,
        )
        .bind(user_id)
        .bind(product_id)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Drop a product's line entirely
    pub async fn remove(&self, user_id: &str, product_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM cart_items WHERE user_id = ?1 AND product_id = ?2")
            .bind(user_id)
            .bind(product_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Cart lines with their products; lines whose product is gone are skipped
    pub async fn lines(&self, user_id: &str) -> Result<Vec<CartLine>> {
        let rows: Vec<CartRow> = sqlx::query_as(
            r#"
            SELECT p.id, p.title, p.price, p.description, p.image_url, p.user_id,
                   p.created_at, p.updated_at, c.quantity
            FROM cart_items c
            JOIN products p ON p.id = c.product_id
            WHERE c.user_id = ?1
            ORDER BY c.added_at, p.id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(CartLine::from_row).collect())
    }

    pub async fn clear(&self, user_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM cart_items WHERE user_id = ?1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::shop::product::{ProductInput, ProductStore};
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_add_increments_quantity() {
        let dir = tempdir().unwrap();
        let pool = test_pool(dir.path()).await;
        let products = ProductStore::new(pool.clone());
        let carts = CartStore::new(pool);

        let input = ProductInput {
            title: "Book".to_string(),
            price: 4.0,
            description: "Paperback".to_string(),
        };
        let book = products.create("owner", &input, "/images/b.png").await.unwrap();

        carts.add("u1", &book.id).await.unwrap();
        carts.add("u1", &book.id).await.unwrap();

        let lines = carts.lines("u1").await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 2);
        assert_eq!(lines[0].subtotal(), 8.0);
        assert!(carts.lines("u2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_and_clear() {
        let dir = tempdir().unwrap();
        let pool = test_pool(dir.path()).await;
        let products = ProductStore::new(pool.clone());
        let carts = CartStore::new(pool);

        let input = ProductInput {
            title: "Lamp".to_string(),
            price: 20.0,
            description: "Desk lamp".to_string(),
        };
        let lamp = products.create("owner", &input, "/images/l.png").await.unwrap();
        let book = products.create("owner", &input, "/images/b.png").await.unwrap();

        carts.add("u1", &lamp.id).await.unwrap();
        carts.add("u1", &book.id).await.unwrap();
        carts.remove("u1", &lamp.id).await.unwrap();
        assert_eq!(carts.lines("u1").await.unwrap().len(), 1);

        carts.clear("u1").await.unwrap();
        assert!(carts.lines("u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deleted_product_leaves_cart() {
        let dir = tempdir().unwrap();
        let pool = test_pool(dir.path()).await;
        let products = ProductStore::new(pool.clone());
        let carts = CartStore::new(pool);

        let input = ProductInput {
            title: "Mug".to_string(),
            price: 3.0,
            description: "Coffee mug".to_string(),
        };
        let mug = products.create("owner", &input, "/images/m.png").await.unwrap();
        carts.add("u1", &mug.id).await.unwrap();

        products.delete(&mug.id, "owner").await.unwrap();
        assert!(carts.lines("u1").await.unwrap().is_empty());
    }
}
