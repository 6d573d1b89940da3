use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Sqlite};
use uuid::Uuid;

use super::cart::CartLine;
use crate::auth::User;
use crate::db::parse_timestamp;
use crate::error::{AppError, Result};

type OrderRow = (String, String, String, String, String);

/// Product details frozen at checkout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: String,
    pub title: String,
    pub price: f64,
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub user_id: String,
    pub user_email: String,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    fn from_row(row: OrderRow) -> Result<Self> {
        let (id, user_id, user_email, items, created_at) = row;
        Ok(Self {
            id,
            user_id,
            user_email,
            items: serde_json::from_str(&items)?,
            created_at: parse_timestamp(&created_at),
        })
    }

    pub fn total(&self) -> f64 {
        self.items
            .iter()
            .map(|item| item.price * item.quantity as f64)
            .sum()
    }
}

/// Order history backed by SQLite
#[derive(Clone)]
pub struct OrderStore {
    pool: Pool<Sqlite>,
}

impl OrderStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Record an order for `user` from their cart lines
    pub async fn create(&self, user: &User, lines: &[CartLine]) -> Result<Order> {
        if lines.is_empty() {
            return Err(AppError::BadRequest("Cart is empty".to_string()));
        }

        let order = Order {
            id: Uuid::new_v4().to_string(),
            user_id: user.id.clone(),
            user_email: user.email.clone(),
            items: lines
                .iter()
                .map(|line| OrderItem {
                    product_id: line.product.id.clone(),
                    title: line.product.title.clone(),
                    price: line.product.price,
                    quantity: line.quantity,
                })
                .collect(),
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, user_email, items, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&order.id)
        .bind(&order.user_id)
        .bind(&order.user_email)
        .bind(serde_json::to_string(&order.items)?)
        .bind(order.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        tracing::info!("Order {} placed by {}", order.id, order.user_email);
        Ok(order)
    }

    /// Orders placed by `user_id`, newest first
    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<Order>> {
        let rows: Vec<OrderRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, user_email, items, created_at
            FROM orders WHERE user_id = ?1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Order::from_row).collect()
    }
}
