//! Shop customers.
//!
//! E-mail addresses are the login name. They are stored trimmed and
//! lowercased, so every lookup goes through [`normalize_email`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Sqlite};
use uuid::Uuid;

use super::password::{hash_password, verify_password};
use crate::db::parse_timestamp;
use crate::error::Result;

const USER_COLUMNS: &str = "id, email, password_hash, created_at";

type UserRow = (String, String, String, String);

/// A registered customer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from((id, email, password_hash, created_at): UserRow) -> Self {
        Self {
            id,
            email,
            password_hash,
            created_at: parse_timestamp(&created_at),
        }
    }
}

/// Outcome of a signup
#[derive(Debug)]
pub enum Registration {
    Created(User),
    /// Another account already uses the address
    EmailTaken,
}

/// Canonical form of an e-mail address as entered in a form
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Clone)]
pub struct UserStore {
    pool: Pool<Sqlite>,
}

impl UserStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Register a customer.
    ///
    /// The unique index on `email` decides whether the address is taken, so
    /// two concurrent signups for one address cannot both succeed.
    pub async fn register(&self, email: &str, password: &str) -> Result<Registration> {
        let user = User {
            id: Uuid::new_v4().to_string(),
            email: normalize_email(email),
            password_hash: hash_password(password)?,
            created_at: Utc::now(),
        };

        let inserted = sqlx::query(
            "INSERT INTO users (id, email, password_hash, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?4)",
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.created_at.to_rfc3339())
        .execute(&self.pool)
        .await;

        match inserted {
            Ok(_) => {
                tracing::info!("Registered {}", user.email);
                Ok(Registration::Created(user))
            }
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Ok(Registration::EmailTaken)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// `Ok(None)` when no such user exists; `Err` only when the lookup failed
    pub async fn get(&self, user_id: &str) -> Result<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS))
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(User::from))
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {} FROM users WHERE email = ?1", USER_COLUMNS))
                .bind(normalize_email(email))
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(User::from))
    }

    /// The user owning `email`, if `password` matches
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Option<User>> {
        match self.find_by_email(email).await? {
            Some(user) if verify_password(password, &user.password_hash)? => Ok(Some(user)),
            _ => Ok(None),
        }
    }

    /// Delete an account; false if there was none
    pub async fn remove(&self, user_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
pub(crate) async fn registered(users: &UserStore, email: &str) -> User {
    match users.register(email, "hunter2").await.unwrap() {
        Registration::Created(user) => user,
        Registration::EmailTaken => panic!("{} is already registered", email),
    }
}
