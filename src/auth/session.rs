use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{Duration, Utc};
use parking_lot::Mutex;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Sqlite};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::db::parse_timestamp;
use crate::error::Result;

/// Session cookie name
pub const SESSION_COOKIE: &str = "storefront.sid";

/// Reference to the logged-in user kept in the session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionUser {
    #[serde(rename = "_id")]
    pub id: String,
}

/// Session payload, stored as a JSON document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionData {
    pub is_logged_in: bool,
    pub user: Option<SessionUser>,
    pub csrf_secret: Option<String>,
    pub flash: BTreeMap<String, Vec<String>>,
}

#[derive(Debug)]
struct SessionInner {
    id: Option<String>,
    data: SessionData,
    modified: bool,
    destroyed: bool,
}

/// Point-in-time copy of a session, used when persisting it
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub id: Option<String>,
    pub data: SessionData,
    pub modified: bool,
    pub destroyed: bool,
}

/// Per-request session handle
///
/// Cloned into every stage of one request; all clones share the same state.
/// Any mutation marks the session modified so it is saved after the response.
#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<Mutex<SessionInner>>,
}

impl Session {
    /// A session with no stored record yet
    pub fn new() -> Self {
        Self::from_parts(None, SessionData::default())
    }

    /// A session loaded from the store
    pub fn existing(id: String, data: SessionData) -> Self {
        Self::from_parts(Some(id), data)
    }

    fn from_parts(id: Option<String>, data: SessionData) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SessionInner {
                id,
                data,
                modified: false,
                destroyed: false,
            })),
        }
    }

    pub fn id(&self) -> Option<String> {
        self.inner.lock().id.clone()
    }

    pub fn is_logged_in(&self) -> bool {
        self.inner.lock().data.is_logged_in
    }

    pub fn user_id(&self) -> Option<String> {
        self.inner.lock().data.user.as_ref().map(|u| u.id.clone())
    }

    /// Mark the session as belonging to `user_id`
    pub fn log_in(&self, user_id: &str) {
        let mut inner = self.inner.lock();
        inner.data.is_logged_in = true;
        inner.data.user = Some(SessionUser {
            id: user_id.to_string(),
        });
        inner.modified = true;
    }

    /// Drop the session; its record and cookie are removed after the response
    pub fn destroy(&self) {
        let mut inner = self.inner.lock();
        inner.data = SessionData::default();
        inner.destroyed = true;
    }

    pub fn csrf_secret(&self) -> Option<String> {
        self.inner.lock().data.csrf_secret.clone()
    }

    pub fn set_csrf_secret(&self, secret: &str) {
        let mut inner = self.inner.lock();
        inner.data.csrf_secret = Some(secret.to_string());
        inner.modified = true;
    }

    pub fn push_flash(&self, kind: &str, message: &str) {
        let mut inner = self.inner.lock();
        inner
            .data
            .flash
            .entry(kind.to_string())
            .or_default()
            .push(message.to_string());
        inner.modified = true;
    }

    /// Remove and return all flash messages of `kind`
    pub fn take_flash(&self, kind: &str) -> Vec<String> {
        let mut inner = self.inner.lock();
        match inner.data.flash.remove(kind) {
            Some(messages) => {
                inner.modified = true;
                messages
            }
            None => Vec::new(),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let inner = self.inner.lock();
        SessionSnapshot {
            id: inner.id.clone(),
            data: inner.data.clone(),
            modified: inner.modified,
            destroyed: inner.destroyed,
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate a random, URL-safe session identifier
pub fn generate_session_id() -> String {
    let random_bytes: [u8; 32] = rand::thread_rng().gen();
    URL_SAFE_NO_PAD.encode(random_bytes)
}

/// Session store backed by SQLite
#[derive(Clone)]
pub struct SessionStore {
    pool: Pool<Sqlite>,
    default_ttl: Duration,
}

impl SessionStore {
    /// Create a new session store
    pub fn new(pool: Pool<Sqlite>, ttl_secs: i64) -> Self {
        Self {
            pool,
            default_ttl: Duration::seconds(ttl_secs),
        }
    }

    /// Get a session by ID, dropping it if expired
    pub async fn load(&self, session_id: &str) -> Result<Option<SessionData>> {
        let row: Option<(String, String)> =
            sqlx::query_as("SELECT data, expires_at FROM sessions WHERE id = ?1")
                .bind(session_id)
                .fetch_optional(&self.pool)
                .await?;

        let Some((data, expires_at)) = row else {
            return Ok(None);
        };

        if Utc::now() > parse_timestamp(&expires_at) {
            self.destroy(session_id).await?;
            return Ok(None);
        }

        Ok(Some(serde_json::from_str(&data)?))
    }

    /// Insert or replace a session, restarting its expiry
    pub async fn save(&self, session_id: &str, data: &SessionData) -> Result<()> {
        let expires_at = Utc::now() + self.default_ttl;
        let json = serde_json::to_string(data)?;

        sqlx::query(
            r#"
            INSERT INTO sessions (id, data, expires_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET data = ?2, expires_at = ?3
            "#,
        )
        .bind(session_id)
        .bind(&json)
        .bind(expires_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Extend session expiration without rewriting its data
    pub async fn touch(&self, session_id: &str) -> Result<()> {
        let new_expires = Utc::now() + self.default_ttl;
        sqlx::query("UPDATE sessions SET expires_at = ?1 WHERE id = ?2")
            .bind(new_expires.to_rfc3339())
            .bind(session_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Delete a session
    pub async fn destroy(&self, session_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE id = ?1")
            .bind(session_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Delete all expired sessions
    pub async fn cleanup_expired(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at < ?1")
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use tempfile::tempdir;

    #[test]
    fn test_new_session_is_unmodified() {
        let session = Session::new();
        assert!(!session.is_logged_in());
        assert!(session.user_id().is_none());
        assert!(!session.snapshot().modified);
    }

    #[test]
    fn test_log_in_marks_modified() {
        let session = Session::new();
        session.log_in("user-1");

        let snapshot = session.snapshot();
        assert!(snapshot.modified);
        assert!(snapshot.data.is_logged_in);
        assert_eq!(session.user_id().as_deref(), Some("user-1"));
    }

    #[test]
    fn test_flash_is_read_once() {
        let session = Session::new();
        session.push_flash("error", "Invalid email or password.");

        assert_eq!(session.take_flash("error"), vec!["Invalid email or password."]);
        assert!(session.take_flash("error").is_empty());
    }

    #[test]
    fn test_reading_empty_flash_does_not_modify() {
        let session = Session::existing("id".to_string(), SessionData::default());
        assert!(session.take_flash("error").is_empty());
        assert!(!session.snapshot().modified);
    }

    #[test]
    fn test_destroy_clears_data() {
        let session = Session::new();
        session.log_in("user-1");
        session.destroy();

        let snapshot = session.snapshot();
        assert!(snapshot.destroyed);
        assert!(!snapshot.data.is_logged_in);
    }

    #[test]
    fn test_session_document_field_names() {
        let data = SessionData {
            is_logged_in: true,
            user: Some(SessionUser {
                id: "u1".to_string(),
            }),
            ..Default::default()
        };
        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["isLoggedIn"], true);
        assert_eq!(json["user"]["_id"], "u1");
    }

    #[test]
    fn test_generate_session_id_randomness() {
        let id1 = generate_session_id();
        let id2 = generate_session_id();
        assert_ne!(id1, id2);
        assert_eq!(id1.len(), 43);
    }

    #[tokio::test]
    async fn test_store_roundtrip_and_destroy() {
        let dir = tempdir().unwrap();
        let store = SessionStore::new(test_pool(dir.path()).await, 3600);

        let mut data = SessionData::default();
        data.is_logged_in = true;
        store.save("s1", &data).await.unwrap();
        assert_eq!(store.load("s1").await.unwrap(), Some(data));

        store.destroy("s1").await.unwrap();
        assert!(store.load("s1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_sessions() {
        let dir = tempdir().unwrap();
        let pool = test_pool(dir.path()).await;
        let expired = SessionStore::new(pool.clone(), -10);
        let live = SessionStore::new(pool, 3600);

        expired.save("old", &SessionData::default()).await.unwrap();
        live.save("fresh", &SessionData::default()).await.unwrap();

        assert_eq!(live.cleanup_expired().await.unwrap(), 1);
        assert!(live.load("fresh").await.unwrap().is_some());

        expired.save("old", &SessionData::default()).await.unwrap();
        assert!(live.load("old").await.unwrap().is_none());
    }
}
