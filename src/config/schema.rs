use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Web server settings
    pub web: WebConfig,
    /// Database settings
    pub database: DatabaseConfig,
    /// Session cookie and store settings
    pub session: SessionConfig,
    /// Public assets and uploaded images
    pub assets: AssetsConfig,
}

/// Web server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// Bind address
    pub bind_address: String,
    /// HTTP port
    pub http_port: u16,
    /// Maximum accepted request body in bytes (forms and uploads)
    pub body_limit: usize,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            http_port: 4000,
            body_limit: 10 * 1024 * 1024,
        }
    }
}

impl WebConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.http_port)
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Connection URL, e.g. `sqlite:shop.db?mode=rwc`
    pub url: String,
    /// Pool size
    pub max_connections: u32,
    /// Seconds to wait for a pooled connection
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:shop.db?mode=rwc".to_string(),
            max_connections: 4,
            acquire_timeout_secs: 5,
        }
    }
}

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Secret used to sign the session cookie
    pub secret: String,
    /// Lifetime of a stored session in seconds
    pub ttl_secs: i64,
    /// How often expired sessions are purged, in seconds
    pub cleanup_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secret: "my secret".to_string(),
            ttl_secs: 14 * 24 * 3600, // two weeks
            cleanup_interval_secs: 600,
        }
    }
}

/// Static asset and upload directories
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetsConfig {
    /// Served verbatim under the site root
    pub public_dir: String,
    /// Upload destination, served under `/images`
    pub images_dir: String,
    /// Largest accepted image in bytes
    pub max_image_size: u64,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            public_dir: "public".to_string(),
            images_dir: "images".to_string(),
            max_image_size: 5 * 1024 * 1024,
        }
    }
}

impl AssetsConfig {
    pub fn public_dir_path(&self) -> PathBuf {
        PathBuf::from(&self.public_dir)
    }

    pub fn images_dir_path(&self) -> PathBuf {
        PathBuf::from(&self.images_dir)
    }
}
