mod schema;

pub use schema::{AppConfig, AssetsConfig, DatabaseConfig, SessionConfig, WebConfig};

use std::env;

use crate::error::{AppError, Result};

impl AppConfig {
    /// Build configuration from defaults overridden by environment variables.
    ///
    /// A `.env` file in the working directory is loaded first if present.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`AppConfig::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = AppConfig::default();

        // MONGODB_URI is the historical name of the connection string
        if let Some(url) = lookup("DATABASE_URL").or_else(|| lookup("MONGODB_URI")) {
            config.database.url = url;
        }
        if let Some(secret) = lookup("SESSION_SECRET") {
            config.session.secret = secret;
        }
        if let Some(addr) = lookup("BIND_ADDRESS") {
            config.web.bind_address = addr;
        }
        if let Some(port) = lookup("PORT") {
            config.web.http_port = port
                .parse()
                .map_err(|_| AppError::Config(format!("Invalid PORT: {}", port)))?;
        }
        if let Some(dir) = lookup("PUBLIC_DIR") {
            config.assets.public_dir = dir;
        }
        if let Some(dir) = lookup("IMAGES_DIR") {
            config.assets.images_dir = dir;
        }

        Ok(config)
    }
}
