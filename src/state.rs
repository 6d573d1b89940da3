use sqlx::{Pool, Sqlite};
use std::sync::Arc;

use crate::auth::{CookieSigner, SessionStore, UserStore};
use crate::config::AppConfig;
use crate::error::Result;
use crate::shop::{CartStore, OrderStore, ProductStore};
use crate::upload::ImageStore;

/// Application-wide state shared across handlers
///
/// Built once at startup from an explicit configuration and a connected pool;
/// nothing in it is a process-wide singleton.
pub struct AppState {
    /// Configuration the state was built from
    pub config: AppConfig,
    /// Session store
    pub sessions: SessionStore,
    /// User store
    pub users: UserStore,
    /// Product catalog
    pub products: ProductStore,
    /// Shopping carts
    pub carts: CartStore,
    /// Order history
    pub orders: OrderStore,
    /// Uploaded product images
    pub images: ImageStore,
    /// Session cookie signer
    pub signer: CookieSigner,
}

impl AppState {
    /// Create new application state
    pub fn new(config: AppConfig, pool: Pool<Sqlite>) -> Result<Arc<Self>> {
        let signer = CookieSigner::new(&config.session.secret)?;
        let images = ImageStore::new(
            config.assets.images_dir_path(),
            config.assets.max_image_size,
        );

        Ok(Arc::new(Self {
            sessions: SessionStore::new(pool.clone(), config.session.ttl_secs),
            users: UserStore::new(pool.clone()),
            products: ProductStore::new(pool.clone()),
            carts: CartStore::new(pool.clone()),
            orders: OrderStore::new(pool),
            images,
            signer,
            config,
        }))
    }
}
