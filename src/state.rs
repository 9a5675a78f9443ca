use std::sync::Arc;

use crate::auth::TokenManager;
use crate::config::Config;
use crate::store::Store;

/// Shared handles every handler and the auth middleware reach through `web::Data`.
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub tokens: TokenManager,
    pub bcrypt_cost: u32,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: &Config) -> Self {
        Self {
            store,
            tokens: TokenManager::new(&config.jwt_secret),
            bcrypt_cost: config.bcrypt_cost,
        }
    }
}
