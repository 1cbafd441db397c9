use std::sync::Arc;

use crate::{
    chat::{ChatRelay, RoomRegistry},
    config::Config,
    db::connection::DbPool,
    services::{media::MediaStore, token::TokenService},
    utils::cookies::CookieOptions,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub config: Config,
    pub tokens: TokenService,
    pub media: Arc<dyn MediaStore>,
    pub chat: ChatRelay,
}

impl AppState {
    pub fn new(pool: DbPool, config: Config, media: Arc<dyn MediaStore>) -> Self {
        let tokens = TokenService::from_config(&config);
        let chat = ChatRelay::new(pool.clone(), Arc::new(RoomRegistry::new()));
        Self {
            pool,
            config,
            tokens,
            media,
            chat,
        }
    }

    pub fn cookie_options(&self) -> CookieOptions {
        CookieOptions {
            secure: self.config.cookie_secure,
            same_site: self.config.cookie_same_site,
        }
    }
}
