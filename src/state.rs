use std::sync::Arc;

use crate::config::AppConfig;
use crate::database::{ContactStore, MongoContactStore, MongoDB, MongoUserStore, UserStore};
use crate::services::auth_service::AuthService;
use crate::services::avatar_service::AvatarService;
use crate::services::email_service::{self, Mailer};

/// Everything a handler needs, built once in `main` and shared read-only
/// through `web::Data`.
pub struct AppState {
    pub contacts: Arc<dyn ContactStore>,
    pub users: Arc<dyn UserStore>,
    pub auth: AuthService,
    pub mailer: Arc<dyn Mailer>,
    pub avatars: AvatarService,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        contacts: Arc<dyn ContactStore>,
        users: Arc<dyn UserStore>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            auth: AuthService::new(&config),
            avatars: AvatarService::new(&config),
            contacts,
            users,
            mailer,
            config,
        }
    }

    pub fn with_mongodb(config: AppConfig, db: &MongoDB) -> Self {
        let mailer: Arc<dyn Mailer> = Arc::from(email_service::mailer_from_config(&config));
        Self::new(
            config,
            Arc::new(MongoContactStore::new(db)),
            Arc::new(MongoUserStore::new(db)),
            mailer,
        )
    }
}
