pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use crate::config::Config;
use crate::database::user_store::PgUserStore;
use crate::services::audit_service::PgActivityLogger;
use crate::services::auth_service::AuthService;
use crate::services::email_service::SmtpMailer;
use crate::services::password_service::PasswordService;
use crate::services::token_service::TokenService;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub auth_service: AuthService,
    pub token_service: TokenService,
}

impl AppState {
    pub fn new(pool: PgPool, config: &Config) -> crate::error::Result<Self> {
        let token_service = TokenService::new(&config.auth);
        let password_service = PasswordService::new(config.auth.bcrypt_cost);
        let store = Arc::new(PgUserStore::new(pool.clone()));
        let activity = Arc::new(PgActivityLogger::new(pool.clone()));
        let mailer = Arc::new(SmtpMailer::new(&config.smtp)?);

        let auth_service = AuthService::new(
            store,
            activity,
            mailer,
            token_service.clone(),
            password_service,
            config.app_base_url.clone(),
        );

        Ok(Self {
            pool,
            auth_service,
            token_service,
        })
    }
}
