use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::auth::token::TokenIssuer;
use crate::config::Config;
use crate::images::ImageHost;

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Config,
    pub tokens: Arc<TokenIssuer>,
    pub images: Arc<dyn ImageHost>,
    /// Hash of a random password, verified against when a login names an
    /// unknown email so both failure paths cost one bcrypt verify.
    pub decoy_hash: Arc<str>,
}

impl AppState {
    /// Open the database, apply migrations and wire up the collaborators
    /// named in `config`.
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        std::fs::create_dir_all(config.uploads_path())?;

        let db = crate::db::create_pool(&config.db_path())?;
        crate::db::run_migrations(&db)?;
        if let Some(seed) = &config.admin {
            crate::db::users::ensure_admin(&db, seed, config.auth.bcrypt_cost)?;
        }

        let secret = match &config.auth.jwt_secret {
            Some(secret) if !secret.is_empty() => secret.clone(),
            _ => {
                tracing::warn!(
                    "No auth.jwt_secret configured; using a random secret. \
                     Sessions will not survive a restart."
                );
                TokenIssuer::random_secret()
            }
        };
        let tokens = Arc::new(TokenIssuer::from_secret(secret.as_bytes()));
        let decoy_hash = crate::auth::password::hash(
            &TokenIssuer::random_secret(),
            config.auth.bcrypt_cost,
        )?;
        let images = crate::images::build_host(&config.images, &config.uploads_path())?;
        tracing::info!("Image provider: {}", images.name());

        Ok(Self {
            db,
            config,
            tokens,
            images,
            decoy_hash: Arc::from(decoy_hash),
        })
    }
}
