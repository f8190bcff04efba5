use crate::config::AppConfig;
use crate::store::{ConferenceStore, PgStore, RegistrationStore, TokenStore, UserStore};
#[cfg(test)]
use crate::store::MemoryStore;
use anyhow::Context;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
    pub tokens: Arc<dyn TokenStore>,
    pub conferences: Arc<dyn ConferenceStore>,
    pub registrations: Arc<dyn RegistrationStore>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let db = sqlx::postgres::PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;

        let store = Arc::new(PgStore::new(db.clone()));
        Ok(Self::with_store(db, config, store))
    }

    /// One backend behind every store handle.
    pub fn with_store<S>(db: PgPool, config: Arc<AppConfig>, store: Arc<S>) -> Self
    where
        S: UserStore + TokenStore + ConferenceStore + RegistrationStore + 'static,
    {
        Self {
            db,
            config,
            users: store.clone(),
            tokens: store.clone(),
            conferences: store.clone(),
            registrations: store,
        }
    }

    /// In-memory stores over a pool that never connects.
    #[cfg(test)]
    pub fn fake() -> Self {
        Self::fake_with_config(AppConfig::default())
    }

    #[cfg(test)]
    pub fn fake_with_config(config: AppConfig) -> Self {
        Self::fake_with_store(config, Arc::new(MemoryStore::new()))
    }

    #[cfg(test)]
    pub fn fake_with_store(config: AppConfig, store: Arc<MemoryStore>) -> Self {
        let db = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .expect("lazy pool ok");
        Self::with_store(db, Arc::new(config), store)
    }
}
