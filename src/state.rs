use std::sync::Arc;
use std::time::Instant;

use crate::auth::JwtKeys;
use crate::config::AppConfig;
use crate::db::{self, Database};

/// Service context handed to every handler. Built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn Database>,
    pub config: Arc<AppConfig>,
    pub jwt: JwtKeys,
    pub started_at: Instant,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let db = db::connect(&config).await?;
        Ok(Self::from_parts(Arc::new(db), Arc::new(config)))
    }

    pub fn from_parts(db: Arc<dyn Database>, config: Arc<AppConfig>) -> Self {
        let jwt = JwtKeys::new(&config.jwt);
        Self {
            db,
            config,
            jwt,
            started_at: Instant::now(),
        }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        Self::with_db(Arc::new(crate::testing::MemoryDb::default()))
    }

    #[cfg(test)]
    pub fn with_db(db: Arc<dyn Database>) -> Self {
        let config = Arc::new(AppConfig {
            database_url: "memory://".into(),
            environment: "test".into(),
            host: "127.0.0.1".into(),
            port: 0,
            client_url: None,
            jwt: crate::config::JwtConfig {
                secret: "test-secret".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
            },
            monitoring: Default::default(),
        });
        Self::from_parts(db, config)
    }
}
