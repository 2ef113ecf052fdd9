use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use axum::async_trait;
use log::LevelFilter;
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    ConnectOptions, PgPool,
};
use thiserror::Error;
use tracing::info;

use crate::{bugs::repo::BugRepo, config::AppConfig, users::repo::UserRepo};

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique constraint rejected the write; holds the constraint name.
    #[error("duplicate key: {0}")]
    Duplicate(String),

    #[error("stored record is malformed: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Maps unique violations to [`StoreError::Duplicate`].
pub(crate) fn classify(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            let constraint = db_err.constraint().unwrap_or("unique").to_string();
            return StoreError::Duplicate(constraint);
        }
    }
    StoreError::Database(e)
}

/// The document store seen by the handlers.
#[async_trait]
pub trait Database: UserRepo + BugRepo {
    /// Round-trips to the store and returns the database name.
    async fn ping(&self) -> Result<String, StoreError>;
}

#[async_trait]
impl Database for PgPool {
    async fn ping(&self) -> Result<String, StoreError> {
        let (name,): (String,) = sqlx::query_as("SELECT current_database()")
            .fetch_one(self)
            .await?;
        Ok(name)
    }
}

/// Statement log level: `info` in production so every query reaches the logs,
/// `debug` elsewhere.
pub fn statement_log_level(config: &AppConfig) -> LevelFilter {
    if config.is_production() {
        LevelFilter::Info
    } else {
        LevelFilter::Debug
    }
}

pub fn connect_options(config: &AppConfig) -> anyhow::Result<PgConnectOptions> {
    let options = PgConnectOptions::from_str(&config.database_url)
        .context("parse DATABASE_URL")?
        .log_statements(statement_log_level(config))
        .log_slow_statements(
            LevelFilter::Warn,
            Duration::from_millis(config.monitoring.slow_request_ms),
        );
    Ok(options)
}

pub async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
    let db = PgPoolOptions::new()
        .max_connections(10)
        .connect_with(connect_options(config)?)
        .await
        .context("connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .context("run migrations")?;

    let name = db.ping().await.context("ping database")?;
    info!(
        database = %name,
        query_log = %statement_log_level(config),
        "database connected"
    );
    Ok(db)
}
