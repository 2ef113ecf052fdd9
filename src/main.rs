mod app;
mod auth;
mod bugs;
mod config;
mod db;
mod error;
mod health;
mod monitoring;
mod state;
mod users;

#[cfg(test)]
mod testing;

use crate::config::AppConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| {
            "bugtracker=debug,axum=info,tower_http=info,sqlx=warn,sqlx::query=info".to_string()
        });
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = AppConfig::from_env()?;
    let state = match AppState::init(config.clone()).await {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = ?e, "database connection failed");
            return Err(e);
        }
    };

    app::serve(app::build_app(state), &config).await
}
