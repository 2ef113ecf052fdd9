use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use time::OffsetDateTime;
use tracing::{error, instrument};

use crate::{
    monitoring::{format_mb, MemorySnapshot},
    state::AppState,
};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    Ok,
    Warning,
    Error,
}

impl HealthStatus {
    pub fn http_status(self) -> StatusCode {
        match self {
            HealthStatus::Error => StatusCode::INTERNAL_SERVER_ERROR,
            HealthStatus::Ok | HealthStatus::Warning => StatusCode::OK,
        }
    }
}

/// A failing store outranks high memory.
pub fn assess(
    db_connected: bool,
    memory_percent: Option<f64>,
    critical_percent: f64,
) -> (HealthStatus, &'static str) {
    if !db_connected {
        return (HealthStatus::Error, "Database connection issue");
    }
    match memory_percent {
        Some(p) if p > critical_percent => (HealthStatus::Warning, "High memory usage detected"),
        _ => (HealthStatus::Ok, "Bug Tracker API health check"),
    }
}

pub fn format_uptime(secs: u64) -> String {
    format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
}

#[derive(Debug, Serialize)]
pub struct LivenessResponse {
    status: HealthStatus,
    message: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    timestamp: OffsetDateTime,
    environment: String,
}

#[derive(Debug, Serialize)]
pub struct Uptime {
    seconds: u64,
    formatted: String,
}

#[derive(Debug, Serialize)]
pub struct DatabaseHealth {
    status: &'static str,
    connected: bool,
    name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryHealth {
    rss: String,
    #[serde(rename = "virtual")]
    virtual_memory: String,
    system_total: String,
    usage_percent: String,
}

#[derive(Debug, Serialize)]
pub struct ProcessInfo {
    version: &'static str,
    platform: &'static str,
    architecture: &'static str,
    pid: u32,
}

#[derive(Debug, Serialize)]
pub struct HealthReport {
    status: HealthStatus,
    message: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    timestamp: OffsetDateTime,
    environment: String,
    uptime: Uptime,
    database: DatabaseHealth,
    memory: Option<MemoryHealth>,
    performance: ProcessInfo,
}

pub async fn liveness(State(state): State<AppState>) -> Json<LivenessResponse> {
    Json(LivenessResponse {
        status: HealthStatus::Ok,
        message: "Bug Tracker API is running",
        timestamp: OffsetDateTime::now_utc(),
        environment: state.config.environment.clone(),
    })
}

#[instrument(skip(state))]
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let database = match state.db.ping().await {
        Ok(name) => DatabaseHealth {
            status: "connected",
            connected: true,
            name,
        },
        Err(e) => {
            error!(error = %e, "database ping failed");
            DatabaseHealth {
                status: "disconnected",
                connected: false,
                name: "unknown".into(),
            }
        }
    };

    let snapshot = tokio::task::spawn_blocking(MemorySnapshot::capture)
        .await
        .ok()
        .flatten();
    let (status, message) = assess(
        database.connected,
        snapshot.map(|m| m.usage_percent()),
        state.config.monitoring.critical_memory_percent,
    );

    let secs = state.started_at.elapsed().as_secs();
    let report = HealthReport {
        status,
        message,
        timestamp: OffsetDateTime::now_utc(),
        environment: state.config.environment.clone(),
        uptime: Uptime {
            seconds: secs,
            formatted: format_uptime(secs),
        },
        database,
        memory: snapshot.map(|m| MemoryHealth {
            rss: format_mb(m.rss),
            virtual_memory: format_mb(m.virtual_memory),
            system_total: format_mb(m.system_total),
            usage_percent: format!("{:.2}%", m.usage_percent()),
        }),
        performance: ProcessInfo {
            version: env!("CARGO_PKG_VERSION"),
            platform: std::env::consts::OS,
            architecture: std::env::consts::ARCH,
            pid: std::process::id(),
        },
    };
    (status.http_status(), Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{app::build_app, testing::{send, MemoryDb}};
    use std::sync::Arc;

    #[test]
    fn assess_prefers_error_over_warning() {
        assert_eq!(assess(true, Some(10.0), 90.0).0, HealthStatus::Ok);
        assert_eq!(assess(true, None, 90.0).0, HealthStatus::Ok);
        assert_eq!(assess(true, Some(95.0), 90.0).0, HealthStatus::Warning);
        assert_eq!(assess(false, Some(95.0), 90.0).0, HealthStatus::Error);
        assert_eq!(HealthStatus::Warning.http_status(), StatusCode::OK);
        assert_eq!(HealthStatus::Error.http_status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn formats_uptime() {
        assert_eq!(format_uptime(0), "0h 0m 0s");
        assert_eq!(format_uptime(3 * 3600 + 25 * 60 + 7), "3h 25m 7s");
    }

    #[tokio::test]
    async fn liveness_is_ok() {
        let app = build_app(AppState::fake());
        let (status, body) = send(&app, "GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "OK");
        assert_eq!(body["environment"], "test");
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn readiness_reports_database() {
        let app = build_app(AppState::fake());
        let (status, body) = send(&app, "GET", "/api/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["status"] == "OK" || body["status"] == "WARNING");
        assert_eq!(body["database"]["connected"], true);
        assert_eq!(body["database"]["name"], "memory");
        assert!(body["uptime"]["formatted"].as_str().unwrap().ends_with('s'));
        assert!(body["performance"]["pid"].is_number());
    }

    #[tokio::test]
    async fn readiness_fails_when_store_is_down() {
        let db = Arc::new(MemoryDb::default());
        db.go_offline();
        let app = build_app(AppState::with_db(db));
        let (status, body) = send(&app, "GET", "/api/health", None, None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["status"], "ERROR");
        assert_eq!(body["message"], "Database connection issue");
        assert_eq!(body["database"]["status"], "disconnected");
    }
}
