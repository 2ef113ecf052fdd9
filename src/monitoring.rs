use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};
use tracing::{error, info, warn};

use crate::state::AppState;

const MB: f64 = 1024.0 * 1024.0;

/// Memory figures for this process, in bytes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemorySnapshot {
    pub rss: u64,
    pub virtual_memory: u64,
    pub system_total: u64,
}

impl MemorySnapshot {
    /// `None` when the platform does not expose process statistics.
    pub fn capture() -> Option<Self> {
        let pid = Pid::from_u32(std::process::id());
        let mut system = System::new();
        system.refresh_memory();
        system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::everything(),
        );
        let process = system.process(pid)?;
        Some(Self {
            rss: process.memory(),
            virtual_memory: process.virtual_memory(),
            system_total: system.total_memory(),
        })
    }

    /// Resident set size as a share of system memory.
    pub fn usage_percent(&self) -> f64 {
        if self.system_total == 0 {
            return 0.0;
        }
        self.rss as f64 / self.system_total as f64 * 100.0
    }
}

pub fn format_mb(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / MB)
}

/// Logs a finished request: errors for 5xx, warnings past the slow threshold.
pub fn log_response(status: StatusCode, latency: Duration, slow_after: Duration) {
    let latency_ms = latency.as_secs_f64() * 1000.0;
    if status.is_server_error() {
        error!(%status, latency_ms, "response");
    } else if latency > slow_after {
        warn!(%status, latency_ms, "slow request");
    } else {
        info!(%status, latency_ms, "response");
    }
}

/// Logs process memory for a random sample of requests in production.
pub async fn sample_resources(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let cfg = &state.config.monitoring;
    if state.config.is_production() && rand::random::<f64>() < cfg.resource_sample_rate {
        let snapshot = tokio::task::spawn_blocking(MemorySnapshot::capture)
            .await
            .ok()
            .flatten();
        if let Some(mem) = snapshot {
            let usage = mem.usage_percent();
            info!(
                rss = %format_mb(mem.rss),
                virtual_memory = %format_mb(mem.virtual_memory),
                usage_percent = usage,
                "resource sample"
            );
            if usage > cfg.high_memory_percent {
                warn!(usage_percent = usage, "high memory usage");
            }
        }
    }
    next.run(req).await
}
