use anyhow::{anyhow, Context};
use serde::Deserialize;
use std::str::FromStr;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Thresholds for request timing and resource logging.
#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    pub slow_request_ms: u64,
    pub high_memory_percent: f64,
    pub critical_memory_percent: f64,
    pub resource_sample_rate: f64,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            slow_request_ms: 1000,
            high_memory_percent: 80.0,
            critical_memory_percent: 90.0,
            resource_sample_rate: 0.01,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub environment: String,
    pub host: String,
    pub port: u16,
    /// Allowed CORS origin. `None` means any origin.
    pub client_url: Option<String>,
    pub jwt: JwtConfig,
    pub monitoring: MonitoringConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |key: &str| get(key).ok_or_else(|| anyhow!("{key} must be set"));

        let database_url = required("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: required("JWT_SECRET")?,
            issuer: get("JWT_ISSUER").unwrap_or_else(|| "bugtracker".into()),
            audience: get("JWT_AUDIENCE").unwrap_or_else(|| "bugtracker-users".into()),
            ttl_minutes: parse_or(&get, "JWT_TTL_MINUTES", 60 * 24 * 30)?,
        };
        if jwt.ttl_minutes <= 0 {
            anyhow::bail!("JWT_TTL_MINUTES must be positive");
        }

        let defaults = MonitoringConfig::default();
        let monitoring = MonitoringConfig {
            slow_request_ms: parse_or(&get, "SLOW_REQUEST_MS", defaults.slow_request_ms)?,
            high_memory_percent: parse_or(&get, "HIGH_MEMORY_PERCENT", defaults.high_memory_percent)?,
            critical_memory_percent: parse_or(
                &get,
                "CRITICAL_MEMORY_PERCENT",
                defaults.critical_memory_percent,
            )?,
            resource_sample_rate: defaults.resource_sample_rate,
        };

        let port = match get("PORT") {
            Some(_) => parse_or(&get, "PORT", 5000)?,
            None => parse_or(&get, "APP_PORT", 5000)?,
        };

        let client_url = get("CLIENT_URL");
        if let Some(url) = &client_url {
            axum::http::HeaderValue::from_str(url)
                .with_context(|| format!("CLIENT_URL is not a valid origin: {url:?}"))?;
        }

        Ok(Self {
            database_url,
            environment: get("APP_ENV").unwrap_or_else(|| "development".into()),
            host: get("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            client_url,
            jwt,
            monitoring,
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value: {raw:?}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const BASE: &[(&str, &str)] = &[
        ("DATABASE_URL", "postgres://localhost/bugs"),
        ("JWT_SECRET", "s3cret"),
    ];

    #[test]
    fn applies_defaults() {
        let cfg = AppConfig::from_lookup(lookup(BASE)).expect("config");
        assert_eq!(cfg.port, 5000);
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.environment, "development");
        assert_eq!(cfg.jwt.issuer, "bugtracker");
        assert_eq!(cfg.jwt.ttl_minutes, 43_200);
        assert_eq!(cfg.monitoring.slow_request_ms, 1000);
        assert!(cfg.client_url.is_none());
        assert!(!cfg.is_production());
    }

    #[test]
    fn missing_secret_fails() {
        let err = AppConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://x")])).unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));

        let err = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://x"),
            ("JWT_SECRET", "   "),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn missing_database_url_fails() {
        let err = AppConfig::from_lookup(lookup(&[("JWT_SECRET", "x")])).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn port_prefers_port_over_app_port() {
        let mut pairs = BASE.to_vec();
        pairs.push(("PORT", "7000"));
        pairs.push(("APP_PORT", "8080"));
        let cfg = AppConfig::from_lookup(lookup(&pairs)).expect("config");
        assert_eq!(cfg.port, 7000);
    }

    #[test]
    fn rejects_bad_numbers() {
        let mut pairs = BASE.to_vec();
        pairs.push(("JWT_TTL_MINUTES", "soon"));
        let err = AppConfig::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(err.to_string().contains("JWT_TTL_MINUTES"));
    }

    #[test]
    fn reads_client_url_and_env() {
        let mut pairs = BASE.to_vec();
        pairs.push(("CLIENT_URL", "http://localhost:5173"));
        pairs.push(("APP_ENV", "Production"));
        let cfg = AppConfig::from_lookup(lookup(&pairs)).expect("config");
        assert_eq!(cfg.client_url.as_deref(), Some("http://localhost:5173"));
        assert!(cfg.is_production());
    }

    #[test]
    fn rejects_unusable_client_url() {
        let mut pairs = BASE.to_vec();
        pairs.push(("CLIENT_URL", "http://bad\u{7f}host"));
        let err = AppConfig::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(err.to_string().contains("CLIENT_URL"));
    }
}
