//! Service configuration.
//!
//! Values are read from environment variables. A `.env` file in the working
//! directory is loaded first; variables already present in the environment win.

use std::time::Duration;

/// Default listen port.
pub const DEFAULT_PORT: u16 = 5000;
/// Default bind address.
pub const DEFAULT_HOST: &str = "0.0.0.0";
/// Default pool size for a single request's connection pool.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
/// Default connection acquisition timeout, in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
/// Default per-query timeout, in seconds.
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;
/// Databases refused by metadata extraction unless overridden.
pub const DEFAULT_BLOCKED_DATABASES: &str = "rdsadmin";

/// Application configuration shared by every handler.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Name reported in logs and on the health endpoint.
    pub service_name: String,
    /// Bind address.
    pub host: String,
    /// Listen port.
    pub port: u16,
    /// Max pooled connections per request pool.
    pub max_connections: u32,
    /// Bound on connection acquisition.
    pub connect_timeout_secs: u64,
    /// Bound on every catalog query.
    pub query_timeout_secs: u64,
    /// Database names that metadata extraction refuses to touch.
    pub blocked_databases: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service_name: "metadata-service".to_string(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            query_timeout_secs: DEFAULT_QUERY_TIMEOUT_SECS,
            blocked_databases: parse_list(DEFAULT_BLOCKED_DATABASES),
        }
    }
}

impl AppConfig {
    /// Loads configuration from the process environment.
    pub fn load_with_service(service_name: &str) -> Self {
        load_dotenv();
        Self::from_lookup(service_name, |key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(service_name: &str, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            service_name: service_name.to_string(),
            host: lookup("SERVER_HOST")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.host),
            port: parse_or(lookup("SERVER_PORT"), defaults.port),
            max_connections: parse_or(lookup("DB_MAX_CONNECTIONS"), defaults.max_connections)
                .max(1),
            connect_timeout_secs: positive_or(
                lookup("DB_CONNECT_TIMEOUT_SECS"),
                defaults.connect_timeout_secs,
            ),
            query_timeout_secs: positive_or(
                lookup("DB_QUERY_TIMEOUT_SECS"),
                defaults.query_timeout_secs,
            ),
            blocked_databases: lookup("BLOCKED_DATABASES")
                .map(|v| parse_list(&v))
                .unwrap_or(defaults.blocked_databases),
        }
    }

    /// Connection acquisition timeout.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Per-query timeout.
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    /// Whether extraction of `database` is refused.
    pub fn is_blocked(&self, database: &str) -> bool {
        self.blocked_databases.iter().any(|name| name == database)
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn positive_or(value: Option<String>, default: u64) -> u64 {
    match parse_or(value, default) {
        0 => default,
        secs => secs,
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Load .env file from the working directory (best-effort, no error if missing).
fn load_dotenv() {
    let env_path = std::path::Path::new(".env");
    if let Ok(content) = std::fs::read_to_string(env_path) {
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim();
                let value = value.trim().trim_matches('"');
                // Only set if not already set by the environment
                if std::env::var(key).is_err() {
                    std::env::set_var(key, value);
                }
            }
        }
    }
}
