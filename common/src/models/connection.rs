//! Connection parameters supplied with each request.
//!
//! Credentials live only for the duration of one request and are never
//! persisted or logged.

use serde::{de, Deserialize, Deserializer};
use utoipa::ToSchema;
use validator::Validate;

use crate::errors::{AppError, AppResult};

/// Port used when the request omits one.
pub const DEFAULT_PG_PORT: u16 = 5432;

/// Target server and credentials for a single request.
#[derive(Clone, Deserialize, Validate, ToSchema)]
pub struct ConnectionParams {
    /// Database server host.
    #[serde(default)]
    #[validate(length(min = 1, message = "host is required"))]
    pub host: String,
    /// Database server port; accepts a number or a numeric string.
    #[serde(default = "default_port", deserialize_with = "deserialize_port")]
    #[schema(value_type = u16, default = 5432)]
    pub port: u16,
    /// Login role.
    #[serde(default)]
    #[validate(length(min = 1, message = "user is required"))]
    pub user: String,
    /// Password; may be empty when the server does not require one.
    #[serde(default)]
    pub password: String,
    /// Target database (required for metadata extraction).
    #[serde(default)]
    pub database: Option<String>,
}

impl ConnectionParams {
    /// Checks the fields every operation needs.
    pub fn validate_request(&self) -> AppResult<()> {
        let host_blank = self.host.trim().is_empty();
        let user_blank = self.user.trim().is_empty();
        if let Err(errors) = self.validate() {
            let mut messages: Vec<String> = errors
                .field_errors()
                .into_values()
                .flat_map(|errs| errs.iter())
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string())
                })
                .collect();
            messages.sort();
            return Err(AppError::Validation(messages.join(", ")));
        }
        if host_blank {
            return Err(AppError::Validation("host is required".into()));
        }
        if user_blank {
            return Err(AppError::Validation("user is required".into()));
        }
        Ok(())
    }

    /// Returns the target database, failing when it is missing or blank.
    pub fn required_database(&self) -> AppResult<&str> {
        match self.database.as_deref() {
            Some(name) if !name.trim().is_empty() => Ok(name),
            _ => Err(AppError::Validation("database is required".into())),
        }
    }
}

impl std::fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .finish()
    }
}

fn default_port() -> u16 {
    DEFAULT_PG_PORT
}

fn deserialize_port<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum PortValue {
        Number(u16),
        Text(String),
    }

    match Option::<PortValue>::deserialize(deserializer)? {
        None => Ok(DEFAULT_PG_PORT),
        Some(PortValue::Number(port)) => Ok(port),
        Some(PortValue::Text(text)) if text.trim().is_empty() => Ok(DEFAULT_PG_PORT),
        Some(PortValue::Text(text)) => text
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("invalid port: {text}"))),
    }
}
