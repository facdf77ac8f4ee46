//! Environment-driven configuration.

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use crate::error::AppError;

/// Pool size used when `DATABASE_MAX_CONNECTIONS` is unset.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
/// Append timeout used when `APPEND_TIMEOUT_MS` is unset.
pub const DEFAULT_APPEND_TIMEOUT_MS: u64 = 5000;

/// Settings for the PostgreSQL log, the Redis broker and the Redis cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// PostgreSQL connection string for the event log.
    pub database_url: String,
    /// Redis connection string for pub/sub and the projection cache.
    pub redis_url: String,
    /// Upper bound on pooled PostgreSQL connections.
    pub max_connections: u32,
    /// How long an append may take before its outcome is reported unknown.
    pub append_timeout: Duration,
}

impl AppConfig {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a required variable is missing or a
    /// value does not parse.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable name
    /// to its value.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a required variable is missing or a
    /// value does not parse.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| {
            lookup(name)
                .ok_or_else(|| AppError::Config(format!("{name} environment variable must be set")))
        };

        let database_url = required("DATABASE_URL")?;
        let redis_url = required("REDIS_URL")?;
        let max_connections: u32 =
            parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?;
        let append_timeout_ms: u64 =
            parse_or(&lookup, "APPEND_TIMEOUT_MS", DEFAULT_APPEND_TIMEOUT_MS)?;

        if max_connections == 0 {
            return Err(AppError::Config(
                "DATABASE_MAX_CONNECTIONS must be at least 1".to_owned(),
            ));
        }
        if append_timeout_ms == 0 {
            return Err(AppError::Config(
                "APPEND_TIMEOUT_MS must be at least 1".to_owned(),
            ));
        }

        Ok(Self {
            database_url,
            redis_url,
            max_connections,
            append_timeout: Duration::from_millis(append_timeout_ms),
        })
    }
}

fn parse_or<F, T>(lookup: &F, name: &str, default: T) -> Result<T, AppError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("{name} is invalid ({raw:?}): {e}"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> Result<AppConfig, AppError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults_apply_when_optional_variables_are_unset() {
        // Act
        let config = config_from(&[
            ("DATABASE_URL", "postgres://localhost/libris"),
            ("REDIS_URL", "redis://localhost:6379"),
        ])
        .unwrap();

        // Assert
        assert_eq!(config.database_url, "postgres://localhost/libris");
        assert_eq!(config.redis_url, "redis://localhost:6379");
        assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);
        assert_eq!(config.append_timeout, Duration::from_millis(5000));
    }

    #[test]
    fn test_optional_variables_override_defaults() {
        let config = config_from(&[
            ("DATABASE_URL", "postgres://db/libris"),
            ("REDIS_URL", "redis://cache"),
            ("DATABASE_MAX_CONNECTIONS", "25"),
            ("APPEND_TIMEOUT_MS", "250"),
        ])
        .unwrap();

        assert_eq!(config.max_connections, 25);
        assert_eq!(config.append_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_missing_database_url_is_a_config_error() {
        let result = config_from(&[("REDIS_URL", "redis://cache")]);

        match result {
            Err(AppError::Config(message)) => assert!(message.contains("DATABASE_URL")),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_redis_url_is_a_config_error() {
        let result = config_from(&[("DATABASE_URL", "postgres://db/libris")]);

        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_unparsable_append_timeout_is_a_config_error() {
        let result = config_from(&[
            ("DATABASE_URL", "postgres://db/libris"),
            ("REDIS_URL", "redis://cache"),
            ("APPEND_TIMEOUT_MS", "soon"),
        ]);

        match result {
            Err(AppError::Config(message)) => assert!(message.contains("APPEND_TIMEOUT_MS")),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn test_zero_pool_size_is_rejected() {
        let result = config_from(&[
            ("DATABASE_URL", "postgres://db/libris"),
            ("REDIS_URL", "redis://cache"),
            ("DATABASE_MAX_CONNECTIONS", "0"),
        ]);

        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
