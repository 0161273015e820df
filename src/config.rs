//! Runtime configuration from the environment (`.env` is honoured).

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub calculation_template: PathBuf,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub vision_timeout: Duration,
    pub db_max_connections: u32,
}

fn parsed<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}

impl Config {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL")
            .filter(|url| !url.is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        Ok(Self {
            database_url,
            bind_addr: parsed(&lookup, "BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 8080)))?,
            calculation_template: lookup("CALCULATION_TEMPLATE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("templates/calculation_template.toml")),
            gemini_api_key: lookup("GEMINI_API_KEY").filter(|key| !key.is_empty()),
            gemini_model: lookup("GEMINI_MODEL").unwrap_or_else(|| "gemini-1.5-flash".to_string()),
            vision_timeout: Duration::from_secs(parsed(&lookup, "VISION_TIMEOUT_SECS", 30)?),
            db_max_connections: parsed(&lookup, "DB_MAX_CONNECTIONS", 5)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(env(&[("DATABASE_URL", "postgres://localhost/hama")])).unwrap();

        assert_eq!(config.bind_addr, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(
            config.calculation_template,
            PathBuf::from("templates/calculation_template.toml")
        );
        assert_eq!(config.gemini_api_key, None);
        assert_eq!(config.gemini_model, "gemini-1.5-flash");
        assert_eq!(config.vision_timeout, Duration::from_secs(30));
        assert_eq!(config.db_max_connections, 5);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(env(&[
            ("DATABASE_URL", "postgres://db/hama"),
            ("BIND_ADDR", "127.0.0.1:3000"),
            ("GEMINI_API_KEY", "secret"),
            ("VISION_TIMEOUT_SECS", "60"),
            ("DB_MAX_CONNECTIONS", "10"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr.port(), 3000);
        assert_eq!(config.gemini_api_key.as_deref(), Some("secret"));
        assert_eq!(config.vision_timeout, Duration::from_secs(60));
        assert_eq!(config.db_max_connections, 10);
    }

    #[test]
    fn test_missing_database_url() {
        let err = Config::from_lookup(env(&[])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("DATABASE_URL"));
    }

    #[test]
    fn test_invalid_number() {
        let err = Config::from_lookup(env(&[
            ("DATABASE_URL", "postgres://db/hama"),
            ("VISION_TIMEOUT_SECS", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "VISION_TIMEOUT_SECS", .. }));
    }
}
