use dotenv::dotenv;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api/v1";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub session_file: PathBuf,
    pub request_timeout: Option<Duration>,
    pub inactivity_timeout: Duration,
    pub table_page_size: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let session_file = match std::env::var("SESSION_FILE") {
            Ok(path) if !path.trim().is_empty() => PathBuf::from(path),
            _ => default_session_file()?,
        };

        let request_timeout = match std::env::var("REQUEST_TIMEOUT_SECS") {
            Ok(raw) => Some(Duration::from_secs(parse_var("REQUEST_TIMEOUT_SECS", &raw)?)),
            Err(_) => None,
        };

        let inactivity_minutes = match std::env::var("INACTIVITY_TIMEOUT_MINS") {
            Ok(raw) => parse_var("INACTIVITY_TIMEOUT_MINS", &raw)?,
            Err(_) => 15,
        };

        let table_page_size = match std::env::var("TABLE_PAGE_SIZE") {
            Ok(raw) => parse_var::<usize>("TABLE_PAGE_SIZE", &raw)?,
            Err(_) => 10,
        };
        if table_page_size == 0 {
            return Err(ConfigError::Invalid {
                key: "TABLE_PAGE_SIZE",
                value: "0".to_string(),
            });
        }

        Ok(Config {
            api_base_url: std::env::var("API_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string()),
            session_file,
            request_timeout,
            inactivity_timeout: Duration::from_secs(inactivity_minutes * 60),
            table_page_size,
        })
    }

    /// Configuration pointing at `base_url` with every other setting at its default.
    pub fn for_base_url(base_url: impl Into<String>) -> Self {
        Config {
            api_base_url: base_url.into(),
            session_file: PathBuf::from("session.json"),
            request_timeout: None,
            inactivity_timeout: Duration::from_secs(15 * 60),
            table_page_size: 10,
        }
    }
}

fn default_session_file() -> Result<PathBuf, ConfigError> {
    let home = home::home_dir().ok_or(ConfigError::NoHomeDir)?;
    Ok(home.join(".proptrade").join("session.json"))
}

fn parse_var<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_var_rejects_garbage() {
        let err = parse_var::<u64>("REQUEST_TIMEOUT_SECS", "soon").unwrap_err();
        assert!(err.to_string().contains("REQUEST_TIMEOUT_SECS"));
        assert_eq!(parse_var::<u64>("X", " 30 ").unwrap(), 30);
    }

    #[test]
    fn base_url_config_uses_defaults() {
        let config = Config::for_base_url("http://127.0.0.1:9000/api/v1");
        assert_eq!(config.api_base_url, "http://127.0.0.1:9000/api/v1");
        assert!(config.request_timeout.is_none());
        assert_eq!(config.inactivity_timeout, Duration::from_secs(900));
        assert_eq!(config.table_page_size, 10);
    }
}
