//! Environment-based configuration.
//!
//! Everything the process needs is read once at startup and handed to the
//! components explicitly; nothing reads the environment after this.

use std::str::FromStr;

use log::LevelFilter;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::Info;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("URLS must be set to a comma-separated list of urls")]
    MissingUrls,
    #[error("invalid PORT value {value:?}")]
    InvalidPort { value: String },
    #[error("invalid LOG_LEVEL value {value:?}")]
    InvalidLogLevel { value: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub urls: Vec<String>,
    pub port: u16,
    pub log_level: LevelFilter,
}

impl AppConfig {
    /// Read `URLS`, `PORT` and `LOG_LEVEL` from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let urls = std::env::var("URLS").ok();
        let port = std::env::var("PORT").ok();
        let log_level = std::env::var("LOG_LEVEL").ok();
        Self::from_values(urls.as_deref(), port.as_deref(), log_level.as_deref())
    }

    fn from_values(
        urls: Option<&str>,
        port: Option<&str>,
        log_level: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let urls = parse_urls(urls.unwrap_or_default());
        if urls.is_empty() {
            return Err(ConfigError::MissingUrls);
        }

        let port = match port {
            None | Some("") => DEFAULT_PORT,
            Some(value) => value.parse::<u16>().map_err(|_| ConfigError::InvalidPort {
                value: value.to_string(),
            })?,
        };

        let log_level = match log_level {
            None | Some("") => DEFAULT_LOG_LEVEL,
            Some(value) => {
                LevelFilter::from_str(value).map_err(|_| ConfigError::InvalidLogLevel {
                    value: value.to_string(),
                })?
            }
        };

        Ok(Self {
            urls,
            port,
            log_level,
        })
    }
}

fn parse_urls(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .collect()
}
