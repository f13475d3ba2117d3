use std::path::PathBuf;

use thiserror::Error;

use crate::settings::{CID_KEY, COMPOSE_LOCATION_KEY, NAME_KEY, TITLE_KEY, URL_KEY};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
    #[error("failed to parse {name} as integer: {source}")]
    ParseInt {
        name: String,
        #[source]
        source: std::num::ParseIntError,
    },
}

/// Process configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Database
    pub database_path: PathBuf,

    // Web Server
    pub web_host: String,
    pub web_port: u16,
    pub session_cookie: String,

    // Widget
    pub template_path: Option<PathBuf>,

    /// Settings written into the settings store at startup.
    pub settings_overrides: Vec<(&'static str, String)>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("./data/blog-comments.sqlite"),
            web_host: "0.0.0.0".to_string(),
            web_port: 8080,
            session_cookie: "session".to_string(),
            template_path: None,
            settings_overrides: Vec::new(),
        }
    }
}

/// Environment variable to settings key, in write order.
const SETTINGS_ENV: [(&str, &str); 5] = [
    ("BLOG_COMMENTS_URL", URL_KEY),
    ("BLOG_COMMENTS_CID", CID_KEY),
    ("BLOG_COMMENTS_NAME", NAME_KEY),
    ("BLOG_COMMENTS_COMPOSE_LOCATION", COMPOSE_LOCATION_KEY),
    ("SITE_TITLE", TITLE_KEY),
];

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let settings_overrides = SETTINGS_ENV
            .iter()
            .filter_map(|(var, key)| std::env::var(var).ok().map(|value| (*key, value)))
            .collect();

        Ok(Self {
            // Database
            database_path: PathBuf::from(env_or_default(
                "DATABASE_PATH",
                "./data/blog-comments.sqlite",
            )),

            // Web Server
            web_host: env_or_default("WEB_HOST", "0.0.0.0"),
            web_port: parse_env_u16("WEB_PORT", 8080)?,
            session_cookie: env_or_default("SESSION_COOKIE", "session"),

            // Widget
            template_path: optional_env("TEMPLATE_PATH").map(PathBuf::from),

            settings_overrides,
        })
    }

    /// Validate that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.web_port == 0 {
            return Err(ConfigError::InvalidValue {
                name: "WEB_PORT".to_string(),
                message: "must be non-zero".to_string(),
            });
        }
        if self.session_cookie.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "SESSION_COOKIE".to_string(),
                message: "cannot be empty".to_string(),
            });
        }
        for (key, value) in &self.settings_overrides {
            if value.trim().is_empty() {
                let name = SETTINGS_ENV
                    .iter()
                    .find(|(_, k)| k == key)
                    .map_or(*key, |(var, _)| *var);
                return Err(ConfigError::InvalidValue {
                    name: name.to_string(),
                    message: "cannot be empty".to_string(),
                });
            }
        }
        Ok(())
    }
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env_u16(name: &str, default: u16) -> Result<u16, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_zero_port_rejected() {
        let config = Config {
            web_port: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_override_rejected() {
        let config = Config {
            settings_overrides: vec![(URL_KEY, "  ".to_string())],
            ..Config::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("BLOG_COMMENTS_URL"));
    }

    #[test]
    fn test_parse_u16_default() {
        assert_eq!(parse_env_u16("NONEXISTENT_VAR", 8080).unwrap(), 8080);
    }
}
