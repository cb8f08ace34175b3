use serde::Deserialize;
use config::{Config, ConfigError, Environment, File};

use crate::visibility::{NoticePolicy, DEFAULT_FEED_LIMIT};

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub notices: NoticeConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NoticeConfig {
    /// Maximum number of notices returned by any feed.
    #[serde(default = "default_feed_limit")]
    pub feed_limit: u32,
    /// Keep unpublished notices out of feeds and away from non-owners.
    #[serde(default = "default_hide_unpublished")]
    pub hide_unpublished: bool,
}

fn default_feed_limit() -> u32 {
    DEFAULT_FEED_LIMIT
}

fn default_hide_unpublished() -> bool {
    true
}

impl Default for NoticeConfig {
    fn default() -> Self {
        Self {
            feed_limit: default_feed_limit(),
            hide_unpublished: default_hide_unpublished(),
        }
    }
}

impl NoticeConfig {
    pub fn policy(&self) -> NoticePolicy {
        NoticePolicy {
            feed_limit: self.feed_limit.max(1),
            hide_unpublished: self.hide_unpublished,
        }
    }
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("database.url", "sqlite://noticeboard.db?mode=rwc")?
            .set_default("database.max_connections", 10)?
            .set_default("notices.feed_limit", i64::from(DEFAULT_FEED_LIMIT))?
            .set_default("notices.hide_unpublished", true)?

            // Add config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))

            // Add environment variables (with NOTICEBOARD__ prefix, double underscore separates levels)
            .add_source(Environment::with_prefix("NOTICEBOARD").separator("__"))

            .build()?;

        config.try_deserialize()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                url: "sqlite://noticeboard.db?mode=rwc".to_string(),
                max_connections: 10,
            },
            notices: NoticeConfig::default(),
        }
    }
}
