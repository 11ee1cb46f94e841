//! Handles settings for the runner. Configuration is read from
//! `settings.toml` (optional) and `REBANHO__*` environment variables.
//!
//! See `settings.example.toml` for the layout.
use config::{Config, ConfigError, Environment, File};
use engine::EngineSettings;
use serde::Deserialize;

const DEFAULT_SETTINGS_PATH: &str = "settings";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

impl Default for Database {
    fn default() -> Self {
        Self::Sqlite("rebanho.db".to_string())
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct App {
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app: App,
    pub database: Database,
    pub engine: EngineSettings,
}

impl Settings {
    pub fn new(path: Option<&str>) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name(path.unwrap_or(DEFAULT_SETTINGS_PATH)).required(false))
            .add_source(Environment::with_prefix("REBANHO").separator("__"))
            .build()?;

        settings.try_deserialize()
    }
}
