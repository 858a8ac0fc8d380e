//! Configuration management for the workflows

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

/// Campus information system (theses source)
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CampusOnlineConfig {
    pub endpoint: String,
    pub token: String,
    pub user_email: String,
}

/// Research information system (open access source)
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PureConfig {
    pub endpoint: String,
    pub username: String,
    pub password: String,
    pub user_email: String,
}

/// External bibliographic registry
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RegistryConfig {
    /// Search key used to look up records by campus id
    pub search_key: String,
    /// Catalog identifier prefix (035 $a) of curated records
    pub authoritative_prefix: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DownloadConfig {
    pub directory: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SchedulerConfig {
    pub interval_seconds: u64,
    /// Names of the sweeps to run on every tick, in order
    pub jobs: Vec<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub campusonline: CampusOnlineConfig,
    pub pure: PureConfig,
    pub registry: RegistryConfig,
    pub downloads: DownloadConfig,
    pub scheduler: SchedulerConfig,
}

impl AppConfig {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let config = Config::builder()
            // Start with default configuration
            .add_source(File::with_name("config/default").required(false))
            // Layer on the environment-specific file
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add environment variables (WORKFLOWS__SECTION__KEY)
            .add_source(
                Environment::with_prefix("WORKFLOWS")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("scheduler.jobs")
                    .try_parsing(true),
            )
            // Override database URL from DATABASE_URL env var if present
            .set_override_option("database.url", env::var("DATABASE_URL").ok())?
            .build()?;

        config.try_deserialize()
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://workflows.db?mode=rwc".to_string(),
            max_connections: 5,
            min_connections: 1,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Default for CampusOnlineConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://online.example.org/thesisservice".to_string(),
            token: String::new(),
            user_email: "workflows@repository.local".to_string(),
        }
    }
}

impl Default for PureConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://pure.example.org/ws/api".to_string(),
            username: String::new(),
            password: String::new(),
            user_email: "workflows@repository.local".to_string(),
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            search_key: "local_field_995".to_string(),
            authoritative_prefix: "(AT-OBV)".to_string(),
        }
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            directory: env::temp_dir().join("repo-workflows"),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 3600,
            jobs: vec![
                "status_arch".to_string(),
                "create_in_alma".to_string(),
                "update_in_repo".to_string(),
                "status_pub".to_string(),
                "mark_as_exported".to_string(),
            ],
        }
    }
}
