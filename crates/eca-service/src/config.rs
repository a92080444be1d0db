//! Configuration for ecad

use crate::error::ServiceError;
use eca_adapters::OAuthConfig;
use eca_core::{CacheConfig, ValidationPolicy};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/// Main service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EcaConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub cache: CacheSettings,

    /// Where accounts, projects and bots come from
    #[serde(default)]
    pub directory: DirectoryConfig,

    /// Client credentials for the accounts API
    #[serde(default)]
    pub oauth: OAuthConfig,

    /// Batch handling of invalid and merge commits
    #[serde(default)]
    pub policy: ValidationPolicy,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    pub listen_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Entry bound per cached value kind
    #[serde(default = "default_max_size")]
    pub max_size: usize,

    /// Seconds an entry stays fresh after it is written
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_size: default_max_size(),
            ttl_secs: default_ttl_secs(),
        }
    }
}

impl From<&CacheSettings> for CacheConfig {
    fn from(settings: &CacheSettings) -> Self {
        CacheConfig {
            max_size: settings.max_size,
            ttl: Duration::from_secs(settings.ttl_secs),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectoryMode {
    /// HTTP clients against the accounts, projects and bots APIs
    Remote,
    /// Built-in sample data
    #[default]
    Fixture,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    #[serde(default)]
    pub mode: DirectoryMode,

    #[serde(default = "default_accounts_url")]
    pub accounts_url: String,

    #[serde(default = "default_projects_url")]
    pub projects_url: String,

    #[serde(default = "default_bots_url")]
    pub bots_url: String,

    /// Projects requested per page of the full listing
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Timeout for every outbound request, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            mode: DirectoryMode::default(),
            accounts_url: default_accounts_url(),
            projects_url: default_projects_url(),
            bots_url: default_bots_url(),
            page_size: default_page_size(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl DirectoryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_max_size() -> usize {
    10_000
}

fn default_ttl_secs() -> u64 {
    900
}

fn default_accounts_url() -> String {
    "https://api.eclipse.org".to_string()
}

fn default_projects_url() -> String {
    "https://projects.eclipse.org".to_string()
}

fn default_bots_url() -> String {
    "https://api.eclipse.org".to_string()
}

fn default_page_size() -> u32 {
    eca_adapters::projects::DEFAULT_PAGE_SIZE
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

impl EcaConfig {
    /// Load configuration: defaults, then the optional file, then `ECA_*` variables
    /// (`ECA_DIRECTORY__MODE=remote`).
    pub fn load(path: Option<&str>) -> Result<Self, ServiceError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&EcaConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("ECA")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: EcaConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the service cannot start with.
    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.cache.max_size == 0 {
            return Err(ServiceError::Config("cache.max_size must be at least 1".into()));
        }
        if self.directory.mode == DirectoryMode::Remote && !self.oauth.has_credentials() {
            return Err(ServiceError::Config(
                "directory.mode = \"remote\" requires oauth.client_id and oauth.client_secret".into(),
            ));
        }
        Ok(())
    }
}
