//! Configuration file support for scm-importer.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (prefixed with `SCM_IMPORTER_`, sections split by
//!    `__`, e.g. `SCM_IMPORTER_PLATFORM__API_KEY`)
//! 3. Config file (./scm-importer.toml, then ~/.config/scm-importer/config.toml)
//! 4. Built-in defaults
//!
//! Example config file:
//! ```toml
//! [platform]
//! base_url = "https://us.ast.checkmarx.net"
//! iam_base_url = "https://us.iam.checkmarx.net"  # optional, derived from base_url
//! tenant_name = "acme"
//! api_key = "..."  # or use SCM_IMPORTER_PLATFORM__API_KEY
//!
//! [scm]
//! token = "ghp_..."  # or use SCM_IMPORTER_SCM__TOKEN
//! org = "acme"
//!
//! [poll]
//! interval_secs = 1
//! timeout_secs = 1800  # optional; unset polls until the conversion finishes
//! ```

use std::path::PathBuf;
use std::time::Duration;

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use directories::ProjectDirs;
use serde::Deserialize;

use scm_importer::PollConfig;

const APP_NAME: &str = "scm-importer";
const LOCAL_CONFIG: &str = "scm-importer.toml";
const ENV_PREFIX: &str = "SCM_IMPORTER";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Platform connection settings.
    pub platform: PlatformConfig,
    /// Source-control credentials.
    pub scm: ScmConfig,
    /// Conversion status polling.
    pub poll: PollSettings,
}

/// Platform connection settings.
#[derive(Default, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    pub base_url: Option<String>,
    pub iam_base_url: Option<String>,
    pub tenant_name: Option<String>,
    pub api_key: Option<String>,
}

impl std::fmt::Debug for PlatformConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformConfig")
            .field("base_url", &self.base_url)
            .field("iam_base_url", &self.iam_base_url)
            .field("tenant_name", &self.tenant_name)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Source-control credentials.
#[derive(Default, Deserialize)]
#[serde(default)]
pub struct ScmConfig {
    pub token: Option<String>,
    pub org: Option<String>,
}

impl std::fmt::Debug for ScmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScmConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("org", &self.org)
            .finish()
    }
}

/// Conversion status polling.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PollSettings {
    /// Seconds between status queries.
    pub interval_secs: u64,
    /// Give up after this many seconds. Unset means no deadline.
    pub timeout_secs: Option<u64>,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval_secs: 1,
            timeout_secs: None,
        }
    }
}

impl PollSettings {
    pub fn to_poll_config(&self) -> PollConfig {
        PollConfig::new(
            Duration::from_secs(self.interval_secs),
            self.timeout_secs.map(Duration::from_secs),
        )
    }
}

impl Config {
    /// Load configuration using the config crate's layered approach.
    ///
    /// Sources are loaded in order (later sources override earlier):
    /// 1. Built-in defaults
    /// 2. XDG config file (~/.config/scm-importer/config.toml)
    /// 3. Local config file (./scm-importer.toml)
    /// 4. Environment variables with SCM_IMPORTER_ prefix
    pub fn load() -> Self {
        let mut builder = ConfigBuilder::builder();

        if let Some(xdg_config) = Self::default_config_path()
            && xdg_config.exists()
        {
            tracing::debug!("Loading config from {:?}", xdg_config);
            builder = builder.add_source(
                File::from(xdg_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        let local_config = PathBuf::from(LOCAL_CONFIG);
        if local_config.exists() {
            tracing::debug!("Loading config from ./{}", LOCAL_CONFIG);
            builder = builder.add_source(
                File::from(local_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        // SCM_IMPORTER_PLATFORM__API_KEY -> platform.api_key
        builder = builder.add_source(Self::environment());

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<Config>() {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to deserialize config: {}", e);
                    Config::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to build config: {}", e);
                Config::default()
            }
        }
    }

    fn environment() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    /// Get the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().join("config.toml"))
    }
}
