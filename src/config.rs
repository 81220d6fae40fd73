// Config module: installer settings loaded from kpm.toml and the environment

use crate::constants;
use crate::error::{KpmError, Result};
use crate::sources::repository::{AuthStrategy, RepositoryResolver};
use crate::sources::{CacheSettings, HttpSettings};
use log::debug;
use reqwest::Url;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding the bundles root
pub const BUNDLES_ROOT_ENV: &str = "KPM_BUNDLES_ROOT";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RepositoryConfig {
    pub url: String,
    pub auth: AuthStrategy,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            url: constants::PUBLIC_REPOSITORY_URL.to_string(),
            auth: AuthStrategy::None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    pub bypass: bool,
    pub max_entries: usize,
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            bypass: false,
            max_entries: constants::DEFAULT_CACHE_ENTRIES,
            ttl_secs: constants::DEFAULT_CACHE_TTL_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KpmConfig {
    pub bundles_root: PathBuf,
    pub repository: RepositoryConfig,
    pub public_repository_url: String,
    /// Try the public repository when the primary one fails
    pub public_fallback: bool,
    pub verify_sha1: bool,
    pub strict_ssl: bool,
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
    pub cache: CacheConfig,
    pub plugin_directory_url: String,
    pub host_group_id: String,
    pub host_artifact_id: String,
    pub default_group_id: String,
    pub notify_url: Option<String>,
}

impl Default for KpmConfig {
    fn default() -> Self {
        Self {
            bundles_root: PathBuf::from(constants::DEFAULT_BUNDLES_ROOT),
            repository: RepositoryConfig::default(),
            public_repository_url: constants::PUBLIC_REPOSITORY_URL.to_string(),
            public_fallback: true,
            verify_sha1: true,
            strict_ssl: true,
            connect_timeout_secs: constants::DEFAULT_TIMEOUT_SECS,
            read_timeout_secs: constants::DEFAULT_TIMEOUT_SECS,
            cache: CacheConfig::default(),
            plugin_directory_url: constants::PLUGIN_DIRECTORY_URL.to_string(),
            host_group_id: constants::HOST_GROUP_ID.to_string(),
            host_artifact_id: constants::HOST_ARTIFACT_ID.to_string(),
            default_group_id: constants::DEFAULT_GROUP_ID.to_string(),
            notify_url: None,
        }
    }
}

impl KpmConfig {
    /// Load and validate configuration.
    ///
    /// Bundles root precedence: `bundles_root` argument, then
    /// `KPM_BUNDLES_ROOT`, then the file, then the default. Without an
    /// explicit `config_path`, `<bundles_root>/kpm.toml` is read if present.
    pub fn load(config_path: Option<&Path>, bundles_root: Option<&Path>) -> Result<Self> {
        let root_override = bundles_root
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(BUNDLES_ROOT_ENV).map(PathBuf::from));

        let path = match config_path {
            Some(path) => Some(path.to_path_buf()),
            None => {
                let root = root_override
                    .clone()
                    .unwrap_or_else(|| PathBuf::from(constants::DEFAULT_BUNDLES_ROOT));
                let candidate = root.join(constants::CONFIG_FILE);
                candidate.exists().then_some(candidate)
            }
        };

        let mut config = match path {
            Some(path) => {
                debug!("Loading configuration from {}", path.display());
                let text = fs::read_to_string(&path).map_err(|e| {
                    KpmError::Configuration(format!("cannot read {}: {}", path.display(), e))
                })?;
                Self::from_toml(&text)?
            }
            None => Self::default(),
        };

        if let Some(root) = root_override {
            config.bundles_root = root;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| KpmError::Configuration(e.to_string()))
    }

    /// Reject settings that would only fail later, at first use
    pub fn validate(&self) -> Result<()> {
        if self.bundles_root.as_os_str().is_empty() {
            return Err(KpmError::Configuration("bundles_root is empty".into()));
        }
        self.primary_repository()?;
        self.fallback_repository()?;
        check_url("plugin_directory_url", &self.plugin_directory_url)?;
        if let Some(url) = &self.notify_url {
            check_url("notify_url", url)?;
        }
        if self.connect_timeout_secs == 0 || self.read_timeout_secs == 0 {
            return Err(KpmError::Configuration(
                "timeouts must be at least one second".into(),
            ));
        }
        if self.cache.max_entries == 0 {
            return Err(KpmError::Configuration(
                "cache.max_entries must be positive".into(),
            ));
        }
        for (name, value) in [
            ("host_group_id", &self.host_group_id),
            ("host_artifact_id", &self.host_artifact_id),
            ("default_group_id", &self.default_group_id),
        ] {
            if value.trim().is_empty() {
                return Err(KpmError::Configuration(format!("{} is empty", name)));
            }
        }
        Ok(())
    }

    pub fn primary_repository(&self) -> Result<RepositoryResolver> {
        RepositoryResolver::new(&self.repository.url, self.repository.auth.clone())
    }

    /// Public repository to fall back on, if enabled
    pub fn fallback_repository(&self) -> Result<Option<RepositoryResolver>> {
        if !self.public_fallback {
            return Ok(None);
        }
        RepositoryResolver::new(&self.public_repository_url, AuthStrategy::None).map(Some)
    }

    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.read_timeout_secs),
            strict_ssl: self.strict_ssl,
        }
    }

    pub fn cache_settings(&self) -> CacheSettings {
        CacheSettings {
            bypass: self.cache.bypass,
            max_entries: self.cache.max_entries,
            ttl: Duration::from_secs(self.cache.ttl_secs),
        }
    }
}

fn check_url(name: &str, value: &str) -> Result<()> {
    Url::parse(value)
        .map(|_| ())
        .map_err(|e| KpmError::Configuration(format!("invalid {} '{}': {}", name, value, e)))
}
