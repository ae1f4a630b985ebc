use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::clients::cache::CachePolicy;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("reading config {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("parsing config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("{0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,
    pub search: SearchConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_fresh_secs")]
    pub fresh_secs: u64,
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            fresh_secs: default_fresh_secs(),
            max_entries: default_max_entries(),
        }
    }
}

fn default_listen_port() -> u16 {
    9090
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_fresh_secs() -> u64 {
    30
}

fn default_max_entries() -> usize {
    256
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&data)
    }

    pub fn parse(data: &str) -> Result<Self, ConfigError> {
        let mut cfg: Config = serde_yaml::from_str(data)?;

        cfg.search.base_url = cfg.search.base_url.trim().to_string();
        if cfg.search.base_url.is_empty() {
            return Err(ConfigError::Invalid(
                "search.base_url must be configured".to_string(),
            ));
        }
        if cfg.cache.max_entries == 0 {
            return Err(ConfigError::Invalid(
                "cache.max_entries must be greater than zero".to_string(),
            ));
        }

        Ok(cfg)
    }

    pub fn listen_addr(&self) -> String {
        format!("0.0.0.0:{}", self.listen_port)
    }

    pub fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search.timeout_secs)
    }

    pub fn cache_policy(&self) -> CachePolicy {
        CachePolicy {
            fresh_for: Duration::from_secs(self.cache.fresh_secs),
            max_entries: self.cache.max_entries,
        }
    }
}
