use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use kwcluster_core::CoreConfig;
use serde::{Deserialize, Serialize};

/// CLI configuration that can be loaded from a JSON file.
/// Every field is optional; missing ones keep the core defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CliConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base_url: Option<String>,

    /// Rows per page when `--limit` is not given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_ttl_ms: Option<u64>,

    /// Row cap for the bulk download used by local filtering
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bulk_fetch_limit: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

impl CliConfig {
    /// Load config from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: CliConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// `~/.config/kwcluster/config.json` (platform equivalent)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("kwcluster").join("config.json"))
    }

    /// An explicit path must exist; the default path is used only when present.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Build the core configuration; `api_override` wins over the file.
    pub fn to_core_config(&self, api_override: Option<&str>) -> CoreConfig {
        let mut config = match api_override.or(self.api_base_url.as_deref()) {
            Some(url) => CoreConfig::new(url),
            None => CoreConfig::default(),
        };
        if let Some(size) = self.page_size {
            config.default_page_size = size.max(1);
        }
        if let Some(ttl) = self.cache_ttl_ms {
            config.cache_ttl = Duration::from_millis(ttl);
        }
        if let Some(limit) = self.bulk_fetch_limit {
            config.bulk_fetch_limit = limit.max(1);
        }
        if let Some(secs) = self.request_timeout_secs {
            config.request_timeout = Duration::from_secs(secs);
        }
        config
    }
}
