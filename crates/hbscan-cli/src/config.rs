//! Configuration file handling.
//!
//! Reads from `~/.config/hbscan/hbscan.toml`

use anyhow::{Context, Result};
use hbscan_core::HttpGateway;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable that overrides `api_base_url`.
pub const API_BASE_URL_ENV: &str = "HBSCAN_API_BASE_URL";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Root of the directory service API.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Where search history and settings are kept.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    /// Per-request timeout.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Page size sent with hierarchy list requests.
    #[serde(default = "default_list_page_size")]
    pub list_page_size: u32,
    /// Cap on results per search request; the service default when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_limit: Option<u32>,
    /// How often the task tab reloads while it is open.
    #[serde(default = "default_task_refresh_secs")]
    pub task_refresh_secs: u64,
}

fn default_api_base_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_list_page_size() -> u32 {
    100
}

fn default_task_refresh_secs() -> u64 {
    5
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            data_dir: None,
            request_timeout_secs: default_request_timeout_secs(),
            list_page_size: default_list_page_size(),
            search_limit: None,
            task_refresh_secs: default_task_refresh_secs(),
        }
    }
}

impl Config {
    /// Load configuration from the config file.
    ///
    /// If `custom_path` is provided, load from that path.
    /// Otherwise, load from the default XDG config location.
    /// Creates a default config file if it doesn't exist (only for default path).
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self> {
        match custom_path {
            Some(path) => Self::load_from(&path, false),
            None => Self::load_from(&Self::config_path()?, true),
        }
    }

    fn load_from(config_path: &Path, create_if_missing: bool) -> Result<Self> {
        if !config_path.exists() {
            if !create_if_missing {
                anyhow::bail!("Config file not found: {}", config_path.display());
            }
            let config = Config::default();
            config.save_to(config_path)?;
            tracing::info!("Created default config at {}", config_path.display());
            return Ok(config);
        }

        let contents = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        tracing::info!("Loaded config from {}: {:?}", config_path.display(), config);
        Ok(config)
    }

    /// Save configuration to `config_path`.
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(config_path, contents)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))
    }

    /// Apply overrides. The CLI flag wins over the environment.
    pub fn apply_overrides(
        &mut self,
        env_api: Option<String>,
        cli_api: Option<String>,
        cli_data_dir: Option<PathBuf>,
    ) {
        if let Some(api) = cli_api.or(env_api).filter(|api| !api.trim().is_empty()) {
            tracing::info!("Overriding API base URL: {}", api);
            self.api_base_url = api;
        }
        if let Some(dir) = cli_data_dir {
            tracing::info!("Overriding data directory: {}", dir.display());
            self.data_dir = Some(dir);
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn task_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.task_refresh_secs.max(1))
    }

    /// HTTP gateway for the configured service.
    pub fn gateway(&self) -> Result<HttpGateway> {
        let gateway = HttpGateway::new(
            &self.api_base_url,
            self.list_page_size,
            self.request_timeout(),
        )?;
        Ok(match self.search_limit {
            Some(limit) => {
                tracing::info!("Search results capped at {}", limit);
                gateway.with_search_limit(limit)
            }
            None => gateway,
        })
    }

    /// Data directory, falling back to the platform data dir.
    pub fn resolved_data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => {
                let data_dir = dirs::data_dir().context("Could not determine data directory")?;
                Ok(data_dir.join("hbscan"))
            }
        }
    }

    /// Get the path to the config file.
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Could not determine config directory")?;

        Ok(config_dir.join("hbscan").join("hbscan.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hbscan.toml");
        std::fs::write(&path, "api_base_url = \"https://dir.example.org/api\"\n").unwrap();

        let config = Config::load(Some(path)).unwrap();
        assert_eq!(config.api_base_url, "https://dir.example.org/api");
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.list_page_size, 100);
        assert_eq!(config.task_refresh_secs, 5);
        assert!(config.search_limit.is_none());
        assert!(config.data_dir.is_none());
    }

    #[test]
    fn test_search_limit_and_gateway() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hbscan.toml");
        std::fs::write(&path, "search_limit = 200\ntask_refresh_secs = 0\n").unwrap();

        let config = Config::load(Some(path)).unwrap();
        assert_eq!(config.search_limit, Some(200));
        assert_eq!(config.task_refresh_interval(), Duration::from_secs(1));
        assert!(config.gateway().is_ok());

        let broken = Config {
            api_base_url: "not a url".to_string(),
            ..Config::default()
        };
        assert!(broken.gateway().is_err());
    }

    #[test]
    fn test_missing_custom_path_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load(Some(dir.path().join("absent.toml"))).is_err());
    }

    #[test]
    fn test_default_file_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hbscan").join("hbscan.toml");

        let config = Config::load_from(&path, true).unwrap();
        assert_eq!(config, Config::default());
        assert!(path.exists());
        assert_eq!(Config::load_from(&path, false).unwrap(), config);
    }

    #[test]
    fn test_cli_beats_env() {
        let mut config = Config::default();
        config.apply_overrides(Some("http://env/api".to_string()), None, None);
        assert_eq!(config.api_base_url, "http://env/api");

        config.apply_overrides(
            Some("http://env/api".to_string()),
            Some("http://cli/api".to_string()),
            Some(PathBuf::from("/tmp/hbscan")),
        );
        assert_eq!(config.api_base_url, "http://cli/api");
        assert_eq!(config.resolved_data_dir().unwrap(), PathBuf::from("/tmp/hbscan"));

        config.apply_overrides(Some(" ".to_string()), None, None);
        assert_eq!(config.api_base_url, "http://cli/api");
    }
}
