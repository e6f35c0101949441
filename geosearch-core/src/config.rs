use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

/// Environment variable that carries the OS Data Hub API key.
pub const API_KEY_ENV: &str = "OS_DATA_HUB_API_KEY";

pub const DEFAULT_BASE_URL: &str = "https://api.os.uk/";
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:7071";

/// Matches the serverless host's default HTTP request timeout.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 230;

/// How much sooner than the inbound request the upstream call gives up.
const UPSTREAM_TIMEOUT_MARGIN: Duration = Duration::from_secs(5);

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
/// base_url = "https://api.os.uk/"
/// bind_address = "127.0.0.1:7071"
/// request_timeout_secs = 230
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// OS Data Hub API key. May still hold a `<...>` template placeholder.
    pub api_key: Option<String>,
    pub base_url: String,
    pub bind_address: String,
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Returns the API key if it is usable: present, not blank, and not a `<...>` placeholder.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty() && !key.starts_with('<'))
    }

    /// Bound on the inbound request as a whole.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Bound on the upstream call, slightly shorter than [`Config::request_timeout`] so
    /// a slow search API surfaces as a transport failure rather than a request timeout.
    pub fn upstream_timeout(&self) -> Duration {
        let request = self.request_timeout();
        request
            .checked_sub(UPSTREAM_TIMEOUT_MARGIN)
            .filter(|t| !t.is_zero())
            .unwrap_or(request / 2)
    }

    /// Set/replace the stored API key.
    pub fn set_api_key(&mut self, api_key: String) {
        self.api_key = Some(api_key);
    }

    /// Load config from the platform config directory, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    /// Load config from an explicit file, or return defaults if it doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to the platform config directory.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    /// Save config to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("uk", "geosearch", "geosearch")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}
