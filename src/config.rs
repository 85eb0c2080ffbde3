use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::auth::Credentials;

/// Configuration file structure for piper.
///
/// Lets users keep server, pipeline and credentials in one place instead of
/// repeating them on every invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default)]
    pub jenkins: JenkinsConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct JenkinsConfig {
    /// Jenkins base URL
    pub url: Option<String>,

    /// Name of the Jenkins view holding the pipeline
    pub pipeline: Option<String>,

    /// Username for basic auth
    pub username: Option<String>,

    /// Password or API token for basic auth
    pub token: Option<String>,

    /// Seconds a polled pipeline state is reused
    #[serde(default = "default_state_cache_seconds")]
    pub state_cache_seconds: u64,

    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,

    /// Pretty-print JSON output
    #[serde(default)]
    pub pretty: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Summary,
    Json,
}

impl Default for JenkinsConfig {
    fn default() -> Self {
        Self {
            url: None,
            pipeline: None,
            username: None,
            token: None,
            state_cache_seconds: default_state_cache_seconds(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

fn default_state_cache_seconds() -> u64 {
    10
}

fn default_timeout_seconds() -> u64 {
    30
}

impl JenkinsConfig {
    pub fn max_state_cache(&self) -> Duration {
        Duration::from_secs(self.state_cache_seconds)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Basic-auth credentials, when both username and token are set
    pub fn credentials(&self) -> Option<Credentials> {
        match (&self.username, &self.token) {
            (Some(username), Some(token)) => Some(Credentials::new(username, token)),
            _ => None,
        }
    }
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path
    /// 2. ./piper.toml
    /// 3. ./piper.json
    /// 4. ./piper.yaml
    /// 5. ./piper.yml
    /// 6. `<user config dir>/piper/piper.toml`
    ///
    /// Returns default configuration if no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            if !path.exists() {
                return Ok(Self::default());
            }
            return Self::load_from_path(path);
        }

        let candidates = ["piper.toml", "piper.json", "piper.yaml", "piper.yml"];

        for candidate in &candidates {
            let path = Path::new(candidate);
            if path.exists() {
                return Self::load_from_path(path);
            }
        }

        if let Some(path) = Self::user_config_path() {
            if path.exists() {
                return Self::load_from_path(&path);
            }
        }

        Ok(Self::default())
    }

    fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("piper").join("piper.toml"))
    }

    /// Load configuration from a specific file path.
    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
            _ => toml::from_str(&contents)
                .or_else(|_| serde_json::from_str(&contents))
                .or_else(|_| serde_yaml::from_str(&contents))
                .with_context(|| format!("Failed to parse config file: {}", path.display())),
        }
    }
}
