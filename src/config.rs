//! Run configuration management

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Main run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Config {
    /// Target settings
    pub target: TargetConfig,

    /// Fuzzing settings
    pub fuzz: FuzzConfig,

    /// Output settings
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Base URL of the application under test
    pub base_url: Option<String>,

    /// HTTP method used for every probe
    pub method: String,

    /// Status codes that count as discoveries ("200" or "200-299" entries)
    pub accepted_statuses: Vec<String>,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Extra request headers
    pub headers: HashMap<String, String>,

    /// Static cookies sent with every probe
    pub cookies: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FuzzConfig {
    /// Wordlist file, one path per line
    pub wordlist: Option<PathBuf>,

    /// Maximum simultaneous in-flight requests
    pub concurrency: usize,

    /// Merge the built-in common paths into the wordlist
    pub include_common_paths: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Findings file, one `<url> [<status>]` line per endpoint
    pub results_file: PathBuf,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            method: "HEAD".to_string(),
            accepted_statuses: ["200", "204", "301", "302", "403"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            timeout_secs: 10,
            headers: HashMap::new(),
            cookies: HashMap::new(),
        }
    }
}

impl Default for FuzzConfig {
    fn default() -> Self {
        Self {
            wordlist: None,
            concurrency: 10,
            include_common_paths: true,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            results_file: PathBuf::from("results.txt"),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: Option<&str>) -> Result<Self> {
        let config_path = match path {
            Some(p) => PathBuf::from(p),
            None => Self::default_config_path()?,
        };

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config from {:?}", config_path))?;

            let config: Config = toml::from_str(&contents)
                .with_context(|| "Failed to parse configuration file")?;

            tracing::info!("Loaded configuration from {:?}", config_path);
            Ok(config)
        } else {
            tracing::info!("No configuration file found, using defaults");
            Ok(Self::default())
        }
    }

    /// Default configuration rendered as TOML
    pub fn default_toml() -> Result<String> {
        toml::to_string_pretty(&Self::default())
            .context("Failed to render default configuration")
    }

    /// Get default configuration file path
    fn default_config_path() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("io", "alcove", "alcove")
            .context("Failed to determine config directory")?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}
