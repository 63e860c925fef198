use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

/// Default API URL (local development backend)
const DEFAULT_API_URL: &str = "http://localhost:5000/api";

/// Environment variable name for API URL override
const ENV_API_URL: &str = "FIXRIFY_API_URL";

/// Configuration file structure
#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    api: Option<ApiConfig>,
}

#[derive(Debug, Deserialize, Default)]
struct ApiConfig {
    /// API endpoint URL (e.g., "https://fixrify.example.com/api")
    url: Option<String>,
}

/// Runtime endpoint configuration
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    /// Base URL for API calls (e.g., "http://localhost:5000/api")
    pub api_url: String,
    /// Source of the configuration (for logging)
    pub source: ConfigSource,
}

/// Where the configuration came from
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    /// Using default hardcoded values
    Default,
    /// Loaded from environment variable
    Environment,
    /// Loaded from config file
    ConfigFile,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::Environment => write!(f, "environment variable"),
            ConfigSource::ConfigFile => write!(f, "config file"),
        }
    }
}

/// Get the path to the configuration file
fn get_config_file_path() -> Option<PathBuf> {
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
        .map(|p| p.join("fixrify").join("config.toml"))
}

/// Load configuration from the config file
fn load_config_file() -> Option<ConfigFile> {
    let path = get_config_file_path()?;

    if !path.exists() {
        return None;
    }

    match fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::debug!("Loaded config from {:?}", path);
                Some(config)
            }
            Err(e) => {
                tracing::warn!("Failed to parse config file {:?}: {}", path, e);
                None
            }
        },
        Err(e) => {
            tracing::warn!("Failed to read config file {:?}: {}", path, e);
            None
        }
    }
}

/// Load endpoint configuration with priority:
/// 1. Environment variable (FIXRIFY_API_URL)
/// 2. Config file (~/.config/fixrify/config.toml)
/// 3. Default values
pub fn load_endpoint_config() -> EndpointConfig {
    // Priority 1: Environment variable
    if let Ok(url) = std::env::var(ENV_API_URL) {
        let url = url.trim().trim_end_matches('/');
        if !url.is_empty() {
            tracing::info!("Using API URL from environment variable: {}", url);
            return EndpointConfig {
                api_url: url.to_string(),
                source: ConfigSource::Environment,
            };
        }
    }

    // Priority 2: Config file
    if let Some(config) = load_config_file() {
        if let Some(api_config) = config.api {
            let api_url = api_config
                .url
                .map(|u| u.trim().trim_end_matches('/').to_string())
                .filter(|u| !u.is_empty());

            if let Some(url) = api_url {
                tracing::info!("Using API URL from config file: {}", url);
                return EndpointConfig {
                    api_url: url,
                    source: ConfigSource::ConfigFile,
                };
            }
        }
    }

    // Priority 3: Default values
    tracing::debug!("Using default API URL: {}", DEFAULT_API_URL);
    EndpointConfig {
        api_url: DEFAULT_API_URL.to_string(),
        source: ConfigSource::Default,
    }
}

impl EndpointConfig {
    /// Build a config pointing at an explicit base URL (tests, tooling).
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            api_url: url.into().trim_end_matches('/').to_string(),
            source: ConfigSource::Default,
        }
    }
}

/// Get the path to the config file for documentation purposes
pub fn get_config_file_path_string() -> String {
    get_config_file_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "~/.config/fixrify/config.toml".to_string())
}

/// Generate example config file content
pub fn generate_example_config() -> String {
    r#"# Fixrify Client Configuration
# Place this file at: ~/.config/fixrify/config.toml

[api]
# API endpoint URL for self-hosted instances
# Default: http://localhost:5000/api
# url = "https://your-instance.example.com/api"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_config_parses() {
        let config: ConfigFile = toml::from_str(&generate_example_config()).unwrap();
        assert!(config.api.is_none() || config.api.unwrap().url.is_none());
    }

    #[test]
    fn test_config_file_url() {
        let config: ConfigFile =
            toml::from_str("[api]\nurl = \"https://fixrify.example.com/api/\"").unwrap();
        assert_eq!(
            config.api.unwrap().url.as_deref(),
            Some("https://fixrify.example.com/api/")
        );
    }

    #[test]
    fn test_with_url_strips_trailing_slash() {
        let config = EndpointConfig::with_url("http://localhost:5000/api/");
        assert_eq!(config.api_url, "http://localhost:5000/api");
    }

    #[test]
    fn test_source_display() {
        assert_eq!(ConfigSource::Default.to_string(), "default");
        assert_eq!(ConfigSource::Environment.to_string(), "environment variable");
        assert_eq!(ConfigSource::ConfigFile.to_string(), "config file");
    }
}
