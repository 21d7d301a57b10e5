use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;

/// Environment variable holding the model gateway API key.
pub const ENV_API_KEY: &str = "NEBIUS";
/// Environment variable overriding the model gateway base URL.
pub const ENV_BASE_URL: &str = "LLM_BASE_URL";
/// Environment variable overriding the model name.
pub const ENV_MODEL: &str = "LLM_MODEL";
/// Environment variable overriding the listen port.
pub const ENV_PORT: &str = "PORT";
/// Environment variable overriding the reported environment name.
pub const ENV_ENVIRONMENT: &str = "SWACHTRACK_ENV";

/// Top-level configuration for the SwachTrack service.
///
/// Loaded from `~/.swachtrack/config.toml` by default, then overlaid with
/// environment variables. Each section corresponds to one concern.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SwachConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub sessions: SessionConfig,
}

impl SwachConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: SwachConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Overlay values from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Overlay values from an arbitrary key lookup.
    ///
    /// Empty values are ignored. An unparseable port is logged and skipped.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get(ENV_API_KEY) {
            self.llm.api_key = Some(key);
        }
        if let Some(url) = get(ENV_BASE_URL) {
            self.llm.base_url = url;
        }
        if let Some(model) = get(ENV_MODEL) {
            self.llm.model = model;
        }
        if let Some(env) = get(ENV_ENVIRONMENT) {
            self.general.environment = env;
        }
        if let Some(port) = get(ENV_PORT) {
            match port.parse::<u16>() {
                Ok(p) => self.general.port = p,
                Err(e) => warn!(value = %port, error = %e, "Ignoring invalid {}", ENV_PORT),
            }
        }
    }
}

/// General service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Interface to bind the HTTP server to.
    pub host: String,
    /// HTTP listen port.
    pub port: u16,
    /// Deployment environment name reported by `/health`.
    pub environment: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            environment: "development".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Hosted chat-completion endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL of the OpenAI-compatible API (without `/chat/completions`).
    pub base_url: String,
    /// Bearer token. Not validated at startup.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Model identifier sent with every request.
    pub model: String,
    /// Sampling temperature for the chat assistant.
    pub temperature: f64,
    /// Completion token cap for the chat assistant.
    pub max_tokens: u32,
    /// Per-request timeout. `None` leaves the HTTP client default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.studio.nebius.com/v1/".to_string(),
            api_key: None,
            model: "openai/gpt-oss-20b".to_string(),
            temperature: 0.7,
            max_tokens: 1000,
            timeout_secs: None,
        }
    }
}

/// Chat session retention.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Maximum live sessions before the least recently used one is evicted.
    pub max_sessions: usize,
    /// Idle minutes after which a session is dropped.
    pub ttl_minutes: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_sessions: 1000,
            ttl_minutes: 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SwachError;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = SwachConfig::default();
        assert_eq!(config.general.port, 3000);
        assert_eq!(config.general.environment, "development");
        assert_eq!(config.llm.base_url, "https://api.studio.nebius.com/v1/");
        assert_eq!(config.llm.model, "openai/gpt-oss-20b");
        assert!(config.llm.api_key.is_none());
        assert!((config.llm.temperature - 0.7).abs() < f64::EPSILON);
        assert_eq!(config.llm.max_tokens, 1000);
        assert!(config.llm.timeout_secs.is_none());
        assert_eq!(config.sessions.max_sessions, 1000);
        assert_eq!(config.sessions.ttl_minutes, 60);
    }

    #[test]
    fn test_load_valid_config() {
        let content = r#"
[general]
host = "127.0.0.1"
port = 8080
environment = "production"
log_level = "debug"

[llm]
base_url = "http://localhost:9000/v1"
api_key = "sk-test"
model = "meta/llama"
temperature = 0.2
max_tokens = 512
timeout_secs = 30

[sessions]
max_sessions = 10
ttl_minutes = 5
"#;
        let file = create_temp_config(content);
        let config = SwachConfig::load(file.path()).unwrap();
        assert_eq!(config.general.host, "127.0.0.1");
        assert_eq!(config.general.port, 8080);
        assert_eq!(config.general.environment, "production");
        assert_eq!(config.llm.base_url, "http://localhost:9000/v1");
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.llm.model, "meta/llama");
        assert_eq!(config.llm.max_tokens, 512);
        assert_eq!(config.llm.timeout_secs, Some(30));
        assert_eq!(config.sessions.max_sessions, 10);
        assert_eq!(config.sessions.ttl_minutes, 5);
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let content = r#"
[llm]
model = "other/model"
"#;
        let file = create_temp_config(content);
        let config = SwachConfig::load(file.path()).unwrap();
        assert_eq!(config.llm.model, "other/model");
        assert_eq!(config.llm.max_tokens, 1000);
        assert_eq!(config.general.port, 3000);
        assert_eq!(config.sessions.ttl_minutes, 60);
    }

    #[test]
    fn test_load_invalid_toml_is_config_error() {
        let file = create_temp_config("[general\nport = ");
        let err = SwachConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, SwachError::Config(_)));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = SwachConfig::load_or_default(Path::new("/nonexistent/config.toml"));
        assert_eq!(config.general.port, 3000);
        assert_eq!(config.llm.model, "openai/gpt-oss-20b");
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = SwachConfig::default();
        config.general.port = 4321;
        config.save(&path).unwrap();

        let reloaded = SwachConfig::load(&path).unwrap();
        assert_eq!(reloaded.general.port, 4321);
        assert_eq!(reloaded.llm.base_url, config.llm.base_url);
        assert!(reloaded.llm.api_key.is_none());
    }

    #[test]
    fn test_overrides_apply_known_keys() {
        let vars: HashMap<&str, &str> = [
            (ENV_API_KEY, "secret"),
            (ENV_BASE_URL, "http://gateway.local/v1"),
            (ENV_MODEL, "tiny/model"),
            (ENV_PORT, "9999"),
            (ENV_ENVIRONMENT, "staging"),
        ]
        .into_iter()
        .collect();

        let mut config = SwachConfig::default();
        config.apply_overrides_from(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.llm.api_key.as_deref(), Some("secret"));
        assert_eq!(config.llm.base_url, "http://gateway.local/v1");
        assert_eq!(config.llm.model, "tiny/model");
        assert_eq!(config.general.port, 9999);
        assert_eq!(config.general.environment, "staging");
    }

    #[test]
    fn test_overrides_skip_empty_and_invalid_values() {
        let mut config = SwachConfig::default();
        config.apply_overrides_from(|k| match k {
            ENV_API_KEY => Some("   ".to_string()),
            ENV_PORT => Some("not-a-port".to_string()),
            _ => None,
        });
        assert!(config.llm.api_key.is_none());
        assert_eq!(config.general.port, 3000);
    }

    #[test]
    fn test_api_key_not_serialized_when_unset() {
        let config = SwachConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(!toml_str.contains("api_key"));
        let deserialized: SwachConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(deserialized.general.log_level, config.general.log_level);
    }
}
