use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api/v1";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_GREETING: &str =
    "Hello! I'm your AI assistant. What would you like to learn about Python and AI?";

/// Environment variable overriding the backend base URL
pub const API_URL_ENV: &str = "CHATTERM_API_URL";
/// Environment variable overriding the request timeout
pub const TIMEOUT_ENV: &str = "CHATTERM_TIMEOUT_MS";

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the chat backend, e.g. `http://localhost:8000/api/v1`
    pub api_url: String,

    /// Request timeout in milliseconds
    pub timeout_ms: u64,

    /// First assistant message shown in every new transcript
    pub greeting: String,

    /// UI preferences
    pub ui: UiConfig,

    /// Logging preferences
    pub log: LogConfig,
}

/// UI configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub title: String,
    pub subtitle: String,
    pub tick_rate_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log file used while the TUI owns the terminal
    pub file: Option<PathBuf>,
    /// Default `tracing` filter; `RUST_LOG` takes precedence
    pub filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_url: DEFAULT_API_URL.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            greeting: DEFAULT_GREETING.to_string(),
            ui: UiConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        UiConfig {
            title: "AI Chat Assistant".to_string(),
            subtitle: "Powered by Python & Gemini AI".to_string(),
            tick_rate_ms: 250,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            file: None,
            filter: "info,chatterm=debug".to_string(),
        }
    }
}

/// Values that take precedence over the config file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub api_url: Option<String>,
    pub timeout_ms: Option<u64>,
    pub greeting: Option<String>,
}

impl Overrides {
    /// Read overrides from the process environment
    pub fn from_env() -> Self {
        Overrides {
            api_url: std::env::var(API_URL_ENV).ok().filter(|v| !v.trim().is_empty()),
            timeout_ms: std::env::var(TIMEOUT_ENV)
                .ok()
                .and_then(|v| v.trim().parse().ok()),
            greeting: None,
        }
    }

    /// Layer `other` on top of `self`; set fields in `other` win
    pub fn or(self, other: Overrides) -> Self {
        Overrides {
            api_url: other.api_url.or(self.api_url),
            timeout_ms: other.timeout_ms.or(self.timeout_ms),
            greeting: other.greeting.or(self.greeting),
        }
    }
}

impl Config {
    /// Directory holding the config file and default log file
    pub fn home_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not find home directory")?;
        Ok(home.join(".chatterm"))
    }

    pub fn default_path() -> Result<PathBuf> {
        Ok(Self::home_dir()?.join("config.toml"))
    }

    /// Load configuration from the default location, then apply overrides
    pub fn load(overrides: Overrides) -> Result<Self> {
        let path = Self::default_path()?;
        let mut config = Self::load_from(&path)?;
        config.apply(overrides);
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Save configuration to file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }

    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(url) = overrides.api_url {
            self.api_url = url;
        }
        if let Some(timeout) = overrides.timeout_ms {
            self.timeout_ms = timeout;
        }
        if let Some(greeting) = overrides.greeting {
            self.greeting = greeting;
        }
    }

    /// Reject settings that would make every request fail
    pub fn validate(&self) -> Result<()> {
        ensure!(self.timeout_ms > 0, "timeout_ms must be greater than zero");
        ensure!(!self.api_url.trim().is_empty(), "api_url must not be empty");
        Ok(())
    }

    /// `POST` target for chat messages
    pub fn chat_endpoint(&self) -> String {
        self.endpoint("chat")
    }

    /// `GET` target for the backend health probe
    pub fn health_endpoint(&self) -> String {
        self.endpoint("health")
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_url.trim_end_matches('/'), path)
    }

    /// Log file for interactive mode
    pub fn log_file(&self) -> Result<PathBuf> {
        match &self.log.file {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::home_dir()?.join("chatterm.log")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_backend_layout() {
        let config = Config::default();
        assert_eq!(config.api_url, "http://localhost:8000/api/v1");
        assert_eq!(config.timeout_ms, 30_000);
        assert_eq!(config.chat_endpoint(), "http://localhost:8000/api/v1/chat");
        assert_eq!(config.health_endpoint(), "http://localhost:8000/api/v1/health");
        assert!(config.greeting.starts_with("Hello!"));
    }

    #[test]
    fn endpoint_tolerates_trailing_slash() {
        let config = Config {
            api_url: "http://example.com/api/v1/".to_string(),
            ..Config::default()
        };
        assert_eq!(config.chat_endpoint(), "http://example.com/api/v1/chat");
    }

    #[test]
    fn overrides_replace_only_set_fields() {
        let mut config = Config::default();
        config.apply(Overrides {
            api_url: Some("http://backend:9000/api/v1".to_string()),
            ..Overrides::default()
        });
        assert_eq!(config.api_url, "http://backend:9000/api/v1");
        assert_eq!(config.timeout_ms, DEFAULT_TIMEOUT_MS);
        assert_eq!(config.greeting, DEFAULT_GREETING);
    }

    #[test]
    fn later_overrides_win() {
        let env = Overrides {
            api_url: Some("http://env".to_string()),
            timeout_ms: Some(5_000),
            greeting: None,
        };
        let cli = Overrides {
            api_url: Some("http://cli".to_string()),
            timeout_ms: None,
            greeting: Some("Hi".to_string()),
        };
        let merged = env.or(cli);
        assert_eq!(merged.api_url.as_deref(), Some("http://cli"));
        assert_eq!(merged.timeout_ms, Some(5_000));
        assert_eq!(merged.greeting.as_deref(), Some("Hi"));
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: Config = toml::from_str("timeout_ms = 1000\n[ui]\ntitle = \"Tutor\"\n").unwrap();
        assert_eq!(config.timeout_ms, 1000);
        assert_eq!(config.ui.title, "Tutor");
        assert_eq!(config.ui.tick_rate_ms, 250);
        assert_eq!(config.api_url, DEFAULT_API_URL);
    }
}
