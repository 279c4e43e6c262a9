//! Configuration loading, validation, and management for Optimus.
//!
//! Loads configuration from `$OPTIMUS_CONFIG` or `~/.optimus/config.toml`
//! with environment variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Provider used when a request does not name one
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Model used when a request does not name one
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Provider-specific configurations, keyed by provider name
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub rag: RagConfig,

    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,
}

fn default_app_name() -> String {
    "Optimus Agent Backend".into()
}
fn default_provider() -> String {
    "openai".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("app_name", &self.app_name)
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("providers", &self.providers)
            .field("database", &self.database)
            .field("rag", &self.rag)
            .field("tools", &self.tools)
            .field("agent", &self.agent)
            .field("gateway", &self.gateway)
            .finish()
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Override the provider's base URL (OpenAI-compatible endpoint)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection string. Unset = in-memory stores.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Apply the bundled schema migration on startup
    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

fn default_max_connections() -> u32 {
    5
}
fn default_true() -> bool {
    true
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
            run_migrations: true,
        }
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Connection strings embed credentials.
        f.debug_struct("DatabaseConfig")
            .field("url", &redact(&self.url))
            .field("max_connections", &self.max_connections)
            .field("run_migrations", &self.run_migrations)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    /// Characters per chunk
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Characters shared by consecutive chunks
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Provider whose embedding endpoint is used
    #[serde(default = "default_provider")]
    pub embedding_provider: String,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Must match the `vector(N)` column of the chunk table
    #[serde(default = "default_embedding_dim")]
    pub embedding_dim: usize,

    #[serde(default = "default_top_k")]
    pub default_top_k: usize,

    /// Index the bundled policy document when the store does not have it
    #[serde(default = "default_true")]
    pub seed_documents: bool,
}

fn default_chunk_size() -> usize {
    500
}
fn default_chunk_overlap() -> usize {
    50
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}
fn default_embedding_dim() -> usize {
    1536
}
fn default_top_k() -> usize {
    5
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            embedding_provider: default_provider(),
            embedding_model: default_embedding_model(),
            embedding_dim: default_embedding_dim(),
            default_top_k: default_top_k(),
            seed_documents: true,
        }
    }
}

/// How `http_request` reaches the network.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMode {
    #[default]
    Live,
    /// Deterministic canned responses, no network
    Mock,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// URL prefixes `http_request` may call
    #[serde(default = "default_http_allowlist")]
    pub http_allowlist: Vec<String>,

    #[serde(default)]
    pub http_mode: HttpMode,

    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

fn default_http_allowlist() -> Vec<String> {
    vec!["https://webhook.site".into()]
}
fn default_http_timeout_secs() -> u64 {
    10
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            http_allowlist: default_http_allowlist(),
            http_mode: HttpMode::default(),
            http_timeout_secs: default_http_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Model turns per query before giving up
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Distinct (provider, model) sessions kept alive
    #[serde(default = "default_session_cache_capacity")]
    pub session_cache_capacity: usize,

    /// Frames buffered between the producer and a slow client
    #[serde(default = "default_stream_buffer")]
    pub stream_buffer: usize,

    /// Replace the built-in system prompt entirely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt_override: Option<String>,
}

fn default_temperature() -> f32 {
    0.0
}
fn default_max_iterations() -> usize {
    10
}
fn default_session_cache_capacity() -> usize {
    4
}
fn default_stream_buffer() -> usize {
    32
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_iterations: default_max_iterations(),
            session_cache_capacity: default_session_cache_capacity(),
            stream_buffer: default_stream_buffer(),
            system_prompt_override: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    /// Allowed CORS origins. `["*"]` allows any origin.
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Upper bound on request bodies (document uploads included)
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_port() -> u16 {
    8000
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_api_prefix() -> String {
    "/api/v1".into()
}
fn default_cors_origins() -> Vec<String> {
    vec!["*".into()]
}
fn default_max_body_bytes() -> usize {
    10 * 1024 * 1024
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            api_prefix: default_api_prefix(),
            cors_origins: default_cors_origins(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `$OPTIMUS_CONFIG` or `~/.optimus/config.toml`.
    ///
    /// Environment variables override the file:
    /// - `OPENAI_API_KEY`, `GOOGLE_API_KEY`
    /// - `DATABASE_URL`
    /// - `OPTIMUS_HTTP_ALLOWLIST` (comma-separated prefixes)
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = std::env::var("OPTIMUS_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::config_dir().join("config.toml"));
        let mut config = Self::read(&config_path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::read(path)?;
        config.validate()?;
        Ok(config)
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Apply environment overrides through `lookup` (injectable for tests).
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for (provider, var) in [("openai", "OPENAI_API_KEY"), ("google", "GOOGLE_API_KEY")] {
            if let Some(key) = lookup(var).filter(|k| !k.is_empty()) {
                self.providers.entry(provider.into()).or_default().api_key = Some(key);
            }
        }

        if let Some(url) = lookup("DATABASE_URL").filter(|u| !u.is_empty()) {
            self.database.url = Some(url);
        }

        if let Some(list) = lookup("OPTIMUS_HTTP_ALLOWLIST") {
            self.tools.http_allowlist = list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".optimus")
    }

    /// Settings for a provider, if any were configured.
    pub fn provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.get(name)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.agent.temperature < 0.0 || self.agent.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "agent.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.rag.chunk_size == 0 {
            return Err(ConfigError::ValidationError(
                "rag.chunk_size must be > 0".into(),
            ));
        }

        if self.rag.chunk_overlap >= self.rag.chunk_size {
            return Err(ConfigError::ValidationError(
                "rag.chunk_overlap must be smaller than rag.chunk_size".into(),
            ));
        }

        if !(1..=20).contains(&self.rag.default_top_k) {
            return Err(ConfigError::ValidationError(
                "rag.default_top_k must be between 1 and 20".into(),
            ));
        }

        if self.agent.session_cache_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "agent.session_cache_capacity must be > 0".into(),
            ));
        }

        if self.agent.stream_buffer == 0 {
            return Err(ConfigError::ValidationError(
                "agent.stream_buffer must be > 0".into(),
            ));
        }

        if !self.gateway.api_prefix.is_empty() && !self.gateway.api_prefix.starts_with('/') {
            return Err(ConfigError::ValidationError(
                "gateway.api_prefix must start with '/'".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            default_provider: default_provider(),
            default_model: default_model(),
            providers: HashMap::new(),
            database: DatabaseConfig::default(),
            rag: RagConfig::default(),
            tools: ToolsConfig::default(),
            agent: AgentConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.default_provider, "openai");
        assert_eq!(config.default_model, "gpt-4o-mini");
        assert_eq!(config.gateway.port, 8000);
        assert_eq!(config.gateway.api_prefix, "/api/v1");
        assert_eq!(config.rag.chunk_size, 500);
        assert_eq!(config.rag.chunk_overlap, 50);
        assert_eq!(config.agent.session_cache_capacity, 4);
        assert_eq!(config.tools.http_allowlist, vec!["https://webhook.site"]);
        assert_eq!(config.tools.http_timeout_secs, 10);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.default_provider, config.default_provider);
        assert_eq!(parsed.gateway.port, config.gateway.port);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let mut config = AppConfig::default();
        config.agent.temperature = 5.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn overlap_must_be_smaller_than_chunk() {
        let mut config = AppConfig::default();
        config.rag.chunk_overlap = 500;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("chunk_overlap"));
    }

    #[test]
    fn zero_cache_capacity_rejected() {
        let mut config = AppConfig::default();
        config.agent.session_cache_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.default_provider, "openai");
    }

    #[test]
    fn load_from_file_with_sections() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
default_model = "gpt-4o"

[providers.google]
api_key = "g-key"

[tools]
http_mode = "mock"
http_allowlist = ["https://hooks.example.com/"]

[gateway]
port = 9100
"#
        )
        .unwrap();

        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.default_model, "gpt-4o");
        assert_eq!(config.tools.http_mode, HttpMode::Mock);
        assert_eq!(config.tools.http_allowlist, vec!["https://hooks.example.com/"]);
        assert_eq!(config.gateway.port, 9100);
        assert_eq!(
            config.provider("google").and_then(|p| p.api_key.as_deref()),
            Some("g-key")
        );
        assert_eq!(config.rag.chunk_size, 500);
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "gateway = 12 = 3").unwrap();
        let err = AppConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = AppConfig::default();
        config.apply_env_overrides(|key| match key {
            "OPENAI_API_KEY" => Some("sk-test".into()),
            "DATABASE_URL" => Some("postgres://localhost/ops".into()),
            "OPTIMUS_HTTP_ALLOWLIST" => Some("https://a.example, https://b.example".into()),
            _ => None,
        });
        assert_eq!(
            config.provider("openai").and_then(|p| p.api_key.as_deref()),
            Some("sk-test")
        );
        assert!(config.provider("google").is_none());
        assert_eq!(config.database.url.as_deref(), Some("postgres://localhost/ops"));
        assert_eq!(
            config.tools.http_allowlist,
            vec!["https://a.example", "https://b.example"]
        );
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let mut config = AppConfig::default();
        config.providers.insert(
            "openai".into(),
            ProviderConfig {
                api_key: Some("sk-very-secret".into()),
                api_url: None,
            },
        );
        config.database.url = Some("postgres://user:pw@db/ops".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-very-secret"));
        assert!(!debug.contains("pw@db"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("gpt-4o-mini"));
        assert!(toml_str.contains("8000"));
    }
}
