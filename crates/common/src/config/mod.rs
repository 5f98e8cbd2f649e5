//! Configuration management for the chatbot gateway
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default, config/{APP_ENV}, config/local)
//! - Default values

use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use config::builder::DefaultState;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::{Validate, ValidationError};

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
#[validate(schema(function = "validate_timeout_budget", skip_on_field_errors = true))]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    #[validate(nested)]
    pub server: ServerConfig,

    /// Upstream service configuration
    #[serde(default)]
    #[validate(nested)]
    pub upstream: UpstreamConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds. Must exceed the worst-case pipeline
    /// run (the three step timeouts added up).
    #[serde(default = "default_request_timeout")]
    #[validate(range(min = 1))]
    pub request_timeout_secs: u64,

    /// Maximum concurrent requests
    #[serde(default = "default_max_concurrent")]
    #[validate(range(min = 1))]
    pub max_concurrent_requests: usize,

    /// URL the chat widget posts to
    #[serde(default = "default_public_endpoint")]
    pub public_endpoint: String,
}

/// Addresses and timeouts of the three backing services.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct UpstreamConfig {
    /// Base URL shared by all services
    #[serde(default = "default_upstream_base")]
    pub base_url: String,

    #[serde(default = "default_embeddings_path")]
    pub embeddings_path: String,

    #[serde(default = "default_search_path")]
    pub search_path: String,

    #[serde(default = "default_answer_path")]
    pub answer_path: String,

    /// Timeout applied to every upstream call, in seconds
    #[serde(default = "default_upstream_timeout")]
    #[validate(range(min = 1))]
    pub timeout_secs: u64,

    /// TCP connect timeout in seconds
    #[serde(default = "default_connect_timeout")]
    #[validate(range(min = 1))]
    pub connect_timeout_secs: u64,

    /// Per-step overrides of `timeout_secs`
    #[serde(default)]
    #[validate(range(min = 1))]
    pub embeddings_timeout_secs: Option<u64>,

    #[serde(default)]
    #[validate(range(min = 1))]
    pub search_timeout_secs: Option<u64>,

    #[serde(default)]
    #[validate(range(min = 1))]
    pub answer_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log filter (e.g. "info", "info,ragchat_common=debug")
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Service name reported in logs
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_request_timeout() -> u64 { 120 }
fn default_max_concurrent() -> usize { 100 }
fn default_public_endpoint() -> String { "/rag-chatbot/v1/query".to_string() }
fn default_upstream_base() -> String { "http://localhost:5000".to_string() }
fn default_embeddings_path() -> String { "/generate_embeddings".to_string() }
fn default_search_path() -> String { "/search".to_string() }
fn default_answer_path() -> String { "/generate_answer".to_string() }
fn default_upstream_timeout() -> u64 { 30 }
fn default_connect_timeout() -> u64 { 5 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_service_name() -> String { "rag-chatbot".to_string() }

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let builder = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))
            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Load local overrides
            .add_source(File::with_name("config/local").required(false))
            // e.g., APP__UPSTREAM__BASE_URL=http://embedder:5000
            .add_source(env_overrides());

        Self::build(builder)
    }

    /// Load from a specific file, still honoring APP__ overrides
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name(path))
            .add_source(env_overrides());

        Self::build(builder)
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let config: Self = builder.build()?.try_deserialize()?;
        config.validated()
    }

    /// Reject settings the server cannot honor.
    pub fn validated(self) -> Result<Self, ConfigError> {
        self.validate()
            .map_err(|e| ConfigError::Message(format!("invalid configuration: {}", e)))?;
        Ok(self)
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }
}

impl UpstreamConfig {
    /// Point every service at `base_url`, keeping the default paths.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn embeddings_url(&self) -> String {
        join_url(&self.base_url, &self.embeddings_path)
    }

    pub fn search_url(&self) -> String {
        join_url(&self.base_url, &self.search_path)
    }

    pub fn answer_url(&self) -> String {
        join_url(&self.base_url, &self.answer_path)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn embeddings_timeout(&self) -> Duration {
        self.embeddings_timeout_secs.map(Duration::from_secs).unwrap_or_else(|| self.timeout())
    }

    pub fn search_timeout(&self) -> Duration {
        self.search_timeout_secs.map(Duration::from_secs).unwrap_or_else(|| self.timeout())
    }

    pub fn answer_timeout(&self) -> Duration {
        self.answer_timeout_secs.map(Duration::from_secs).unwrap_or_else(|| self.timeout())
    }
}

fn env_overrides() -> Environment {
    Environment::with_prefix("APP")
        .separator("__")
        .try_parsing(true)
}

/// A router timeout that can fire mid-pipeline would turn fallbacks into a
/// bare 408, so it has to outlast all three upstream calls.
fn validate_timeout_budget(config: &AppConfig) -> Result<(), ValidationError> {
    let upstream = &config.upstream;
    let pipeline_secs = upstream
        .embeddings_timeout()
        .as_secs()
        .saturating_add(upstream.search_timeout().as_secs())
        .saturating_add(upstream.answer_timeout().as_secs());

    if config.server.request_timeout_secs > pipeline_secs {
        return Ok(());
    }

    let mut error = ValidationError::new("timeout_budget");
    error.message = Some(
        format!(
            "server.request_timeout_secs ({}) must exceed the summed upstream step timeouts ({})",
            config.server.request_timeout_secs, pipeline_secs
        )
        .into(),
    );
    Err(error)
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            max_concurrent_requests: default_max_concurrent(),
            public_endpoint: default_public_endpoint(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_upstream_base(),
            embeddings_path: default_embeddings_path(),
            search_path: default_search_path(),
            answer_path: default_answer_path(),
            timeout_secs: default_upstream_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            embeddings_timeout_secs: None,
            search_timeout_secs: None,
            answer_timeout_secs: None,
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            service_name: default_service_name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.public_endpoint, "/rag-chatbot/v1/query");
        assert_eq!(config.upstream.timeout_secs, 30);
    }

    #[test]
    fn test_default_upstream_urls() {
        let upstream = UpstreamConfig::default();
        assert_eq!(upstream.embeddings_url(), "http://localhost:5000/generate_embeddings");
        assert_eq!(upstream.search_url(), "http://localhost:5000/search");
        assert_eq!(upstream.answer_url(), "http://localhost:5000/generate_answer");
    }

    #[test]
    fn test_url_join_tolerates_slashes() {
        let upstream = UpstreamConfig {
            search_path: "search".to_string(),
            ..UpstreamConfig::with_base_url("http://rag:9000/")
        };
        assert_eq!(upstream.search_url(), "http://rag:9000/search");
        assert_eq!(upstream.answer_url(), "http://rag:9000/generate_answer");
    }

    #[test]
    fn test_step_timeout_overrides() {
        let upstream = UpstreamConfig {
            answer_timeout_secs: Some(90),
            ..UpstreamConfig::default()
        };
        assert_eq!(upstream.answer_timeout(), Duration::from_secs(90));
        assert_eq!(upstream.search_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_shipped_defaults_file_matches_code() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../config/default");
        let config = AppConfig::from_file(path).unwrap();
        assert_eq!(config.upstream.embeddings_url(), UpstreamConfig::default().embeddings_url());
        assert_eq!(config.server.public_endpoint, default_public_endpoint());
        assert!(config.upstream.answer_timeout_secs.is_none());
    }

    #[test]
    fn test_defaults_pass_validation() {
        assert!(AppConfig::default().validated().is_ok());
    }

    #[test]
    fn test_request_timeout_must_outlast_pipeline() {
        // 30 + 30 + 60 = 120, so a 120s router timeout could cut the answer off
        let mut config = AppConfig::default();
        config.upstream.answer_timeout_secs = Some(60);
        let err = config.clone().validated().unwrap_err();
        assert!(err.to_string().contains("timeout"));

        config.server.request_timeout_secs = 121;
        assert!(config.validated().is_ok());
    }

    #[test]
    fn test_short_request_timeout_rejected() {
        let config = AppConfig {
            server: ServerConfig {
                request_timeout_secs: 2,
                ..ServerConfig::default()
            },
            upstream: UpstreamConfig {
                timeout_secs: 1,
                ..UpstreamConfig::default()
            },
            ..AppConfig::default()
        };
        assert!(config.validated().is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = AppConfig::default();
        config.upstream.search_timeout_secs = Some(0);
        assert!(config.validated().is_err());
    }

    #[test]
    fn test_builder_rejects_tight_request_timeout() {
        let builder = Config::builder()
            .set_override("server.request_timeout_secs", 60)
            .unwrap();
        assert!(AppConfig::build(builder).is_err());
    }

    #[test]
    fn test_partial_sections_fill_defaults() {
        let config: AppConfig = Config::builder()
            .set_override("upstream.base_url", "http://services:5000")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(config.upstream.base_url, "http://services:5000");
        assert_eq!(config.upstream.search_path, "/search");
        assert_eq!(config.server.port, 8080);
    }
}
