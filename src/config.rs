//! Configuration management for the SEO assistant
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::agent::context::Constraints;
use crate::error::{Result, SeoAssistantError};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
///
/// Holds provider settings, generation limits, storage location, server
/// binding, token verification settings and knowledge retrieval options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Generation provider configuration (OpenAI-compatible, Ollama, fake)
    pub provider: ProviderConfig,
    /// Generation pipeline behavior
    #[serde(default)]
    pub generation: GenerationConfig,
    /// Database location
    #[serde(default)]
    pub storage: StorageConfig,
    /// HTTP server binding
    #[serde(default)]
    pub server: ServerConfig,
    /// Bearer token verification
    #[serde(default)]
    pub auth: AuthConfig,
    /// Knowledge retrieval augmentation
    #[serde(default)]
    pub knowledge: KnowledgeConfig,
}

/// Provider configuration
///
/// Specifies which generation backend to use and its settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Type of provider to use
    #[serde(rename = "type")]
    pub provider_type: String,

    /// OpenAI-compatible chat completions configuration
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// Ollama configuration
    #[serde(default)]
    pub ollama: OllamaConfig,
}

/// OpenAI-compatible provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// Model to request
    #[serde(default = "default_openai_model")]
    pub model: String,

    /// API base URL; `/chat/completions` is appended
    #[serde(default = "default_openai_api_base")]
    pub api_base: String,

    /// API key sent as a bearer token
    #[serde(default)]
    pub api_key: Option<String>,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_openai_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            model: default_openai_model(),
            api_base: default_openai_api_base(),
            api_key: None,
            temperature: default_temperature(),
        }
    }
}

/// Ollama provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Ollama server host
    #[serde(default = "default_ollama_host")]
    pub host: String,

    /// Model to use for Ollama
    #[serde(default = "default_ollama_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_ollama_host() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3.2:latest".to_string()
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: default_ollama_host(),
            model: default_ollama_model(),
            temperature: default_temperature(),
        }
    }
}

/// Generation pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Timeout for a single generation call (seconds)
    #[serde(default = "default_generation_timeout")]
    pub timeout_seconds: u64,

    /// Maximum stored length of a failed job's error message (characters)
    #[serde(default = "default_max_error_length")]
    pub max_error_length: usize,

    /// Advisory length constraints passed to the generator
    #[serde(default)]
    pub constraints: Constraints,
}

fn default_generation_timeout() -> u64 {
    120
}

fn default_max_error_length() -> usize {
    500
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_generation_timeout(),
            max_error_length: default_max_error_length(),
            constraints: Constraints::default(),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Explicit SQLite database path; defaults to the user data directory
    #[serde(default)]
    pub database_path: Option<PathBuf>,
}

impl StorageConfig {
    /// Resolve the database file path
    ///
    /// # Errors
    ///
    /// Returns `SeoAssistantError::Storage` if no path is configured and
    /// the platform data directory cannot be determined
    pub fn resolve_database_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.database_path {
            return Ok(path.clone());
        }

        let proj_dirs = ProjectDirs::from("com", "seo-assistant", "seo-assistant").ok_or_else(
            || SeoAssistantError::Storage("Could not determine data directory".into()),
        )?;

        Ok(proj_dirs.data_dir().join("seo_assistant.sqlite3"))
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind host
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Bearer token verification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Expected `iss` claim
    #[serde(default)]
    pub issuer: String,

    /// Expected `aud` claim
    #[serde(default)]
    pub audience: String,

    /// Key set URL; defaults to `<issuer>.well-known/jwks.json`
    #[serde(default)]
    pub jwks_url: Option<String>,

    /// How long a fetched key set stays fresh (seconds)
    #[serde(default = "default_key_cache_ttl")]
    pub key_cache_ttl_seconds: u64,

    /// Clock skew tolerated for `exp` and `nbf` (seconds)
    #[serde(default = "default_leeway")]
    pub leeway_seconds: u64,
}

fn default_key_cache_ttl() -> u64 {
    600
}

fn default_leeway() -> u64 {
    30
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            issuer: String::new(),
            audience: String::new(),
            jwks_url: None,
            key_cache_ttl_seconds: default_key_cache_ttl(),
            leeway_seconds: default_leeway(),
        }
    }
}

impl AuthConfig {
    /// Issuer with a guaranteed trailing slash
    pub fn normalized_issuer(&self) -> String {
        if self.issuer.ends_with('/') {
            self.issuer.clone()
        } else {
            format!("{}/", self.issuer)
        }
    }

    /// Key set URL, derived from the issuer when not configured
    pub fn resolved_jwks_url(&self) -> String {
        self.jwks_url
            .clone()
            .unwrap_or_else(|| format!("{}.well-known/jwks.json", self.normalized_issuer()))
    }
}

/// Knowledge retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    /// Whether retrieved guidance is added to generation payloads
    #[serde(default = "default_knowledge_enabled")]
    pub enabled: bool,

    /// Maximum number of guideline documents per payload
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

fn default_knowledge_enabled() -> bool {
    true
}

fn default_max_results() -> usize {
    3
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            enabled: default_knowledge_enabled(),
            max_results: default_max_results(),
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default_config()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn default_config() -> Self {
        Self {
            provider: ProviderConfig {
                provider_type: "openai".to_string(),
                openai: OpenAiConfig::default(),
                ollama: OllamaConfig::default(),
            },
            generation: GenerationConfig::default(),
            storage: StorageConfig::default(),
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            knowledge: KnowledgeConfig::default(),
        }
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| SeoAssistantError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| SeoAssistantError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(provider_type) = std::env::var("SEO_ASSISTANT_PROVIDER") {
            self.provider.provider_type = provider_type;
        }

        if let Ok(model) = std::env::var("SEO_ASSISTANT_OPENAI_MODEL") {
            self.provider.openai.model = model;
        }

        if let Ok(api_base) = std::env::var("SEO_ASSISTANT_OPENAI_API_BASE") {
            self.provider.openai.api_base = api_base;
        }

        // The conventional variable is honored when nothing more specific is set
        if let Ok(api_key) = std::env::var("SEO_ASSISTANT_OPENAI_API_KEY")
            .or_else(|_| std::env::var("OPENAI_API_KEY"))
        {
            self.provider.openai.api_key = Some(api_key);
        }

        if let Ok(host) = std::env::var("SEO_ASSISTANT_OLLAMA_HOST") {
            self.provider.ollama.host = host;
        }

        if let Ok(model) = std::env::var("SEO_ASSISTANT_OLLAMA_MODEL") {
            self.provider.ollama.model = model;
        }

        if let Ok(timeout) = std::env::var("SEO_ASSISTANT_GENERATION_TIMEOUT_SECONDS") {
            match timeout.parse() {
                Ok(value) => self.generation.timeout_seconds = value,
                Err(_) => tracing::warn!(
                    "Invalid SEO_ASSISTANT_GENERATION_TIMEOUT_SECONDS: {}",
                    timeout
                ),
            }
        }

        if let Ok(db_path) = std::env::var("SEO_ASSISTANT_DB") {
            tracing::debug!(db_path = %db_path, "Env override: SEO_ASSISTANT_DB");
            self.storage.database_path = Some(PathBuf::from(db_path));
        }

        if let Ok(host) = std::env::var("SEO_ASSISTANT_HOST") {
            self.server.host = host;
        }

        if let Ok(port) = std::env::var("SEO_ASSISTANT_PORT") {
            match port.parse() {
                Ok(value) => self.server.port = value,
                Err(_) => tracing::warn!("Invalid SEO_ASSISTANT_PORT: {}", port),
            }
        }

        if let Ok(issuer) = std::env::var("SEO_ASSISTANT_AUTH_ISSUER") {
            self.auth.issuer = issuer;
        }

        if let Ok(audience) = std::env::var("SEO_ASSISTANT_AUTH_AUDIENCE") {
            self.auth.audience = audience;
        }

        if let Ok(jwks_url) = std::env::var("SEO_ASSISTANT_JWKS_URL") {
            self.auth.jwks_url = Some(jwks_url);
        }

        if let Ok(enabled) = std::env::var("SEO_ASSISTANT_KNOWLEDGE_ENABLED") {
            match enabled.parse::<bool>() {
                Ok(v) => {
                    self.knowledge.enabled = v;
                    tracing::debug!(enabled = v, "Env override: SEO_ASSISTANT_KNOWLEDGE_ENABLED");
                }
                Err(_) => {
                    tracing::warn!(
                        "Invalid value for SEO_ASSISTANT_KNOWLEDGE_ENABLED: {}",
                        enabled
                    );
                }
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }

        if let Some(db_path) = &cli.storage_path {
            tracing::info!("Using storage DB override from CLI: {}", db_path);
            self.storage.database_path = Some(PathBuf::from(db_path));
        }
    }

    /// Validate the configuration
    ///
    /// Ensures all configuration values are within acceptable ranges
    /// and that required fields are properly set.
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        if self.provider.provider_type.is_empty() {
            return Err(
                SeoAssistantError::Config("Provider type cannot be empty".to_string()).into(),
            );
        }

        let valid_providers = ["openai", "ollama", "fake"];
        if !valid_providers.contains(&self.provider.provider_type.as_str()) {
            return Err(SeoAssistantError::Config(format!(
                "Invalid provider type: {}. Must be one of: {}",
                self.provider.provider_type,
                valid_providers.join(", ")
            ))
            .into());
        }

        if url::Url::parse(&self.provider.openai.api_base).is_err() {
            return Err(SeoAssistantError::Config(format!(
                "provider.openai.api_base is not a valid URL: {}",
                self.provider.openai.api_base
            ))
            .into());
        }

        if url::Url::parse(&self.provider.ollama.host).is_err() {
            return Err(SeoAssistantError::Config(format!(
                "provider.ollama.host is not a valid URL: {}",
                self.provider.ollama.host
            ))
            .into());
        }

        if self.generation.timeout_seconds == 0 {
            return Err(SeoAssistantError::Config(
                "generation.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.generation.timeout_seconds > 3600 {
            return Err(SeoAssistantError::Config(
                "generation.timeout_seconds must be less than or equal to 3600".to_string(),
            )
            .into());
        }

        if self.generation.max_error_length == 0 {
            return Err(SeoAssistantError::Config(
                "generation.max_error_length must be greater than 0".to_string(),
            )
            .into());
        }

        let constraints = &self.generation.constraints;
        if constraints.title_max == 0 {
            return Err(SeoAssistantError::Config(
                "generation.constraints.title_max must be greater than 0".to_string(),
            )
            .into());
        }

        if constraints.meta_description_min > constraints.meta_description_max {
            return Err(SeoAssistantError::Config(
                "generation.constraints.meta_description_min must not exceed meta_description_max"
                    .to_string(),
            )
            .into());
        }

        if self.auth.key_cache_ttl_seconds == 0 {
            return Err(SeoAssistantError::Config(
                "auth.key_cache_ttl_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.knowledge.enabled && self.knowledge.max_results == 0 {
            return Err(SeoAssistantError::Config(
                "knowledge.max_results must be greater than 0 when knowledge is enabled"
                    .to_string(),
            )
            .into());
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}
