//! Configuration loading, validation, and management for Switchyard.
//!
//! Loads configuration from `~/.switchyard/config.toml` (or the path in
//! `SWITCHYARD_CONFIG`) with environment variable overrides for API keys.
//! Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use switchyard_core::ProviderTier;

/// The root configuration structure.
///
/// Maps directly to `~/.switchyard/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Fallback API key for providers that do not set their own
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Tool loop and request shaping
    #[serde(default)]
    pub router: RouterConfig,

    /// Local/cloud classification
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Provider health thresholds and probe cadence
    #[serde(default)]
    pub health: HealthConfig,

    /// Response cache
    #[serde(default)]
    pub cache: CacheConfig,

    /// Persona and prompt extensions
    #[serde(default)]
    pub identity: IdentityConfig,

    /// Text returned when every provider is exhausted
    #[serde(default)]
    pub emergency: EmergencyConfig,

    /// Ordered provider chain. Order within a tier is the attempt order.
    #[serde(default = "default_providers")]
    pub providers: Vec<ProviderConfig>,
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("router", &self.router)
            .field("classifier", &self.classifier)
            .field("health", &self.health)
            .field("cache", &self.cache)
            .field("identity", &self.identity)
            .field("emergency", &self.emergency)
            .field("providers", &self.providers)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("tier", &self.tier)
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("supports_tools", &self.supports_tools)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Provider rounds per tool-calling loop
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: u32,

    /// Tool calls from one round executed at the same time
    #[serde(default = "default_tool_concurrency")]
    pub tool_concurrency: usize,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_max_tool_rounds() -> u32 {
    3
}
fn default_tool_concurrency() -> usize {
    4
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_temperature() -> f32 {
    0.7
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            max_tool_rounds: default_max_tool_rounds(),
            tool_concurrency: default_tool_concurrency(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Messages longer than this many characters go to the cloud tier
    #[serde(default = "default_long_message_threshold")]
    pub long_message_threshold: usize,

    /// Case-insensitive substrings that force the cloud tier
    #[serde(default = "default_cloud_keywords")]
    pub cloud_keywords: Vec<String>,
}

fn default_long_message_threshold() -> usize {
    300
}

/// Business, analytical, report and generative triggers.
pub const DEFAULT_CLOUD_KEYWORDS: &[&str] = &[
    // business
    "revenue", "earnings", "sales", "profit", "invoice", "budget", "expense",
    "pricing", "customer", "booking", "reservation", "inventory",
    // analytical
    "analy", "compare", "comparison", "forecast", "trend", "statistic",
    "metric", "kpi", "performance", "breakdown",
    // report
    "report", "summary", "summarize", "summarise", "dashboard", "overview",
    // generative; phrased so they do not hit inside everyday words
    "write a", "write an", "write me", "draft a", "draft an", "generate",
    "compose", "translate", "rewrite", "create a", "business plan", "make a plan",
];

fn default_cloud_keywords() -> Vec<String> {
    DEFAULT_CLOUD_KEYWORDS.iter().map(|k| k.to_string()).collect()
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            long_message_threshold: default_long_message_threshold(),
            cloud_keywords: default_cloud_keywords(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    /// Consecutive failures before a provider is degraded; one more makes it dead
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,

    /// How often dead providers are re-probed
    #[serde(default = "default_recheck_interval_secs")]
    pub recheck_interval_secs: u64,
}

fn default_failure_threshold() -> u32 {
    2
}
fn default_probe_timeout_secs() -> u64 {
    10
}
fn default_recheck_interval_secs() -> u64 {
    300
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            probe_timeout_secs: default_probe_timeout_secs(),
            recheck_interval_secs: default_recheck_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// TTL for static/informational intents
    #[serde(default = "default_long_ttl_secs")]
    pub long_ttl_secs: u64,

    /// TTL for conversational/dynamic intents
    #[serde(default = "default_short_ttl_secs")]
    pub short_ttl_secs: u64,

    /// TTL for everything else
    #[serde(default = "default_ttl_secs")]
    pub default_ttl_secs: u64,
}

fn default_max_entries() -> usize {
    500
}
fn default_long_ttl_secs() -> u64 {
    3600
}
fn default_short_ttl_secs() -> u64 {
    300
}
fn default_ttl_secs() -> u64 {
    900
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: default_max_entries(),
            long_ttl_secs: default_long_ttl_secs(),
            short_ttl_secs: default_short_ttl_secs(),
            default_ttl_secs: default_ttl_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    #[serde(default = "default_identity_name")]
    pub name: String,

    /// Identity/persona segment, first in every prompt
    #[serde(default = "default_persona")]
    pub persona: String,

    /// Block appended only for privileged callers
    #[serde(default = "default_privileged_extension")]
    pub privileged_extension: String,

    /// Appended last to every prompt; refines, never replaces, the fixed rules
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_prompt: Option<String>,

    /// Directory holding optional MEMORY.md, SKILLS.md, KNOWLEDGE.md, POLICY.md
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_dir: Option<String>,
}

fn default_identity_name() -> String {
    "Switchyard Assistant".into()
}

fn default_persona() -> String {
    concat!(
        "You are the virtual assistant for this business. ",
        "You are warm, concise and accurate, and you answer in the language the user writes in.",
    )
    .into()
}

fn default_privileged_extension() -> String {
    concat!(
        "You are speaking with an administrator. You may discuss internal figures, ",
        "reports and operational details, and you should use the available tools to ",
        "fetch live data instead of estimating.",
    )
    .into()
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            name: default_identity_name(),
            persona: default_persona(),
            privileged_extension: default_privileged_extension(),
            custom_prompt: None,
            context_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyConfig {
    /// Polite contact-redirect shown to ordinary users during a total outage
    #[serde(default = "default_emergency_message")]
    pub user_message: String,

    /// Optional contact detail appended to the user message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_hint: Option<String>,
}

fn default_emergency_message() -> String {
    concat!(
        "Sorry, I can't answer right now. Please try again in a few minutes, ",
        "or contact our team directly and we'll be glad to help.",
    )
    .into()
}

impl Default for EmergencyConfig {
    fn default() -> Self {
        Self {
            user_message: default_emergency_message(),
            contact_hint: None,
        }
    }
}

/// One backend in the provider chain.
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Unique id used in logs, stats and outcomes
    pub id: String,

    /// Provider family ("openrouter", "openai", "ollama", ...)
    pub kind: String,

    pub tier: ProviderTier,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    pub model: String,

    #[serde(default = "default_true")]
    pub supports_tools: bool,

    /// Per-attempt timeout
    #[serde(default = "default_provider_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_provider_timeout_secs() -> u64 {
    30
}

impl ProviderConfig {
    /// Environment variable consulted for this provider's key, e.g. `OPENROUTER_API_KEY`.
    pub fn api_key_env(&self) -> String {
        let kind: String = self
            .kind
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
            .collect();
        format!("{kind}_API_KEY")
    }
}

fn default_providers() -> Vec<ProviderConfig> {
    vec![
        ProviderConfig {
            id: "openrouter".into(),
            kind: "openrouter".into(),
            tier: ProviderTier::Primary,
            api_key: None,
            api_url: None,
            model: "anthropic/claude-sonnet-4".into(),
            supports_tools: true,
            timeout_secs: default_provider_timeout_secs(),
        },
        ProviderConfig {
            id: "openai".into(),
            kind: "openai".into(),
            tier: ProviderTier::Secondary,
            api_key: None,
            api_url: None,
            model: "gpt-4o-mini".into(),
            supports_tools: true,
            timeout_secs: default_provider_timeout_secs(),
        },
        ProviderConfig {
            id: "ollama".into(),
            kind: "ollama".into(),
            tier: ProviderTier::Local,
            api_key: None,
            api_url: None,
            model: "llama3.2".into(),
            supports_tools: false,
            timeout_secs: 60,
        },
    ]
}

impl AppConfig {
    /// Load configuration from `SWITCHYARD_CONFIG` or the default path.
    ///
    /// API keys are filled from the environment for any provider without one:
    /// - `<KIND>_API_KEY` (e.g. `OPENROUTER_API_KEY`)
    /// - `SWITCHYARD_API_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// [`AppConfig::load`] against an arbitrary variable lookup.
    pub fn load_with(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let config_path = lookup("SWITCHYARD_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|| Self::config_dir().join("config.toml"));
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(lookup);
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Fill missing API keys from an environment lookup.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.api_key.is_none() {
            self.api_key = lookup("SWITCHYARD_API_KEY");
        }
        let fallback = self.api_key.clone();
        for provider in &mut self.providers {
            if provider.api_key.is_none() {
                provider.api_key = lookup(&provider.api_key_env()).or_else(|| fallback.clone());
            }
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".switchyard")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.router.temperature < 0.0 || self.router.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "router.temperature must be between 0.0 and 2.0".into(),
            ));
        }
        if self.router.max_tool_rounds == 0 {
            return Err(ConfigError::ValidationError(
                "router.max_tool_rounds must be at least 1".into(),
            ));
        }
        if self.router.tool_concurrency == 0 {
            return Err(ConfigError::ValidationError(
                "router.tool_concurrency must be at least 1".into(),
            ));
        }
        if self.health.failure_threshold == 0 {
            return Err(ConfigError::ValidationError(
                "health.failure_threshold must be at least 1".into(),
            ));
        }
        if self.cache.max_entries == 0 {
            return Err(ConfigError::ValidationError(
                "cache.max_entries must be at least 1".into(),
            ));
        }

        let mut seen = HashSet::new();
        for provider in &self.providers {
            if provider.id.trim().is_empty() {
                return Err(ConfigError::ValidationError("provider id must not be empty".into()));
            }
            if provider.model.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "provider '{}' has no model",
                    provider.id
                )));
            }
            if !seen.insert(provider.id.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate provider id '{}'",
                    provider.id
                )));
            }
        }

        Ok(())
    }

    /// Generate a default config TOML string (for the `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            router: RouterConfig::default(),
            classifier: ClassifierConfig::default(),
            health: HealthConfig::default(),
            cache: CacheConfig::default(),
            identity: IdentityConfig::default(),
            emergency: EmergencyConfig::default(),
            providers: default_providers(),
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
