//! Build a [`ProviderRegistry`] from configuration.

use std::sync::Arc;
use std::time::Duration;
use switchyard_config::{AppConfig, ConfigError, ProviderConfig};
use switchyard_core::event::EventBus;
use tracing::{info, warn};

use crate::health::ProviderDescriptor;
use crate::openai_compat::OpenAiCompatProvider;
use crate::registry::ProviderRegistry;
use crate::tool_loop::ToolLoop;

/// Build the registry described by `config`, publishing health and tool
/// events on `events`.
///
/// Providers keep their configured order. A cloud provider without a key is
/// still registered; its first call fails with an authentication error and
/// it drops out of the walk until a probe succeeds.
pub fn build_registry(
    config: &AppConfig,
    events: Arc<EventBus>,
) -> Result<ProviderRegistry, ConfigError> {
    config.validate()?;

    let tool_loop = ToolLoop::new(config.router.max_tool_rounds, config.router.tool_concurrency)
        .with_events(events.clone());

    let mut registry = ProviderRegistry::new()
        .with_tool_loop(tool_loop)
        .with_failure_threshold(config.health.failure_threshold)
        .with_probe_timeout(Duration::from_secs(config.health.probe_timeout_secs))
        .with_events(events);

    for provider in &config.providers {
        registry = registry.with_provider(descriptor(provider)?);
    }

    info!(providers = registry.len(), "Provider registry built");
    Ok(registry)
}

fn descriptor(config: &ProviderConfig) -> Result<ProviderDescriptor, ConfigError> {
    let base_url = match &config.api_url {
        Some(url) => url.clone(),
        None => default_base_url(&config.kind).ok_or_else(|| {
            ConfigError::ValidationError(format!(
                "provider '{}' has unknown kind '{}' and no api_url",
                config.id, config.kind
            ))
        })?,
    };

    let api_key = match (&config.api_key, is_keyless(&config.kind)) {
        (Some(key), _) => key.clone(),
        (None, true) => config.kind.clone(),
        (None, false) => {
            warn!(
                provider = %config.id,
                env = %config.api_key_env(),
                "No API key configured for provider"
            );
            String::new()
        }
    };

    let backend = OpenAiCompatProvider::new(&config.id, base_url, api_key);

    Ok(
        ProviderDescriptor::new(&config.id, config.tier, &config.model, Arc::new(backend))
            .with_tools(config.supports_tools)
            .with_timeout(Duration::from_secs(config.timeout_secs)),
    )
}

/// Local runtimes accept any bearer token.
fn is_keyless(kind: &str) -> bool {
    matches!(kind, "ollama" | "vllm" | "llamacpp" | "llama.cpp")
}

/// Get the default base URL for a known provider kind.
fn default_base_url(kind: &str) -> Option<String> {
    let url = match kind {
        "openrouter" => "https://openrouter.ai/api/v1",
        "openai" => "https://api.openai.com/v1",
        "ollama" => "http://localhost:11434/v1",
        "deepseek" => "https://api.deepseek.com/v1",
        "groq" => "https://api.groq.com/openai/v1",
        "together" => "https://api.together.xyz/v1",
        "fireworks" => "https://api.fireworks.ai/inference/v1",
        "vllm" => "http://localhost:8000/v1",
        "llamacpp" | "llama.cpp" => "http://localhost:8080/v1",
        _ => return None,
    };
    Some(url.to_string())
}
