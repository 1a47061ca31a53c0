//! Assemble a [`Router`] from configuration.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use switchyard_config::{AppConfig, ConfigError};
use switchyard_core::event::EventBus;
use switchyard_providers::build_registry;
use switchyard_router::{PromptComposer, Router};
use tracing::debug;

use crate::context::{ClockContext, MarkdownFileContext};
use crate::tools::default_tools;

/// Files read from `identity.context_dir`, in prompt order.
const DYNAMIC_FILES: [&str; 3] = ["MEMORY.md", "SKILLS.md", "KNOWLEDGE.md"];
const POLICY_FILE: &str = "POLICY.md";

/// Where the config file lives: `--config`, else `~/.switchyard/config.toml`.
pub fn config_path(explicit: Option<PathBuf>) -> PathBuf {
    explicit.unwrap_or_else(|| AppConfig::config_dir().join("config.toml"))
}

/// Load the file (defaults if absent) and fill API keys from the environment.
pub fn load_config(explicit: Option<PathBuf>) -> Result<AppConfig, ConfigError> {
    let Some(path) = explicit else {
        return AppConfig::load();
    };
    let mut config = AppConfig::load_from(&path)?;
    config.apply_env(|key| std::env::var(key).ok());
    Ok(config)
}

/// The prompt composer: configured identity, a live clock block, and the
/// markdown files of the context directory when one is set.
pub fn composer(config: &AppConfig) -> PromptComposer {
    let mut composer =
        PromptComposer::from_config(&config.identity).with_live(Arc::new(ClockContext::new()));

    if let Some(dir) = config.identity.context_dir.as_deref() {
        let dir = Path::new(dir);
        composer = composer.with_policy(Arc::new(MarkdownFileContext::in_dir(dir, POLICY_FILE)));
        for file in DYNAMIC_FILES {
            composer = composer.with_dynamic(Arc::new(MarkdownFileContext::in_dir(dir, file)));
        }
    }
    composer
}

/// Build a router with every provider, tool and context source attached.
///
/// The router is not initialized; callers decide whether to probe.
pub fn build_router(config: &AppConfig) -> Result<Router, ConfigError> {
    let events = Arc::new(EventBus::default());
    let registry = Arc::new(build_registry(config, events.clone())?);
    let tools = Arc::new(default_tools(registry.clone()));
    debug!(
        providers = registry.len(),
        tools = tools.names().len(),
        context_dir = config.identity.context_dir.as_deref().unwrap_or("-"),
        "Router assembled"
    );

    Ok(Router::from_config(config, registry, composer(config), events).with_tools(tools))
}
