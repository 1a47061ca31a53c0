//! `switchyard status`: configuration summary and provider list.

use std::path::PathBuf;
use switchyard_config::AppConfig;

use crate::wiring::{build_router, config_path, load_config};

pub async fn run(explicit: Option<PathBuf>, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let path = config_path(explicit.clone());
    let config = load_config(explicit).map_err(|e| format!("Failed to load config: {e}"))?;
    let router = build_router(&config)?;

    if json {
        let report = serde_json::json!({
            "config_file": path.display().to_string(),
            "providers": router.registry().snapshots(),
            "health": &config.health,
            "cache": &config.cache,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Switchyard Status");
    println!("=================");
    for line in summary(&config) {
        println!("  {line}");
    }

    if path.exists() {
        println!("\n  Config file: {}", path.display());
    } else {
        println!("\n  No config file at {}; run `switchyard init`", path.display());
    }
    Ok(())
}

fn summary(config: &AppConfig) -> Vec<String> {
    let providers = config
        .providers
        .iter()
        .map(|p| format!("{} ({})", p.id, p.tier))
        .collect::<Vec<_>>()
        .join(", ");
    vec![
        format!("Identity:     {}", config.identity.name),
        format!("Providers:    {providers}"),
        format!(
            "Classifier:   {} keywords, length threshold {}",
            config.classifier.cloud_keywords.len(),
            config.classifier.long_message_threshold
        ),
        format!(
            "Health:       failure threshold {}, recheck every {}s",
            config.health.failure_threshold, config.health.recheck_interval_secs
        ),
        format!(
            "Cache:        {} (max {} entries)",
            if config.cache.enabled { "enabled" } else { "disabled" },
            config.cache.max_entries
        ),
        format!(
            "Tool loop:    {} rounds, {} concurrent",
            config.router.max_tool_rounds, config.router.tool_concurrency
        ),
    ]
}
