//! `switchyard providers`: probe every configured provider.

use std::path::PathBuf;
use switchyard_providers::ProviderHealthSnapshot;

use crate::wiring::{build_router, load_config};

pub async fn run(explicit: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(explicit).map_err(|e| format!("Failed to load config: {e}"))?;
    let router = build_router(&config)?;

    let healthy = router.registry().init().await;
    let snapshots = router.registry().snapshots();

    println!("Providers ({healthy}/{} healthy)", snapshots.len());
    println!("{}", "=".repeat(24));
    for line in table(&snapshots) {
        println!("  {line}");
    }
    Ok(())
}

fn table(snapshots: &[ProviderHealthSnapshot]) -> Vec<String> {
    let mut lines = vec![format!(
        "{:<16} {:<10} {:<24} {:<6} {:<8}",
        "ID", "TIER", "MODEL", "TOOLS", "STATE"
    )];
    for s in snapshots {
        let mut line = format!(
            "{:<16} {:<10} {:<24} {:<6} {:<8}",
            s.id,
            s.tier.to_string(),
            s.model,
            if s.supports_tools { "yes" } else { "no" },
            s.state.to_string()
        );
        if let Some(error) = &s.last_error {
            line.push_str(&format!(" {error}"));
        }
        lines.push(line.trim_end().to_string());
    }
    lines
}
