//! `switchyard init`: write a default configuration file.

use std::path::{Path, PathBuf};
use switchyard_config::AppConfig;

use crate::wiring::config_path;

pub fn run(explicit: Option<PathBuf>, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let path = config_path(explicit);
    write_default(&path, force)?;
    println!("Wrote {}", path.display());
    println!();
    println!("  API keys are read from <KIND>_API_KEY (e.g. OPENROUTER_API_KEY)");
    println!("  or SWITCHYARD_API_KEY when a provider has no api_key of its own.");
    Ok(())
}

fn write_default(path: &Path, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() && !force {
        return Err(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )
        .into());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, AppConfig::default_toml())?;
    Ok(())
}
