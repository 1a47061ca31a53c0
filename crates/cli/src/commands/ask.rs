//! `switchyard ask`: route a single message.

use std::path::PathBuf;
use switchyard_core::tier::RouteTier;
use switchyard_router::RouteOptions;

use super::provenance;
use crate::wiring::{build_router, load_config};

pub struct AskArgs {
    pub message: String,
    pub admin: bool,
    pub intent: Option<String>,
    pub tier: Option<RouteTier>,
    pub system: Option<String>,
}

impl AskArgs {
    fn options(&self) -> RouteOptions {
        RouteOptions {
            force_tier: self.tier,
            is_admin: self.admin,
            custom_system_prompt: self.system.clone(),
            intent: self.intent.clone(),
        }
    }
}

pub async fn run(
    explicit: Option<PathBuf>,
    args: AskArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(explicit).map_err(|e| format!("Failed to load config: {e}"))?;
    let router = build_router(&config)?;
    router.init().await;

    let outcome = router.route(&args.message, &[], args.options()).await;
    println!("{}", outcome.content);
    eprintln!("{}", provenance(&outcome));

    router.shutdown();
    Ok(())
}
