pub mod ask;
pub mod chat;
pub mod init;
pub mod providers;
pub mod status;

use switchyard_router::RouteOutcome;

/// One-line provenance footer printed after an answer.
pub(crate) fn provenance(outcome: &RouteOutcome) -> String {
    let mut line = format!("[{}", outcome.tier);
    if let Some(provider) = &outcome.provider {
        line.push_str(&format!(" via {provider}"));
    }
    if outcome.cached {
        line.push_str(", cached");
    }
    if let Some(usage) = &outcome.usage {
        line.push_str(&format!(", {} tokens", usage.total_tokens));
    }
    line.push(']');
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchyard_core::tier::OutcomeTier;

    #[test]
    fn emergency_provenance_has_no_provider() {
        let outcome = RouteOutcome {
            content: "Sorry".into(),
            tier: OutcomeTier::Emergency,
            provider: None,
            usage: None,
            cached: false,
        };
        assert_eq!(provenance(&outcome), "[emergency]");
    }

    #[test]
    fn cached_provenance_names_the_provider() {
        let outcome = RouteOutcome {
            content: "Hi".into(),
            tier: OutcomeTier::Primary,
            provider: Some("openrouter".into()),
            usage: None,
            cached: true,
        };
        assert_eq!(provenance(&outcome), "[primary via openrouter, cached]");
    }
}
