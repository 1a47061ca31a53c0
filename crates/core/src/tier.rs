//! Tier vocabulary shared by the classifier, the rotation engine and the
//! orchestrator.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The capability tier a request is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteTier {
    /// Cheap local inference, no tools.
    Local,
    /// Cloud providers, tools attached.
    Cloud,
}

impl RouteTier {
    /// The provider tier a chain walk starts from.
    pub fn entry_tier(self) -> ProviderTier {
        match self {
            RouteTier::Local => ProviderTier::Local,
            RouteTier::Cloud => ProviderTier::Primary,
        }
    }
}

impl fmt::Display for RouteTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteTier::Local => write!(f, "local"),
            RouteTier::Cloud => write!(f, "cloud"),
        }
    }
}

impl FromStr for RouteTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(RouteTier::Local),
            "cloud" => Ok(RouteTier::Cloud),
            other => Err(format!("unknown route tier '{other}' (expected local or cloud)")),
        }
    }
}

/// The priority class a configured provider belongs to.
///
/// Declaration order is the canonical walk order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderTier {
    Primary,
    Secondary,
    Local,
}

impl ProviderTier {
    pub const ALL: [ProviderTier; 3] = [
        ProviderTier::Primary,
        ProviderTier::Secondary,
        ProviderTier::Local,
    ];

    /// Tiers in walk order when starting from `self`: the entry tier first,
    /// then the remaining tiers in canonical order.
    pub fn walk_from(self) -> Vec<ProviderTier> {
        let mut order = vec![self];
        order.extend(Self::ALL.into_iter().filter(|t| *t != self));
        order
    }
}

impl fmt::Display for ProviderTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderTier::Primary => write!(f, "primary"),
            ProviderTier::Secondary => write!(f, "secondary"),
            ProviderTier::Local => write!(f, "local"),
        }
    }
}

/// Where a route() answer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeTier {
    /// The first candidate in the walk answered.
    Primary,
    /// A later candidate answered after skips or failures.
    Fallback,
    /// No provider answered; static content was returned.
    Emergency,
}

impl fmt::Display for OutcomeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeTier::Primary => write!(f, "primary"),
            OutcomeTier::Fallback => write!(f, "fallback"),
            OutcomeTier::Emergency => write!(f, "emergency"),
        }
    }
}
