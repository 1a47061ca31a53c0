//! Request counters and the introspection snapshot.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use switchyard_core::tier::OutcomeTier;
use switchyard_providers::ProviderHealthSnapshot;

use crate::cache::CacheStats;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestCounts {
    pub total: u64,
    pub primary: u64,
    pub fallback: u64,
    pub emergency: u64,
    pub cache_hit: u64,
}

/// What `Router::stats` reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterStats {
    pub requests: RequestCounts,
    pub cache: CacheStats,
    pub providers: Vec<ProviderHealthSnapshot>,
}

#[derive(Debug, Default)]
pub(crate) struct RequestCounters {
    total: AtomicU64,
    primary: AtomicU64,
    fallback: AtomicU64,
    emergency: AtomicU64,
    cache_hit: AtomicU64,
}

impl RequestCounters {
    pub(crate) fn record(&self, tier: OutcomeTier, cached: bool) {
        self.total.fetch_add(1, Ordering::Relaxed);
        let counter = match (cached, tier) {
            (true, _) => &self.cache_hit,
            (false, OutcomeTier::Primary) => &self.primary,
            (false, OutcomeTier::Fallback) => &self.fallback,
            (false, OutcomeTier::Emergency) => &self.emergency,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> RequestCounts {
        RequestCounts {
            total: self.total.load(Ordering::Relaxed),
            primary: self.primary.load(Ordering::Relaxed),
            fallback: self.fallback.load(Ordering::Relaxed),
            emergency: self.emergency.load(Ordering::Relaxed),
            cache_hit: self.cache_hit.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cached_outcomes_count_as_cache_hits_only() {
        let counters = RequestCounters::default();
        counters.record(OutcomeTier::Primary, false);
        counters.record(OutcomeTier::Fallback, false);
        counters.record(OutcomeTier::Primary, true);
        counters.record(OutcomeTier::Emergency, false);

        assert_eq!(
            counters.snapshot(),
            RequestCounts {
                total: 4,
                primary: 1,
                fallback: 1,
                emergency: 1,
                cache_hit: 1,
            }
        );
    }
}
