//! Bounded, TTL-aware response cache.
//!
//! Keys are normalized before use, so "What are your HOURS?" and
//! "what are your hours" share an entry. Expired entries are removed when
//! read; when full, the least-recently-used entry makes room.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use switchyard_config::CacheConfig;
use tokio::time::Instant;
use tracing::trace;

/// Intents whose answers go stale or carry sensitive state.
const UNCACHEABLE_INTENTS: &[&str] = &["payment", "complaint", "emergency", "cancel", "refund"];

/// Static, informational intents.
const LONG_TTL_INTENTS: &[&str] = &[
    "faq", "info", "hours", "opening_hours", "location", "address", "directions",
    "contact", "menu", "services", "pricing", "policy", "about",
];

/// Conversational intents whose answers shift quickly.
const SHORT_TTL_INTENTS: &[&str] = &[
    "greeting", "smalltalk", "small_talk", "chitchat", "thanks", "farewell",
    "availability", "status", "recommendation",
];

/// Whether and for how long a response may be cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub cache: bool,
    pub ttl: Duration,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
}

/// Case-fold, strip punctuation, collapse whitespace.
pub fn normalize_key(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

struct Entry<V> {
    value: V,
    created_at: Instant,
    expires_at: Instant,
    last_used: u64,
}

struct Inner<V> {
    entries: HashMap<String, Entry<V>>,
    /// last_used tick -> key, oldest first
    recency: BTreeMap<u64, String>,
    tick: u64,
    stats: CacheStats,
}

impl<V> Inner<V> {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn remove(&mut self, key: &str) {
        if let Some(entry) = self.entries.remove(key) {
            self.recency.remove(&entry.last_used);
        }
    }
}

/// Bounded response cache with per-entry TTL and exact LRU eviction.
///
/// Not `moka`, whose eviction is approximate and whose expiry ignores
/// tokio's clock.
pub struct ResponseCache<V> {
    inner: Mutex<Inner<V>>,
    max_entries: usize,
    long_ttl: Duration,
    short_ttl: Duration,
    default_ttl: Duration,
}

impl<V: Clone> ResponseCache<V> {
    /// A cache with the default TTL tiers (1h, 5m, 15m).
    pub fn new(max_entries: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                recency: BTreeMap::new(),
                tick: 0,
                stats: CacheStats::default(),
            }),
            max_entries: max_entries.max(1),
            long_ttl: Duration::from_secs(3600),
            short_ttl: Duration::from_secs(300),
            default_ttl: Duration::from_secs(900),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        let mut cache = Self::new(config.max_entries);
        cache.long_ttl = Duration::from_secs(config.long_ttl_secs);
        cache.short_ttl = Duration::from_secs(config.short_ttl_secs);
        cache.default_ttl = Duration::from_secs(config.default_ttl_secs);
        cache
    }

    fn lock(&self) -> MutexGuard<'_, Inner<V>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Look up `key`, refreshing its recency on a hit.
    pub fn get(&self, key: &str) -> Option<V> {
        let key = normalize_key(key);
        let mut inner = self.lock();
        let now = Instant::now();

        let Some(entry) = inner.entries.get(&key) else {
            inner.stats.misses += 1;
            return None;
        };

        if entry.expires_at <= now {
            trace!(
                key = %key,
                age_ms = now.duration_since(entry.created_at).as_millis() as u64,
                "Cache entry expired"
            );
            inner.remove(&key);
            inner.stats.expirations += 1;
            inner.stats.misses += 1;
            return None;
        }

        let old_tick = entry.last_used;
        let tick = inner.next_tick();
        inner.recency.remove(&old_tick);
        inner.recency.insert(tick, key.clone());
        let entry = inner.entries.get_mut(&key)?;
        entry.last_used = tick;
        let value = entry.value.clone();
        inner.stats.hits += 1;
        Some(value)
    }

    /// Store `value` under `key` for `ttl`, evicting the least recently used
    /// entry if the cache is full.
    pub fn set(&self, key: &str, value: V, ttl: Duration) {
        let key = normalize_key(key);
        if key.is_empty() {
            return;
        }

        let mut inner = self.lock();
        inner.remove(&key);

        if inner.entries.len() >= self.max_entries {
            let oldest = inner.recency.first_key_value().map(|(_, k)| k.clone());
            if let Some(oldest) = oldest {
                inner.remove(&oldest);
                inner.stats.evictions += 1;
            }
        }

        let now = Instant::now();
        let tick = inner.next_tick();
        inner.recency.insert(tick, key.clone());
        inner.entries.insert(
            key,
            Entry {
                value,
                created_at: now,
                expires_at: now + ttl,
                last_used: tick,
            },
        );
    }

    /// Caching policy for a request's intent.
    ///
    /// Sensitive intents are never cached. Requests without an intent get
    /// the default TTL.
    pub fn should_cache(&self, intent: Option<&str>) -> CachePolicy {
        let Some(intent) = intent.map(|i| i.trim().to_lowercase()) else {
            return CachePolicy { cache: true, ttl: self.default_ttl };
        };

        if UNCACHEABLE_INTENTS.iter().any(|s| intent.contains(s)) {
            return CachePolicy { cache: false, ttl: Duration::ZERO };
        }

        let ttl = if LONG_TTL_INTENTS.contains(&intent.as_str()) {
            self.long_ttl
        } else if SHORT_TTL_INTENTS.contains(&intent.as_str()) {
            self.short_ttl
        } else {
            self.default_ttl
        };
        CachePolicy { cache: true, ttl }
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        CacheStats {
            entries: inner.entries.len(),
            ..inner.stats
        }
    }
}
