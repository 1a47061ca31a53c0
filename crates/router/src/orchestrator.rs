//! The routing pipeline: Receive → Route → Augment → Call → Respond.
//!
//! [`Router::route`] always resolves to exactly one [`RouteOutcome`] with
//! non-empty content. Exhaustion, collaborator failures and panics inside
//! collaborators all end in either a degraded prompt or the emergency
//! response; nothing propagates to the caller.

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use switchyard_config::{AppConfig, EmergencyConfig};
use switchyard_core::error::ExhaustedError;
use switchyard_core::event::{DomainEvent, EventBus};
use switchyard_core::message::Message;
use switchyard_core::provider::Usage;
use switchyard_core::tier::{OutcomeTier, RouteTier};
use switchyard_core::tool::{ToolContext, ToolExecutor};
use switchyard_providers::{ExecutionRequest, ProviderRegistry};
use tracing::{debug, error, info, warn};

use crate::cache::{CachePolicy, ResponseCache};
use crate::classifier::MessageClassifier;
use crate::prompt::PromptComposer;
use crate::stats::{RequestCounters, RouterStats};

/// Per-call options.
#[derive(Debug, Clone, Default)]
pub struct RouteOptions {
    /// Skip classification; privileged callers still go to the cloud
    pub force_tier: Option<RouteTier>,
    pub is_admin: bool,
    /// Appended after every other prompt segment
    pub custom_system_prompt: Option<String>,
    /// Coarse label used only for the caching decision
    pub intent: Option<String>,
}

impl RouteOptions {
    pub fn admin() -> Self {
        Self {
            is_admin: true,
            ..Self::default()
        }
    }

    pub fn with_intent(mut self, intent: impl Into<String>) -> Self {
        self.intent = Some(intent.into());
        self
    }

    pub fn with_tier(mut self, tier: RouteTier) -> Self {
        self.force_tier = Some(tier);
        self
    }
}

/// The single result of a `route()` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteOutcome {
    pub content: String,
    pub tier: OutcomeTier,
    /// `None` for emergency responses
    pub provider: Option<String>,
    pub usage: Option<Usage>,
    /// Served from the response cache
    pub cached: bool,
}

/// Why no provider answered.
enum Failure {
    Exhausted(ExhaustedError),
    Panicked(String),
}

pub struct Router {
    classifier: MessageClassifier,
    cache: ResponseCache<RouteOutcome>,
    cache_enabled: bool,
    composer: PromptComposer,
    registry: Arc<ProviderRegistry>,
    tools: Option<Arc<dyn ToolExecutor>>,
    emergency: EmergencyConfig,
    events: Arc<EventBus>,
    counters: RequestCounters,
    max_tokens: Option<u32>,
    temperature: f32,
    recheck_interval: Duration,
}

impl Router {
    pub fn new(registry: Arc<ProviderRegistry>, composer: PromptComposer) -> Self {
        Self {
            classifier: MessageClassifier::default(),
            cache: ResponseCache::new(500),
            cache_enabled: true,
            composer,
            registry,
            tools: None,
            emergency: EmergencyConfig::default(),
            events: Arc::new(EventBus::default()),
            counters: RequestCounters::default(),
            max_tokens: None,
            temperature: 0.7,
            recheck_interval: Duration::from_secs(300),
        }
    }

    /// Wire a router from configuration. `events` should be the bus the
    /// registry was built with so every event lands in one place.
    pub fn from_config(
        config: &AppConfig,
        registry: Arc<ProviderRegistry>,
        composer: PromptComposer,
        events: Arc<EventBus>,
    ) -> Self {
        let mut router = Self::new(registry, composer)
            .with_classifier(MessageClassifier::from_config(&config.classifier))
            .with_cache(ResponseCache::from_config(&config.cache))
            .with_emergency(config.emergency.clone())
            .with_events(events);
        router.cache_enabled = config.cache.enabled;
        router.max_tokens = Some(config.router.max_tokens);
        router.temperature = config.router.temperature;
        router.recheck_interval = Duration::from_secs(config.health.recheck_interval_secs);
        router
    }

    pub fn with_classifier(mut self, classifier: MessageClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_cache(mut self, cache: ResponseCache<RouteOutcome>) -> Self {
        self.cache = cache;
        self
    }

    pub fn without_cache(mut self) -> Self {
        self.cache_enabled = false;
        self
    }

    /// Tools offered to cloud-tier providers.
    pub fn with_tools(mut self, executor: Arc<dyn ToolExecutor>) -> Self {
        self.tools = Some(executor);
        self
    }

    pub fn with_emergency(mut self, emergency: EmergencyConfig) -> Self {
        self.emergency = emergency;
        self
    }

    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = events;
        self
    }

    pub fn with_recheck_interval(mut self, interval: Duration) -> Self {
        self.recheck_interval = interval;
        self
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    /// Probe every provider and start the periodic recheck.
    pub async fn init(&self) {
        let healthy = self.registry.init().await;
        if healthy == 0 {
            warn!("No provider passed its initial probe; requests will get the emergency response until one recovers");
        }
        self.registry.start_recheck(self.recheck_interval);
    }

    /// Stop background work.
    pub fn shutdown(&self) {
        self.registry.stop_recheck();
        info!("Router shut down");
    }

    /// Re-probe dead providers now. Returns how many recovered.
    pub async fn recheck_providers(&self) -> usize {
        self.registry.recheck_all().await
    }

    pub fn stats(&self) -> RouterStats {
        RouterStats {
            requests: self.counters.snapshot(),
            cache: self.cache.stats(),
            providers: self.registry.snapshots(),
        }
    }

    /// Answer one user message. Never fails.
    pub async fn route(
        &self,
        user_message: &str,
        history: &[Message],
        options: RouteOptions,
    ) -> RouteOutcome {
        let started = Instant::now();

        let pipeline = AssertUnwindSafe(self.run_pipeline(user_message, history, &options));
        let outcome = match pipeline.catch_unwind().await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(exhausted)) => self.emergency(options.is_admin, Failure::Exhausted(exhausted)),
            Err(panic) => {
                let message = panic_message(&*panic);
                error!(panic = %message, "Routing pipeline panicked");
                self.emergency(options.is_admin, Failure::Panicked(message))
            }
        };

        self.counters.record(outcome.tier, outcome.cached);
        let duration_ms = started.elapsed().as_millis() as u64;
        info!(
            tier = %outcome.tier,
            provider = outcome.provider.as_deref().unwrap_or("-"),
            cached = outcome.cached,
            duration_ms,
            "Request routed"
        );
        self.events.publish(DomainEvent::RouteCompleted {
            tier: outcome.tier.to_string(),
            provider: outcome.provider.clone(),
            cached: outcome.cached,
            duration_ms,
            timestamp: chrono::Utc::now(),
        });

        outcome
    }

    async fn run_pipeline(
        &self,
        user_message: &str,
        history: &[Message],
        options: &RouteOptions,
    ) -> std::result::Result<RouteOutcome, ExhaustedError> {
        // Receive
        let policy = self.cache_policy(options);
        if policy.cache {
            if let Some(hit) = self.cache.get(user_message) {
                debug!("Cache hit");
                return Ok(RouteOutcome { cached: true, ..hit });
            }
        }

        // Route
        let tier = self.effective_tier(user_message, options);

        // Augment
        let custom = options.custom_system_prompt.as_deref();
        let system_prompt = match self.composer.compose(options.is_admin, custom).await {
            Ok(prompt) => prompt,
            Err(e) => {
                warn!(source = %e.source_name, error = %e.reason, "Context source failed, using minimal prompt");
                self.events.publish(DomainEvent::AugmentationDegraded {
                    source_name: e.source_name.clone(),
                    error_message: e.reason.clone(),
                    timestamp: chrono::Utc::now(),
                });
                self.composer.minimal(options.is_admin, custom)
            }
        };

        // Call
        let mut messages = history.to_vec();
        messages.push(Message::user(user_message));
        let mut request = ExecutionRequest::new(tier, system_prompt, messages);
        request.max_tokens = self.max_tokens;
        request.temperature = self.temperature;

        let tool_context = ToolContext {
            is_admin: options.is_admin,
        };
        if let (RouteTier::Cloud, Some(executor)) = (tier, &self.tools) {
            let definitions = executor.definitions(tool_context);
            if !definitions.is_empty() {
                request = request.with_tools(definitions, executor.clone(), tool_context);
            }
        }

        let result = self.registry.execute(&request).await?;

        // Respond
        let outcome = RouteOutcome {
            content: result.content,
            tier: result.tier,
            provider: Some(result.provider_id),
            usage: Some(result.usage),
            cached: false,
        };
        if policy.cache {
            self.cache.set(user_message, outcome.clone(), policy.ttl);
        }
        Ok(outcome)
    }

    /// Privileged callers bypass the cache entirely.
    fn cache_policy(&self, options: &RouteOptions) -> CachePolicy {
        if !self.cache_enabled || options.is_admin {
            return CachePolicy {
                cache: false,
                ttl: Duration::ZERO,
            };
        }
        self.cache.should_cache(options.intent.as_deref())
    }

    /// Privileged callers always go to the cloud.
    fn effective_tier(&self, user_message: &str, options: &RouteOptions) -> RouteTier {
        if options.is_admin {
            return RouteTier::Cloud;
        }
        options
            .force_tier
            .unwrap_or_else(|| self.classifier.classify(user_message))
    }

    fn emergency(&self, is_admin: bool, failure: Failure) -> RouteOutcome {
        let content = if is_admin {
            diagnostic(&failure)
        } else {
            match &self.emergency.contact_hint {
                Some(hint) if !hint.trim().is_empty() => {
                    format!("{}\n\n{}", self.emergency.user_message.trim(), hint.trim())
                }
                _ => self.emergency.user_message.trim().to_string(),
            }
        };

        RouteOutcome {
            content: if content.is_empty() {
                EmergencyConfig::default().user_message
            } else {
                content
            },
            tier: OutcomeTier::Emergency,
            provider: None,
            usage: None,
            cached: false,
        }
    }
}

/// Summary for administrators, who are expected to act on it.
fn diagnostic(failure: &Failure) -> String {
    match failure {
        Failure::Exhausted(exhausted) => {
            let mut lines = vec![format!("[Router] {exhausted}.")];
            lines.extend(
                exhausted
                    .attempted
                    .iter()
                    .map(|(provider, e)| format!("- {provider}: {e}")),
            );
            lines.extend(
                exhausted
                    .skipped
                    .iter()
                    .map(|provider| format!("- {provider}: skipped (dead, awaiting recheck)")),
            );
            if exhausted.attempted.is_empty() && exhausted.skipped.is_empty() {
                lines.push("- no providers are configured".into());
            }
            lines.join("\n")
        }
        Failure::Panicked(message) => {
            format!("[Router] Routing failed unexpectedly: {message}")
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".into()
    }
}
