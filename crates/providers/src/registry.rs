//! Provider registry and rotation engine.
//!
//! Holds every configured [`ProviderDescriptor`] in configuration order and
//! walks them for each request: entry tier first, then the remaining tiers
//! in canonical order. Dead providers are skipped but never removed; a
//! background task re-probes them on a fixed interval.

use futures::future::join_all;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use switchyard_core::error::{Disposition, ExhaustedError, ProviderError};
use switchyard_core::event::{DomainEvent, EventBus};
use switchyard_core::message::Message;
use switchyard_core::provider::Usage;
use switchyard_core::tier::{OutcomeTier, ProviderTier, RouteTier};
use switchyard_core::tool::{ToolContext, ToolDefinition, ToolExecutor};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::health::{HealthState, ProviderDescriptor, ProviderHealthSnapshot, Transition};
use crate::tool_loop::{CallSettings, LoopOutcome, ToolInvocation, ToolLoop};

/// Everything the rotation engine needs for one request.
#[derive(Clone)]
pub struct ExecutionRequest {
    /// Tier chosen upstream by the classifier (or forced by the caller)
    pub tier: RouteTier,
    pub system_prompt: String,
    pub messages: Vec<Message>,
    /// Empty means no tools were requested
    pub tools: Vec<ToolDefinition>,
    pub executor: Option<Arc<dyn ToolExecutor>>,
    pub tool_context: ToolContext,
    pub max_tokens: Option<u32>,
    pub temperature: f32,
}

impl ExecutionRequest {
    pub fn new(tier: RouteTier, system_prompt: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            tier,
            system_prompt: system_prompt.into(),
            messages,
            tools: Vec::new(),
            executor: None,
            tool_context: ToolContext::default(),
            max_tokens: None,
            temperature: 0.7,
        }
    }

    pub fn with_tools(
        mut self,
        tools: Vec<ToolDefinition>,
        executor: Arc<dyn ToolExecutor>,
        tool_context: ToolContext,
    ) -> Self {
        self.tools = tools;
        self.executor = Some(executor);
        self.tool_context = tool_context;
        self
    }

    fn wants_tools(&self) -> bool {
        !self.tools.is_empty() && self.executor.is_some()
    }
}

/// The answer plus which provider produced it.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub content: String,
    pub provider_id: String,
    /// `Primary` only when the first candidate in the walk answered
    pub tier: OutcomeTier,
    pub usage: Usage,
    pub rounds: u32,
    pub tool_invocations: Vec<ToolInvocation>,
    pub model: String,
}

/// Result of one provider attempt inside the chain walk.
enum AttemptResult {
    Success(LoopOutcome),
    /// Transient failure; the provider stays eligible below the threshold
    Retryable(ProviderError),
    /// The provider is out until a probe brings it back
    Fatal(ProviderError),
}

impl From<std::result::Result<LoopOutcome, ProviderError>> for AttemptResult {
    fn from(result: std::result::Result<LoopOutcome, ProviderError>) -> Self {
        match result {
            Ok(outcome) => AttemptResult::Success(outcome),
            Err(e) => match e.disposition() {
                Disposition::Retryable => AttemptResult::Retryable(e),
                Disposition::Fatal => AttemptResult::Fatal(e),
            },
        }
    }
}

struct RecheckTask {
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

pub struct ProviderRegistry {
    providers: Vec<Arc<ProviderDescriptor>>,
    tool_loop: ToolLoop,
    failure_threshold: u32,
    probe_timeout: Duration,
    events: Arc<EventBus>,
    recheck: Mutex<Option<RecheckTask>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
            tool_loop: ToolLoop::new(3, 4),
            failure_threshold: 2,
            probe_timeout: Duration::from_secs(10),
            events: Arc::new(EventBus::default()),
            recheck: Mutex::new(None),
        }
    }

    /// Append a provider. Order of registration is walk order within a tier.
    pub fn with_provider(mut self, descriptor: ProviderDescriptor) -> Self {
        self.providers.push(Arc::new(descriptor));
        self
    }

    pub fn with_tool_loop(mut self, tool_loop: ToolLoop) -> Self {
        self.tool_loop = tool_loop;
        self
    }

    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold.max(1);
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = events;
        self
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&ProviderDescriptor> {
        self.providers.iter().find(|d| d.id() == id).map(Arc::as_ref)
    }

    pub fn snapshots(&self) -> Vec<ProviderHealthSnapshot> {
        self.providers.iter().map(|d| d.snapshot()).collect()
    }

    /// Candidates for `tier` in walk order.
    fn walk(&self, tier: RouteTier) -> impl Iterator<Item = &Arc<ProviderDescriptor>> {
        tier.entry_tier()
            .walk_from()
            .into_iter()
            .flat_map(move |t: ProviderTier| self.providers.iter().filter(move |d| d.tier() == t))
    }

    /// Probe every provider concurrently. Returns how many came up healthy.
    pub async fn init(&self) -> usize {
        let probes = self.providers.iter().map(|d| async move {
            let ok = d.probe(self.probe_timeout).await;
            self.note(d, d.record_probe(ok));
            if !ok {
                warn!(provider = %d.id(), "Provider failed initial probe, marked dead");
            }
            ok
        });

        let healthy = join_all(probes).await.into_iter().filter(|ok| *ok).count();
        info!(healthy, total = self.providers.len(), "Provider registry initialized");
        healthy
    }

    /// Re-probe every dead provider. Returns how many recovered.
    pub async fn recheck_all(&self) -> usize {
        let probes = self
            .providers
            .iter()
            .filter(|d| !d.is_available())
            .map(|d| async move {
                let ok = d.probe(self.probe_timeout).await;
                self.note(d, d.record_probe(ok));
                ok
            });

        let recovered = join_all(probes).await.into_iter().filter(|ok| *ok).count();
        debug!(recovered, "Dead providers rechecked");
        recovered
    }

    /// Start re-probing dead providers every `interval`. Replaces any
    /// running recheck task.
    pub fn start_recheck(self: &Arc<Self>, interval: Duration) {
        let (stop, mut stopped) = watch::channel(false);
        let registry: Weak<Self> = Arc::downgrade(self);

        let handle = tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let Some(registry) = registry.upgrade() else { break };
                        registry.recheck_all().await;
                    }
                    changed = stopped.changed() => {
                        if changed.is_err() || *stopped.borrow() {
                            break;
                        }
                    }
                }
            }
            debug!("Recheck task stopped");
        });

        let previous = self
            .recheck
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(RecheckTask { stop, handle });
        if let Some(task) = previous {
            let _ = task.stop.send(true);
        }
        info!(interval_secs = interval.as_secs(), "Provider recheck scheduled");
    }

    /// Stop the background recheck task, if one is running.
    pub fn stop_recheck(&self) {
        let task = self.recheck.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(task) = task {
            let _ = task.stop.send(true);
            drop(task.handle);
        }
    }

    pub fn is_rechecking(&self) -> bool {
        self.recheck
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|t| !t.handle.is_finished())
    }

    /// Walk the chain until one provider answers.
    pub async fn execute(
        &self,
        request: &ExecutionRequest,
    ) -> std::result::Result<ExecutionResult, ExhaustedError> {
        let settings = CallSettings {
            system_prompt: request.system_prompt.clone(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            tool_context: request.tool_context,
        };
        let mut attempted = Vec::new();
        let mut skipped = Vec::new();

        for (position, descriptor) in self.walk(request.tier).enumerate() {
            if !descriptor.is_available() {
                debug!(provider = %descriptor.id(), "Skipping dead provider");
                skipped.push(descriptor.id().to_string());
                continue;
            }

            info!(
                provider = %descriptor.id(),
                tier = %descriptor.tier(),
                position,
                "Trying provider"
            );

            match self.attempt(descriptor, request, &settings).await {
                AttemptResult::Success(outcome) => {
                    self.note(descriptor, descriptor.record_success());
                    let tier = if position == 0 {
                        OutcomeTier::Primary
                    } else {
                        OutcomeTier::Fallback
                    };
                    return Ok(ExecutionResult {
                        content: outcome.content,
                        provider_id: descriptor.id().to_string(),
                        tier,
                        usage: outcome.usage,
                        rounds: outcome.rounds,
                        tool_invocations: outcome.invocations,
                        model: outcome.model,
                    });
                }
                AttemptResult::Retryable(e) => {
                    warn!(provider = %descriptor.id(), error = %e, "Provider failed, trying next");
                    self.note(descriptor, descriptor.record_failure(&e, self.failure_threshold));
                    attempted.push((descriptor.id().to_string(), e));
                }
                AttemptResult::Fatal(e) => {
                    warn!(provider = %descriptor.id(), error = %e, "Provider unusable, disabling until recheck");
                    self.note(descriptor, descriptor.record_failure(&e, self.failure_threshold));
                    attempted.push((descriptor.id().to_string(), e));
                }
            }
        }

        warn!(
            attempted = attempted.len(),
            skipped = skipped.len(),
            "All providers exhausted"
        );
        Err(ExhaustedError { attempted, skipped })
    }

    async fn attempt(
        &self,
        descriptor: &ProviderDescriptor,
        request: &ExecutionRequest,
        settings: &CallSettings,
    ) -> AttemptResult {
        match &request.executor {
            Some(executor) if request.wants_tools() && descriptor.supports_tools() => self
                .tool_loop
                .run(
                    descriptor,
                    &request.messages,
                    &request.tools,
                    executor.as_ref(),
                    settings,
                )
                .await
                .into(),
            _ => self
                .tool_loop
                .single_shot(descriptor, &request.messages, settings)
                .await
                .into(),
        }
    }

    fn note(&self, descriptor: &ProviderDescriptor, transition: Option<Transition>) {
        let Some(Transition { from, to }) = transition else {
            return;
        };
        if to == HealthState::Healthy {
            info!(provider = %descriptor.id(), %from, "Provider recovered");
        } else {
            warn!(provider = %descriptor.id(), %from, %to, "Provider health changed");
        }
        self.events.publish(DomainEvent::ProviderHealthChanged {
            provider: descriptor.id().to_string(),
            from: from.to_string(),
            to: to.to_string(),
            timestamp: chrono::Utc::now(),
        });
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ProviderRegistry {
    fn drop(&mut self) {
        self.stop_recheck();
    }
}
