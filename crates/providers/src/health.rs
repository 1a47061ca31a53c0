//! Provider descriptors and their health bookkeeping.
//!
//! A descriptor wraps one configured backend with its tier, capability
//! flags and a small health record. Every call attempt and every probe
//! updates the record; the rotation engine reads it to decide whether the
//! provider is eligible for the next chain walk.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use switchyard_core::error::{Disposition, ProviderError};
use switchyard_core::provider::{ProviderRequest, ProviderResponse};
use switchyard_core::tier::ProviderTier;
use switchyard_core::Provider;
use tracing::debug;

/// Availability of a single provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Healthy,
    /// Still attempted, but one more failure kills it.
    Degraded,
    /// Skipped during chain walks until a probe succeeds.
    Dead,
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthState::Healthy => write!(f, "healthy"),
            HealthState::Degraded => write!(f, "degraded"),
            HealthState::Dead => write!(f, "dead"),
        }
    }
}

/// A health change produced by a single observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: HealthState,
    pub to: HealthState,
}

#[derive(Debug)]
struct HealthRecord {
    state: HealthState,
    consecutive_failures: u32,
    last_checked: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

impl HealthRecord {
    fn set(&mut self, to: HealthState) -> Option<Transition> {
        let from = self.state;
        self.state = to;
        self.last_checked = Some(Utc::now());
        (from != to).then_some(Transition { from, to })
    }
}

/// Point-in-time view of a provider, used by stats and the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderHealthSnapshot {
    pub id: String,
    pub tier: ProviderTier,
    pub model: String,
    pub supports_tools: bool,
    pub state: HealthState,
    pub consecutive_failures: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_checked: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// One backend endpoint in the rotation.
pub struct ProviderDescriptor {
    id: String,
    tier: ProviderTier,
    model: String,
    supports_tools: bool,
    timeout: Duration,
    provider: Arc<dyn Provider>,
    health: Mutex<HealthRecord>,
}

impl ProviderDescriptor {
    /// Create a healthy descriptor with tools enabled and a 30s attempt timeout.
    pub fn new(
        id: impl Into<String>,
        tier: ProviderTier,
        model: impl Into<String>,
        provider: Arc<dyn Provider>,
    ) -> Self {
        Self {
            id: id.into(),
            tier,
            model: model.into(),
            supports_tools: true,
            timeout: Duration::from_secs(30),
            provider,
            health: Mutex::new(HealthRecord {
                state: HealthState::Healthy,
                consecutive_failures: 0,
                last_checked: None,
                last_error: None,
            }),
        }
    }

    pub fn with_tools(mut self, supports_tools: bool) -> Self {
        self.supports_tools = supports_tools;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn tier(&self) -> ProviderTier {
        self.tier
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn supports_tools(&self) -> bool {
        self.supports_tools
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    // Health updates are coarse counters; a panic while holding the lock
    // leaves nothing half-written worth refusing to read.
    fn record(&self) -> MutexGuard<'_, HealthRecord> {
        self.health.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// One outbound call bounded by this provider's timeout.
    pub async fn call(
        &self,
        mut request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        request.model.clone_from(&self.model);
        match tokio::time::timeout(self.timeout, self.provider.complete(request)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(format!(
                "Provider '{}' timed out after {}s",
                self.id,
                self.timeout.as_secs()
            ))),
        }
    }

    /// Run the backend's health check under `timeout`. Errors and expiry both
    /// count as a failed probe.
    pub async fn probe(&self, timeout: Duration) -> bool {
        match tokio::time::timeout(timeout, self.provider.health_check()).await {
            Ok(Ok(ok)) => ok,
            Ok(Err(e)) => {
                debug!(provider = %self.id, error = %e, "Probe failed");
                self.record().last_error = Some(e.to_string());
                false
            }
            Err(_) => {
                debug!(provider = %self.id, timeout_secs = timeout.as_secs(), "Probe timed out");
                self.record().last_error = Some("probe timed out".into());
                false
            }
        }
    }

    /// A call succeeded: back to healthy with a clean count.
    pub fn record_success(&self) -> Option<Transition> {
        let mut record = self.record();
        record.consecutive_failures = 0;
        record.last_error = None;
        record.set(HealthState::Healthy)
    }

    /// A call failed. Fatal errors kill the provider outright; retryable
    /// ones degrade it at `threshold` consecutive failures and kill it on
    /// the next.
    pub fn record_failure(
        &self,
        error: &ProviderError,
        threshold: u32,
    ) -> Option<Transition> {
        let mut record = self.record();
        record.consecutive_failures = record.consecutive_failures.saturating_add(1);
        record.last_error = Some(error.to_string());

        let next = match error.disposition() {
            Disposition::Fatal => HealthState::Dead,
            Disposition::Retryable if record.consecutive_failures > threshold => HealthState::Dead,
            Disposition::Retryable if record.consecutive_failures >= threshold => {
                HealthState::Degraded
            }
            Disposition::Retryable => record.state,
        };
        record.set(next)
    }

    /// Apply a probe result. Only a successful probe brings a provider back.
    pub fn record_probe(&self, ok: bool) -> Option<Transition> {
        let mut record = self.record();
        if ok {
            record.consecutive_failures = 0;
            record.last_error = None;
            record.set(HealthState::Healthy)
        } else {
            record.set(HealthState::Dead)
        }
    }

    pub fn health(&self) -> HealthState {
        self.record().state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.record().consecutive_failures
    }

    /// Whether the chain walk may attempt this provider.
    pub fn is_available(&self) -> bool {
        self.health() != HealthState::Dead
    }

    pub fn snapshot(&self) -> ProviderHealthSnapshot {
        let record = self.record();
        ProviderHealthSnapshot {
            id: self.id.clone(),
            tier: self.tier,
            model: self.model.clone(),
            supports_tools: self.supports_tools,
            state: record.state,
            consecutive_failures: record.consecutive_failures,
            last_checked: record.last_checked,
            last_error: record.last_error.clone(),
        }
    }
}

impl fmt::Debug for ProviderDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderDescriptor")
            .field("id", &self.id)
            .field("tier", &self.tier)
            .field("model", &self.model)
            .field("supports_tools", &self.supports_tools)
            .field("health", &self.health())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use switchyard_core::message::Message;

    struct Backend {
        healthy: bool,
        delay: Duration,
    }

    #[async_trait]
    impl Provider for Backend {
        fn name(&self) -> &str {
            "backend"
        }

        async fn complete(
            &self,
            request: ProviderRequest,
        ) -> std::result::Result<ProviderResponse, ProviderError> {
            tokio::time::sleep(self.delay).await;
            Ok(ProviderResponse {
                message: Message::assistant("ok"),
                usage: None,
                model: request.model,
            })
        }

        async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
            tokio::time::sleep(self.delay).await;
            Ok(self.healthy)
        }
    }

    fn descriptor(healthy: bool, delay: Duration) -> ProviderDescriptor {
        ProviderDescriptor::new(
            "a",
            ProviderTier::Primary,
            "model-a",
            Arc::new(Backend { healthy, delay }),
        )
        .with_timeout(Duration::from_secs(5))
    }

    fn request() -> ProviderRequest {
        ProviderRequest {
            model: String::new(),
            system_prompt: String::new(),
            messages: vec![Message::user("hi")],
            temperature: 0.7,
            max_tokens: None,
            tools: vec![],
        }
    }

    #[test]
    fn retryable_failures_degrade_then_kill() {
        let d = descriptor(true, Duration::ZERO);
        let err = ProviderError::Network("reset".into());

        assert_eq!(d.record_failure(&err, 2), None);
        assert_eq!(d.health(), HealthState::Healthy);

        assert_eq!(
            d.record_failure(&err, 2),
            Some(Transition { from: HealthState::Healthy, to: HealthState::Degraded })
        );
        assert!(d.is_available());

        assert_eq!(
            d.record_failure(&err, 2),
            Some(Transition { from: HealthState::Degraded, to: HealthState::Dead })
        );
        assert!(!d.is_available());
        assert_eq!(d.consecutive_failures(), 3);
    }

    #[test]
    fn fatal_failure_kills_immediately() {
        let d = descriptor(true, Duration::ZERO);
        d.record_failure(&ProviderError::AuthenticationFailed("bad key".into()), 2);
        assert_eq!(d.health(), HealthState::Dead);
    }

    #[test]
    fn success_resets_count() {
        let d = descriptor(true, Duration::ZERO);
        let err = ProviderError::Timeout("slow".into());
        d.record_failure(&err, 2);
        d.record_failure(&err, 2);
        assert_eq!(d.health(), HealthState::Degraded);

        d.record_success();
        assert_eq!(d.health(), HealthState::Healthy);
        assert_eq!(d.consecutive_failures(), 0);
        assert!(d.snapshot().last_error.is_none());
    }

    #[test]
    fn probe_result_sets_state() {
        let d = descriptor(true, Duration::ZERO);
        d.record_probe(false);
        assert_eq!(d.health(), HealthState::Dead);
        d.record_probe(true);
        assert_eq!(d.health(), HealthState::Healthy);
    }

    #[tokio::test(start_paused = true)]
    async fn call_times_out() {
        let d = descriptor(true, Duration::from_secs(60));
        let err = d.call(request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Timeout(_)));
    }

    #[tokio::test]
    async fn call_uses_descriptor_model() {
        let d = descriptor(true, Duration::ZERO);
        let response = d.call(request()).await.unwrap();
        assert_eq!(response.model, "model-a");
    }

    #[tokio::test(start_paused = true)]
    async fn probe_failure_and_timeout() {
        assert!(!descriptor(false, Duration::ZERO).probe(Duration::from_secs(1)).await);
        assert!(!descriptor(true, Duration::from_secs(30)).probe(Duration::from_secs(1)).await);
        assert!(descriptor(true, Duration::ZERO).probe(Duration::from_secs(1)).await);
    }

    #[test]
    fn snapshot_serializes_lowercase_state() {
        let d = descriptor(true, Duration::ZERO);
        let json = serde_json::to_value(d.snapshot()).unwrap();
        assert_eq!(json["state"], "healthy");
        assert_eq!(json["tier"], "primary");
    }
}
