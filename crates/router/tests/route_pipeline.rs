//! End-to-end tests for the routing pipeline.
//!
//! These wire a real registry, composer, cache and tool registry around
//! hand-written mock providers and exercise `Router::route` from user input
//! to outcome.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use switchyard_config::EmergencyConfig;
use switchyard_core::context::{ContextSource, StaticContext};
use switchyard_core::error::{ContextError, ProviderError, ToolError};
use switchyard_core::event::{DomainEvent, EventBus};
use switchyard_core::message::{Message, MessageToolCall};
use switchyard_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use switchyard_core::tier::{OutcomeTier, ProviderTier, RouteTier};
use switchyard_core::tool::{Tool, ToolContext, ToolRegistry, ToolOutput};
use switchyard_providers::{HealthState, ProviderDescriptor, ProviderRegistry};
use switchyard_router::{PromptComposer, RouteOptions, Router};

// ── Mock Provider ────────────────────────────────────────────────────────

#[derive(Clone)]
enum Behavior {
    Reply(&'static str),
    Fail,
    Panic,
    /// Call `tool` once, then answer with whatever the tool returned
    UseTool(&'static str),
    /// Request a tool on every round, never answering in text
    AlwaysTool,
}

struct MockProvider {
    behavior: Behavior,
    healthy: Mutex<bool>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl MockProvider {
    fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            healthy: Mutex::new(true),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn last_request(&self) -> ProviderRequest {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }

    fn set_healthy(&self, healthy: bool) {
        *self.healthy.lock().unwrap() = healthy;
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let tool_result = request
            .messages
            .iter()
            .rev()
            .find(|m| m.tool_call_id.is_some())
            .map(|m| m.content.clone());
        let model = request.model.clone();
        self.requests.lock().unwrap().push(request);

        let message = match &self.behavior {
            Behavior::Reply(text) => Message::assistant(*text),
            Behavior::Fail => return Err(ProviderError::Network("connection refused".into())),
            Behavior::Panic => panic!("provider bug"),
            Behavior::UseTool(_) if tool_result.is_some() => {
                Message::assistant(format!("Tool said: {}", tool_result.unwrap_or_default()))
            }
            Behavior::UseTool(tool) => Message::assistant_tool_calls(
                "",
                vec![MessageToolCall {
                    id: "call_1".into(),
                    name: (*tool).into(),
                    arguments: "{}".into(),
                }],
            ),
            Behavior::AlwaysTool => Message::assistant_tool_calls(
                "",
                vec![MessageToolCall {
                    id: "call_n".into(),
                    name: "order_status".into(),
                    arguments: "{}".into(),
                }],
            ),
        };

        Ok(ProviderResponse {
            message,
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
            model,
        })
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        Ok(*self.healthy.lock().unwrap())
    }
}

// ── Tools and context sources ────────────────────────────────────────────

struct OrderStatus;

#[async_trait]
impl Tool for OrderStatus {
    fn name(&self) -> &str {
        "order_status"
    }
    fn description(&self) -> &str {
        "Status of the caller's latest order"
    }
    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object", "properties": {}})
    }
    async fn execute(
        &self,
        _arguments: serde_json::Value,
        _ctx: ToolContext,
    ) -> Result<ToolOutput, ToolError> {
        Ok(ToolOutput::Success(serde_json::json!("shipped")))
    }
}

struct RevenueReport;

#[async_trait]
impl Tool for RevenueReport {
    fn name(&self) -> &str {
        "revenue_report"
    }
    fn description(&self) -> &str {
        "Monthly revenue"
    }
    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object"})
    }
    fn admin_only(&self) -> bool {
        true
    }
    async fn execute(
        &self,
        _arguments: serde_json::Value,
        _ctx: ToolContext,
    ) -> Result<ToolOutput, ToolError> {
        Ok(ToolOutput::Success(serde_json::json!({"total": 1200})))
    }
}

fn tools() -> Arc<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(OrderStatus));
    registry.register(Box::new(RevenueReport));
    Arc::new(registry)
}

struct FailingLiveContext;

#[async_trait]
impl ContextSource for FailingLiveContext {
    fn name(&self) -> &str {
        "live"
    }
    async fn build(&self, _is_admin: bool) -> Result<String, ContextError> {
        Err(ContextError::new("live", "bookings table locked"))
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────

fn descriptor(id: &str, tier: ProviderTier, provider: Arc<MockProvider>) -> ProviderDescriptor {
    ProviderDescriptor::new(id, tier, format!("{id}-model"), provider)
        .with_timeout(Duration::from_secs(30))
}

fn composer() -> PromptComposer {
    PromptComposer::new("You are Ada, the assistant for Corner Bakery.")
        .with_privileged_extension("You are talking to the owner.")
        .with_policy(Arc::new(StaticContext::new("policy", "Orders ship in 2 days.")))
}

fn router_with(registry: ProviderRegistry) -> Router {
    Router::new(Arc::new(registry), composer()).with_emergency(EmergencyConfig {
        user_message: "We can't reply right now.".into(),
        contact_hint: Some("Call us at 555-0100.".into()),
    })
}

/// One cloud primary, one cloud secondary, one local provider.
fn three_tier(
    primary: Arc<MockProvider>,
    secondary: Arc<MockProvider>,
    local: Arc<MockProvider>,
) -> ProviderRegistry {
    ProviderRegistry::new()
        .with_provider(descriptor("cloud-a", ProviderTier::Primary, primary))
        .with_provider(descriptor("cloud-b", ProviderTier::Secondary, secondary))
        .with_provider(descriptor("local", ProviderTier::Local, local).with_tools(false))
}

// ── Tests ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn small_talk_stays_local() {
    let cloud = MockProvider::new(Behavior::Reply("cloud"));
    let local = MockProvider::new(Behavior::Reply("Hello! How can I help?"));
    let router = router_with(three_tier(cloud.clone(), cloud.clone(), local.clone()));

    let outcome = router.route("hi", &[], RouteOptions::default()).await;
    assert_eq!(outcome.content, "Hello! How can I help?");
    assert_eq!(outcome.provider.as_deref(), Some("local"));
    assert_eq!(outcome.tier, OutcomeTier::Primary);
    assert_eq!(cloud.calls(), 0);
    assert!(local.last_request().tools.is_empty());
}

#[tokio::test]
async fn business_question_goes_to_cloud_with_tools() {
    let cloud = MockProvider::new(Behavior::UseTool("order_status"));
    let local = MockProvider::new(Behavior::Reply("local"));
    let router = router_with(three_tier(cloud.clone(), cloud.clone(), local.clone()))
        .with_tools(tools());

    let outcome = router
        .route("Can you give me a summary of my order?", &[], RouteOptions::default())
        .await;

    assert_eq!(outcome.content, "Tool said: shipped");
    assert_eq!(outcome.provider.as_deref(), Some("cloud-a"));
    assert_eq!(outcome.usage.unwrap().total_tokens, 30);
    assert_eq!(local.calls(), 0);

    // Ordinary callers are not offered admin-only tools
    let offered: Vec<_> = cloud.last_request().tools.into_iter().map(|t| t.name).collect();
    assert_eq!(offered, ["order_status"]);
}

#[tokio::test]
async fn admin_is_escalated_to_cloud() {
    let cloud = MockProvider::new(Behavior::Reply("cloud answer"));
    let local = MockProvider::new(Behavior::Reply("local answer"));
    let router = router_with(three_tier(cloud.clone(), cloud.clone(), local.clone()))
        .with_tools(tools());

    let outcome = router
        .route("hi", &[], RouteOptions::admin().with_tier(RouteTier::Local))
        .await;

    assert_eq!(outcome.content, "cloud answer");
    assert_eq!(local.calls(), 0);

    let request = cloud.last_request();
    assert!(request.system_prompt.contains("You are talking to the owner."));
    let offered: Vec<_> = request.tools.into_iter().map(|t| t.name).collect();
    assert_eq!(offered, ["order_status", "revenue_report"]);
}

#[tokio::test]
async fn privileged_tool_is_rejected_for_users_without_failover() {
    let cloud_a = MockProvider::new(Behavior::UseTool("revenue_report"));
    let cloud_b = MockProvider::new(Behavior::Reply("should not be reached"));
    let local = MockProvider::new(Behavior::Reply("local"));
    let router = router_with(three_tier(cloud_a.clone(), cloud_b.clone(), local))
        .with_tools(tools());

    let outcome = router
        .route("What was revenue last month?", &[], RouteOptions::default())
        .await;

    assert_eq!(outcome.provider.as_deref(), Some("cloud-a"));
    assert!(outcome.content.contains("permission denied"), "{}", outcome.content);
    assert_eq!(cloud_b.calls(), 0);
}

#[tokio::test]
async fn dead_primary_is_skipped_and_reported_as_fallback() {
    let a = MockProvider::new(Behavior::Reply("from A"));
    let b = MockProvider::new(Behavior::Reply("from B"));
    let c = MockProvider::new(Behavior::Reply("from C"));
    let registry = ProviderRegistry::new()
        .with_provider(descriptor("A", ProviderTier::Primary, a.clone()))
        .with_provider(descriptor("B", ProviderTier::Primary, b))
        .with_provider(descriptor("C", ProviderTier::Primary, c.clone()));
    registry.get("A").unwrap().record_probe(false);
    let router = router_with(registry);

    let outcome = router
        .route("hello", &[], RouteOptions::default().with_tier(RouteTier::Cloud))
        .await;

    assert_eq!(outcome.content, "from B");
    assert_eq!(outcome.provider.as_deref(), Some("B"));
    assert_eq!(outcome.tier, OutcomeTier::Fallback);
    assert_eq!(a.calls(), 0);
    assert_eq!(c.calls(), 0);
}

#[tokio::test]
async fn total_outage_gives_users_the_contact_message() {
    let failing = MockProvider::new(Behavior::Fail);
    let router = router_with(three_tier(failing.clone(), failing.clone(), failing.clone()));

    let outcome = router.route("hi", &[], RouteOptions::default()).await;
    assert_eq!(outcome.tier, OutcomeTier::Emergency);
    assert_eq!(outcome.content, "We can't reply right now.\n\nCall us at 555-0100.");
    assert!(outcome.provider.is_none());
    assert_eq!(failing.calls(), 3);
}

#[tokio::test]
async fn total_outage_gives_admins_a_diagnostic() {
    let failing = MockProvider::new(Behavior::Fail);
    let router = router_with(three_tier(failing.clone(), failing.clone(), failing));

    let outcome = router.route("status?", &[], RouteOptions::admin()).await;
    assert_eq!(outcome.tier, OutcomeTier::Emergency);
    assert!(outcome.content.contains("All providers exhausted (3 attempted, 0 skipped)"));
    assert!(outcome.content.contains("cloud-a: Network error: connection refused"));
}

#[tokio::test]
async fn no_providers_still_answers() {
    let router = router_with(ProviderRegistry::new());
    let outcome = router.route("hi", &[], RouteOptions::default()).await;
    assert_eq!(outcome.tier, OutcomeTier::Emergency);
    assert!(!outcome.content.is_empty());
}

#[tokio::test]
async fn panicking_provider_becomes_emergency() {
    let panicking = MockProvider::new(Behavior::Panic);
    let registry =
        ProviderRegistry::new().with_provider(descriptor("p", ProviderTier::Primary, panicking));
    let router = router_with(registry);

    let outcome = router.route("hi", &[], RouteOptions::default()).await;
    assert_eq!(outcome.tier, OutcomeTier::Emergency);
    assert!(!outcome.content.is_empty());

    let admin = router.route("hi", &[], RouteOptions::admin()).await;
    assert!(admin.content.contains("provider bug"));
}

#[tokio::test]
async fn endless_tool_requests_are_bounded() {
    let looping = MockProvider::new(Behavior::AlwaysTool);
    let registry =
        ProviderRegistry::new().with_provider(descriptor("a", ProviderTier::Primary, looping.clone()));
    let router = router_with(registry).with_tools(tools());

    let outcome = router
        .route("Give me a report on my order", &[], RouteOptions::default())
        .await;

    assert_eq!(outcome.tier, OutcomeTier::Primary);
    assert!(!outcome.content.is_empty());
    assert_eq!(looping.calls(), 3);
}

#[tokio::test]
async fn repeated_question_is_served_from_cache() {
    let local = MockProvider::new(Behavior::Reply("We open at 8am."));
    let registry =
        ProviderRegistry::new().with_provider(descriptor("local", ProviderTier::Local, local.clone()));
    let router = router_with(registry);
    let options = RouteOptions::default().with_intent("hours");

    let first = router.route("When do you open?", &[], options.clone()).await;
    let second = router.route("  when do you OPEN ", &[], options).await;

    assert!(!first.cached);
    assert!(second.cached);
    assert_eq!(second.content, "We open at 8am.");
    assert_eq!(second.provider.as_deref(), Some("local"));
    assert_eq!(local.calls(), 1);

    let stats = router.stats();
    assert_eq!(stats.requests.total, 2);
    assert_eq!(stats.requests.primary, 1);
    assert_eq!(stats.requests.cache_hit, 1);
    assert_eq!(stats.cache.hits, 1);
}

#[tokio::test]
async fn sensitive_intents_and_admins_bypass_cache() {
    let local = MockProvider::new(Behavior::Reply("ok"));
    let registry =
        ProviderRegistry::new().with_provider(descriptor("local", ProviderTier::Local, local.clone()));
    let router = router_with(registry);

    for _ in 0..2 {
        router
            .route("hi", &[], RouteOptions::default().with_intent("payment"))
            .await;
    }
    assert_eq!(local.calls(), 2);

    for _ in 0..2 {
        router.route("hi", &[], RouteOptions::admin().with_intent("faq")).await;
    }
    assert_eq!(local.calls(), 4);
    assert_eq!(router.stats().cache.entries, 0);
}

#[tokio::test]
async fn emergency_outcomes_are_not_cached() {
    let a = MockProvider::new(Behavior::Fail);
    let registry =
        ProviderRegistry::new().with_provider(descriptor("a", ProviderTier::Primary, a.clone()));
    let router = router_with(registry);

    router.route("hi", &[], RouteOptions::default()).await;
    assert_eq!(router.stats().cache.entries, 0);
}

#[tokio::test]
async fn broken_context_source_degrades_to_minimal_prompt() {
    let bus = Arc::new(EventBus::new(32));
    let mut events = bus.subscribe();
    let local = MockProvider::new(Behavior::Reply("Still here!"));
    let registry =
        ProviderRegistry::new().with_provider(descriptor("local", ProviderTier::Local, local.clone()));
    let composer = PromptComposer::new("You are Ada.")
        .with_live(Arc::new(FailingLiveContext))
        .with_policy(Arc::new(StaticContext::new("policy", "Orders ship in 2 days.")));
    let router = Router::new(Arc::new(registry), composer).with_events(bus);

    let outcome = router.route("hi", &[], RouteOptions::default()).await;
    assert_eq!(outcome.content, "Still here!");

    let prompt = local.last_request().system_prompt;
    assert!(prompt.starts_with("You are Ada."));
    assert!(!prompt.contains("Orders ship in 2 days."));

    match events.recv().await.unwrap().as_ref() {
        DomainEvent::AugmentationDegraded { source_name, .. } => assert_eq!(source_name, "live"),
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn history_and_custom_prompt_reach_the_provider() {
    let local = MockProvider::new(Behavior::Reply("Sure."));
    let registry =
        ProviderRegistry::new().with_provider(descriptor("local", ProviderTier::Local, local.clone()));
    let router = router_with(registry);

    let history = vec![Message::user("hello"), Message::assistant("Hi there!")];
    let options = RouteOptions {
        custom_system_prompt: Some("Answer in one word.".into()),
        ..RouteOptions::default()
    };
    router.route("ok thanks", &history, options).await;

    let request = local.last_request();
    assert_eq!(request.messages.len(), 3);
    assert_eq!(request.messages[2].content, "ok thanks");
    assert!(request.system_prompt.ends_with("Answer in one word."));
    assert!(!request.system_prompt.contains("local-model"));
}

#[tokio::test]
async fn recovered_provider_is_tried_first_again() {
    let a = MockProvider::new(Behavior::Reply("from A"));
    let b = MockProvider::new(Behavior::Reply("from B"));
    let registry = ProviderRegistry::new()
        .with_provider(descriptor("A", ProviderTier::Primary, a.clone()))
        .with_provider(descriptor("B", ProviderTier::Primary, b));
    let router = router_with(registry).without_cache();

    a.set_healthy(false);
    router.init().await;
    assert_eq!(
        router.stats().providers[0].state,
        HealthState::Dead
    );
    let cloud = RouteOptions::default().with_tier(RouteTier::Cloud);
    assert_eq!(router.route("hi", &[], cloud.clone()).await.provider.as_deref(), Some("B"));

    a.set_healthy(true);
    assert_eq!(router.recheck_providers().await, 1);

    let outcome = router.route("hi", &[], cloud).await;
    assert_eq!(outcome.provider.as_deref(), Some("A"));
    assert_eq!(outcome.tier, OutcomeTier::Primary);
    router.shutdown();
}

#[tokio::test(start_paused = true)]
async fn recheck_interval_revives_providers_without_operator() {
    let a = MockProvider::new(Behavior::Reply("from A"));
    let registry =
        ProviderRegistry::new().with_provider(descriptor("A", ProviderTier::Primary, a.clone()));
    let router = router_with(registry).with_recheck_interval(Duration::from_secs(300));

    a.set_healthy(false);
    router.init().await;
    a.set_healthy(true);

    tokio::time::sleep(Duration::from_secs(301)).await;
    assert_eq!(router.stats().providers[0].state, HealthState::Healthy);
    router.shutdown();
    assert!(!router.registry().is_rechecking());
}

#[tokio::test]
async fn route_completed_event_is_published() {
    let bus = Arc::new(EventBus::new(32));
    let mut events = bus.subscribe();
    let local = MockProvider::new(Behavior::Reply("hey"));
    let registry =
        ProviderRegistry::new().with_provider(descriptor("local", ProviderTier::Local, local));
    let router = router_with(registry).with_events(bus);

    router.route("hi", &[], RouteOptions::default()).await;

    match events.recv().await.unwrap().as_ref() {
        DomainEvent::RouteCompleted { tier, provider, cached, .. } => {
            assert_eq!(tier, "primary");
            assert_eq!(provider.as_deref(), Some("local"));
            assert!(!cached);
        }
        other => panic!("unexpected event {other:?}"),
    }
}
