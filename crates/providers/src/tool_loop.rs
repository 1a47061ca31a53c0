//! Bounded tool-calling loop.
//!
//! Drives one provider through up to `max_rounds` completions. Each round
//! that asks for tools gets its calls resolved through the
//! [`ToolExecutor`] and the results appended as tool turns, in the order
//! the provider requested them. Business-rule rejections and executor
//! faults are both fed back to the provider as error content; only the
//! provider's own failures leave this loop as `Err`.

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use switchyard_core::error::{ProviderError, ToolError};
use switchyard_core::event::{DomainEvent, EventBus};
use switchyard_core::message::{Message, MessageToolCall};
use switchyard_core::provider::{ProviderRequest, Usage};
use switchyard_core::tool::{ToolCall, ToolContext, ToolDefinition, ToolExecutor, ToolOutput};
use tracing::{debug, warn};

use crate::health::ProviderDescriptor;

/// Returned when the round budget runs out before any text was produced.
pub const INCOMPLETE_RESPONSE: &str =
    "I couldn't complete that request right now. Please try again or rephrase it.";

/// Per-request knobs shared by every round.
#[derive(Debug, Clone)]
pub struct CallSettings {
    pub system_prompt: String,
    pub max_tokens: Option<u32>,
    pub temperature: f32,
    pub tool_context: ToolContext,
}

/// One resolved tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub call_id: String,
    pub name: String,
    pub arguments: serde_json::Value,
    pub output: ToolOutput,
    pub duration_ms: u64,
}

/// What a provider produced after zero or more tool rounds.
#[derive(Debug, Clone)]
pub struct LoopOutcome {
    pub content: String,
    /// Summed over every round
    pub usage: Usage,
    pub rounds: u32,
    pub invocations: Vec<ToolInvocation>,
    pub model: String,
}

pub struct ToolLoop {
    max_rounds: u32,
    concurrency: usize,
    events: Option<Arc<EventBus>>,
}

impl ToolLoop {
    pub fn new(max_rounds: u32, concurrency: usize) -> Self {
        Self {
            max_rounds: max_rounds.max(1),
            concurrency: concurrency.max(1),
            events: None,
        }
    }

    /// Publish a `ToolExecuted` event for every resolved call.
    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn max_rounds(&self) -> u32 {
        self.max_rounds
    }

    /// Run the loop against `descriptor`.
    pub async fn run(
        &self,
        descriptor: &ProviderDescriptor,
        messages: &[Message],
        tools: &[ToolDefinition],
        executor: &dyn ToolExecutor,
        settings: &CallSettings,
    ) -> std::result::Result<LoopOutcome, ProviderError> {
        let mut conversation = messages.to_vec();
        let mut usage = Usage::default();
        let mut invocations = Vec::new();
        let mut last_text: Option<String> = None;
        let mut model = descriptor.model().to_string();

        for round in 1..=self.max_rounds {
            debug!(provider = %descriptor.id(), round, "Tool loop round");

            let response = descriptor
                .call(Self::request(settings, conversation.clone(), tools.to_vec()))
                .await?;

            if let Some(u) = &response.usage {
                usage.accumulate(u);
            }
            model = response.model;

            let message = response.message;
            if !message.content.trim().is_empty() {
                last_text = Some(message.content.clone());
            }

            if !message.requests_tools() {
                let content = last_text.ok_or_else(|| {
                    ProviderError::InvalidResponse("empty response with no tool calls".into())
                })?;
                return Ok(LoopOutcome {
                    content,
                    usage,
                    rounds: round,
                    invocations,
                    model,
                });
            }

            if round == self.max_rounds {
                warn!(
                    provider = %descriptor.id(),
                    rounds = round,
                    "Tool round limit reached, returning last text"
                );
                break;
            }

            let calls = message.tool_calls.clone();
            conversation.push(message);

            let resolved = self.resolve_all(&calls, executor, settings.tool_context).await;
            for invocation in resolved {
                conversation.push(Message::tool_result(
                    &invocation.call_id,
                    invocation.output.to_content(),
                ));
                invocations.push(invocation);
            }
        }

        Ok(LoopOutcome {
            content: last_text.unwrap_or_else(|| INCOMPLETE_RESPONSE.to_string()),
            usage,
            rounds: self.max_rounds,
            invocations,
            model,
        })
    }

    /// One completion without tools.
    pub async fn single_shot(
        &self,
        descriptor: &ProviderDescriptor,
        messages: &[Message],
        settings: &CallSettings,
    ) -> std::result::Result<LoopOutcome, ProviderError> {
        let response = descriptor
            .call(Self::request(settings, messages.to_vec(), Vec::new()))
            .await?;

        if response.message.content.trim().is_empty() {
            return Err(ProviderError::InvalidResponse("empty response".into()));
        }

        Ok(LoopOutcome {
            content: response.message.content,
            usage: response.usage.unwrap_or_default(),
            rounds: 1,
            invocations: Vec::new(),
            model: response.model,
        })
    }

    fn request(
        settings: &CallSettings,
        messages: Vec<Message>,
        tools: Vec<ToolDefinition>,
    ) -> ProviderRequest {
        ProviderRequest {
            model: String::new(),
            system_prompt: settings.system_prompt.clone(),
            messages,
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            tools,
        }
    }

    /// Resolve a round's calls concurrently, yielding results in request order.
    async fn resolve_all(
        &self,
        calls: &[MessageToolCall],
        executor: &dyn ToolExecutor,
        ctx: ToolContext,
    ) -> Vec<ToolInvocation> {
        stream::iter(calls)
            .map(|call| self.resolve(call, executor, ctx))
            .buffered(self.concurrency)
            .collect()
            .await
    }

    async fn resolve(
        &self,
        call: &MessageToolCall,
        executor: &dyn ToolExecutor,
        ctx: ToolContext,
    ) -> ToolInvocation {
        let start = Instant::now();

        let (arguments, output) = match parse_arguments(&call.arguments) {
            Ok(arguments) => {
                let tool_call = ToolCall {
                    id: call.id.clone(),
                    name: call.name.clone(),
                    arguments: arguments.clone(),
                };
                let output = match executor.execute_tool(&tool_call, ctx).await {
                    Ok(output) => output,
                    Err(e) => {
                        warn!(tool = %call.name, error = %e, "Tool execution failed");
                        ToolOutput::rejected(e.to_string())
                    }
                };
                (arguments, output)
            }
            Err(e) => {
                debug!(tool = %call.name, error = %e, "Rejecting tool call");
                (
                    serde_json::Value::String(call.arguments.clone()),
                    ToolOutput::rejected(e.to_string()),
                )
            }
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        if let Some(events) = &self.events {
            events.publish(DomainEvent::ToolExecuted {
                tool_name: call.name.clone(),
                success: output.is_success(),
                duration_ms,
                timestamp: chrono::Utc::now(),
            });
        }

        ToolInvocation {
            call_id: call.id.clone(),
            name: call.name.clone(),
            arguments,
            output,
            duration_ms,
        }
    }
}

/// Empty arguments mean "no arguments"; anything else must be JSON.
fn parse_arguments(raw: &str) -> std::result::Result<serde_json::Value, ToolError> {
    if raw.trim().is_empty() {
        return Ok(serde_json::json!({}));
    }
    serde_json::from_str(raw).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}
