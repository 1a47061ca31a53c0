//! # Switchyard Core
//!
//! Domain types, traits, and error definitions for the Switchyard dialogue
//! router. This crate has **no transport or framework dependencies**; it
//! defines the seams every other crate implements against.
//!
//! ## Seams
//!
//! - [`Provider`]: one chat-completion backend (the provider call primitive)
//! - [`ToolExecutor`]: resolves tool invocations requested by a provider
//! - [`ContextSource`]: contributes one block of text to the system prompt
//! - [`EventBus`]: in-process pub/sub for domain events

pub mod context;
pub mod error;
pub mod event;
pub mod message;
pub mod provider;
pub mod tier;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use context::{ContextSource, StaticContext};
pub use error::{ContextError, Disposition, ExhaustedError, ProviderError, ToolError};
pub use event::{DomainEvent, EventBus};
pub use message::{Message, MessageToolCall, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
pub use tier::{OutcomeTier, ProviderTier, RouteTier};
pub use tool::{Tool, ToolCall, ToolContext, ToolDefinition, ToolExecutor, ToolOutput, ToolRegistry};
