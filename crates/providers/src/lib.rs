//! Provider chain for Switchyard.
//!
//! All backends implement the `switchyard_core::Provider` trait. This crate
//! wraps them in [`ProviderDescriptor`]s that carry tier and health, walks
//! them in order through the [`ProviderRegistry`], and drives the bounded
//! [`ToolLoop`] against whichever provider is being tried.

pub mod factory;
pub mod health;
pub mod openai_compat;
pub mod registry;
pub mod tool_loop;

pub use factory::build_registry;
pub use health::{HealthState, ProviderDescriptor, ProviderHealthSnapshot, Transition};
pub use openai_compat::OpenAiCompatProvider;
pub use registry::{ExecutionRequest, ExecutionResult, ProviderRegistry};
pub use tool_loop::{CallSettings, INCOMPLETE_RESPONSE, LoopOutcome, ToolInvocation, ToolLoop};
