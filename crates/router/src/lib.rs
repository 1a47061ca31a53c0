//! # Switchyard Router
//!
//! The never-fail entry point of the dialogue router. A [`Router`] owns a
//! [`MessageClassifier`], a [`ResponseCache`], a [`PromptComposer`] and a
//! shared provider registry, and turns each user message into exactly one
//! [`RouteOutcome`].

pub mod cache;
pub mod classifier;
pub mod orchestrator;
pub mod prompt;
pub mod stats;

pub use cache::{CachePolicy, CacheStats, ResponseCache, normalize_key};
pub use classifier::MessageClassifier;
pub use orchestrator::{RouteOptions, RouteOutcome, Router};
pub use prompt::{BEHAVIOR_RULES, PromptComposer, PromptSegment, SegmentKind, render};
pub use stats::{RequestCounts, RouterStats};
