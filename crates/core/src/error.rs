//! Error types for the Switchyard domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum.

use thiserror::Error;

/// A failed call against a single provider.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed response: {0}")]
    InvalidResponse(String),
}

/// How the chain walk treats a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Transient; counts one failure against the provider.
    Retryable,
    /// The provider cannot serve anything until it is re-probed.
    Fatal,
}

impl ProviderError {
    /// Classify this error for the rotation engine.
    pub fn disposition(&self) -> Disposition {
        match self {
            ProviderError::AuthenticationFailed(_)
            | ProviderError::NotConfigured(_)
            | ProviderError::ModelNotFound(_) => Disposition::Fatal,
            ProviderError::ApiError { .. }
            | ProviderError::RateLimited { .. }
            | ProviderError::Timeout(_)
            | ProviderError::Network(_)
            | ProviderError::InvalidResponse(_) => Disposition::Retryable,
        }
    }
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),
}

/// A context collaborator failed while building its prompt segment.
#[derive(Debug, Clone, Error)]
#[error("Context source '{source_name}' failed: {reason}")]
pub struct ContextError {
    pub source_name: String,
    pub reason: String,
}

impl ContextError {
    pub fn new(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }
}

/// Every candidate provider in every tier was skipped or failed.
#[derive(Debug, Clone, Error)]
#[error("All providers exhausted ({} attempted, {} skipped)", .attempted.len(), .skipped.len())]
pub struct ExhaustedError {
    /// Providers that were called, with the error each one returned.
    pub attempted: Vec<(String, ProviderError)>,
    /// Providers skipped because they were dead.
    pub skipped: Vec<String>,
}

impl ExhaustedError {
    /// The error returned by the last provider attempted, if any.
    pub fn last_error(&self) -> Option<&ProviderError> {
        self.attempted.last().map(|(_, e)| e)
    }
}
