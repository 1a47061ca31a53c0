//! Context collaborators: sources of system-prompt text.
//!
//! Each source contributes at most one block. Returning an empty string
//! means "nothing to add"; returning an error means the source is broken
//! for this request and the caller decides how to degrade.

use async_trait::async_trait;
use crate::error::ContextError;

#[async_trait]
pub trait ContextSource: Send + Sync {
    /// Short identifier used in logs and as the segment heading key.
    fn name(&self) -> &str;

    /// Build this source's block for one request.
    async fn build(&self, is_admin: bool) -> std::result::Result<String, ContextError>;
}

/// A source that always returns the same text.
pub struct StaticContext {
    name: String,
    text: String,
}

impl StaticContext {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

#[async_trait]
impl ContextSource for StaticContext {
    fn name(&self) -> &str {
        &self.name
    }

    async fn build(&self, _is_admin: bool) -> std::result::Result<String, ContextError> {
        Ok(self.text.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_context_returns_its_text() {
        let ctx = StaticContext::new("policy", "Refunds within 30 days.");
        assert_eq!(ctx.name(), "policy");
        assert_eq!(ctx.build(false).await.unwrap(), "Refunds within 30 days.");
    }
}
