//! Tools the CLI offers to cloud providers.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use switchyard_core::error::ToolError;
use switchyard_core::tool::{Tool, ToolContext, ToolOutput, ToolRegistry};
use switchyard_providers::ProviderRegistry;

/// The current date and time in UTC.
pub struct CurrentTimeTool;

#[async_trait]
impl Tool for CurrentTimeTool {
    fn name(&self) -> &str {
        "current_time"
    }

    fn description(&self) -> &str {
        "Returns the current date and time in UTC"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn execute(
        &self,
        _arguments: serde_json::Value,
        _ctx: ToolContext,
    ) -> Result<ToolOutput, ToolError> {
        let now = chrono::Utc::now();
        Ok(ToolOutput::Success(json!({
            "utc": now.to_rfc3339(),
            "weekday": now.format("%A").to_string(),
        })))
    }
}

/// Health of every configured provider. Administrators only.
pub struct ProviderHealthTool {
    registry: Arc<ProviderRegistry>,
}

impl ProviderHealthTool {
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl Tool for ProviderHealthTool {
    fn name(&self) -> &str {
        "provider_health"
    }

    fn description(&self) -> &str {
        "Lists every configured LLM provider with its tier and health state"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({ "type": "object", "properties": {} })
    }

    fn admin_only(&self) -> bool {
        true
    }

    async fn execute(
        &self,
        _arguments: serde_json::Value,
        _ctx: ToolContext,
    ) -> Result<ToolOutput, ToolError> {
        let snapshots = serde_json::to_value(self.registry.snapshots())
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "provider_health".into(),
                reason: e.to_string(),
            })?;
        Ok(ToolOutput::Success(snapshots))
    }
}

/// Every tool the CLI registers.
pub fn default_tools(registry: Arc<ProviderRegistry>) -> ToolRegistry {
    let mut tools = ToolRegistry::new();
    tools.register(Box::new(CurrentTimeTool));
    tools.register(Box::new(ProviderHealthTool::new(registry)));
    tools
}
