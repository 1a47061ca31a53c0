//! Tool seams: how providers reach external capabilities.
//!
//! The router never implements tools itself. It hands each requested
//! [`ToolCall`] to a [`ToolExecutor`] and feeds the [`ToolOutput`] back to the
//! provider. Expected business-rule denials are values
//! ([`ToolOutput::Rejected`]), not errors; [`ToolError`] is reserved for
//! faults nobody planned for.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use crate::error::ToolError;

/// A tool definition sent to the LLM so it knows what tools it can call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON Schema describing the tool's parameters
    pub parameters: serde_json::Value,
}

/// A request to execute a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique call ID (matches the LLM's tool_call.id)
    pub id: String,

    /// Name of the tool to execute
    pub name: String,

    /// Arguments as a JSON value
    pub arguments: serde_json::Value,
}

/// Caller facts a tool executor may use to allow or deny a call.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToolContext {
    pub is_admin: bool,
}

/// What a tool produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum ToolOutput {
    /// JSON-serializable result.
    Success(serde_json::Value),
    /// Expected refusal (permission denied, unknown record, ...).
    Rejected(String),
}

impl ToolOutput {
    pub fn rejected(reason: impl Into<String>) -> Self {
        ToolOutput::Rejected(reason.into())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ToolOutput::Success(_))
    }

    /// Render as the content of a tool-result turn.
    ///
    /// Rejections become `{"error": "..."}` so the provider can read them.
    pub fn to_content(&self) -> String {
        match self {
            ToolOutput::Success(serde_json::Value::String(s)) => s.clone(),
            ToolOutput::Success(value) => value.to_string(),
            ToolOutput::Rejected(reason) => serde_json::json!({ "error": reason }).to_string(),
        }
    }
}

/// The tool executor collaborator.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Resolve one tool invocation.
    ///
    /// Returns `Ok(ToolOutput::Rejected(_))` for business-rule denials and
    /// `Err(_)` only for unexpected faults.
    async fn execute_tool(
        &self,
        call: &ToolCall,
        ctx: ToolContext,
    ) -> std::result::Result<ToolOutput, ToolError>;

    /// Definitions offered to a provider on behalf of this caller.
    fn definitions(&self, _ctx: ToolContext) -> Vec<ToolDefinition> {
        Vec::new()
    }
}

/// A single capability registered in a [`ToolRegistry`].
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "lookup_order").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the LLM).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Privileged tools are refused for ordinary callers.
    fn admin_only(&self) -> bool {
        false
    }

    /// Execute the tool with the given arguments.
    async fn execute(
        &self,
        arguments: serde_json::Value,
        ctx: ToolContext,
    ) -> std::result::Result<ToolOutput, ToolError>;

    /// Convert this tool into a ToolDefinition for sending to the LLM.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// A registry of available tools.
///
/// The router uses this to:
/// 1. Get tool definitions to send to the LLM
/// 2. Resolve tool calls the LLM requests, enforcing `admin_only`
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// Tool definitions visible to a caller, sorted by name.
    ///
    /// Ordinary callers do not see `admin_only` tools.
    pub fn definitions(&self, ctx: ToolContext) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self
            .tools
            .values()
            .filter(|t| ctx.is_admin || !t.admin_only())
            .map(|t| t.to_definition())
            .collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolExecutor for ToolRegistry {
    async fn execute_tool(
        &self,
        call: &ToolCall,
        ctx: ToolContext,
    ) -> std::result::Result<ToolOutput, ToolError> {
        let Some(tool) = self.tools.get(&call.name) else {
            return Ok(ToolOutput::rejected(format!("unknown tool '{}'", call.name)));
        };

        if tool.admin_only() && !ctx.is_admin {
            tracing::debug!(tool = %call.name, "Refusing privileged tool for ordinary caller");
            return Ok(ToolOutput::rejected(format!(
                "permission denied: '{}' requires an administrator",
                call.name
            )));
        }

        tool.execute(call.arguments.clone(), ctx).await
    }

    fn definitions(&self, ctx: ToolContext) -> Vec<ToolDefinition> {
        ToolRegistry::definitions(self, ctx)
    }
}
