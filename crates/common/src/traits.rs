//! Core agent and tool traits.
//!
//! These traits are defined in `switchboard-common` so that the agents,
//! coordinator and CLI crates can reference them without circular
//! dependencies.

use async_trait::async_trait;
use tracing::{debug, error};

use crate::{AgentResponse, IntentDetection, Params, Result, ToolResult, ToolSet};

/// A single capability exposed by an agent.
///
/// Implementations validate their own parameters and report problems as
/// [`ToolResult::Failure`] rather than panicking.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    async fn execute(&self, params: Params) -> ToolResult;
}

/// The core agent trait that all department agents implement.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Get the agent's human-readable name.
    fn name(&self) -> &str;

    /// Short description, also used as a keyword-scoring signal.
    fn description(&self) -> &str;

    /// Action identifiers this agent understands.
    fn supported_actions(&self) -> Vec<String> {
        Vec::new()
    }

    /// Tools owned by this agent.
    fn tools(&self) -> &ToolSet;

    /// Handle a routed message.
    ///
    /// `detection` carries the action and parameters chosen by the resolver,
    /// when there are any.
    async fn process_message(
        &self,
        message: &str,
        session_id: &str,
        context: &Params,
        detection: Option<&IntentDetection>,
    ) -> Result<AgentResponse>;

    /// Run one of this agent's tools by name.
    ///
    /// An unknown tool is reported as a failed result, never as an error.
    async fn execute_tool(&self, tool_name: &str, params: Params) -> ToolResult {
        let Some(tool) = self.tools().get(tool_name) else {
            error!(agent = %self.name(), tool = %tool_name, "Tool not found");
            return ToolResult::failure(format!("Tool \"{tool_name}\" is not available."));
        };

        debug!(agent = %self.name(), tool = %tool_name, "Executing tool");
        let result = tool.execute(params).await;
        if let Some(err) = result.error() {
            error!(agent = %self.name(), tool = %tool_name, error = %err, "Tool execution failed");
        }
        result
    }

    /// Human-readable capability summary: description plus tool list.
    fn capabilities(&self) -> String {
        let tools = self
            .tools()
            .describe()
            .into_iter()
            .map(|(name, description)| format!("- {name}: {description}"))
            .collect::<Vec<_>>()
            .join("\n");

        if tools.is_empty() {
            format!("{}\n\nNo tools available.", self.description())
        } else {
            format!("{}\n\nAvailable tools:\n{}", self.description(), tools)
        }
    }
}
