//! Tool outcomes and the per-agent tool set.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::traits::Tool;

/// Outcome of a single tool execution.
///
/// On the wire this is `{"success": true, "data": ..}` or
/// `{"success": false, "error": ".."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "ToolResultWire", try_from = "ToolResultWire")]
pub enum ToolResult {
    Success(Value),
    Failure(String),
}

impl ToolResult {
    pub fn success(data: impl Into<Value>) -> Self {
        Self::Success(data.into())
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self::Failure(error.into())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn data(&self) -> Option<&Value> {
        match self {
            Self::Success(data) => Some(data),
            Self::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::Failure(error) => Some(error),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct ToolResultWire {
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl From<ToolResult> for ToolResultWire {
    fn from(result: ToolResult) -> Self {
        match result {
            ToolResult::Success(data) => Self {
                success: true,
                data: Some(data),
                error: None,
            },
            ToolResult::Failure(error) => Self {
                success: false,
                data: None,
                error: Some(error),
            },
        }
    }
}

impl TryFrom<ToolResultWire> for ToolResult {
    type Error = String;

    fn try_from(wire: ToolResultWire) -> std::result::Result<Self, Self::Error> {
        if wire.success {
            Ok(Self::Success(wire.data.unwrap_or(Value::Null)))
        } else {
            Ok(Self::Failure(
                wire.error.unwrap_or_else(|| "Unknown error".to_string()),
            ))
        }
    }
}

/// Tools owned by one agent, keyed by name in registration order.
///
/// Tools can be added after the agent is shared, never removed.
#[derive(Default)]
pub struct ToolSet {
    tools: RwLock<Vec<Arc<dyn Tool>>>,
}

impl ToolSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. A tool with the same name is replaced.
    pub fn register(&self, owner: &str, tool: Arc<dyn Tool>) {
        let mut tools = self.tools.write();
        if let Some(slot) = tools.iter_mut().find(|t| t.name() == tool.name()) {
            warn!(
                agent = %owner,
                tool = %tool.name(),
                "Tool already registered, overwriting"
            );
            *slot = tool;
        } else {
            info!(agent = %owner, tool = %tool.name(), "Registered tool");
            tools.push(tool);
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.read().iter().find(|t| t.name() == name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.read().iter().map(|t| t.name().to_string()).collect()
    }

    /// `(name, description)` pairs in registration order.
    pub fn describe(&self) -> Vec<(String, String)> {
        self.tools
            .read()
            .iter()
            .map(|t| (t.name().to_string(), t.description().to_string()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.read().is_empty()
    }
}

impl std::fmt::Debug for ToolSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolSet").field("tools", &self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Params;
    use async_trait::async_trait;
    use serde_json::json;

    struct StaticTool {
        name: &'static str,
        description: &'static str,
    }

    #[async_trait]
    impl Tool for StaticTool {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            self.description
        }

        async fn execute(&self, _params: Params) -> ToolResult {
            ToolResult::success(json!({ "tool": self.name }))
        }
    }

    #[test]
    fn success_serializes_with_data_only() {
        let json = serde_json::to_value(ToolResult::success(json!({"id": 7}))).unwrap();
        assert_eq!(json, json!({"success": true, "data": {"id": 7}}));
    }

    #[test]
    fn failure_serializes_with_error_only() {
        let json = serde_json::to_value(ToolResult::failure("boom")).unwrap();
        assert_eq!(json, json!({"success": false, "error": "boom"}));
    }

    #[test]
    fn failure_without_message_deserializes() {
        let result: ToolResult = serde_json::from_value(json!({"success": false})).unwrap();
        assert_eq!(result.error(), Some("Unknown error"));
        assert!(result.data().is_none());
    }

    #[test]
    fn register_replaces_same_name_in_place() {
        let set = ToolSet::new();
        set.register(
            "hr",
            Arc::new(StaticTool {
                name: "directory",
                description: "v1",
            }),
        );
        set.register(
            "hr",
            Arc::new(StaticTool {
                name: "leave",
                description: "leave",
            }),
        );
        set.register(
            "hr",
            Arc::new(StaticTool {
                name: "directory",
                description: "v2",
            }),
        );

        assert_eq!(set.len(), 2);
        assert_eq!(set.names(), vec!["directory", "leave"]);
        assert_eq!(set.get("directory").unwrap().description(), "v2");
    }

    #[tokio::test]
    async fn registered_tool_is_executable() {
        let set = ToolSet::new();
        set.register(
            "hr",
            Arc::new(StaticTool {
                name: "directory",
                description: "Employee records",
            }),
        );

        let tool = set.get("directory").unwrap();
        let result = tool.execute(Params::new()).await;
        assert_eq!(result.data(), Some(&json!({"tool": "directory"})));
        assert!(set.get("missing").is_none());
    }
}
