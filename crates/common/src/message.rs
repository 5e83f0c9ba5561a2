//! Response type returned by agents.

use serde::{Deserialize, Serialize};

/// What an agent hands back after processing a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentResponse {
    /// Text shown to the user
    pub message: String,

    /// Names of the tools the agent invoked
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools_used: Vec<String>,

    /// Structured payload (owned by the agent, opaque to the core)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,

    pub session_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
}

impl AgentResponse {
    pub fn new(message: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            tools_used: Vec::new(),
            data: None,
            session_id: session_id.into(),
            department: None,
        }
    }

    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.tools_used.push(tool.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_camel_case_keys() {
        let response = AgentResponse::new("done", "session-1")
            .with_department("hr")
            .with_tool("employee_directory");

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["sessionId"], "session-1");
        assert_eq!(json["toolsUsed"][0], "employee_directory");
        assert_eq!(json["department"], "hr");
        assert!(json.get("data").is_none());
    }
}
