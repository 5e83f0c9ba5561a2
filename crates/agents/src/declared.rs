//! Agents declared in configuration rather than compiled in.
//!
//! A declared agent carries a name, description and action list so that it
//! takes part in routing. It acknowledges messages and runs whatever tools
//! have been registered on it; it has no business logic of its own.

use async_trait::async_trait;
use serde_json::json;
use switchboard_common::{Agent, AgentResponse, IntentDetection, Params, Result, ToolSet};
use tracing::info;

pub struct DeclaredAgent {
    name: String,
    description: String,
    actions: Vec<String>,
    tools: ToolSet,
}

impl DeclaredAgent {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            actions: Vec::new(),
            tools: ToolSet::new(),
        }
    }

    pub fn with_actions<I, S>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.actions = actions.into_iter().map(Into::into).collect();
        self
    }
}

#[async_trait]
impl Agent for DeclaredAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn supported_actions(&self) -> Vec<String> {
        self.actions.clone()
    }

    fn tools(&self) -> &ToolSet {
        &self.tools
    }

    async fn process_message(
        &self,
        message: &str,
        session_id: &str,
        context: &Params,
        detection: Option<&IntentDetection>,
    ) -> Result<AgentResponse> {
        let action = detection.and_then(|d| d.action.as_deref());
        info!(
            agent = %self.name,
            session_id = %session_id,
            action = action.unwrap_or("-"),
            "Processing message"
        );

        let text = match action {
            Some(action) => format!("{} received {action}: {message}", self.name),
            None => format!("{} received: {message}", self.name),
        };

        Ok(AgentResponse::new(text, session_id).with_data(json!({
            "action": action,
            "context": context,
        })))
    }
}
