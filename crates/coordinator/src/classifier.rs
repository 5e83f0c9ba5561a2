//! Learned intent detection.
//!
//! [`IntentClassifier`] is the seam the resolver depends on. The shipped
//! implementation, [`LlmIntentClassifier`], asks an OpenAI-compatible model
//! (LM Studio by default) to pick a department and action and to extract
//! parameters, then validates what comes back.
//!
//! # Output validation
//!
//! - Input length limit before anything is sent
//! - JSON is pulled out of markdown fences or surrounding prose
//! - Confidence is clamped to `0.0..=1.0`
//! - Actions the chosen agent does not support are dropped
//! - Reasoning is truncated

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use switchboard_agents::AgentSummary;
use switchboard_common::{Params, Result, SwitchboardError};
use switchboard_llm::{LlmClient, LlmRequest};
use tracing::{debug, info, warn};

/// Maximum length for user input content.
const MAX_INPUT_CONTENT_LENGTH: usize = 10_000;

/// Maximum length for the reasoning field.
const MAX_REASONING_LENGTH: usize = 500;

const DEFAULT_TEMPERATURE: f32 = 0.1;

/// What a classifier decided about a message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    /// Department key as returned by the classifier, lowercased.
    /// Not guaranteed to be registered.
    pub department: String,
    pub confidence: f64,
    pub action: Option<String>,
    pub reasoning: String,
    pub parameters: Params,
}

/// External natural-language intent classification.
///
/// An `Err` means the service is unavailable or answered with something
/// unusable; callers fall back to keyword detection.
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(&self, message: &str, agents: &[AgentSummary]) -> Result<Classification>;
}

const CLASSIFIER_SYSTEM_PROMPT: &str = r#"You are an intelligent router for a multi-agent business system.

Your job is to analyze the user's message and decide which department agent should handle it, and which of that agent's actions fits the request.

IMPORTANT: Respond ONLY with a JSON object, no other text. The JSON must have this exact structure:

{
  "department": "one of the department keys listed below",
  "action": "one of that department's supported actions, or null",
  "parameters": { "extracted": "values" },
  "confidence": 0.0-1.0,
  "reasoning": "brief explanation of your routing decision"
}

Field rules:
- "department" must be one of the listed keys, exactly as written
- "action" must come from the "Supported actions" list of the chosen department; use null if none fits
- "parameters" holds entities from the message: for employee searches put the name in "name"; for inventory put the item in "item" and the amount in "quantity"; also dates, ids and project names
- "confidence" should reflect how certain you are (0.0 = guess, 1.0 = certain)"#;

/// Render the agent list shown to the model.
fn agent_context(agents: &[AgentSummary]) -> String {
    agents
        .iter()
        .map(|agent| {
            let actions = if agent.supported_actions.is_empty() {
                "none".to_string()
            } else {
                agent.supported_actions.join(", ")
            };
            format!(
                "- {} ({}): {}\n  Supported actions: {}",
                agent.department, agent.name, agent.description, actions
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Validate user input content before sending it to the model.
pub fn validate_input_content(content: &str) -> Result<()> {
    if content.trim().is_empty() {
        return Err(SwitchboardError::Classification(
            "Input content is empty".to_string(),
        ));
    }

    if content.len() > MAX_INPUT_CONTENT_LENGTH {
        return Err(SwitchboardError::Classification(format!(
            "Input content exceeds maximum length of {} bytes",
            MAX_INPUT_CONTENT_LENGTH
        )));
    }

    // Legitimate requests may contain JSON, so this only warns.
    if content.contains(r#""department":"#) || content.contains(r#""department" :"#) {
        warn!("Input content contains department JSON - potential injection attempt");
    }

    Ok(())
}

/// Classifier backed by a chat-completion model.
pub struct LlmIntentClassifier {
    client: Arc<dyn LlmClient>,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl LlmIntentClassifier {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self {
            client,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn build_request(message: &str, agents: &[AgentSummary]) -> LlmRequest {
        let user = format!(
            "Available agents and their responsibilities:\n{}\n\nUser message: \"{}\"",
            agent_context(agents),
            message
        );
        LlmRequest::prompt(CLASSIFIER_SYSTEM_PROMPT, user)
    }
}

#[async_trait]
impl IntentClassifier for LlmIntentClassifier {
    async fn classify(&self, message: &str, agents: &[AgentSummary]) -> Result<Classification> {
        validate_input_content(message)?;

        if agents.is_empty() {
            return Err(SwitchboardError::Classification(
                "No agents are registered".to_string(),
            ));
        }

        debug!(
            model = %self.client.model_name(),
            agents = agents.len(),
            content_preview = %message.chars().take(50).collect::<String>(),
            "Classifying message"
        );

        let request = Self::build_request(message, agents)
            .with_temperature(Some(self.temperature))
            .with_max_tokens(self.max_tokens);
        let response = self.client.complete(request).await?;

        debug!(response = %response.content, "Classifier response");

        let classification = parse_classification(&response.content, agents)?;

        info!(
            department = %classification.department,
            action = ?classification.action,
            confidence = classification.confidence,
            "Learned intent decision"
        );

        Ok(classification)
    }
}

/// Turn a raw model answer into a [`Classification`].
fn parse_classification(response: &str, agents: &[AgentSummary]) -> Result<Classification> {
    let parsed = extract_json_object(response).ok_or_else(|| {
        SwitchboardError::Classification(format!(
            "No valid JSON found in response: {}",
            response.chars().take(200).collect::<String>()
        ))
    })?;

    let department = parsed
        .get("department")
        .and_then(Value::as_str)
        .map(|d| d.trim().to_lowercase())
        .filter(|d| !d.is_empty())
        .ok_or_else(|| {
            SwitchboardError::Classification("Response has no department".to_string())
        })?;

    let confidence = parsed
        .get("confidence")
        .and_then(Value::as_f64)
        .unwrap_or(0.5)
        .clamp(0.0, 1.0);

    let reasoning = parsed
        .get("reasoning")
        .and_then(Value::as_str)
        .unwrap_or("No reasoning provided");
    let reasoning = if reasoning.chars().count() > MAX_REASONING_LENGTH {
        reasoning.chars().take(MAX_REASONING_LENGTH).collect::<String>() + "..."
    } else {
        reasoning.to_string()
    };

    let action = parsed
        .get("action")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .and_then(|action| supported_action(agents, &department, action));

    let parameters = match parsed.get("parameters") {
        Some(Value::Object(map)) => map.clone(),
        _ => Params::new(),
    };

    Ok(Classification {
        department,
        confidence,
        action,
        reasoning,
        parameters,
    })
}

/// The agent's own spelling of `action`, or `None` if the agent declares
/// actions and `action` is not one of them.
fn supported_action(agents: &[AgentSummary], department: &str, action: &str) -> Option<String> {
    let Some(agent) = agents.iter().find(|a| a.department == department) else {
        return Some(action.to_string());
    };
    if agent.supported_actions.is_empty() {
        return Some(action.to_string());
    }

    let found = agent
        .supported_actions
        .iter()
        .find(|known| known.eq_ignore_ascii_case(action))
        .cloned();
    if found.is_none() {
        warn!(department = %department, action = %action, "Classifier returned unsupported action, dropping it");
    }
    found
}

/// Extract a JSON object from a model answer that may contain other text.
///
/// Tries a fenced code block first, then every balanced `{...}` span that
/// parses and has a `department` key, then any balanced object at all.
fn extract_json_object(s: &str) -> Option<Value> {
    if let Some(value) = fenced_block(s).and_then(|block| serde_json::from_str::<Value>(block).ok())
    {
        if value.is_object() {
            return Some(value);
        }
    }

    let candidates: Vec<Value> = s
        .char_indices()
        .filter(|(_, c)| *c == '{')
        .filter_map(|(start, _)| balanced_object(&s[start..]))
        .filter_map(|span| serde_json::from_str::<Value>(span).ok())
        .filter(Value::is_object)
        .collect();

    candidates
        .iter()
        .find(|v| v.get("department").is_some())
        .or_else(|| candidates.first())
        .cloned()
}

/// Contents of the first ```` ``` ```` fence, minus an optional `json` tag.
fn fenced_block(s: &str) -> Option<&str> {
    let start = s.find("```")? + 3;
    let rest = &s[start..];
    let end = rest.find("```")?;
    let block = rest[..end].trim_start();
    Some(block.strip_prefix("json").unwrap_or(block).trim())
}

/// The balanced object starting at the first byte of `s`.
fn balanced_object(s: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in s.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&s[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}
