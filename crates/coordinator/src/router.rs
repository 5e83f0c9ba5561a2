//! Message routing: resolve a department, forward to its agent.

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde::Serialize;
use switchboard_agents::AgentRegistry;
use switchboard_common::{panic_message, Agent, AgentResponse, IntentDetection, Params};
use tracing::{debug, error, info};

use crate::classifier::IntentClassifier;
use crate::config::CoordinatorConfig;
use crate::resolver::{IntentResolver, UNKNOWN_DEPARTMENT};

/// An agent's answer plus how its department was chosen.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutedResponse {
    pub response: AgentResponse,
    pub department: String,
    pub detection: IntentDetection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouterStats {
    pub registered_departments: Vec<String>,
    pub total_agents: usize,
    /// Extra keywords configured per department
    pub keyword_counts: BTreeMap<String, usize>,
    pub learned_intent: bool,
}

/// Routes free-form messages to department agents.
pub struct AgentRouter {
    resolver: IntentResolver,
}

impl AgentRouter {
    pub fn new(resolver: IntentResolver) -> Self {
        Self { resolver }
    }

    /// Router over `registry` configured from the `[router]` section.
    pub fn from_config(
        registry: Arc<AgentRegistry>,
        config: &CoordinatorConfig,
        classifier: Option<Arc<dyn IntentClassifier>>,
    ) -> Self {
        let resolver = IntentResolver::new(registry, &config.router);
        let resolver = match classifier {
            Some(classifier) => resolver.with_classifier(classifier),
            None => resolver,
        };
        Self::new(resolver)
    }

    pub fn registry(&self) -> &Arc<AgentRegistry> {
        self.resolver.registry()
    }

    pub fn add_keywords<I, S>(&mut self, department: &str, keywords: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.resolver.add_keywords(department, keywords);
    }

    /// Resolve the department without invoking any agent.
    pub async fn detect(&self, message: &str, context: &Params) -> IntentDetection {
        self.resolver.resolve(message, context).await
    }

    /// Route a message to the agent of the detected department.
    ///
    /// Never fails: a missing agent, an agent error or an agent panic
    /// produces a response for department `"unknown"` with confidence 0.
    pub async fn route(&self, message: &str, session_id: &str, context: &Params) -> RoutedResponse {
        let detection = self.resolver.resolve(message, context).await;

        info!(
            session_id = %session_id,
            message_preview = %message.chars().take(100).collect::<String>(),
            department = %detection.department,
            method = ?detection.method,
            confidence = detection.confidence,
            "Routing message"
        );

        let Some(agent) = self.registry().get(&detection.department) else {
            error!(
                session_id = %session_id,
                department = %detection.department,
                "No agent registered for department"
            );
            return unknown_response(
                session_id,
                &detection,
                &format!("No agent found for department: {}", detection.department),
            );
        };

        let mut forwarded = context.clone();
        if let Some(parameters) = &detection.parameters {
            for (key, value) in parameters {
                forwarded.insert(key.clone(), value.clone());
            }
        }

        let outcome = AssertUnwindSafe(agent.process_message(
            message,
            session_id,
            &forwarded,
            Some(&detection),
        ))
        .catch_unwind()
        .await;

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(panic) => {
                let reason = format!("Agent panicked: {}", panic_message(&*panic));
                error!(
                    session_id = %session_id,
                    department = %detection.department,
                    error = %reason,
                    "Agent panicked while processing message"
                );
                return unknown_response(session_id, &detection, &reason);
            }
        };

        match outcome {
            Ok(mut response) => {
                if response.department.is_none() {
                    response.department = Some(detection.department.clone());
                }
                debug!(
                    session_id = %session_id,
                    department = %detection.department,
                    tools_used = ?response.tools_used,
                    "Agent responded"
                );
                RoutedResponse {
                    response,
                    department: detection.department.clone(),
                    detection,
                }
            }
            Err(e) => {
                error!(
                    session_id = %session_id,
                    department = %detection.department,
                    error = %e,
                    "Agent failed to process message"
                );
                unknown_response(session_id, &detection, &e.to_string())
            }
        }
    }

    pub fn stats(&self) -> RouterStats {
        let registry = self.registry();
        RouterStats {
            registered_departments: registry.departments(),
            total_agents: registry.len(),
            keyword_counts: self.resolver.keyword_counts(),
            learned_intent: self.resolver.learned_enabled(),
        }
    }

    /// Capability text per department, in registration order.
    pub fn capabilities(&self) -> Vec<(String, String)> {
        self.registry().capabilities()
    }
}

fn unknown_response(session_id: &str, detection: &IntentDetection, error: &str) -> RoutedResponse {
    RoutedResponse {
        response: AgentResponse::new(
            format!("Sorry, I encountered an error: {error}"),
            session_id,
        )
        .with_department(UNKNOWN_DEPARTMENT),
        department: UNKNOWN_DEPARTMENT.to_string(),
        detection: IntentDetection::new(
            UNKNOWN_DEPARTMENT,
            0.0,
            format!("Error occurred during routing: {error}"),
            detection.method,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouterConfig;
    use serde_json::json;
    use switchboard_agents::DeclaredAgent;

    fn router(default_department: Option<&str>) -> AgentRouter {
        let mut registry = AgentRegistry::new();
        registry.register(
            "manufacturing",
            Arc::new(DeclaredAgent::new("Manufacturing", "Inventory and production")),
        );
        let config = RouterConfig {
            default_department: default_department.map(str::to_string),
            ..RouterConfig::default()
        };
        AgentRouter::new(IntentResolver::new(Arc::new(registry), &config))
    }

    #[tokio::test]
    async fn routes_to_detected_agent() {
        let routed = router(None)
            .route("inventory check", "s-1", &Params::new())
            .await;

        assert_eq!(routed.department, "manufacturing");
        assert_eq!(routed.response.session_id, "s-1");
        assert_eq!(routed.response.department.as_deref(), Some("manufacturing"));
        assert!(routed.response.message.starts_with("Manufacturing received"));
    }

    #[tokio::test]
    async fn unregistered_default_yields_unknown() {
        let routed = router(Some("finance"))
            .route("good morning", "s-2", &Params::new())
            .await;

        assert_eq!(routed.department, "unknown");
        assert_eq!(routed.detection.department, "unknown");
        assert_eq!(routed.detection.confidence, 0.0);
        assert!(routed.response.message.contains("finance"));
    }

    #[test]
    fn stats_report_registry_and_keywords() {
        let mut router = router(None);
        router.add_keywords("manufacturing", ["bolts", "reorder"]);

        let stats = router.stats();
        assert_eq!(stats.registered_departments, vec!["manufacturing"]);
        assert_eq!(stats.total_agents, 1);
        assert_eq!(stats.keyword_counts["manufacturing"], 2);
        assert!(!stats.learned_intent);
    }

    #[test]
    fn routed_response_serializes_camel_case() {
        let detection = IntentDetection::new(
            "hr",
            0.5,
            "test",
            switchboard_common::DetectionMethod::Keyword,
        );
        let routed = unknown_response("s", &detection, "boom");
        let value = serde_json::to_value(&routed).unwrap();

        assert_eq!(value["department"], json!("unknown"));
        assert_eq!(value["response"]["sessionId"], json!("s"));
        assert_eq!(value["detection"]["method"], json!("keyword"));
    }
}
