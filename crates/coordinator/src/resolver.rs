//! Department detection: context override, learned intent, keyword scoring.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use serde_json::Value;
use switchboard_agents::AgentRegistry;
use switchboard_common::{Agent, DetectionMethod, IntentDetection, Params};
use tracing::{debug, info, warn};

use crate::classifier::IntentClassifier;
use crate::config::RouterConfig;

const DEPARTMENT_KEY_SCORE: u32 = 10;
const TERM_SCORE: u32 = 2;
/// Score at which keyword confidence reaches 1.0.
const FULL_CONFIDENCE_SCORE: f64 = 15.0;
const DEFAULT_CONFIDENCE: f64 = 0.1;

pub const UNKNOWN_DEPARTMENT: &str = "unknown";

/// Picks the department that should handle a message.
///
/// Precedence is strict: an explicit `department` in the context wins,
/// then the classifier (when enabled), then keyword scoring, then the
/// default department.
pub struct IntentResolver {
    registry: Arc<AgentRegistry>,
    classifier: Option<Arc<dyn IntentClassifier>>,
    learned_intent: bool,
    default_department: Option<String>,
    keywords: BTreeMap<String, Vec<String>>,
}

impl IntentResolver {
    pub fn new(registry: Arc<AgentRegistry>, config: &RouterConfig) -> Self {
        let mut resolver = Self {
            registry,
            classifier: None,
            learned_intent: config.learned_intent,
            default_department: config
                .default_department
                .as_deref()
                .map(normalize)
                .filter(|d| !d.is_empty()),
            keywords: BTreeMap::new(),
        };
        for (department, keywords) in &config.keywords {
            resolver.add_keywords(department, keywords.iter().cloned());
        }
        resolver
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn IntentClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    /// True when learned intent is switched on and a classifier is attached.
    pub fn learned_enabled(&self) -> bool {
        self.learned_intent && self.classifier.is_some()
    }

    /// Add extra keywords for a department. Keywords are lowercased and
    /// duplicates are ignored.
    pub fn add_keywords<I, S>(&mut self, department: &str, keywords: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let department = normalize(department);
        let entry = self.keywords.entry(department.clone()).or_default();
        let before = entry.len();
        for keyword in keywords {
            let keyword = keyword.into().trim().to_lowercase();
            if !keyword.is_empty() && !entry.contains(&keyword) {
                entry.push(keyword);
            }
        }
        info!(department = %department, count = entry.len() - before, "Added custom keywords");
    }

    /// Number of extra keywords configured per department.
    pub fn keyword_counts(&self) -> BTreeMap<String, usize> {
        self.keywords
            .iter()
            .map(|(department, keywords)| (department.clone(), keywords.len()))
            .collect()
    }

    pub async fn resolve(&self, message: &str, context: &Params) -> IntentDetection {
        if let Some(detection) = self.from_context(context) {
            return detection;
        }

        if let Some(detection) = self.from_classifier(message).await {
            return detection;
        }

        self.from_keywords(message)
    }

    fn from_context(&self, context: &Params) -> Option<IntentDetection> {
        let requested = context.get("department").and_then(Value::as_str)?;
        let department = normalize(requested);

        if !self.registry.has(&department) {
            debug!(department = %department, "Context names an unregistered department, ignoring");
            return None;
        }

        debug!(department = %department, "Department taken from context");
        Some(IntentDetection::new(
            department,
            1.0,
            "Explicit department specified in context",
            DetectionMethod::Context,
        ))
    }

    async fn from_classifier(&self, message: &str) -> Option<IntentDetection> {
        if !self.learned_intent {
            return None;
        }
        let classifier = self.classifier.as_ref()?;
        if self.registry.is_empty() {
            debug!("No agents registered, skipping learned intent");
            return None;
        }

        let classification = match classifier.classify(message, &self.registry.summaries()).await
        {
            Ok(classification) => classification,
            Err(e) => {
                warn!(error = %e, "Learned intent detection failed, falling back to keywords");
                return None;
            }
        };

        let department = normalize(&classification.department);
        if !self.registry.has(&department) {
            warn!(
                department = %department,
                "Classifier returned an unregistered department, falling back to keywords"
            );
            return None;
        }

        let mut detection = IntentDetection::new(
            department,
            classification.confidence,
            classification.reasoning,
            DetectionMethod::Learned,
        );
        if let Some(action) = classification.action {
            detection = detection.with_action(action);
        }
        if !classification.parameters.is_empty() {
            detection = detection.with_parameters(classification.parameters);
        }
        Some(detection)
    }

    fn from_keywords(&self, message: &str) -> IntentDetection {
        let lower = message.to_lowercase();
        let mut best: Option<(&str, u32)> = None;

        for (department, agent) in self.registry.iter() {
            let score = self.score(department, agent.description(), &lower);
            debug!(department = %department, score, "Department scoring");

            match best {
                Some((_, top)) if score <= top => {}
                _ if score > 0 => best = Some((department, score)),
                _ => {}
            }
        }

        if let Some((department, score)) = best {
            let confidence = (f64::from(score) / FULL_CONFIDENCE_SCORE).min(1.0);
            return IntentDetection::new(
                department,
                confidence,
                format!("Keyword score {score} for {department}"),
                DetectionMethod::Keyword,
            );
        }

        let department = self
            .default_department
            .clone()
            .or_else(|| self.registry.departments().into_iter().next())
            .unwrap_or_else(|| UNKNOWN_DEPARTMENT.to_string());

        debug!(department = %department, "No keyword match, using default department");
        IntentDetection::new(
            department,
            DEFAULT_CONFIDENCE,
            "No specific department detected, using default",
            DetectionMethod::Keyword,
        )
    }

    /// Keyword score of one department against a lowercased message.
    fn score(&self, department: &str, description: &str, lower: &str) -> u32 {
        let mut score = 0;

        if lower.contains(department) {
            score += DEPARTMENT_KEY_SCORE;
        }

        let description = description.to_lowercase();
        let terms: HashSet<&str> = description
            .split(|c: char| !c.is_alphanumeric())
            .filter(|term| term.chars().count() > 3)
            .collect();
        score += TERM_SCORE * terms.iter().filter(|term| lower.contains(**term)).count() as u32;

        if let Some(keywords) = self.keywords.get(department) {
            score += TERM_SCORE
                * keywords
                    .iter()
                    .filter(|keyword| lower.contains(keyword.as_str()))
                    .count() as u32;
        }

        score
    }
}

fn normalize(department: &str) -> String {
    department.trim().to_lowercase()
}
