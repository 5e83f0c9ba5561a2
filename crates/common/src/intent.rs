//! Intent detection types produced by the resolver.

use serde::{Deserialize, Serialize};

use crate::Params;

/// How a department was chosen for a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionMethod {
    /// The caller named the department explicitly.
    Context,
    /// The external classification service picked the department.
    Learned,
    /// Deterministic keyword scoring.
    Keyword,
}

/// The resolver's decision about which department handles a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentDetection {
    /// Registry key of the chosen agent (lowercase).
    pub department: String,

    /// Confidence score (0.0 - 1.0)
    pub confidence: f64,

    /// Human-readable justification
    pub reason: String,

    pub method: DetectionMethod,

    /// Action identifier, when the classifier supplied one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,

    /// Entities extracted from the message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Params>,
}

impl IntentDetection {
    pub fn new(
        department: impl Into<String>,
        confidence: f64,
        reason: impl Into<String>,
        method: DetectionMethod,
    ) -> Self {
        Self {
            department: department.into(),
            confidence: confidence.clamp(0.0, 1.0),
            reason: reason.into(),
            method,
            action: None,
            parameters: None,
        }
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn with_parameters(mut self, parameters: Params) -> Self {
        self.parameters = Some(parameters);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_is_clamped() {
        let high = IntentDetection::new("hr", 3.5, "test", DetectionMethod::Learned);
        let low = IntentDetection::new("hr", -1.0, "test", DetectionMethod::Learned);

        assert_eq!(high.confidence, 1.0);
        assert_eq!(low.confidence, 0.0);
    }

    #[test]
    fn method_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&DetectionMethod::Context).unwrap(),
            "\"context\""
        );
        assert_eq!(
            serde_json::to_string(&DetectionMethod::Learned).unwrap(),
            "\"learned\""
        );
        assert_eq!(
            serde_json::to_string(&DetectionMethod::Keyword).unwrap(),
            "\"keyword\""
        );
    }

    #[test]
    fn optional_fields_are_skipped() {
        let detection = IntentDetection::new("hr", 1.0, "explicit", DetectionMethod::Context);
        let json = serde_json::to_value(&detection).unwrap();

        assert!(json.get("action").is_none());
        assert!(json.get("parameters").is_none());
        assert_eq!(json["method"], "context");
    }
}
