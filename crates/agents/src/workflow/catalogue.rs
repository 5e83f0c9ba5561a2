//! Registered workflow definitions, with keyword detection and context checks.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use switchboard_common::Params;
use tracing::{debug, info, warn};

use super::definition::WorkflowDefinition;

/// Outcome of checking a context against a workflow's required fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextValidation {
    pub valid: bool,
    /// Missing fields, in the order the workflow declares them.
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowSummary {
    pub id: String,
    pub name: String,
    pub description: String,
    pub steps: usize,
    pub keywords: Vec<String>,
    pub required_context: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogueStats {
    pub total: usize,
    pub workflows: Vec<WorkflowSummary>,
}

#[derive(Default)]
pub struct WorkflowCatalogue {
    workflows: HashMap<String, Arc<WorkflowDefinition>>,
    order: Vec<String>,
}

impl WorkflowCatalogue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition. Re-registering an id replaces the definition
    /// but keeps its position.
    pub fn register(&mut self, definition: WorkflowDefinition) {
        let id = definition.id.clone();
        let name = definition.name.clone();
        if self.workflows.insert(id.clone(), Arc::new(definition)).is_some() {
            warn!(workflow_id = %id, workflow = %name, "Workflow already registered, overwriting");
        } else {
            info!(workflow_id = %id, workflow = %name, "Registered workflow");
            self.order.push(id);
        }
    }

    pub fn get(&self, id: &str) -> Option<Arc<WorkflowDefinition>> {
        self.workflows.get(id).cloned()
    }

    /// Definitions in registration order.
    pub fn all(&self) -> Vec<Arc<WorkflowDefinition>> {
        self.order
            .iter()
            .filter_map(|id| self.workflows.get(id).cloned())
            .collect()
    }

    /// First workflow, in registration order, with a keyword contained in
    /// the message (case-insensitive).
    pub fn detect_by_keywords(&self, message: &str) -> Option<Arc<WorkflowDefinition>> {
        let lower = message.to_lowercase();
        let found = self.all().into_iter().find(|workflow| {
            workflow
                .keywords
                .iter()
                .any(|keyword| !keyword.is_empty() && lower.contains(&keyword.to_lowercase()))
        });

        match &found {
            Some(workflow) => debug!(workflow_id = %workflow.id, "Detected workflow by keyword"),
            None => debug!("No workflow keyword matched"),
        }
        found
    }

    /// Check that every required field is present and non-empty.
    ///
    /// Absent keys, `null` and blank strings count as missing.
    pub fn validate_context(
        &self,
        definition: &WorkflowDefinition,
        context: &Params,
    ) -> ContextValidation {
        let missing: Vec<String> = definition
            .required_context
            .iter()
            .filter(|field| match context.get(field.as_str()) {
                None | Some(Value::Null) => true,
                Some(Value::String(s)) => s.trim().is_empty(),
                Some(_) => false,
            })
            .cloned()
            .collect();

        ContextValidation {
            valid: missing.is_empty(),
            missing,
        }
    }

    pub fn stats(&self) -> CatalogueStats {
        let workflows: Vec<WorkflowSummary> = self
            .all()
            .iter()
            .map(|w| WorkflowSummary {
                id: w.id.clone(),
                name: w.name.clone(),
                description: w.description.clone(),
                steps: w.steps.len(),
                keywords: w.keywords.clone(),
                required_context: w.required_context.clone(),
            })
            .collect();

        CatalogueStats {
            total: workflows.len(),
            workflows,
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
