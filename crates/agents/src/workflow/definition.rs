use std::time::Duration;

use async_trait::async_trait;
use switchboard_common::Params;

use super::engine::WorkflowEngine;
use super::state::WorkflowResult;
use super::step::WorkflowStep;

/// Per-run options.
#[derive(Debug, Clone, Default)]
pub struct WorkflowOptions {
    pub session_id: String,
    /// Initial contents of the data bag.
    pub context: Params,
    /// Keep running later steps after a failure.
    pub continue_on_error: bool,
    /// Upper bound on a single step; exceeding it is a step failure.
    pub step_timeout: Option<Duration>,
}

impl WorkflowOptions {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            ..Self::default()
        }
    }

    pub fn with_context(mut self, context: Params) -> Self {
        self.context = context;
        self
    }

    pub fn continue_on_error(mut self, value: bool) -> Self {
        self.continue_on_error = value;
        self
    }

    pub fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = Some(timeout);
        self
    }
}

/// Anything that can be run to produce a [`WorkflowResult`].
#[async_trait]
pub trait Workflow: Send + Sync {
    fn id(&self) -> &str;

    fn name(&self) -> &str;

    async fn run(&self, options: WorkflowOptions) -> WorkflowResult;
}

/// A named, ordered list of steps plus detection metadata.
#[derive(Debug, Clone)]
pub struct WorkflowDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    pub steps: Vec<WorkflowStep>,
    /// Phrases that select this workflow from free text.
    pub keywords: Vec<String>,
    /// Fields that must be present in the context before running.
    pub required_context: Vec<String>,
}

impl WorkflowDefinition {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            steps: Vec::new(),
            keywords: Vec::new(),
            required_context: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn step(mut self, step: WorkflowStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_required_context<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_context = fields.into_iter().map(Into::into).collect();
        self
    }
}

#[async_trait]
impl Workflow for WorkflowDefinition {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, options: WorkflowOptions) -> WorkflowResult {
        WorkflowEngine::new().execute(self, options).await
    }
}
