//! Workflow steps: action, optional predicate, optional error hook.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use switchboard_common::{Result, ToolResult};

use super::state::WorkflowState;

/// Outcome of one step action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum StepResult {
    Success {
        data: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Failure {
        error: String,
    },
}

impl StepResult {
    pub fn success(data: impl Into<Value>) -> Self {
        Self::Success {
            data: data.into(),
            message: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self::Failure {
            error: error.into(),
        }
    }

    /// Attach a human-readable message; ignored on failures.
    pub fn with_message(self, text: impl Into<String>) -> Self {
        match self {
            Self::Success { data, .. } => Self::Success {
                data,
                message: Some(text.into()),
            },
            failure => failure,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

impl From<ToolResult> for StepResult {
    fn from(result: ToolResult) -> Self {
        match result {
            ToolResult::Success(data) => Self::success(data),
            ToolResult::Failure(error) => Self::failure(error),
        }
    }
}

/// Boxed future returned by closure-based step actions.
pub type StepFuture<'a> = BoxFuture<'a, Result<StepResult>>;

/// The work a step performs.
///
/// An `Err` is treated the same as [`StepResult::Failure`].
#[async_trait]
pub trait StepAction: Send + Sync {
    async fn run(&self, state: &mut WorkflowState) -> Result<StepResult>;
}

struct FnAction<F>(F);

#[async_trait]
impl<F> StepAction for FnAction<F>
where
    F: for<'a> Fn(&'a mut WorkflowState) -> StepFuture<'a> + Send + Sync,
{
    async fn run(&self, state: &mut WorkflowState) -> Result<StepResult> {
        (self.0)(state).await
    }
}

pub type Predicate = Arc<dyn Fn(&WorkflowState) -> bool + Send + Sync>;

/// Runs after a step fails. Sees the state read-only and cannot change the
/// outcome.
pub type ErrorHook = Arc<dyn for<'a> Fn(&'a str, &'a WorkflowState) -> BoxFuture<'a, ()> + Send + Sync>;

#[derive(Clone)]
pub struct WorkflowStep {
    pub name: String,
    pub description: String,
    /// Department the step talks to, for listings only.
    pub agent: Option<String>,
    /// Tool the step calls, for listings only.
    pub tool: Option<String>,
    pub(crate) action: Arc<dyn StepAction>,
    pub(crate) predicate: Option<Predicate>,
    pub(crate) on_error: Option<ErrorHook>,
}

impl WorkflowStep {
    pub fn new(name: impl Into<String>, action: impl StepAction + 'static) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            agent: None,
            tool: None,
            action: Arc::new(action),
            predicate: None,
            on_error: None,
        }
    }

    /// Build a step from a closure returning a boxed future.
    ///
    /// ```ignore
    /// WorkflowStep::from_fn("Count", |state| {
    ///     Box::pin(async move {
    ///         state.set("count", 3);
    ///         Ok(StepResult::success(3))
    ///     })
    /// })
    /// ```
    pub fn from_fn<F>(name: impl Into<String>, action: F) -> Self
    where
        F: for<'a> Fn(&'a mut WorkflowState) -> StepFuture<'a> + Send + Sync + 'static,
    {
        Self::new(name, FnAction(action))
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Record which agent and tool the step uses.
    pub fn using(mut self, agent: impl Into<String>, tool: impl Into<String>) -> Self {
        self.agent = Some(agent.into());
        self.tool = Some(tool.into());
        self
    }

    /// Only run the step when `predicate` holds for the current state.
    pub fn when<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&WorkflowState) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    pub fn on_error<H>(mut self, hook: H) -> Self
    where
        H: for<'a> Fn(&'a str, &'a WorkflowState) -> BoxFuture<'a, ()> + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(hook));
        self
    }

    pub(crate) fn should_run(&self, state: &WorkflowState) -> bool {
        self.predicate.as_ref().map_or(true, |p| p(state))
    }
}

impl std::fmt::Debug for WorkflowStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowStep")
            .field("name", &self.name)
            .field("agent", &self.agent)
            .field("tool", &self.tool)
            .field("conditional", &self.predicate.is_some())
            .finish()
    }
}
