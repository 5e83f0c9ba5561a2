//! Graph-shaped workflows: named nodes joined by fixed or state-dependent edges.
//!
//! A run starts at the entry node and follows edges until it reaches
//! [`Next::End`], a node without an outgoing edge, a failing node, or the
//! transition limit. Unlike the sequential engine there is no
//! continue-on-error: the first failure ends the run.
//!
//! `steps_completed` counts distinct nodes that succeeded, so a node
//! revisited through a cycle counts once against `total_steps`.

use std::collections::{HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use switchboard_common::panic_message;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::definition::{Workflow, WorkflowOptions};
use super::engine::{evaluate_predicate, run_error_hook, run_step};
use super::state::{WorkflowResult, WorkflowState, WorkflowStatus};
use super::step::{StepResult, WorkflowStep};

const DEFAULT_MAX_TRANSITIONS: usize = 25;

/// Where to go after a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Next {
    Node(String),
    End,
}

impl Next {
    pub fn node(name: impl Into<String>) -> Self {
        Self::Node(name.into())
    }
}

pub type Selector = Arc<dyn Fn(&WorkflowState) -> Next + Send + Sync>;

#[derive(Clone)]
enum Edge {
    Fixed(Next),
    Conditional(Selector),
}

#[derive(Clone)]
pub struct GraphWorkflow {
    id: String,
    name: String,
    description: String,
    entry: Option<String>,
    nodes: HashMap<String, WorkflowStep>,
    edges: HashMap<String, Edge>,
    max_transitions: usize,
}

impl GraphWorkflow {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            entry: None,
            nodes: HashMap::new(),
            edges: HashMap::new(),
            max_transitions: DEFAULT_MAX_TRANSITIONS,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add a node named after the step. The first node added is the entry
    /// unless [`GraphWorkflow::entry`] says otherwise.
    pub fn node(mut self, step: WorkflowStep) -> Self {
        if self.entry.is_none() {
            self.entry = Some(step.name.clone());
        }
        self.nodes.insert(step.name.clone(), step);
        self
    }

    pub fn entry(mut self, name: impl Into<String>) -> Self {
        self.entry = Some(name.into());
        self
    }

    pub fn edge(mut self, from: impl Into<String>, to: Next) -> Self {
        self.edges.insert(from.into(), Edge::Fixed(to));
        self
    }

    pub fn conditional_edge<S>(mut self, from: impl Into<String>, selector: S) -> Self
    where
        S: Fn(&WorkflowState) -> Next + Send + Sync + 'static,
    {
        self.edges
            .insert(from.into(), Edge::Conditional(Arc::new(selector)));
        self
    }

    pub fn with_max_transitions(mut self, max: usize) -> Self {
        self.max_transitions = max;
        self
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Follow the edge out of `node`. A panicking selector yields its
    /// panic message as the error.
    fn next_after(&self, node: &str, state: &WorkflowState) -> Result<Next, String> {
        match self.edges.get(node) {
            Some(Edge::Fixed(next)) => Ok(next.clone()),
            Some(Edge::Conditional(select)) => {
                std::panic::catch_unwind(AssertUnwindSafe(|| select(state)))
                    .map_err(|panic| panic_message(&*panic))
            }
            None => {
                debug!(workflow = %self.name, node = %node, "Node has no outgoing edge");
                Ok(Next::End)
            }
        }
    }

    pub async fn execute(&self, options: WorkflowOptions) -> WorkflowResult {
        let start_time = Instant::now();
        let workflow_id = Uuid::new_v4().to_string();

        let mut state = WorkflowState::new(
            workflow_id.clone(),
            options.session_id,
            self.node_count(),
            options.context,
        );
        state.status = WorkflowStatus::Running;

        info!(
            workflow_id = %workflow_id,
            workflow = %self.name,
            nodes = self.node_count(),
            "Starting graph workflow"
        );

        let mut completed = HashSet::new();
        let mut visits = 0;
        let mut current = match &self.entry {
            Some(entry) => Next::Node(entry.clone()),
            None => Next::End,
        };

        while let Next::Node(name) = current {
            let Some(step) = self.nodes.get(&name) else {
                error!(workflow_id = %workflow_id, node = %name, "Edge points to unknown node");
                state.errors.push(format!("Unknown node: {name}"));
                state.status = WorkflowStatus::Failed;
                break;
            };

            if visits >= self.max_transitions {
                warn!(
                    workflow_id = %workflow_id,
                    max_transitions = self.max_transitions,
                    "Transition limit reached"
                );
                state.errors.push(format!(
                    "Exceeded {} transitions at node {}",
                    self.max_transitions, name
                ));
                state.status = WorkflowStatus::Failed;
                break;
            }
            visits += 1;
            state.current_step = visits;

            let outcome = match evaluate_predicate(step, &state) {
                Ok(true) => {
                    info!(workflow_id = %workflow_id, step = visits, node = %name, "Executing node");
                    Some(run_step(step, &mut state, options.step_timeout).await)
                }
                Ok(false) => {
                    info!(workflow_id = %workflow_id, node = %name, "Skipping node due to condition");
                    None
                }
                Err(failure) => Some(failure),
            };

            match outcome {
                Some(StepResult::Success { data, .. }) => {
                    state.results.push(data);
                    completed.insert(name.clone());
                }
                Some(StepResult::Failure { error: err }) => {
                    error!(workflow_id = %workflow_id, node = %name, error = %err, "Node failed");
                    state
                        .errors
                        .push(format!("Step {} ({}): {}", visits, name, err));
                    run_error_hook(step, &err, &state).await;
                    state.status = WorkflowStatus::Failed;
                    break;
                }
                None => {}
            }

            current = match self.next_after(&name, &state) {
                Ok(next) => next,
                Err(panic) => {
                    error!(workflow_id = %workflow_id, node = %name, error = %panic, "Edge selector panicked");
                    state
                        .errors
                        .push(format!("Edge selector after {name} panicked: {panic}"));
                    state.status = WorkflowStatus::Failed;
                    break;
                }
            };
        }

        if state.status != WorkflowStatus::Failed {
            state.status = WorkflowStatus::Completed;
        }
        state.completed_at = Some(Utc::now());

        let steps_completed = completed.len();
        let execution_time_ms = start_time.elapsed().as_millis() as u64;
        info!(
            workflow_id = %workflow_id,
            workflow = %self.name,
            status = ?state.status,
            steps_completed,
            visits,
            "Graph workflow finished"
        );

        WorkflowResult::from_state(&self.name, state, steps_completed, execution_time_ms)
    }
}

#[async_trait]
impl Workflow for GraphWorkflow {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, options: WorkflowOptions) -> WorkflowResult {
        self.execute(options).await
    }
}

impl std::fmt::Debug for GraphWorkflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphWorkflow")
            .field("id", &self.id)
            .field("entry", &self.entry)
            .field("nodes", &self.nodes.keys().collect::<Vec<_>>())
            .finish()
    }
}
