//! Sequential step execution.
//!
//! Steps run strictly in order. Each step may be skipped by its predicate.
//! A failed step is recorded as `"Step <n> (<name>): <error>"`, its error
//! hook runs, and the run stops unless `continue_on_error` is set.

use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::FutureExt;
use switchboard_common::panic_message;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::definition::{WorkflowDefinition, WorkflowOptions};
use super::state::{WorkflowResult, WorkflowState, WorkflowStatus};
use super::step::{StepResult, WorkflowStep};

#[derive(Debug, Clone, Copy, Default)]
pub struct WorkflowEngine;

impl WorkflowEngine {
    pub fn new() -> Self {
        Self
    }

    /// Run `definition` to completion. Never fails; problems are reported
    /// in the returned result.
    pub async fn execute(
        &self,
        definition: &WorkflowDefinition,
        options: WorkflowOptions,
    ) -> WorkflowResult {
        let start_time = Instant::now();
        let workflow_id = Uuid::new_v4().to_string();

        let mut state = WorkflowState::new(
            workflow_id.clone(),
            options.session_id,
            definition.steps.len(),
            options.context,
        );
        state.status = WorkflowStatus::Running;

        info!(
            workflow_id = %workflow_id,
            workflow = %definition.name,
            total_steps = definition.steps.len(),
            "Starting workflow execution"
        );

        let mut steps_completed = 0;

        for (i, step) in definition.steps.iter().enumerate() {
            state.current_step = i + 1;

            let outcome = match evaluate_predicate(step, &state) {
                Ok(false) => {
                    info!(
                        workflow_id = %workflow_id,
                        step = i + 1,
                        step_name = %step.name,
                        "Skipping step due to condition"
                    );
                    continue;
                }
                Ok(true) => {
                    info!(
                        workflow_id = %workflow_id,
                        step = i + 1,
                        step_name = %step.name,
                        "Executing workflow step"
                    );
                    run_step(step, &mut state, options.step_timeout).await
                }
                Err(failure) => failure,
            };

            match outcome {
                StepResult::Success { data, message } => {
                    debug!(
                        workflow_id = %workflow_id,
                        step = i + 1,
                        message = message.as_deref().unwrap_or(""),
                        "Step completed successfully"
                    );
                    state.results.push(data);
                    steps_completed += 1;
                }
                StepResult::Failure { error: err } => {
                    error!(
                        workflow_id = %workflow_id,
                        step = i + 1,
                        step_name = %step.name,
                        error = %err,
                        "Step failed"
                    );
                    state
                        .errors
                        .push(format!("Step {} ({}): {}", i + 1, step.name, err));

                    run_error_hook(step, &err, &state).await;

                    if !options.continue_on_error {
                        state.status = WorkflowStatus::Failed;
                        break;
                    }
                }
            }
        }

        if state.status != WorkflowStatus::Failed {
            state.status = WorkflowStatus::Completed;
        }
        state.completed_at = Some(Utc::now());

        let execution_time_ms = start_time.elapsed().as_millis() as u64;
        info!(
            workflow_id = %workflow_id,
            workflow = %definition.name,
            status = ?state.status,
            steps_completed,
            total_steps = definition.steps.len(),
            execution_time_ms,
            "Workflow execution completed"
        );

        WorkflowResult::from_state(&definition.name, state, steps_completed, execution_time_ms)
    }
}

/// Run one step action, turning errors, panics and timeouts into failures.
pub(crate) async fn run_step(
    step: &WorkflowStep,
    state: &mut WorkflowState,
    timeout: Option<Duration>,
) -> StepResult {
    let action = AssertUnwindSafe(step.action.run(state)).catch_unwind();

    let outcome = match timeout {
        Some(limit) => match tokio::time::timeout(limit, action).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(step_name = %step.name, timeout_ms = limit.as_millis() as u64, "Step timed out");
                return StepResult::failure(format!(
                    "timed out after {}ms",
                    limit.as_millis()
                ));
            }
        },
        None => action.await,
    };

    match outcome {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => StepResult::failure(e.to_string()),
        Err(panic) => StepResult::failure(format!("panicked: {}", panic_message(&*panic))),
    }
}

/// Evaluate the step's predicate. A panicking predicate is a step failure.
pub(crate) fn evaluate_predicate(
    step: &WorkflowStep,
    state: &WorkflowState,
) -> Result<bool, StepResult> {
    std::panic::catch_unwind(AssertUnwindSafe(|| step.should_run(state))).map_err(|panic| {
        StepResult::failure(format!("condition panicked: {}", panic_message(&*panic)))
    })
}

/// Run the step's error hook, if any. A panicking hook is logged and
/// otherwise ignored.
pub(crate) async fn run_error_hook(step: &WorkflowStep, err: &str, state: &WorkflowState) {
    let Some(hook) = &step.on_error else {
        return;
    };
    if let Err(panic) = AssertUnwindSafe(async { hook(err, state).await })
        .catch_unwind()
        .await
    {
        error!(
            step_name = %step.name,
            error = %panic_message(&*panic),
            "Error hook panicked"
        );
    }
}
