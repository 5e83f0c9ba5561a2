//! Per-run workflow state and the summary produced at the end of a run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use switchboard_common::Params;

/// Lifecycle of a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Outcome reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    Completed,
    Partial,
    Failed,
}

/// Mutable state threaded through the steps of one run.
///
/// Steps pass values to later steps through `data`. Nothing here is shared
/// between runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowState {
    pub workflow_id: String,
    pub session_id: String,
    /// 1-based index of the step being evaluated, 0 before the first step.
    pub current_step: usize,
    pub total_steps: usize,
    pub status: WorkflowStatus,
    pub data: Params,
    pub results: Vec<Value>,
    pub errors: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl WorkflowState {
    pub fn new(
        workflow_id: impl Into<String>,
        session_id: impl Into<String>,
        total_steps: usize,
        context: Params,
    ) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            session_id: session_id.into(),
            current_step: 0,
            total_steps,
            status: WorkflowStatus::Pending,
            data: context,
            results: Vec::new(),
            errors: Vec::new(),
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// String value for `key`, `None` when absent or not a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    /// True when `key` holds something other than null, `false`, zero or an
    /// empty string.
    pub fn is_set(&self, key: &str) -> bool {
        match self.data.get(key) {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => !s.is_empty(),
            Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
            Some(_) => true,
        }
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.data.insert(key.into(), value.into());
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowResult {
    pub workflow_id: String,
    pub workflow_name: String,
    pub session_id: String,
    /// True only when the run completed with no recorded errors.
    pub success: bool,
    pub status: ResultStatus,
    /// Terminal status of the run itself.
    pub run_status: WorkflowStatus,
    pub message: String,
    pub results: Vec<Value>,
    pub errors: Vec<String>,
    pub data: Params,
    pub execution_time_ms: u64,
    pub steps_completed: usize,
    pub total_steps: usize,
}

impl WorkflowResult {
    pub(crate) fn from_state(
        workflow_name: &str,
        state: WorkflowState,
        steps_completed: usize,
        execution_time_ms: u64,
    ) -> Self {
        let status = if state.errors.is_empty() {
            ResultStatus::Completed
        } else if steps_completed > 0 {
            ResultStatus::Partial
        } else {
            ResultStatus::Failed
        };
        let success = state.status == WorkflowStatus::Completed && state.errors.is_empty();

        let message = match status {
            ResultStatus::Completed => format!(
                "{workflow_name} completed successfully ({steps_completed}/{} steps)",
                state.total_steps
            ),
            ResultStatus::Partial => format!(
                "{workflow_name} partially completed ({steps_completed}/{} steps). {} error(s).",
                state.total_steps,
                state.errors.len()
            ),
            ResultStatus::Failed => {
                format!("{workflow_name} failed. {} error(s).", state.errors.len())
            }
        };

        Self {
            workflow_id: state.workflow_id,
            workflow_name: workflow_name.to_string(),
            session_id: state.session_id,
            success,
            status,
            run_status: state.status,
            message,
            results: state.results,
            errors: state.errors,
            data: state.data,
            execution_time_ms,
            steps_completed,
            total_steps: state.total_steps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn finished(status: WorkflowStatus, errors: usize) -> WorkflowState {
        let mut state = WorkflowState::new("run-1", "s-1", 3, Params::new());
        state.status = status;
        state.errors = (0..errors).map(|i| format!("error {i}")).collect();
        state
    }

    #[test]
    fn completed_without_errors_is_success() {
        let result = WorkflowResult::from_state("Restock", finished(WorkflowStatus::Completed, 0), 3, 5);
        assert!(result.success);
        assert_eq!(result.status, ResultStatus::Completed);
        assert_eq!(result.message, "Restock completed successfully (3/3 steps)");
    }

    #[test]
    fn stop_after_one_success_is_partial_but_failed_run() {
        let result = WorkflowResult::from_state("Restock", finished(WorkflowStatus::Failed, 1), 1, 5);
        assert!(!result.success);
        assert_eq!(result.status, ResultStatus::Partial);
        assert_eq!(result.run_status, WorkflowStatus::Failed);
        assert_eq!(
            result.message,
            "Restock partially completed (1/3 steps). 1 error(s)."
        );
    }

    #[test]
    fn errors_without_progress_is_failed() {
        let result = WorkflowResult::from_state("Restock", finished(WorkflowStatus::Completed, 2), 0, 5);
        assert!(!result.success);
        assert_eq!(result.status, ResultStatus::Failed);
        assert_eq!(result.message, "Restock failed. 2 error(s).");
    }

    #[test]
    fn is_set_treats_empty_values_as_unset() {
        let mut state = WorkflowState::new("run-1", "s-1", 0, Params::new());
        state.set("email", "");
        state.set("count", 0);
        state.set("name", "Ada");
        state.set("nothing", Value::Null);
        state.set("items", json!([]));

        assert!(!state.is_set("email"));
        assert!(!state.is_set("count"));
        assert!(!state.is_set("nothing"));
        assert!(!state.is_set("missing"));
        assert!(state.is_set("name"));
        assert!(state.is_set("items"));
        assert_eq!(state.get_str("name"), Some("Ada"));
    }
}
