//! Workflow orchestration for multi-step business processes.
//!
//! - [`WorkflowEngine`] runs a [`WorkflowDefinition`] step by step
//! - [`WorkflowCatalogue`] holds definitions and picks one from free text
//! - [`GraphWorkflow`] runs nodes joined by conditional edges
//! - [`predefined`] ships onboarding, project kickoff and restock flows
//!
//! # Example
//!
//! ```ignore
//! let catalogue = predefined::catalogue(registry.clone());
//! let workflow = catalogue.detect_by_keywords("we need to hire a welder")?;
//! let result = WorkflowEngine::new()
//!     .execute(&workflow, WorkflowOptions::new(session_id).with_context(context))
//!     .await;
//! ```

pub mod catalogue;
pub mod definition;
pub mod engine;
pub mod graph;
pub mod predefined;
pub mod state;
pub mod step;

pub use catalogue::{CatalogueStats, ContextValidation, WorkflowCatalogue, WorkflowSummary};
pub use definition::{Workflow, WorkflowDefinition, WorkflowOptions};
pub use engine::WorkflowEngine;
pub use graph::{GraphWorkflow, Next};
pub use state::{ResultStatus, WorkflowResult, WorkflowState, WorkflowStatus};
pub use step::{StepAction, StepFuture, StepResult, WorkflowStep};
