//! Agents and workflows for Switchboard.
//!
//! This crate provides:
//!
//! - **Registry**: department-keyed catalogue of shared agents
//! - **Declared agents**: agents described in configuration
//! - **Workflows**: sequential and graph workflows over registered agents
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    WORKFLOW ENGINE                       │
//! │   step 1 ──▶ step 2 ──▶ step 3 (predicate) ──▶ ...       │
//! └──────────────────────────┬───────────────────────────────┘
//!                            │ execute_tool(name, params)
//!                            ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │                    AGENT REGISTRY                        │
//! │   ┌────────┐   ┌──────────────┐   ┌───────────────┐      │
//! │   │   hr   │   │ construction │   │ manufacturing │      │
//! │   └────────┘   └──────────────┘   └───────────────┘      │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod declared;
pub mod registry;
pub mod workflow;

pub use declared::DeclaredAgent;
pub use registry::{AgentRegistry, AgentSummary};
pub use workflow::{
    GraphWorkflow, Next, ResultStatus, StepAction, StepResult, Workflow, WorkflowCatalogue,
    WorkflowDefinition, WorkflowEngine, WorkflowOptions, WorkflowResult, WorkflowState,
    WorkflowStatus, WorkflowStep,
};
