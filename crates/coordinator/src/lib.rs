//! Request routing for Switchboard.
//!
//! The coordinator decides which department agent handles a message:
//! 1. An explicit `department` in the request context wins
//! 2. Otherwise a learned classifier is asked, when enabled
//! 3. Otherwise keyword scoring over registered agents picks one
//! 4. Otherwise the configured default department is used
//!
//! # Architecture
//!
//! ```text
//! User Request
//!      │
//!      ▼
//! ┌─────────────────┐
//! │  AgentRouter    │  ◄── IntentResolver (context / learned / keyword)
//! │  (this crate)   │
//! └────────┬────────┘
//!          │ process_message
//!    ┌─────┴──────────┬───────────────┐
//!    ▼                ▼               ▼
//! [construction] [manufacturing]    [hr]
//!    Agent           Agent          Agent
//! ```

pub mod classifier;
pub mod config;
pub mod resolver;
pub mod router;

pub use classifier::{Classification, IntentClassifier, LlmIntentClassifier};
pub use config::{CoordinatorConfig, DeclaredAgentConfig, RouterConfig, WorkflowConfig};
pub use resolver::{IntentResolver, UNKNOWN_DEPARTMENT};
pub use router::{AgentRouter, RoutedResponse, RouterStats};
