//! Common types and traits shared across Switchboard crates.
//!
//! This crate holds the capability model every other crate builds on: the
//! [`Agent`] and [`Tool`] traits, the [`ToolResult`] outcome, the
//! [`IntentDetection`] produced by the resolver and the [`AgentResponse`]
//! returned by agents.

pub mod error;
pub mod intent;
pub mod message;
pub mod tool;
pub mod traits;

pub use error::{panic_message, Result, SwitchboardError};
pub use intent::{DetectionMethod, IntentDetection};
pub use message::AgentResponse;
pub use tool::{ToolResult, ToolSet};
pub use traits::{Agent, Tool};

/// Untyped parameter bag passed to agents, tools and workflow steps.
///
/// Each tool defines its own typed view of the bag and validates it
/// internally; the core never inspects payload internals.
pub type Params = serde_json::Map<String, serde_json::Value>;
