//! Department-keyed catalogue of agents.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use switchboard_common::Agent;
use tracing::{info, warn};

/// What the resolver and classifier may see of an agent. Never exposes tools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSummary {
    pub department: String,
    pub name: String,
    pub description: String,
    pub supported_actions: Vec<String>,
}

/// Maps normalized department keys to shared agents.
///
/// Keys are trimmed and lowercased on both registration and lookup.
/// Registration order is preserved for listing and keyword tie-breaking.
#[derive(Default)]
pub struct AgentRegistry {
    agents: HashMap<String, Arc<dyn Agent>>,
    order: Vec<String>,
}

pub(crate) fn normalize(department: &str) -> String {
    department.trim().to_lowercase()
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an agent under a department.
    ///
    /// An existing department is overwritten in place: the new agent takes
    /// the original registration position.
    pub fn register(&mut self, department: &str, agent: Arc<dyn Agent>) {
        let key = normalize(department);
        let name = agent.name().to_string();

        if self.agents.insert(key.clone(), agent).is_some() {
            warn!(department = %key, agent = %name, "Department already registered, overwriting");
        } else {
            info!(department = %key, agent = %name, "Registered agent");
            self.order.push(key);
        }
    }

    pub fn get(&self, department: &str) -> Option<Arc<dyn Agent>> {
        self.agents.get(&normalize(department)).cloned()
    }

    pub fn has(&self, department: &str) -> bool {
        self.agents.contains_key(&normalize(department))
    }

    /// Department keys in registration order.
    pub fn departments(&self) -> Vec<String> {
        self.order.clone()
    }

    /// `(department, agent)` pairs in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn Agent>)> + '_ {
        self.order
            .iter()
            .filter_map(|key| self.agents.get(key).map(|agent| (key.as_str(), agent)))
    }

    pub fn summaries(&self) -> Vec<AgentSummary> {
        self.iter()
            .map(|(department, agent)| AgentSummary {
                department: department.to_string(),
                name: agent.name().to_string(),
                description: agent.description().to_string(),
                supported_actions: agent.supported_actions(),
            })
            .collect()
    }

    /// Capability text per department, in registration order.
    pub fn capabilities(&self) -> Vec<(String, String)> {
        self.iter()
            .map(|(department, agent)| (department.to_string(), agent.capabilities()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl std::fmt::Debug for AgentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRegistry")
            .field("departments", &self.order)
            .finish()
    }
}
