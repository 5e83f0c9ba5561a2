//! Configuration for the coordinator.
//!
//! # File security
//!
//! - Config file permission validation on Unix systems
//! - Rejects world-readable files containing API keys
//! - Warns about API keys stored in config files

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use switchboard_agents::{AgentRegistry, DeclaredAgent, WorkflowOptions};
use switchboard_common::Params;
use switchboard_llm::LlmConfig;
use tracing::{debug, warn};

/// Main coordinator configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Department detection settings
    #[serde(default)]
    pub router: RouterConfig,

    /// Model used for learned intent detection. Absent means keyword-only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classifier: Option<LlmConfig>,

    /// Defaults applied to workflow runs
    #[serde(default)]
    pub workflows: WorkflowConfig,

    /// Agents declared by department key, registered in key order.
    #[serde(default)]
    pub agents: BTreeMap<String, DeclaredAgentConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Department used when nothing matches. Falls back to the first
    /// registered department when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_department: Option<String>,

    /// Ask the classifier before keyword scoring.
    #[serde(default)]
    pub learned_intent: bool,

    /// Extra keywords per department, each worth +2 when found.
    #[serde(default)]
    pub keywords: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    #[serde(default)]
    pub continue_on_error: bool,

    /// Per-step timeout in milliseconds; 0 disables the limit.
    #[serde(default = "default_step_timeout_ms")]
    pub step_timeout_ms: Option<u64>,
}

fn default_step_timeout_ms() -> Option<u64> {
    Some(30_000)
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            continue_on_error: false,
            step_timeout_ms: default_step_timeout_ms(),
        }
    }
}

impl WorkflowConfig {
    pub fn step_timeout(&self) -> Option<Duration> {
        self.step_timeout_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }

    /// Run options carrying these defaults.
    pub fn options(&self, session_id: impl Into<String>, context: Params) -> WorkflowOptions {
        let options = WorkflowOptions::new(session_id)
            .with_context(context)
            .continue_on_error(self.continue_on_error);
        match self.step_timeout() {
            Some(timeout) => options.with_step_timeout(timeout),
            None => options,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeclaredAgentConfig {
    pub name: String,

    /// Shown to the classifier and scored by keyword detection
    #[serde(default)]
    pub description: String,

    /// Action labels the classifier may pick for this department
    #[serde(default)]
    pub actions: Vec<String>,
}

impl CoordinatorConfig {
    /// Load configuration from a TOML file.
    ///
    /// On Unix systems the file must be a regular file, must not be
    /// world-writable, and must not be world-readable if it holds an API key.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();

        #[cfg(unix)]
        validate_config_file_permissions(path)?;

        let config = Self::from_file_unchecked(path)?;

        if config
            .classifier
            .as_ref()
            .is_some_and(|c| c.api_key.is_some())
        {
            warn!(
                "API key found in config file '{}'. For better security, \
                 use the OPENAI_API_KEY environment variable instead.",
                path.display()
            );
        }

        Ok(config)
    }

    /// Load configuration from a TOML file without permission checks.
    ///
    /// Use this only for testing or when you've already validated the file.
    pub fn from_file_unchecked(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// The classifier settings with the API key resolved, or `None` when
    /// no classifier is configured.
    pub fn resolved_classifier(&self) -> Option<LlmConfig> {
        let mut config = self.classifier.clone()?;
        config.api_key = resolve_api_key(&config);
        Some(config)
    }

    /// Build a registry holding one [`DeclaredAgent`] per `[agents.*]` table.
    pub fn build_registry(&self) -> AgentRegistry {
        let mut registry = AgentRegistry::new();
        for (department, agent) in &self.agents {
            debug!(department = %department, agent = %agent.name, "Declaring agent from config");
            registry.register(
                department,
                Arc::new(
                    DeclaredAgent::new(agent.name.clone(), agent.description.clone())
                        .with_actions(agent.actions.iter().cloned()),
                ),
            );
        }
        registry
    }
}

/// Resolve the API key from config or environment variables.
///
/// Priority:
/// 1. Explicit non-empty `api_key` in config
/// 2. `OPENAI_API_KEY` for the `openai` provider
///
/// Local servers (`lmstudio`, `ollama`) run without a key.
pub fn resolve_api_key(config: &LlmConfig) -> Option<String> {
    if let Some(key) = config.api_key.as_ref().filter(|k| !k.is_empty()) {
        return Some(key.clone());
    }

    match config.provider.as_str() {
        "openai" => std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.is_empty()),
        _ => None,
    }
}

/// Validate config file permissions on Unix systems.
///
/// Requirements:
/// - File must be a regular file (not symlink, directory, etc.)
/// - File must not be world-writable (mode & 0o002 == 0)
/// - If file contains API key patterns, must not be world-readable
#[cfg(unix)]
fn validate_config_file_permissions(path: &Path) -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = std::fs::symlink_metadata(path)
        .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e))?;

    if !metadata.is_file() {
        anyhow::bail!(
            "Config path '{}' is not a regular file. Symlinks and directories are not allowed.",
            path.display()
        );
    }

    let permission_bits = metadata.permissions().mode() & 0o777;

    if permission_bits & 0o002 != 0 {
        anyhow::bail!(
            "Config file '{}' is world-writable (mode {:04o}). \
             This is a security risk. Fix with: chmod o-w {}",
            path.display(),
            permission_bits,
            path.display()
        );
    }

    let content = std::fs::read_to_string(path).unwrap_or_default();
    let has_api_key = content.contains("api_key")
        && (content.contains("sk-") || content.contains("api_key ="));

    if has_api_key && permission_bits & 0o004 != 0 {
        anyhow::bail!(
            "Config file '{}' contains an API key but is world-readable (mode {:04o}). \
             This is a security risk. Fix with: chmod 600 {}",
            path.display(),
            permission_bits,
            path.display()
        );
    }

    if has_api_key && permission_bits & 0o040 != 0 {
        warn!(
            "Config file '{}' contains an API key and is group-readable (mode {:04o}). \
             Consider restricting access with: chmod 600 {}",
            path.display(),
            permission_bits,
            path.display()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use switchboard_common::Agent;

    const SAMPLE: &str = r#"
[router]
default_department = "construction"
learned_intent = true

[router.keywords]
manufacturing = ["bolts", "reorder"]

[classifier]
provider = "lmstudio"
model = "qwen2.5-7b-instruct"
api_url = "http://localhost:1234"

[workflows]
continue_on_error = true
step_timeout_ms = 5000

[agents.hr]
name = "HR"
description = "Human resources: employees, leave, onboarding"
actions = ["SEARCH_EMPLOYEE", "QUERY_POLICY"]

[agents.construction]
name = "Construction"
description = "Projects, sites and safety"
"#;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn parses_full_config() {
        let config: CoordinatorConfig = toml::from_str(SAMPLE).unwrap();

        assert_eq!(config.router.default_department.as_deref(), Some("construction"));
        assert!(config.router.learned_intent);
        assert_eq!(config.router.keywords["manufacturing"], vec!["bolts", "reorder"]);

        let classifier = config.classifier.as_ref().unwrap();
        assert_eq!(classifier.provider, "lmstudio");
        assert_eq!(classifier.model, "qwen2.5-7b-instruct");

        assert!(config.workflows.continue_on_error);
        assert_eq!(config.workflows.step_timeout(), Some(Duration::from_millis(5000)));

        assert_eq!(config.agents["hr"].actions, vec!["SEARCH_EMPLOYEE", "QUERY_POLICY"]);
        assert!(config.agents["construction"].actions.is_empty());
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config: CoordinatorConfig = toml::from_str("").unwrap();

        assert!(config.router.default_department.is_none());
        assert!(!config.router.learned_intent);
        assert!(config.classifier.is_none());
        assert!(config.agents.is_empty());
        assert!(!config.workflows.continue_on_error);
        assert_eq!(config.workflows.step_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn zero_timeout_means_no_limit() {
        let config = WorkflowConfig {
            continue_on_error: false,
            step_timeout_ms: Some(0),
        };
        assert!(config.step_timeout().is_none());
        assert!(config.options("s", Params::new()).step_timeout.is_none());
    }

    #[test]
    fn workflow_options_carry_defaults() {
        let config: CoordinatorConfig = toml::from_str(SAMPLE).unwrap();
        let mut context = Params::new();
        context.insert("firstName".into(), serde_json::json!("Ada"));

        let options = config.workflows.options("session-1", context);
        assert_eq!(options.session_id, "session-1");
        assert!(options.continue_on_error);
        assert_eq!(options.step_timeout, Some(Duration::from_millis(5000)));
        assert_eq!(options.context["firstName"], "Ada");
    }

    #[test]
    fn build_registry_registers_in_key_order() {
        let config: CoordinatorConfig = toml::from_str(SAMPLE).unwrap();
        let registry = config.build_registry();

        assert_eq!(registry.departments(), vec!["construction", "hr"]);
        let hr = registry.get("HR").unwrap();
        assert_eq!(hr.name(), "HR");
        assert_eq!(hr.supported_actions(), vec!["SEARCH_EMPLOYEE", "QUERY_POLICY"]);
    }

    #[test]
    fn api_key_resolution_prefers_config() {
        let mut llm = LlmConfig::new("gpt-4o-mini");
        llm.api_key = Some("sk-test-key".into());
        assert_eq!(resolve_api_key(&llm), Some("sk-test-key".to_string()));
    }

    #[test]
    fn api_key_resolution_local_provider() {
        let mut llm = LlmConfig::new("llama3.2");
        llm.provider = "ollama".into();
        llm.api_key = Some(String::new());
        assert_eq!(resolve_api_key(&llm), None);
    }

    #[test]
    fn resolved_classifier_absent_without_section() {
        let config = CoordinatorConfig::default();
        assert!(config.resolved_classifier().is_none());
    }

    #[test]
    fn from_file_reads_toml() {
        let file = write_config(SAMPLE);
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(file.path(), std::fs::Permissions::from_mode(0o600))
                .unwrap();
        }

        let config = CoordinatorConfig::from_file(file.path()).unwrap();
        assert_eq!(config.agents.len(), 2);
    }

    #[test]
    fn from_file_rejects_invalid_toml() {
        let file = write_config("[router\nlearned_intent = ");
        assert!(CoordinatorConfig::from_file_unchecked(file.path()).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn rejects_world_writable_file() {
        use std::os::unix::fs::PermissionsExt;

        let file = write_config(SAMPLE);
        std::fs::set_permissions(file.path(), std::fs::Permissions::from_mode(0o666)).unwrap();

        let err = CoordinatorConfig::from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("world-writable"));
    }

    #[cfg(unix)]
    #[test]
    fn rejects_world_readable_file_with_api_key() {
        use std::os::unix::fs::PermissionsExt;

        let file = write_config(
            "[classifier]\nmodel = \"gpt-4o-mini\"\napi_key = \"sk-secret\"\n",
        );
        std::fs::set_permissions(file.path(), std::fs::Permissions::from_mode(0o644)).unwrap();

        let err = CoordinatorConfig::from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("world-readable"));

        std::fs::set_permissions(file.path(), std::fs::Permissions::from_mode(0o600)).unwrap();
        let config = CoordinatorConfig::from_file(file.path()).unwrap();
        assert_eq!(
            config.classifier.unwrap().api_key.as_deref(),
            Some("sk-secret")
        );
    }

    #[cfg(unix)]
    #[test]
    fn rejects_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = CoordinatorConfig::from_file(dir.path()).unwrap_err();
        assert!(err.to_string().contains("not a regular file"));
    }
}
