use anyhow::Context;
use serde_json::json;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use switchboard_agents::workflow::predefined;
use switchboard_agents::{AgentRegistry, WorkflowCatalogue, WorkflowEngine};
use switchboard_common::Params;
use switchboard_coordinator::{
    AgentRouter, CoordinatorConfig, IntentClassifier, LlmIntentClassifier,
};
use switchboard_llm::build_llm_client;
use tracing::{info, warn};
use uuid::Uuid;

/// Exit code for a context that fails validation.
const INVALID_CONTEXT: u8 = 2;

const ONBOARDING_WORKFLOW: &str = "employee_onboarding";

/// Ids accepted by `workflows run --graph`. The graph shares the
/// onboarding workflow's required context.
const GRAPH_WORKFLOW_IDS: [&str; 2] = [ONBOARDING_WORKFLOW, "employee_onboarding_graph"];

pub struct RunRequest {
    pub id: String,
    pub context: Params,
    pub session: Option<String>,
    pub continue_on_error: bool,
    pub graph: bool,
}

/// Everything a command needs, built once from the config.
pub struct App {
    config: CoordinatorConfig,
    registry: Arc<AgentRegistry>,
    router: AgentRouter,
    catalogue: WorkflowCatalogue,
}

impl App {
    pub fn load(path: Option<&Path>, default_file: &str) -> anyhow::Result<Self> {
        let config = match path {
            Some(path) => CoordinatorConfig::from_file(path)
                .with_context(|| format!("Failed to load config '{}'", path.display()))?,
            None if Path::new(default_file).is_file() => {
                CoordinatorConfig::from_file(default_file)
                    .with_context(|| format!("Failed to load config '{default_file}'"))?
            }
            None => {
                info!("No config file found, using defaults");
                CoordinatorConfig::default()
            }
        };

        let registry = Arc::new(config.build_registry());
        let classifier = build_classifier(&config);
        let router = AgentRouter::from_config(registry.clone(), &config, classifier);
        let catalogue = predefined::catalogue(registry.clone());

        info!(
            agents = registry.len(),
            workflows = catalogue.len(),
            learned_intent = router.stats().learned_intent,
            "Switchboard ready"
        );

        Ok(Self {
            config,
            registry,
            router,
            catalogue,
        })
    }

    pub async fn detect(&self, message: &str, context: Params) -> anyhow::Result<ExitCode> {
        let detection = self.router.detect(message, &context).await;
        print_json(&detection)?;
        Ok(ExitCode::SUCCESS)
    }

    pub async fn route(
        &self,
        message: &str,
        session: Option<String>,
        context: Params,
    ) -> anyhow::Result<ExitCode> {
        let session_id = session.unwrap_or_else(new_session_id);
        let routed = self.router.route(message, &session_id, &context).await;
        print_json(&routed)?;
        Ok(ExitCode::SUCCESS)
    }

    pub fn agents(&self) -> anyhow::Result<ExitCode> {
        let capabilities: serde_json::Map<String, serde_json::Value> = self
            .router
            .capabilities()
            .into_iter()
            .map(|(department, text)| (department, json!(text)))
            .collect();

        print_json(&json!({
            "agents": self.registry.summaries(),
            "capabilities": capabilities,
            "stats": self.router.stats(),
        }))?;
        Ok(ExitCode::SUCCESS)
    }

    pub fn list_workflows(&self) -> anyhow::Result<ExitCode> {
        print_json(&self.catalogue.stats())?;
        Ok(ExitCode::SUCCESS)
    }

    pub fn detect_workflow(&self, message: &str) -> anyhow::Result<ExitCode> {
        let found = self.catalogue.detect_by_keywords(message);
        print_json(&json!({
            "workflow": found.map(|w| json!({"id": &w.id, "name": &w.name})),
        }))?;
        Ok(ExitCode::SUCCESS)
    }

    pub fn validate_workflow(&self, id: &str, context: &Params) -> anyhow::Result<ExitCode> {
        let definition = self
            .catalogue
            .get(id)
            .with_context(|| format!("Unknown workflow: {id}"))?;
        let validation = self.catalogue.validate_context(&definition, context);
        print_json(&validation)?;

        Ok(if validation.valid {
            ExitCode::SUCCESS
        } else {
            ExitCode::from(INVALID_CONTEXT)
        })
    }

    pub async fn run_workflow(&self, request: RunRequest) -> anyhow::Result<ExitCode> {
        let session_id = request.session.unwrap_or_else(new_session_id);
        let mut options = self.config.workflows.options(session_id, request.context);
        options.continue_on_error |= request.continue_on_error;

        let definition_id = if request.graph {
            anyhow::ensure!(
                GRAPH_WORKFLOW_IDS.contains(&request.id.as_str()),
                "No graph variant for workflow: {}",
                request.id
            );
            ONBOARDING_WORKFLOW
        } else {
            request.id.as_str()
        };

        let definition = self
            .catalogue
            .get(definition_id)
            .with_context(|| format!("Unknown workflow: {}", request.id))?;

        let validation = self
            .catalogue
            .validate_context(&definition, &options.context);
        if !validation.valid {
            warn!(workflow = %definition.id, missing = ?validation.missing, "Workflow context is incomplete");
            print_json(&validation)?;
            return Ok(ExitCode::from(INVALID_CONTEXT));
        }

        let result = if request.graph {
            predefined::onboarding_graph(self.registry.clone())
                .execute(options)
                .await
        } else {
            WorkflowEngine::new().execute(&definition, options).await
        };

        print_json(&result)?;
        Ok(if result.success {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        })
    }
}

/// The learned classifier, when configured and buildable. Failures are
/// logged and leave the router on keyword detection.
fn build_classifier(config: &CoordinatorConfig) -> Option<Arc<dyn IntentClassifier>> {
    if !config.router.learned_intent {
        return None;
    }
    let Some(llm) = config.resolved_classifier() else {
        warn!("learned_intent is enabled but no [classifier] is configured, using keyword detection");
        return None;
    };

    match build_llm_client(&llm) {
        Ok(client) => {
            info!(provider = %llm.provider, model = %llm.model, "Learned intent classifier initialized");
            let mut classifier = LlmIntentClassifier::new(client).with_max_tokens(llm.max_tokens);
            if let Some(temperature) = llm.temperature {
                classifier = classifier.with_temperature(temperature);
            }
            Some(Arc::new(classifier))
        }
        Err(e) => {
            warn!(error = %e, "Failed to initialize classifier, using keyword detection");
            None
        }
    }
}

fn new_session_id() -> String {
    format!("session-{}", Uuid::new_v4())
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
