//! Integration tests for the registry and predefined workflows.
//!
//! Department agents here are simulated: each owns scripted tools that
//! record the parameters they receive and return canned payloads.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use switchboard_agents::workflow::predefined;
use switchboard_agents::{AgentRegistry, ResultStatus, Workflow, WorkflowOptions, WorkflowStatus};
use switchboard_common::{
    Agent, AgentResponse, IntentDetection, Params, Result, Tool, ToolResult, ToolSet,
};

type Responder = Box<dyn Fn(&Params) -> ToolResult + Send + Sync>;

/// A tool that records each call and answers with a scripted result.
struct ScriptedTool {
    name: String,
    respond: Responder,
    calls: AtomicUsize,
    last_params: Mutex<Option<Params>>,
}

impl ScriptedTool {
    fn new(name: &str, respond: impl Fn(&Params) -> ToolResult + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            respond: Box::new(respond),
            calls: AtomicUsize::new(0),
            last_params: Mutex::new(None),
        })
    }

    fn returning(name: &str, data: Value) -> Arc<Self> {
        Self::new(name, move |_| ToolResult::success(data.clone()))
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_params(&self) -> Params {
        self.last_params.lock().clone().unwrap_or_default()
    }
}

#[async_trait]
impl Tool for ScriptedTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Scripted tool for testing"
    }

    async fn execute(&self, params: Params) -> ToolResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let result = (self.respond)(&params);
        *self.last_params.lock() = Some(params);
        result
    }
}

struct DepartmentAgent {
    name: String,
    tools: ToolSet,
}

impl DepartmentAgent {
    fn new(name: &str, tools: &[Arc<ScriptedTool>]) -> Arc<Self> {
        let agent = Self {
            name: name.to_string(),
            tools: ToolSet::new(),
        };
        for tool in tools {
            agent.tools.register(name, tool.clone());
        }
        Arc::new(agent)
    }
}

#[async_trait]
impl Agent for DepartmentAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Simulated department"
    }

    fn tools(&self) -> &ToolSet {
        &self.tools
    }

    async fn process_message(
        &self,
        message: &str,
        session_id: &str,
        _context: &Params,
        _detection: Option<&IntentDetection>,
    ) -> Result<AgentResponse> {
        Ok(AgentResponse::new(message, session_id))
    }
}

struct HrTools {
    directory: Arc<ScriptedTool>,
    checklist: Arc<ScriptedTool>,
    goals: Arc<ScriptedTool>,
    email: Arc<ScriptedTool>,
}

fn hr_tools() -> HrTools {
    HrTools {
        directory: ScriptedTool::returning(
            "employee_directory",
            json!({"employee": {"employeeId": "EMP-042"}}),
        ),
        checklist: ScriptedTool::returning(
            "onboarding_checklist",
            json!({"checklistId": "CHK-9", "totalTasks": 12}),
        ),
        goals: ScriptedTool::returning("performance_tracker", json!({"goalId": "G-1"})),
        email: ScriptedTool::returning("email_sender", json!({"messageId": "M-1"})),
    }
}

fn registry_with_hr(tools: &HrTools) -> Arc<AgentRegistry> {
    let mut registry = AgentRegistry::new();
    registry.register(
        "hr",
        DepartmentAgent::new(
            "HR",
            &[
                tools.directory.clone(),
                tools.checklist.clone(),
                tools.goals.clone(),
                tools.email.clone(),
            ],
        ),
    );
    Arc::new(registry)
}

fn new_hire(email: Option<&str>) -> Params {
    let mut context = Params::new();
    context.insert("firstName".into(), json!("Ada"));
    context.insert("lastName".into(), json!("Lovelace"));
    context.insert("position".into(), json!("Engineer"));
    context.insert("department".into(), json!("R&D"));
    if let Some(email) = email {
        context.insert("email".into(), json!(email));
    }
    context
}

// ============================================================================
// Employee onboarding
// ============================================================================

#[tokio::test]
async fn test_onboarding_runs_all_steps_and_passes_ids() {
    let tools = hr_tools();
    let workflow = predefined::employee_onboarding(registry_with_hr(&tools));

    let result = workflow
        .run(WorkflowOptions::new("session-1").with_context(new_hire(Some("ada@example.com"))))
        .await;

    assert!(result.success, "errors: {:?}", result.errors);
    assert_eq!(result.status, ResultStatus::Completed);
    assert_eq!(result.steps_completed, 4);
    assert_eq!(
        result.message,
        "Employee Onboarding completed successfully (4/4 steps)"
    );

    assert_eq!(tools.checklist.last_params()["employeeId"], "EMP-042");
    assert_eq!(tools.checklist.last_params()["role"], "Engineer");
    assert_eq!(tools.goals.calls(), 2);
    assert_eq!(tools.goals.last_params()["action"], "create_goal");
    assert_eq!(tools.email.last_params()["to"], "ada@example.com");
    assert_eq!(
        tools.email.last_params()["subject"],
        "Welcome to the team, Ada!"
    );

    assert_eq!(result.data["employeeId"], "EMP-042");
    assert_eq!(result.data["totalTasks"], 12);
    assert_eq!(result.data["goalsCreated"], 2);
}

#[tokio::test]
async fn test_onboarding_without_email_skips_welcome() {
    let tools = hr_tools();
    let workflow = predefined::employee_onboarding(registry_with_hr(&tools));

    let result = workflow
        .run(WorkflowOptions::new("session-2").with_context(new_hire(None)))
        .await;

    assert!(result.success);
    assert_eq!(result.steps_completed, 3);
    assert_eq!(result.total_steps, 4);
    assert_eq!(result.results.len(), 3);
    assert_eq!(tools.email.calls(), 0);

    // The record still gets a generated address
    assert_eq!(
        tools.directory.last_params()["email"],
        "ada.lovelace@company.com"
    );
}

#[tokio::test]
async fn test_onboarding_tolerates_unconfigured_email() {
    let mut tools = hr_tools();
    tools.email = ScriptedTool::new("email_sender", |_| {
        ToolResult::failure("Email service not configured")
    });
    let workflow = predefined::employee_onboarding(registry_with_hr(&tools));

    let result = workflow
        .run(WorkflowOptions::new("s").with_context(new_hire(Some("ada@example.com"))))
        .await;

    assert!(result.success);
    assert_eq!(result.steps_completed, 4);
    assert_eq!(tools.email.calls(), 1);
}

#[tokio::test]
async fn test_onboarding_without_hr_agent_fails_first_step() {
    let workflow = predefined::employee_onboarding(Arc::new(AgentRegistry::new()));

    let result = workflow
        .run(WorkflowOptions::new("s").with_context(new_hire(None)))
        .await;

    assert!(!result.success);
    assert_eq!(result.status, ResultStatus::Failed);
    assert_eq!(result.run_status, WorkflowStatus::Failed);
    assert_eq!(
        result.errors,
        vec!["Step 1 (Create Employee Record): hr agent not found"]
    );
    assert_eq!(result.message, "Employee Onboarding failed. 1 error(s).");
}

#[tokio::test]
async fn test_onboarding_graph_branches_on_email() {
    let tools = hr_tools();
    let graph = predefined::onboarding_graph(registry_with_hr(&tools));

    let without = graph
        .run(WorkflowOptions::new("s").with_context(new_hire(None)))
        .await;
    assert!(without.success);
    assert_eq!(without.steps_completed, 2);
    assert_eq!(tools.email.calls(), 0);

    let with = graph
        .run(WorkflowOptions::new("s").with_context(new_hire(Some("ada@example.com"))))
        .await;
    assert!(with.success);
    assert_eq!(with.steps_completed, 3);
    assert_eq!(tools.email.calls(), 1);
}

// ============================================================================
// Inventory restock
// ============================================================================

fn manufacturing_registry(
    inventory: Arc<ScriptedTool>,
    csv: Arc<ScriptedTool>,
    email: Arc<ScriptedTool>,
) -> Arc<AgentRegistry> {
    let mut registry = AgentRegistry::new();
    registry.register(
        "manufacturing",
        DepartmentAgent::new("Manufacturing", &[inventory, csv, email]),
    );
    Arc::new(registry)
}

#[tokio::test]
async fn test_restock_computes_reorders_from_inventory() {
    let inventory = ScriptedTool::returning(
        "inventory_tracker",
        json!({
            "count": 2,
            "inventory": [
                {"itemId": "B-1", "name": "Bolts", "quantity": 10, "reorderPoint": 40,
                 "maxStock": 200, "unitCost": 0.5},
                {"itemId": "N-1", "name": "Nuts", "quantity": 500},
            ],
        }),
    );
    let csv = ScriptedTool::returning("csv_generator", json!({"file": "restock.csv"}));
    let email = ScriptedTool::returning("email_sender", json!({"messageId": "M-2"}));
    let workflow =
        predefined::inventory_restock(manufacturing_registry(inventory, csv.clone(), email.clone()));

    let result = workflow.run(WorkflowOptions::new("s")).await;

    assert!(result.success, "errors: {:?}", result.errors);
    assert_eq!(result.steps_completed, 5);
    assert_eq!(result.data["lowStockCount"], 1);

    let reorder = &result.data["reorderList"][0];
    assert_eq!(reorder["itemId"], "B-1");
    assert_eq!(reorder["reorderQuantity"].as_f64(), Some(190.0));
    assert_eq!(reorder["estimatedCost"].as_f64(), Some(95.0));
    assert_eq!(reorder["supplier"], "Default Supplier");

    assert_eq!(csv.last_params()["data"][0]["name"], "Bolts");
    assert_eq!(email.last_params()["to"], "procurement@company.com");
    assert_eq!(
        email.last_params()["subject"],
        "Inventory Restock Required - 1 Items"
    );
}

#[tokio::test]
async fn test_restock_skips_summary_when_nothing_is_low() {
    let inventory = ScriptedTool::returning(
        "inventory_tracker",
        json!({"count": 1, "inventory": [{"itemId": "N-1", "name": "Nuts", "quantity": 500}]}),
    );
    let csv = ScriptedTool::returning("csv_generator", json!({}));
    let email = ScriptedTool::returning("email_sender", json!({}));
    let workflow =
        predefined::inventory_restock(manufacturing_registry(inventory, csv, email.clone()));

    let result = workflow.run(WorkflowOptions::new("s")).await;

    assert!(result.success);
    assert_eq!(result.steps_completed, 4);
    assert_eq!(email.calls(), 0);
}

#[tokio::test]
async fn test_restock_with_failing_tracker_and_continue_on_error() {
    let inventory = ScriptedTool::new("inventory_tracker", |_| {
        ToolResult::failure("database unavailable")
    });
    let csv = ScriptedTool::returning("csv_generator", json!({}));
    let email = ScriptedTool::returning("email_sender", json!({}));
    let workflow = predefined::inventory_restock(manufacturing_registry(inventory, csv, email));

    let result = workflow
        .run(WorkflowOptions::new("s").continue_on_error(true))
        .await;

    assert!(!result.success);
    assert_eq!(result.run_status, WorkflowStatus::Completed);
    assert_eq!(
        result.errors[0],
        "Step 1 (Check Inventory Levels): database unavailable"
    );
    assert_eq!(
        result.errors[1],
        "Step 2 (Identify Low Stock Items): no inventory data available"
    );
    // The report step still runs with an empty payload
    assert_eq!(result.status, ResultStatus::Partial);
}

// ============================================================================
// Project kickoff
// ============================================================================

#[tokio::test]
async fn test_kickoff_missing_export_tool_is_partial() {
    let tracker = ScriptedTool::returning("project_tracker", json!({"projectId": "P-7"}));
    let costs = ScriptedTool::returning(
        "material_cost_calculator",
        json!({"totalCost": 125000, "breakdown": []}),
    );
    let timeline = ScriptedTool::returning(
        "timeline_estimator",
        json!({"estimatedDuration": 180, "milestones": ["foundation", "frame"]}),
    );
    let safety = ScriptedTool::returning("safety_checklist_generator", json!({"totalItems": 24}));

    let mut registry = AgentRegistry::new();
    registry.register(
        "Construction",
        DepartmentAgent::new(
            "Construction",
            &[tracker, costs.clone(), timeline, safety],
        ),
    );
    let workflow = predefined::project_kickoff(Arc::new(registry));

    let mut context = Params::new();
    context.insert("projectName".into(), json!("Riverside Depot"));
    context.insert("location".into(), json!("Austin"));
    context.insert("type".into(), json!("commercial"));

    let result = workflow
        .run(WorkflowOptions::new("s").with_context(context))
        .await;

    assert_eq!(costs.last_params()["projectId"], "P-7");
    assert_eq!(costs.last_params()["materials"].as_array().unwrap().len(), 3);
    assert_eq!(result.steps_completed, 4);
    assert_eq!(result.status, ResultStatus::Partial);
    assert_eq!(
        result.errors,
        vec!["Step 5 (Export Project Plan): Tool \"pdf_generator\" is not available."]
    );
    assert_eq!(result.data["estimatedDuration"], 180);
    assert_eq!(result.data["safetyItems"], 24);
}

// ============================================================================
// Catalogue
// ============================================================================

#[test]
fn test_predefined_catalogue_detects_and_validates() {
    let catalogue = predefined::catalogue(Arc::new(AgentRegistry::new()));

    assert_eq!(catalogue.len(), 3);
    let ids: Vec<_> = catalogue.all().iter().map(|w| w.id.clone()).collect();
    assert_eq!(
        ids,
        vec!["employee_onboarding", "project_kickoff", "inventory_restock"]
    );

    let hire = catalogue
        .detect_by_keywords("We need to hire a new welder")
        .unwrap();
    assert_eq!(hire.id, "employee_onboarding");
    assert!(catalogue.detect_by_keywords("What's the weather today?").is_none());
    assert_eq!(
        catalogue
            .detect_by_keywords("time to REPLENISH the bolts")
            .unwrap()
            .id,
        "inventory_restock"
    );

    let mut context = Params::new();
    context.insert("firstName".into(), json!("Ada"));
    context.insert("position".into(), json!(""));
    let validation = catalogue.validate_context(&hire, &context);
    assert!(!validation.valid);
    assert_eq!(validation.missing, vec!["lastName", "position", "department"]);

    let stats = catalogue.stats();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.workflows[0].steps, 4);
    assert_eq!(stats.workflows[1].steps, 5);
    assert_eq!(stats.workflows[2].steps, 5);
}

#[test]
fn test_registry_capabilities_list_tools() {
    let tools = hr_tools();
    let registry = registry_with_hr(&tools);

    let capabilities = registry.capabilities();
    assert_eq!(capabilities.len(), 1);
    assert_eq!(capabilities[0].0, "hr");
    assert!(capabilities[0]
        .1
        .contains("- employee_directory: Scripted tool for testing"));
}
