//! Ready-made business workflows.
//!
//! Steps reach department agents through the shared [`AgentRegistry`] and
//! call their tools by name. Identifiers produced by one step (employee id,
//! project id, reorder list) travel to later steps through the data bag.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Days, Utc};
use serde_json::{json, Value};
use switchboard_common::{Agent, Params, Result, ToolResult};
use tracing::warn;

use super::catalogue::WorkflowCatalogue;
use super::definition::WorkflowDefinition;
use super::graph::{GraphWorkflow, Next};
use super::state::WorkflowState;
use super::step::{StepAction, StepResult, WorkflowStep};
use crate::registry::AgentRegistry;

const DEFAULT_REORDER_POINT: f64 = 50.0;
const DEFAULT_MAX_STOCK: f64 = 200.0;
const DEFAULT_UNIT_COST: f64 = 10.0;

type BuildParams = fn(&WorkflowState) -> Params;
type ApplyResult = fn(&mut WorkflowState, &Value) -> String;

/// Calls one tool on one department's agent.
struct AgentToolCall {
    registry: Arc<AgentRegistry>,
    department: &'static str,
    tool: &'static str,
    params: BuildParams,
    apply: ApplyResult,
    /// Treat a "not configured" tool failure as a skipped success.
    optional: bool,
}

#[async_trait]
impl StepAction for AgentToolCall {
    async fn run(&self, state: &mut WorkflowState) -> Result<StepResult> {
        let Some(agent) = self.registry.get(self.department) else {
            return Ok(StepResult::failure(format!(
                "{} agent not found",
                self.department
            )));
        };

        match agent.execute_tool(self.tool, (self.params)(state)).await {
            ToolResult::Success(data) => {
                let message = (self.apply)(state, &data);
                Ok(StepResult::success(data).with_message(message))
            }
            ToolResult::Failure(error) if self.optional && error.contains("not configured") => {
                warn!(tool = %self.tool, "Tool not configured, skipping");
                Ok(StepResult::success(Value::Null).with_message(format!(
                    "{} not configured (skipped)",
                    self.tool
                )))
            }
            ToolResult::Failure(error) => Ok(StepResult::failure(error)),
        }
    }
}

fn tool_step(
    name: &str,
    description: &str,
    registry: &Arc<AgentRegistry>,
    department: &'static str,
    tool: &'static str,
    params: BuildParams,
    apply: ApplyResult,
) -> WorkflowStep {
    WorkflowStep::new(
        name,
        AgentToolCall {
            registry: registry.clone(),
            department,
            tool,
            params,
            apply,
            optional: false,
        },
    )
    .with_description(description)
    .using(department, tool)
}

fn optional_tool_step(
    name: &str,
    description: &str,
    registry: &Arc<AgentRegistry>,
    department: &'static str,
    tool: &'static str,
    params: BuildParams,
) -> WorkflowStep {
    WorkflowStep::new(
        name,
        AgentToolCall {
            registry: registry.clone(),
            department,
            tool,
            params,
            apply: |_, _| "Sent".to_string(),
            optional: true,
        },
    )
    .with_description(description)
    .using(department, tool)
}

fn into_params(value: Value) -> Params {
    match value {
        Value::Object(map) => map,
        _ => Params::new(),
    }
}

fn text(state: &WorkflowState, key: &str) -> String {
    match state.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn or_value(state: &WorkflowState, key: &str, fallback: Value) -> Value {
    match state.get(key) {
        None | Some(Value::Null) => fallback,
        Some(Value::String(s)) if s.is_empty() => fallback,
        Some(value) => value.clone(),
    }
}

fn number(value: Option<&Value>, fallback: f64) -> f64 {
    value
        .and_then(Value::as_f64)
        .filter(|n| *n != 0.0)
        .unwrap_or(fallback)
}

fn today() -> String {
    Utc::now().date_naive().to_string()
}

fn days_from_now(days: u64) -> String {
    let date = Utc::now().date_naive();
    date.checked_add_days(Days::new(days))
        .unwrap_or(date)
        .to_string()
}

/// Copy `field` from a tool payload into the data bag, returning it.
fn keep(state: &mut WorkflowState, data: &Value, field: &str, key: &str) -> Value {
    let value = data.get(field).cloned().unwrap_or(Value::Null);
    state.set(key, value.clone());
    value
}

// Employee onboarding

/// Create record, generate checklist, set goals, send welcome email.
pub fn employee_onboarding(registry: Arc<AgentRegistry>) -> WorkflowDefinition {
    WorkflowDefinition::new("employee_onboarding", "Employee Onboarding")
        .with_description(
            "Complete employee onboarding: create record, checklist, goals, and send welcome email",
        )
        .with_keywords(["hire", "onboard", "new employee", "recruit"])
        .with_required_context(["firstName", "lastName", "position", "department"])
        .step(create_employee_step(&registry))
        .step(onboarding_checklist_step(&registry))
        .step(performance_goals_step(registry.clone()))
        .step(welcome_email_step(&registry).when(|state| state.is_set("email")))
}

fn create_employee_step(registry: &Arc<AgentRegistry>) -> WorkflowStep {
    tool_step(
        "Create Employee Record",
        "Create employee in HR system",
        registry,
        "hr",
        "employee_directory",
        |state| {
            let first = text(state, "firstName");
            let last = text(state, "lastName");
            let email = or_value(
                state,
                "email",
                json!(format!("{}.{}@company.com", first.to_lowercase(), last.to_lowercase())),
            );
            into_params(json!({
                "action": "create",
                "firstName": first,
                "lastName": last,
                "email": email,
                "phone": or_value(state, "phone", json!("555-123-4567")),
                "department": state.get("department"),
                "position": state.get("position"),
                "startDate": or_value(state, "startDate", json!(today())),
                "salary": or_value(state, "salary", json!(75000)),
            }))
        },
        |state, data| {
            let id = data
                .pointer("/employee/employeeId")
                .or_else(|| data.get("employeeId"))
                .cloned()
                .unwrap_or(Value::Null);
            state.set("employeeId", id.clone());
            format!("Created employee: {}", id.as_str().unwrap_or("unknown"))
        },
    )
}

fn onboarding_checklist_step(registry: &Arc<AgentRegistry>) -> WorkflowStep {
    tool_step(
        "Generate Onboarding Checklist",
        "Create role-based onboarding checklist",
        registry,
        "hr",
        "onboarding_checklist",
        |state| {
            into_params(json!({
                "action": "generate",
                "employeeId": state.get("employeeId"),
                "role": state.get("position"),
                "department": state.get("department"),
            }))
        },
        |state, data| {
            keep(state, data, "checklistId", "checklistId");
            let total = keep(state, data, "totalTasks", "totalTasks");
            format!("Generated checklist with {total} tasks")
        },
    )
}

fn performance_goals_step(registry: Arc<AgentRegistry>) -> WorkflowStep {
    WorkflowStep::from_fn("Set Performance Goals", move |state| {
        let registry = registry.clone();
        Box::pin(async move {
            let Some(hr) = registry.get("hr") else {
                return Ok(StepResult::failure("hr agent not found"));
            };

            let goals = [
                json!({
                    "title": "Complete onboarding checklist",
                    "description": "Finish all onboarding tasks",
                    "category": "onboarding",
                    "priority": "high",
                    "dueDate": days_from_now(30),
                }),
                json!({
                    "title": "90-day performance review",
                    "description": "Complete first performance review",
                    "category": "performance",
                    "priority": "medium",
                    "dueDate": days_from_now(90),
                }),
            ];

            let mut created = Vec::new();
            for goal in goals {
                let mut params = into_params(goal);
                params.insert("action".into(), json!("create_goal"));
                params.insert(
                    "employeeId".into(),
                    state.get("employeeId").cloned().unwrap_or(Value::Null),
                );
                if let ToolResult::Success(data) = hr.execute_tool("performance_tracker", params).await {
                    created.push(data);
                }
            }

            state.set("goalsCreated", created.len());
            let message = format!("Created {} performance goals", created.len());
            Ok(StepResult::success(Value::Array(created)).with_message(message))
        })
    })
    .with_description("Create initial performance goals")
    .using("hr", "performance_tracker")
}

fn welcome_email_step(registry: &Arc<AgentRegistry>) -> WorkflowStep {
    optional_tool_step(
        "Send Welcome Email",
        "Send welcome email with onboarding information",
        registry,
        "hr",
        "email_sender",
        |state| {
            let first = text(state, "firstName");
            let body = format!(
                "Hi {first},\n\n\
                 Welcome to {department}! We're excited to have you join us as {position}.\n\n\
                 Your onboarding checklist has {tasks} tasks to complete.\n\
                 We've also set up your initial performance goals.\n\n\
                 Employee ID: {id}\n\
                 Start Date: {start}\n\n\
                 Best regards,\nHR Team",
                department = text(state, "department"),
                position = text(state, "position"),
                tasks = text(state, "totalTasks"),
                id = text(state, "employeeId"),
                start = or_value(state, "startDate", json!(today()))
                    .as_str()
                    .unwrap_or_default(),
            );
            into_params(json!({
                "to": state.get("email"),
                "subject": format!("Welcome to the team, {first}!"),
                "body": body,
            }))
        },
    )
}

// Project kickoff

/// Create project, estimate costs and timeline, safety checklist, export plan.
pub fn project_kickoff(registry: Arc<AgentRegistry>) -> WorkflowDefinition {
    WorkflowDefinition::new("project_kickoff", "Project Kickoff")
        .with_description(
            "Complete project setup: create project, calculate costs, estimate timeline, \
             generate safety checklist, and export the plan",
        )
        .with_keywords([
            "new project",
            "start project",
            "kickoff",
            "project setup",
            "begin project",
        ])
        .with_required_context(["projectName", "location", "type"])
        .step(tool_step(
            "Create Project Record",
            "Create project in construction system",
            &registry,
            "construction",
            "project_tracker",
            |state| {
                into_params(json!({
                    "action": "create",
                    "name": state.get("projectName"),
                    "location": state.get("location"),
                    "type": state.get("type"),
                    "status": "planning",
                    "budget": or_value(state, "budget", json!(500000)),
                    "startDate": or_value(state, "startDate", json!(today())),
                }))
            },
            |state, data| {
                let id = keep(state, data, "projectId", "projectId");
                format!("Created project: {}", id.as_str().unwrap_or("unknown"))
            },
        ))
        .step(tool_step(
            "Calculate Material Costs",
            "Estimate material costs for project",
            &registry,
            "construction",
            "material_cost_calculator",
            |state| {
                let materials = or_value(
                    state,
                    "materials",
                    json!([
                        {"name": "Concrete", "quantity": 100, "unit": "cubic yards"},
                        {"name": "Steel", "quantity": 50, "unit": "tons"},
                        {"name": "Lumber", "quantity": 200, "unit": "board feet"},
                    ]),
                );
                into_params(json!({
                    "action": "calculate",
                    "projectId": state.get("projectId"),
                    "materials": materials,
                }))
            },
            |state, data| {
                let total = keep(state, data, "totalCost", "totalCost");
                keep(state, data, "breakdown", "materialBreakdown");
                format!("Estimated material cost: ${total}")
            },
        ))
        .step(tool_step(
            "Estimate Project Timeline",
            "Generate project timeline and milestones",
            &registry,
            "construction",
            "timeline_estimator",
            |state| {
                into_params(json!({
                    "action": "estimate",
                    "projectId": state.get("projectId"),
                    "projectType": state.get("type"),
                    "complexity": or_value(state, "complexity", json!("medium")),
                }))
            },
            |state, data| {
                let days = keep(state, data, "estimatedDuration", "estimatedDuration");
                keep(state, data, "milestones", "milestones");
                format!("Estimated duration: {days} days")
            },
        ))
        .step(tool_step(
            "Generate Safety Checklist",
            "Create project-specific safety checklist",
            &registry,
            "construction",
            "safety_checklist_generator",
            |state| {
                into_params(json!({
                    "action": "generate",
                    "projectId": state.get("projectId"),
                    "projectType": state.get("type"),
                    "location": state.get("location"),
                }))
            },
            |state, data| {
                let items = keep(state, data, "totalItems", "safetyItems");
                format!("Generated safety checklist with {items} items")
            },
        ))
        .step(tool_step(
            "Export Project Plan",
            "Hand the kickoff report to the document tool",
            &registry,
            "construction",
            "pdf_generator",
            |state| {
                let milestones = state
                    .get("milestones")
                    .and_then(Value::as_array)
                    .map_or(0, Vec::len);
                let content = format!(
                    "PROJECT KICKOFF REPORT\n\n\
                     Project: {name}\nID: {id}\nLocation: {location}\nType: {kind}\n\n\
                     Total Material Cost: ${cost}\n\
                     Estimated Duration: {days} days\nMilestones: {milestones}\n\
                     Safety Checklist Items: {safety}\n\n\
                     Generated: {generated}",
                    name = text(state, "projectName"),
                    id = text(state, "projectId"),
                    location = text(state, "location"),
                    kind = text(state, "type"),
                    cost = text(state, "totalCost"),
                    days = text(state, "estimatedDuration"),
                    safety = text(state, "safetyItems"),
                    generated = Utc::now().to_rfc3339(),
                );
                into_params(json!({
                    "content": content,
                    "filename": format!("project_kickoff_{}.pdf", text(state, "projectId")),
                }))
            },
            |_, _| "Project plan exported".to_string(),
        ))
}

// Inventory restock

/// Check levels, find low stock, compute reorders, report, notify.
pub fn inventory_restock(registry: Arc<AgentRegistry>) -> WorkflowDefinition {
    WorkflowDefinition::new("inventory_restock", "Inventory Restock")
        .with_description(
            "Analyze inventory levels, identify low stock, calculate reorder quantities, \
             and generate procurement report",
        )
        .with_keywords(["restock", "reorder", "inventory low", "stock check", "replenish"])
        .step(tool_step(
            "Check Inventory Levels",
            "Analyze current inventory status",
            &registry,
            "manufacturing",
            "inventory_tracker",
            |_| into_params(json!({ "action": "list" })),
            |state, data| {
                keep(state, data, "inventory", "allInventory");
                let count = keep(state, data, "count", "totalItems");
                format!("Checked {count} inventory items")
            },
        ))
        .step(
            WorkflowStep::from_fn("Identify Low Stock Items", |state| {
                Box::pin(async move { Ok(identify_low_stock(state)) })
            })
            .with_description("Find items below reorder threshold")
            .using("manufacturing", "inventory_tracker"),
        )
        .step(
            WorkflowStep::from_fn("Calculate Reorder Quantities", |state| {
                Box::pin(async move { Ok(calculate_reorders(state)) })
            })
            .with_description("Determine reorder amounts")
            .using("manufacturing", "inventory_tracker"),
        )
        .step(tool_step(
            "Generate Procurement Report",
            "Create CSV report for procurement team",
            &registry,
            "manufacturing",
            "csv_generator",
            |state| {
                into_params(json!({
                    "data": state.get("reorderList"),
                    "filename": format!("inventory_restock_{}.csv", today()),
                }))
            },
            |_, _| "Procurement report exported".to_string(),
        ))
        .step(
            optional_tool_step(
                "Send Procurement Summary",
                "Email summary to procurement team",
                &registry,
                "manufacturing",
                "email_sender",
                |state| {
                    let items = state
                        .get("reorderList")
                        .and_then(Value::as_array)
                        .map(|list| {
                            list.iter()
                                .map(|item| {
                                    format!(
                                        "- {}: {} units (${})",
                                        item["name"].as_str().unwrap_or("item"),
                                        item["reorderQuantity"],
                                        item["estimatedCost"]
                                    )
                                })
                                .collect::<Vec<_>>()
                                .join("\n")
                        })
                        .unwrap_or_default();
                    let count = text(state, "lowStockCount");
                    into_params(json!({
                        "to": or_value(state, "procurementEmail", json!("procurement@company.com")),
                        "subject": format!("Inventory Restock Required - {count} Items"),
                        "body": format!(
                            "INVENTORY RESTOCK ALERT\n\nLow Stock Items: {count}\n\
                             Total Reorder Cost: ${}\n\nITEMS TO REORDER:\n{items}",
                            text(state, "totalReorderCost")
                        ),
                    }))
                },
            )
            .when(|state| {
                state
                    .get("lowStockCount")
                    .and_then(Value::as_u64)
                    .is_some_and(|n| n > 0)
            }),
        )
}

fn identify_low_stock(state: &mut WorkflowState) -> StepResult {
    let Some(inventory) = state.get("allInventory").and_then(Value::as_array) else {
        return StepResult::failure("no inventory data available");
    };

    let low: Vec<Value> = inventory
        .iter()
        .filter(|item| {
            let threshold = number(item.get("reorderPoint"), DEFAULT_REORDER_POINT);
            item.get("quantity")
                .and_then(Value::as_f64)
                .unwrap_or(0.0)
                <= threshold
        })
        .cloned()
        .collect();

    let count = low.len();
    state.set("lowStockItems", low.clone());
    state.set("lowStockCount", count);
    StepResult::success(json!({ "lowStockItems": low, "count": count }))
        .with_message(format!("Found {count} items below reorder threshold"))
}

fn calculate_reorders(state: &mut WorkflowState) -> StepResult {
    let Some(low) = state.get("lowStockItems").and_then(Value::as_array) else {
        return StepResult::failure("low stock items not computed");
    };

    let mut total_cost = 0.0;
    let reorders: Vec<Value> = low
        .iter()
        .map(|item| {
            let current = item.get("quantity").and_then(Value::as_f64).unwrap_or(0.0);
            let reorder_point = number(item.get("reorderPoint"), DEFAULT_REORDER_POINT);
            let max_stock = number(item.get("maxStock"), DEFAULT_MAX_STOCK);
            let quantity = (max_stock - current).max(reorder_point);
            let cost = number(item.get("unitCost"), DEFAULT_UNIT_COST) * quantity;
            total_cost += cost;
            json!({
                "itemId": item.get("itemId"),
                "name": item.get("name"),
                "currentQuantity": current,
                "reorderQuantity": quantity,
                "estimatedCost": cost,
                "supplier": item
                    .get("supplier")
                    .and_then(Value::as_str)
                    .unwrap_or("Default Supplier"),
            })
        })
        .collect();

    let count = reorders.len();
    state.set("reorderList", reorders.clone());
    state.set("totalReorderCost", total_cost);
    StepResult::success(json!({ "reorderList": reorders, "totalCost": total_cost })).with_message(
        format!("Calculated reorder for {count} items, total cost: ${total_cost}"),
    )
}

/// All predefined sequential workflows, in detection order.
pub fn catalogue(registry: Arc<AgentRegistry>) -> WorkflowCatalogue {
    let mut catalogue = WorkflowCatalogue::new();
    catalogue.register(employee_onboarding(registry.clone()));
    catalogue.register(project_kickoff(registry.clone()));
    catalogue.register(inventory_restock(registry));
    catalogue
}

/// Onboarding as a graph: the welcome email node is only reached when an
/// address was supplied.
pub fn onboarding_graph(registry: Arc<AgentRegistry>) -> GraphWorkflow {
    const CREATE: &str = "Create Employee Record";
    const CHECKLIST: &str = "Generate Onboarding Checklist";
    const EMAIL: &str = "Send Welcome Email";

    GraphWorkflow::new("employee_onboarding_graph", "Employee Onboarding (graph)")
        .with_description("Onboarding with a conditional welcome email")
        .node(create_employee_step(&registry))
        .node(onboarding_checklist_step(&registry))
        .node(welcome_email_step(&registry))
        .edge(CREATE, Next::node(CHECKLIST))
        .conditional_edge(CHECKLIST, |state| {
            if state.is_set("email") {
                Next::node(EMAIL)
            } else {
                Next::End
            }
        })
        .edge(EMAIL, Next::End)
}
