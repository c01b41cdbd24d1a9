// src/tools/registry.rs
// Tool schemas and dispatch onto the triage engines

use crate::engines::{
    AttributeRequest, DetectRequest, FixPlanRequest, Tables, TriageRequest, attribute, classify,
    generate_fix_plan, triage,
};
use crate::error::{FixFastError, Result};
use crate::llm::{Tool, ToolCall};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tracing::{debug, error, warn};

// ============================================================================
// Schema
// ============================================================================

/// JSON type of a declared argument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Integer,
    StringArray,
}

impl FieldKind {
    fn schema(self, description: &str) -> Value {
        match self {
            FieldKind::String => json!({ "type": "string", "description": description }),
            FieldKind::Integer => json!({ "type": "integer", "description": description }),
            FieldKind::StringArray => json!({
                "type": "array",
                "items": { "type": "string" },
                "description": description
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub description: &'static str,
    pub required: bool,
}

const fn field(
    name: &'static str,
    kind: FieldKind,
    description: &'static str,
    required: bool,
) -> FieldSpec {
    FieldSpec {
        name,
        kind,
        description,
        required,
    }
}

type Handler = fn(&Tables, Value) -> Result<Value>;

/// One invokable tool: its model-facing contract plus the engine behind it
#[derive(Clone)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub fields: Vec<FieldSpec>,
    handler: Handler,
}

impl ToolSpec {
    /// JSON schema of the arguments object
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        for f in &self.fields {
            properties.insert(f.name.to_string(), f.kind.schema(f.description));
        }
        let required: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name)
            .collect();
        json!({
            "type": "object",
            "properties": properties,
            "required": required
        })
    }

    pub fn definition(&self) -> Tool {
        Tool::function(self.name, self.description, self.input_schema())
    }

    fn required_fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().filter(|f| f.required).map(|f| f.name)
    }
}

impl std::fmt::Debug for ToolSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolSpec")
            .field("name", &self.name)
            .field("fields", &self.fields.len())
            .finish()
    }
}

const ENVIRONMENT_HELP: &str =
    "Where the issue was found: ide, local_test, ci, code_review, staging, or production";

fn builtin_specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: "detect_regression",
            description: "Analyzes a bug report, code change, or error message to determine if it is a regression. \
                Returns the regression type (null_pointer, performance, crash, memory_leak, logic_error, \
                data_corruption, api_breaking_change, security_flaw), severity, affected components, \
                and detection confidence. Always call this first.",
            fields: vec![
                field(
                    "description",
                    FieldKind::String,
                    "Description of the bug, crash, or code change to analyze for regressions",
                    true,
                ),
                field(
                    "files_changed",
                    FieldKind::StringArray,
                    "List of files modified in the change (optional)",
                    false,
                ),
                field("environment", FieldKind::String, ENVIRONMENT_HELP, true),
                field(
                    "error_message",
                    FieldKind::String,
                    "The actual error or stack trace if available (optional)",
                    false,
                ),
                field(
                    "run_history",
                    FieldKind::StringArray,
                    "Recent test or CI outcomes for the failing check, oldest first, each 'pass' or 'fail' (optional)",
                    false,
                ),
            ],
            handler: run_detect,
        },
        ToolSpec {
            name: "triage_issue",
            description: "Calculates the Cost Per Developer (CPD) score for a regression. \
                CPD is Facebook's metric: bugs cost exponentially more the further downstream they are detected. \
                Production bugs are 100x more expensive than IDE-caught bugs. \
                Returns priority (P0-P3), recommended action, and a 'shift left' target environment. \
                Call this after detect_regression.",
            fields: vec![
                field(
                    "regression_type",
                    FieldKind::String,
                    "Type of regression from detect_regression output",
                    true,
                ),
                field(
                    "severity",
                    FieldKind::String,
                    "Severity from detect_regression: critical, high, medium, or low",
                    true,
                ),
                field("environment", FieldKind::String, ENVIRONMENT_HELP, true),
                field(
                    "affected_users_estimate",
                    FieldKind::Integer,
                    "Estimated number of users affected (0 if unknown)",
                    true,
                ),
            ],
            handler: run_triage,
        },
        ToolSpec {
            name: "attribute_to_owner",
            description: "Attributes the regression to the most likely code component and owner by analyzing \
                changed files and the regression description. Uses the 'multisect' principle from \
                Fix Fast to route issues to the right team 3x faster. \
                Returns suspected owners with confidence scores. \
                Call this after triage_issue.",
            fields: vec![
                field(
                    "files_changed",
                    FieldKind::StringArray,
                    "List of files changed in the suspected commit or diff",
                    false,
                ),
                field(
                    "description",
                    FieldKind::String,
                    "Description of the regression or bug",
                    true,
                ),
                field(
                    "regression_type",
                    FieldKind::String,
                    "Type of regression from detect_regression",
                    true,
                ),
            ],
            handler: run_attribute,
        },
        ToolSpec {
            name: "generate_fix_plan",
            description: "Generates a concrete, step-by-step fix plan for the regression. \
                Implements the 'Get Clean, Stay Clean' principle from Fix Fast: immediate mitigation, \
                root cause fix, prevention measures, and 'shift left' recommendations to catch this \
                class of bug earlier in the development pipeline next time. \
                Call this last, after attribution is complete.",
            fields: vec![
                field(
                    "regression_type",
                    FieldKind::String,
                    "Type of regression from detect_regression",
                    true,
                ),
                field(
                    "severity",
                    FieldKind::String,
                    "Severity level: critical, high, medium, or low",
                    true,
                ),
                field(
                    "affected_files",
                    FieldKind::StringArray,
                    "Files involved in the regression",
                    false,
                ),
                field(
                    "root_cause",
                    FieldKind::String,
                    "Description of the suspected root cause",
                    true,
                ),
                field(
                    "priority",
                    FieldKind::String,
                    "Priority from triage: P0, P1, P2, or P3",
                    true,
                ),
            ],
            handler: run_fix_plan,
        },
    ]
}

// ============================================================================
// Handlers
// ============================================================================

fn decode<T: DeserializeOwned>(args: Value) -> Result<T> {
    serde_json::from_value(args).map_err(|e| FixFastError::Validation(e.to_string()))
}

fn run_detect(tables: &Tables, args: Value) -> Result<Value> {
    let req: DetectRequest = decode(args)?;
    Ok(serde_json::to_value(classify(&tables.classification, &req))?)
}

fn run_triage(tables: &Tables, args: Value) -> Result<Value> {
    let req: TriageRequest = decode(args)?;
    Ok(serde_json::to_value(triage(&tables.cost, &req))?)
}

fn run_attribute(tables: &Tables, args: Value) -> Result<Value> {
    let req: AttributeRequest = decode(args)?;
    Ok(serde_json::to_value(attribute(&tables.ownership, &req))?)
}

fn run_fix_plan(tables: &Tables, args: Value) -> Result<Value> {
    let req: FixPlanRequest = decode(args)?;
    Ok(serde_json::to_value(generate_fix_plan(&tables.playbooks, &req))?)
}

// ============================================================================
// Tool results
// ============================================================================

/// Outcome of one tool call, ready to become a tool-result turn
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    pub tool_call_id: String,
    pub name: String,
    pub content: String,
    pub is_error: bool,
}

impl ToolResult {
    pub fn success(id: &str, name: &str, content: String) -> Self {
        Self {
            tool_call_id: id.to_string(),
            name: name.to_string(),
            content,
            is_error: false,
        }
    }

    pub fn error(id: &str, name: &str, error: String) -> Self {
        Self {
            tool_call_id: id.to_string(),
            name: name.to_string(),
            content: error,
            is_error: true,
        }
    }
}

// ============================================================================
// Registry
// ============================================================================

/// The fixed set of triage tools, bound to one set of lookup tables
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    specs: Vec<ToolSpec>,
    tables: Arc<Tables>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new(Tables::builtin())
    }
}

impl ToolRegistry {
    pub fn new(tables: Arc<Tables>) -> Self {
        Self {
            specs: builtin_specs(),
            tables,
        }
    }

    pub fn specs(&self) -> &[ToolSpec] {
        &self.specs
    }

    pub fn get(&self, name: &str) -> Option<&ToolSpec> {
        self.specs.iter().find(|s| s.name == name)
    }

    /// Tool declarations sent to the model with every request
    pub fn tool_definitions(&self) -> Vec<Tool> {
        self.specs.iter().map(ToolSpec::definition).collect()
    }

    /// Run a tool by name with JSON-encoded arguments.
    ///
    /// Top-level nulls count as absent. Payloads that fail the schema are
    /// validation errors.
    pub fn dispatch(&self, name: &str, arguments: &str) -> Result<Value> {
        let spec = self
            .get(name)
            .ok_or_else(|| FixFastError::UnknownTool(name.to_string()))?;

        let args = parse_arguments(arguments)?;
        if let Some(missing) = spec.required_fields().find(|f| !args.contains_key(*f)) {
            return Err(FixFastError::Validation(format!(
                "missing required field `{}` for {}",
                missing, spec.name
            )));
        }

        debug!(tool = spec.name, fields = args.len(), "Dispatching tool");
        (spec.handler)(&self.tables, Value::Object(args))
    }

    /// Execute a model-issued tool call. Never fails: errors become
    /// error-flagged results the model can read.
    pub fn execute(&self, call: &ToolCall) -> ToolResult {
        let name = call.function.name.as_str();
        match self.dispatch(name, &call.function.arguments) {
            Ok(output) => ToolResult::success(&call.id, name, output.to_string()),
            Err(e) => {
                if e.is_recoverable() {
                    warn!(tool = %name, call_id = %call.id, error = %e, "Tool call rejected");
                } else {
                    error!(tool = %name, call_id = %call.id, error = %e, "Tool call failed");
                }
                ToolResult::error(&call.id, name, e.to_tool_message())
            }
        }
    }
}

fn parse_arguments(arguments: &str) -> Result<Map<String, Value>> {
    // Some providers send an empty string for a call with no arguments
    let raw = if arguments.trim().is_empty() {
        "{}"
    } else {
        arguments
    };
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| FixFastError::Validation(format!("arguments are not valid JSON: {}", e)))?;
    match value {
        Value::Object(mut map) => {
            map.retain(|_, v| !v.is_null());
            Ok(map)
        }
        other => Err(FixFastError::Validation(format!(
            "arguments must be a JSON object, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
