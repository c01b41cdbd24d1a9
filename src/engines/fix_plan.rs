// src/engines/fix_plan.rs
// Playbook selection and customisation

use crate::model::{Priority, RegressionType, Severity};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixStep {
    pub order: u32,
    pub action: String,
    pub description: String,
    pub automated: bool,
}

/// Output of `generate_fix_plan`, also the shape of a stored playbook
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixPlan {
    pub immediate_actions: Vec<String>,
    pub fix_steps: Vec<FixStep>,
    pub prevention_measures: Vec<String>,
    pub shift_left_recommendations: Vec<String>,
    pub estimated_effort: String,
    pub rollback_plan: String,
    pub test_strategy: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playbook {
    pub regression_type: RegressionType,
    #[serde(flatten)]
    pub plan: FixPlan,
}

/// Playbooks keyed by regression type, plus the generic fallback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybookLibrary {
    pub playbooks: Vec<Playbook>,
    pub fallback: FixPlan,
    /// Prepended to immediate actions for P0 or critical issues
    pub escalation_actions: Vec<String>,
}

impl PlaybookLibrary {
    pub fn lookup(&self, regression_type: RegressionType) -> &FixPlan {
        self.playbooks
            .iter()
            .find(|p| p.regression_type == regression_type)
            .map(|p| &p.plan)
            .unwrap_or(&self.fallback)
    }
}

/// Arguments of `generate_fix_plan`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FixPlanRequest {
    pub regression_type: String,
    pub severity: String,
    #[serde(default)]
    pub affected_files: Vec<String>,
    pub root_cause: String,
    pub priority: String,
}

/// Select a playbook and tailor it to the request.
///
/// The plan only grows: escalation actions go in front, a focus step goes
/// at the end. Existing steps are never reordered or dropped.
pub fn generate_fix_plan(library: &PlaybookLibrary, req: &FixPlanRequest) -> FixPlan {
    let regression_type = RegressionType::parse(&req.regression_type);
    debug!(
        regression_type = %regression_type,
        root_cause = %req.root_cause,
        "Generating fix plan"
    );

    let mut plan = library.lookup(regression_type).clone();

    let escalate = Priority::parse(&req.priority) == Some(Priority::P0)
        || Severity::parse(&req.severity) == Some(Severity::Critical);
    if escalate {
        let mut actions = library.escalation_actions.clone();
        actions.append(&mut plan.immediate_actions);
        plan.immediate_actions = actions;
    }

    if !req.affected_files.is_empty() {
        plan.fix_steps.push(FixStep {
            order: plan.fix_steps.len() as u32 + 1,
            action: "focus-files".to_string(),
            description: format!("Focus review on: {}", req.affected_files.join(", ")),
            automated: false,
        });
    }

    plan
}
