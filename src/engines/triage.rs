// src/engines/triage.rs
// Cost-per-detection scoring, priority buckets, and shift-left targets

use crate::model::{Environment, Priority, RegressionType, Severity};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One value per pipeline stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentTable<T> {
    pub ide: T,
    pub local_test: T,
    pub ci: T,
    pub code_review: T,
    pub staging: T,
    pub production: T,
}

impl<T> EnvironmentTable<T> {
    pub fn get(&self, env: Environment) -> &T {
        match env {
            Environment::Ide => &self.ide,
            Environment::LocalTest => &self.local_test,
            Environment::Ci => &self.ci,
            Environment::CodeReview => &self.code_review,
            Environment::Staging => &self.staging,
            Environment::Production => &self.production,
        }
    }
}

/// One value per severity level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeverityTable<T> {
    pub critical: T,
    pub high: T,
    pub medium: T,
    pub low: T,
}

impl<T> SeverityTable<T> {
    pub fn get(&self, severity: Severity) -> &T {
        match severity {
            Severity::Critical => &self.critical,
            Severity::High => &self.high,
            Severity::Medium => &self.medium,
            Severity::Low => &self.low,
        }
    }
}

/// Users strictly above `above` scale the cost by `factor`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactStep {
    pub above: i64,
    pub factor: f64,
}

/// Cost at or above `min_cost` lands in `priority`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityBand {
    pub priority: Priority,
    pub min_cost: f64,
    pub action: String,
}

/// Lookup tables for the triage engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostModel {
    pub environment_multiplier: EnvironmentTable<u32>,
    /// Used when the environment string is not recognised
    pub default_multiplier: u32,
    pub severity_base: SeverityTable<f64>,
    pub default_base: f64,
    /// Checked in order, first match wins
    pub user_impact: Vec<ImpactStep>,
    pub default_impact: f64,
    /// Checked in order, first match wins; the last band catches everything else
    pub priority_bands: Vec<PriorityBand>,
    pub shift_left: EnvironmentTable<Environment>,
    pub default_shift_left: Environment,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            environment_multiplier: EnvironmentTable {
                ide: 1,
                local_test: 3,
                ci: 10,
                code_review: 15,
                staging: 30,
                production: 100,
            },
            default_multiplier: 30,
            severity_base: SeverityTable {
                critical: 100.0,
                high: 50.0,
                medium: 20.0,
                low: 5.0,
            },
            default_base: 20.0,
            user_impact: vec![
                ImpactStep {
                    above: 1000,
                    factor: 2.0,
                },
                ImpactStep {
                    above: 100,
                    factor: 1.5,
                },
            ],
            default_impact: 1.0,
            priority_bands: vec![
                PriorityBand {
                    priority: Priority::P0,
                    min_cost: 5000.0,
                    action: "Page on-call immediately. Revert or hotfix within 1 hour.".into(),
                },
                PriorityBand {
                    priority: Priority::P1,
                    min_cost: 1000.0,
                    action: "Fix today. Assign to the last committer and block release if unresolved."
                        .into(),
                },
                PriorityBand {
                    priority: Priority::P2,
                    min_cost: 200.0,
                    action: "Schedule fix this sprint. Add to team backlog with owner assigned."
                        .into(),
                },
                PriorityBand {
                    priority: Priority::P3,
                    min_cost: 0.0,
                    action: "Add to backlog. Consider addressing during next refactoring cycle."
                        .into(),
                },
            ],
            shift_left: EnvironmentTable {
                ide: Environment::Ide,
                local_test: Environment::Ide,
                ci: Environment::LocalTest,
                code_review: Environment::LocalTest,
                staging: Environment::Ci,
                production: Environment::Staging,
            },
            default_shift_left: Environment::Ci,
        }
    }
}

impl CostModel {
    pub fn multiplier(&self, env: Option<Environment>) -> u32 {
        env.map(|e| *self.environment_multiplier.get(e))
            .unwrap_or(self.default_multiplier)
    }

    pub fn base_score(&self, severity: Option<Severity>) -> f64 {
        severity
            .map(|s| *self.severity_base.get(s))
            .unwrap_or(self.default_base)
    }

    pub fn impact_factor(&self, affected_users: i64) -> f64 {
        self.user_impact
            .iter()
            .find(|step| affected_users > step.above)
            .map(|step| step.factor)
            .unwrap_or(self.default_impact)
    }

    /// The first band whose floor the cost reaches, or the last band
    pub fn band(&self, cost: f64) -> Option<&PriorityBand> {
        self.priority_bands
            .iter()
            .find(|b| cost >= b.min_cost)
            .or_else(|| self.priority_bands.last())
    }

    pub fn shift_left_of(&self, env: Option<Environment>) -> Environment {
        env.map(|e| *self.shift_left.get(e))
            .unwrap_or(self.default_shift_left)
    }
}

/// Arguments of `triage_issue`
#[derive(Debug, Clone, Deserialize)]
pub struct TriageRequest {
    pub regression_type: String,
    pub severity: String,
    pub environment: String,
    pub affected_users_estimate: i64,
}

/// Output of `triage_issue`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriageResult {
    pub cpd_score: f64,
    pub cpd_multiplier: u32,
    pub priority: Priority,
    pub recommended_action: String,
    pub shift_left_target: Environment,
    pub cost_rationale: String,
}

/// Score a regression and pick its priority
pub fn triage(model: &CostModel, req: &TriageRequest) -> TriageResult {
    debug!(
        regression_type = %RegressionType::parse(&req.regression_type),
        severity = %req.severity,
        environment = %req.environment,
        "Triage request"
    );
    let environment = Environment::parse(&req.environment);

    let multiplier = model.multiplier(environment);
    let base = model.base_score(Severity::parse(&req.severity));
    let impact = model.impact_factor(req.affected_users_estimate);
    let cost = base * multiplier as f64 * impact;

    let (priority, action) = match model.band(cost) {
        Some(band) => (band.priority, band.action.clone()),
        None => (Priority::P3, String::new()),
    };

    let target = model.shift_left_of(environment);
    let shifted_cost = base * model.multiplier(Some(target)) as f64 * impact;
    // Denominator is recomputed rather than taken from the multiplier ratio
    let ratio = cost / (base * model.multiplier(Some(target)) as f64 * impact);

    let cost_rationale = format!(
        "Base severity score {:.0} × {}x environment multiplier (found in {}) × {:.1}x user impact = CPD {:.0}. \
         If caught at {} stage, CPD would have been {:.0} ({:.0}x cheaper).",
        base, multiplier, req.environment, impact, cost, target, shifted_cost, ratio
    );

    TriageResult {
        cpd_score: cost,
        cpd_multiplier: multiplier,
        priority,
        recommended_action: action,
        shift_left_target: target,
        cost_rationale,
    }
}
