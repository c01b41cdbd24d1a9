// src/engines/attribution.rs
// Heuristic ownership attribution from changed files and description text

use crate::model::RegressionType;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Keyword rule that claims files for a component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnershipRule {
    pub component: String,
    pub role: String,
    pub keywords: Vec<String>,
}

impl OwnershipRule {
    fn new(keywords: &[&str], component: &str, role: &str) -> Self {
        Self {
            component: component.to_string(),
            role: role.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    /// First keyword contained in any of `haystacks`
    fn first_match(&self, haystacks: &[&str]) -> Option<&str> {
        self.keywords
            .iter()
            .find(|k| haystacks.iter().any(|h| h.contains(k.as_str())))
            .map(String::as_str)
    }
}

/// Note keyed by regression type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedNote {
    pub regression_type: RegressionType,
    pub text: String,
}

impl TypedNote {
    fn new(regression_type: RegressionType, text: &str) -> Self {
        Self {
            regression_type,
            text: text.to_string(),
        }
    }
}

/// Lookup tables for the attribution engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OwnershipTable {
    /// Priority order: a file belongs to the first rule it matches
    pub rules: Vec<OwnershipRule>,
    pub fallback_component: String,
    pub fallback_confidence: f64,
    pub confidence_cap: f64,
    /// Extra narrative signal appended per regression type
    pub type_signals: Vec<TypedNote>,
    pub reviewer_advice: Vec<TypedNote>,
    pub default_advice: String,
}

impl Default for OwnershipTable {
    fn default() -> Self {
        use RegressionType as T;
        Self {
            rules: vec![
                OwnershipRule::new(
                    &["auth", "login", "session", "token", "oauth"],
                    "auth-service",
                    "Security",
                ),
                OwnershipRule::new(
                    &["db", "database", "model", "migration", "schema", "sql", "query"],
                    "data-layer",
                    "Backend",
                ),
                OwnershipRule::new(
                    &["api", "handler", "route", "endpoint", "controller", "server"],
                    "api-layer",
                    "Backend",
                ),
                OwnershipRule::new(
                    &["ui", "frontend", "component", "view", "react", "vue", "css", "html"],
                    "frontend",
                    "Frontend",
                ),
                OwnershipRule::new(
                    &["cache", "redis", "memcache", "ttl"],
                    "caching-layer",
                    "Infrastructure",
                ),
                OwnershipRule::new(
                    &["queue", "worker", "job", "task", "async", "consumer"],
                    "async-workers",
                    "Backend",
                ),
                OwnershipRule::new(
                    &["test", "spec", "_test", "mock", "fixture"],
                    "test-suite",
                    "QA",
                ),
                OwnershipRule::new(
                    &["config", "env", "setting", "yaml", "toml", "json"],
                    "configuration",
                    "DevOps",
                ),
                OwnershipRule::new(
                    &["deploy", "k8s", "docker", "helm", "terraform", "ci", "cd"],
                    "infra-pipeline",
                    "DevOps",
                ),
                OwnershipRule::new(
                    &["metric", "log", "trace", "monitor", "alert", "dashboard"],
                    "observability",
                    "SRE",
                ),
            ],
            fallback_component: "core-logic".to_string(),
            fallback_confidence: 0.4,
            confidence_cap: 0.95,
            type_signals: vec![
                TypedNote::new(
                    T::NullPointer,
                    "NPE regressions are 3x more likely in non-null-safe files",
                ),
                TypedNote::new(
                    T::Performance,
                    "Performance regressions often originate in data-layer or caching changes",
                ),
                TypedNote::new(
                    T::SecurityFlaw,
                    "Security regressions require immediate auth-service review",
                ),
            ],
            reviewer_advice: vec![
                TypedNote::new(
                    T::SecurityFlaw,
                    "Security review mandatory before any fix is merged.",
                ),
                TypedNote::new(T::DataCorruption, "Data team and DBA must approve the fix."),
                TypedNote::new(
                    T::ApiBreakingChange,
                    "All downstream service owners must be notified.",
                ),
            ],
            default_advice: "Route to the identified component owner for fastest resolution."
                .to_string(),
        }
    }
}

impl OwnershipTable {
    fn advice_for(&self, regression_type: RegressionType) -> &str {
        self.reviewer_advice
            .iter()
            .find(|n| n.regression_type == regression_type)
            .map(|n| n.text.as_str())
            .unwrap_or(&self.default_advice)
    }
}

/// Arguments of `attribute_to_owner`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttributeRequest {
    #[serde(default)]
    pub files_changed: Vec<String>,
    pub description: String,
    pub regression_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuspectedOwner {
    pub component: String,
    pub file_paths: Vec<String>,
    pub confidence: f64,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// Output of `attribute_to_owner`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributionResult {
    pub suspected_owners: Vec<SuspectedOwner>,
    pub highest_confidence_component: String,
    pub attribution_signals: Vec<String>,
    pub recommended_reviewer: String,
    pub summary: String,
}

/// Rank suspected owners for a set of changed files
pub fn attribute(table: &OwnershipTable, req: &AttributeRequest) -> AttributionResult {
    let regression_type = RegressionType::parse(&req.regression_type);

    // Bucket each file under the first matching rule, by rule index
    let mut buckets: Vec<Vec<String>> = vec![Vec::new(); table.rules.len()];
    let mut unmatched: Vec<String> = Vec::new();
    for file in &req.files_changed {
        let lower = file.to_lowercase();
        let base = Path::new(file)
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_else(|| lower.clone());
        let haystacks = [lower.as_str(), base.as_str()];
        match table
            .rules
            .iter()
            .position(|rule| rule.first_match(&haystacks).is_some())
        {
            Some(idx) => buckets[idx].push(file.clone()),
            None => unmatched.push(file.clone()),
        }
    }

    let total_files = req.files_changed.len().max(1) as f64;
    let mut owners: Vec<SuspectedOwner> = table
        .rules
        .iter()
        .zip(buckets)
        .filter(|(_, files)| !files.is_empty())
        .map(|(rule, files)| {
            let preview: Vec<&str> = rule.keywords.iter().take(3).map(String::as_str).collect();
            SuspectedOwner {
                component: rule.component.clone(),
                confidence: (files.len() as f64 / total_files).min(table.confidence_cap),
                file_paths: files,
                reason: format!(
                    "Files match {} pattern ({})",
                    rule.component,
                    preview.join(", ")
                ),
                role: Some(rule.role.clone()),
            }
        })
        .collect();

    if !unmatched.is_empty() {
        owners.push(SuspectedOwner {
            component: table.fallback_component.clone(),
            file_paths: unmatched,
            confidence: table.fallback_confidence,
            reason: "Files did not match any known component pattern".to_string(),
            role: None,
        });
    }

    // Stable: ties keep rule order, fallback last
    owners.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let description = req.description.to_lowercase();
    let mut signals: Vec<String> = table
        .rules
        .iter()
        .filter_map(|rule| {
            rule.first_match(&[description.as_str()])
                .map(|kw| format!("Description mentions '{}' → {}", kw, rule.component))
        })
        .collect();
    signals.extend(
        table
            .type_signals
            .iter()
            .filter(|n| n.regression_type == regression_type)
            .map(|n| n.text.clone()),
    );

    let (highest, reviewer) = match owners.first() {
        Some(top) => (top.component.clone(), format!("{}-owner", top.component)),
        None => ("unknown".to_string(), "team-lead".to_string()),
    };

    let summary = format!(
        "Attribution complete. Highest confidence component: {}. {}",
        highest,
        table.advice_for(regression_type)
    );

    AttributionResult {
        suspected_owners: owners,
        highest_confidence_component: highest,
        attribution_signals: signals,
        recommended_reviewer: reviewer,
        summary,
    }
}
