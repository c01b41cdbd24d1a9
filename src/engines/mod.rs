// src/engines/mod.rs
// Deterministic analysis engines behind the four tools

pub mod attribution;
pub mod classify;
pub mod fix_plan;
mod playbooks;
pub mod run_history;
pub mod tables;
pub mod triage;

pub use attribution::{AttributeRequest, AttributionResult, OwnershipTable, SuspectedOwner, attribute};
pub use classify::{DetectRequest, DetectionResult, SignalTable, classify};
pub use fix_plan::{FixPlan, FixPlanRequest, FixStep, PlaybookLibrary, generate_fix_plan};
pub use run_history::{RunHistoryAnalysis, RunHistoryStats};
pub use tables::Tables;
pub use triage::{CostModel, TriageRequest, TriageResult, triage};
