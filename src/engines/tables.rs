// src/engines/tables.rs
// Injectable lookup tables shared read-only by all engines

use super::attribution::OwnershipTable;
use super::classify::SignalTable;
use super::fix_plan::PlaybookLibrary;
use super::triage::CostModel;
use crate::error::Result;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

static BUILTIN: Lazy<Arc<Tables>> = Lazy::new(|| Arc::new(Tables::default()));

/// Every lookup table the engines consult.
///
/// Sections missing from a tables file keep their built-in values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tables {
    pub classification: SignalTable,
    pub cost: CostModel,
    pub ownership: OwnershipTable,
    pub playbooks: PlaybookLibrary,
}

impl Tables {
    /// Shared handle to the built-in tables
    pub fn builtin() -> Arc<Tables> {
        BUILTIN.clone()
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Load an override file. Unlike the user config, a tables file that was
    /// asked for explicitly must exist and parse.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let tables = Self::from_toml(&contents)?;
        info!(
            path = %path.display(),
            signal_rules = tables.classification.rules.len(),
            ownership_rules = tables.ownership.rules.len(),
            playbooks = tables.playbooks.playbooks.len(),
            "Loaded lookup tables"
        );
        Ok(tables)
    }
}
