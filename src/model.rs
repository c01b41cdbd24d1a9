// src/model.rs
// Closed vocabularies shared by the engines and the tool contracts

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of regression the classifier can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegressionType {
    NullPointer,
    Performance,
    Crash,
    MemoryLeak,
    LogicError,
    DataCorruption,
    ApiBreakingChange,
    SecurityFlaw,
    Unknown,
}

impl RegressionType {
    pub const ALL: [RegressionType; 9] = [
        Self::NullPointer,
        Self::Performance,
        Self::Crash,
        Self::MemoryLeak,
        Self::LogicError,
        Self::DataCorruption,
        Self::ApiBreakingChange,
        Self::SecurityFlaw,
        Self::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NullPointer => "null_pointer",
            Self::Performance => "performance",
            Self::Crash => "crash",
            Self::MemoryLeak => "memory_leak",
            Self::LogicError => "logic_error",
            Self::DataCorruption => "data_corruption",
            Self::ApiBreakingChange => "api_breaking_change",
            Self::SecurityFlaw => "security_flaw",
            Self::Unknown => "unknown",
        }
    }

    /// Lenient parse: anything unrecognised is `Unknown`
    pub fn parse(s: &str) -> Self {
        let needle = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == needle)
            .unwrap_or(Self::Unknown)
    }
}

impl fmt::Display for RegressionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity, ordered so that `Critical > High > Medium > Low`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derived triage bucket. P0 is the most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    P0,
    P1,
    P2,
    P3,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::P0 => "P0",
            Self::P1 => "P1",
            Self::P2 => "P2",
            Self::P3 => "P3",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "P0" => Some(Self::P0),
            "P1" => Some(Self::P1),
            "P2" => Some(Self::P2),
            "P3" => Some(Self::P3),
            _ => None,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pipeline stage where a defect was detected, leftmost first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Ide,
    LocalTest,
    Ci,
    CodeReview,
    Staging,
    Production,
}

impl Environment {
    /// All stages in pipeline order
    pub const ALL: [Environment; 6] = [
        Self::Ide,
        Self::LocalTest,
        Self::Ci,
        Self::CodeReview,
        Self::Staging,
        Self::Production,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ide => "ide",
            Self::LocalTest => "local_test",
            Self::Ci => "ci",
            Self::CodeReview => "code_review",
            Self::Staging => "staging",
            Self::Production => "production",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let needle = s.trim().to_lowercase();
        Self::ALL.into_iter().find(|e| e.as_str() == needle)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
