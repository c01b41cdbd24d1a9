// src/tools/mod.rs
// Model-invokable tools backed by the triage engines

mod registry;

pub use registry::{FieldKind, FieldSpec, ToolRegistry, ToolResult, ToolSpec};
