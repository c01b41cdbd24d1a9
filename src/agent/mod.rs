// src/agent/mod.rs
// Conversation orchestrator for the Fix Fast triage agent

mod conversation;
mod events;
mod orchestrator;
mod prompt;

pub use conversation::ConversationState;
pub use events::RunEvent;
pub use orchestrator::{
    AgentConfig, DEFAULT_CALL_TIMEOUT_SECS, DEFAULT_MAX_ROUNDS, Orchestrator, RunOutcome,
};
pub use prompt::SYSTEM_PROMPT;
