// src/agent/conversation.rs
// Append-only message history for a single run

use crate::llm::{Message, ToolCall};
use crate::tools::ToolResult;
use std::collections::HashSet;

/// History of one run. Turns are only ever appended.
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    messages: Vec<Message>,
}

impl ConversationState {
    pub fn new(system: &str, input: &str) -> Self {
        Self {
            messages: vec![Message::system(system), Message::user(input)],
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn push_assistant(&mut self, content: Option<String>, tool_calls: Vec<ToolCall>) {
        let tool_calls = (!tool_calls.is_empty()).then_some(tool_calls);
        self.messages.push(Message::assistant(content, tool_calls));
    }

    pub fn push_tool_result(&mut self, result: &ToolResult) {
        self.messages.push(Message::tool_result(
            &result.tool_call_id,
            &result.content,
            result.is_error,
        ));
    }

    /// Call ids from the latest assistant turn that have no tool result yet.
    /// The next model call may only go out when this is empty.
    pub fn unanswered_call_ids(&self) -> Vec<String> {
        let Some(idx) = self.messages.iter().rposition(|m| m.role == "assistant") else {
            return Vec::new();
        };
        let answered: HashSet<&str> = self.messages[idx + 1..]
            .iter()
            .filter_map(|m| m.tool_call_id.as_deref())
            .collect();
        self.messages[idx]
            .calls()
            .iter()
            .filter(|c| !answered.contains(c.id.as_str()))
            .map(|c| c.id.clone())
            .collect()
    }
}
