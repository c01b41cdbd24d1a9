// tests/common/mod.rs
// Shared test utilities: a scripted LLM client and canned responses

#![allow(dead_code)]

use async_trait::async_trait;
use fixfast::llm::{ChatResult, LlmClient, Message, Provider, Tool, ToolCall, Usage};
use fixfast::{FixFastError, Result};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// One request as the client saw it
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub messages: Vec<Message>,
    pub tools: Option<Vec<Tool>>,
    /// Sent through `chat_final`: tools declared, calls forbidden
    pub final_answer: bool,
}

/// Replays queued responses in order and records every request
pub struct ScriptedClient {
    responses: Mutex<VecDeque<Result<ChatResult>>>,
    calls: Mutex<Vec<RecordedCall>>,
    delay: Option<Duration>,
}

impl ScriptedClient {
    pub fn new(responses: Vec<Result<ChatResult>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Sleep before every response
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    async fn reply(&self, call: RecordedCall) -> Result<ChatResult> {
        self.calls.lock().unwrap().push(call);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(FixFastError::Transport("script exhausted".into())))
    }
}

#[async_trait]
impl LlmClient for ScriptedClient {
    async fn chat(&self, messages: Vec<Message>, tools: Option<Vec<Tool>>) -> Result<ChatResult> {
        self.reply(RecordedCall {
            messages,
            tools,
            final_answer: false,
        })
        .await
    }

    async fn chat_final(&self, messages: Vec<Message>, tools: Vec<Tool>) -> Result<ChatResult> {
        self.reply(RecordedCall {
            messages,
            tools: Some(tools),
            final_answer: true,
        })
        .await
    }

    fn provider_type(&self) -> Provider {
        Provider::Anthropic
    }

    fn model_name(&self) -> String {
        "scripted".to_string()
    }
}

/// Assistant turn with text only
pub fn text_reply(text: &str) -> Result<ChatResult> {
    Ok(ChatResult {
        request_id: "req-text".into(),
        content: Some(text.into()),
        usage: Some(Usage::new(10, 5)),
        ..Default::default()
    })
}

/// Assistant turn requesting tools, given as (id, name, json arguments)
pub fn tool_reply(calls: &[(&str, &str, &str)]) -> Result<ChatResult> {
    Ok(ChatResult {
        request_id: "req-tools".into(),
        content: None,
        tool_calls: Some(
            calls
                .iter()
                .map(|(id, name, args)| ToolCall::new(*id, *name, *args))
                .collect(),
        ),
        usage: Some(Usage::new(20, 8)),
        ..Default::default()
    })
}

pub const DETECT_ARGS: &str = r#"{"description":"panic: nil pointer dereference in handler","environment":"production","files_changed":["api/handler.go"]}"#;
pub const TRIAGE_ARGS: &str = r#"{"regression_type":"null_pointer","severity":"high","environment":"production","affected_users_estimate":5000}"#;
