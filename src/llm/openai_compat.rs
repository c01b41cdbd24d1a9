// src/llm/openai_compat.rs
// OpenAI-compatible chat client (OpenAI, DeepSeek)

use crate::error::{FixFastError, Result};
use crate::llm::http_client::LlmHttpClient;
use crate::llm::logging::{log_completion, log_tool_calls, log_usage};
use crate::llm::provider::{LlmClient, Provider};
use crate::llm::{ChatResult, Message, Tool, ToolCall, Usage};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{Span, debug, info, instrument};
use uuid::Uuid;

// ============================================================================
// Request
// ============================================================================

/// Chat completion request (OpenAI-compatible format)
#[derive(Debug, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<String>, // "auto" | "required" | "none"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            tools: None,
            tool_choice: None,
            max_tokens: None,
        }
    }

    /// Set tools for function calling
    pub fn with_tools(mut self, tools: Option<Vec<Tool>>) -> Self {
        self.tools = tools;
        if self.tools.is_some() {
            self.tool_choice = Some("auto".into());
        }
        self
    }

    /// Keep the tools declared but forbid calling them
    pub fn forbid_tool_calls(mut self) -> Self {
        if self.tools.is_some() {
            self.tool_choice = Some("none".into());
        }
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

// ============================================================================
// Response
// ============================================================================

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ResponseChoice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ResponseChoice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCall>>,
}

/// Parse an OpenAI-compatible chat response into a ChatResult
pub fn parse_chat_response(
    response_body: &str,
    request_id: &str,
    duration_ms: u64,
) -> Result<ChatResult> {
    let data: ChatResponse = serde_json::from_str(response_body)
        .map_err(|e| FixFastError::Transport(format!("Failed to parse chat response: {}", e)))?;

    let (content, tool_calls) = match data.choices.into_iter().next() {
        Some(c) => (c.message.content, c.message.tool_calls),
        None => (None, None),
    };

    // Some servers omit the call type
    let tool_calls = tool_calls.map(|mut calls| {
        for tc in &mut calls {
            if tc.call_type.is_empty() {
                tc.call_type = "function".into();
            }
        }
        calls
    });

    Ok(ChatResult {
        request_id: request_id.to_owned(),
        content,
        tool_calls,
        usage: data.usage,
        duration_ms,
    })
}

// ============================================================================
// Client
// ============================================================================

pub struct OpenAiCompatClient {
    provider: Provider,
    api_key: String,
    model: String,
    url: String,
    max_tokens: Option<u32>,
    http: LlmHttpClient,
}

impl OpenAiCompatClient {
    pub fn new(provider: Provider, api_key: String) -> Self {
        Self::with_model(provider, api_key, provider.default_model().into())
    }

    pub fn with_model(provider: Provider, api_key: String, model: String) -> Self {
        Self {
            provider,
            api_key,
            model,
            url: provider.default_url().into(),
            max_tokens: None,
            http: LlmHttpClient::default(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_http(mut self, http: LlmHttpClient) -> Self {
        self.http = http;
        self
    }

    fn provider_name(&self) -> &'static str {
        match self.provider {
            Provider::DeepSeek => "DeepSeek",
            _ => "OpenAI",
        }
    }

    #[instrument(skip(self, messages, tools), fields(request_id, model = %self.model, message_count = messages.len()))]
    async fn complete(
        &self,
        messages: Vec<Message>,
        tools: Option<Vec<Tool>>,
        final_answer: bool,
    ) -> Result<ChatResult> {
        let request_id = Uuid::new_v4().to_string();
        let start_time = Instant::now();
        Span::current().record("request_id", &request_id);

        let provider = self.provider_name();
        info!(
            request_id = %request_id,
            message_count = messages.len(),
            tool_count = tools.as_ref().map(|t| t.len()).unwrap_or(0),
            model = %self.model,
            final_answer,
            "Starting {} chat request", provider
        );

        let mut request = ChatRequest::new(&self.model, messages).with_tools(tools);
        if final_answer {
            request = request.forbid_tool_calls();
        }
        if let Some(max) = self.max_tokens {
            request = request.with_max_tokens(max);
        }
        let body = serde_json::to_string(&request)?;
        debug!(request_id = %request_id, "{} request: {}", provider, body);

        let response_body = self
            .http
            .execute_with_retry(&request_id, &self.url, &self.api_key, body)
            .await?;

        let duration_ms = start_time.elapsed().as_millis() as u64;
        let result = parse_chat_response(&response_body, &request_id, duration_ms)?;

        if let Some(ref u) = result.usage {
            log_usage(&request_id, provider, u);
        }
        if let Some(ref tcs) = result.tool_calls {
            log_tool_calls(&request_id, provider, tcs);
        }
        log_completion(
            &request_id,
            provider,
            duration_ms,
            result.content.as_ref().map(|c| c.len()).unwrap_or(0),
            result.tool_calls.as_ref().map(|t| t.len()).unwrap_or(0),
        );

        Ok(result)
    }
}

#[async_trait]
impl LlmClient for OpenAiCompatClient {
    async fn chat(&self, messages: Vec<Message>, tools: Option<Vec<Tool>>) -> Result<ChatResult> {
        self.complete(messages, tools, false).await
    }

    async fn chat_final(&self, messages: Vec<Message>, tools: Vec<Tool>) -> Result<ChatResult> {
        self.complete(messages, Some(tools), true).await
    }

    fn provider_type(&self) -> Provider {
        self.provider
    }

    fn model_name(&self) -> String {
        self.model.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // Request
    // ========================================================================

    #[test]
    fn test_request_sets_tool_choice_with_tools() {
        let tools = vec![Tool::function("t", "d", serde_json::json!({"type": "object"}))];
        let req = ChatRequest::new("m", vec![Message::user("hi")]).with_tools(Some(tools));
        assert_eq!(req.tool_choice.as_deref(), Some("auto"));

        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["tools"][0]["function"]["name"], "t");
        assert!(json.get("max_tokens").is_none());
    }

    #[test]
    fn test_final_request_keeps_tools_declared() {
        let tools = vec![Tool::function("t", "d", serde_json::json!({"type": "object"}))];
        let history = vec![
            Message::assistant(None, Some(vec![ToolCall::new("c1", "t", "{}")])),
            Message::tool_result("c1", "{}", false),
        ];
        let req = ChatRequest::new("m", history)
            .with_tools(Some(tools))
            .forbid_tool_calls();
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["tools"][0]["function"]["name"], "t");
        assert_eq!(json["tool_choice"], "none");

        // Nothing declared, nothing to forbid
        let bare = ChatRequest::new("m", vec![]).forbid_tool_calls();
        assert!(bare.tool_choice.is_none());
    }

    #[test]
    fn test_request_without_tools_has_no_tool_choice() {
        let req = ChatRequest::new("m", vec![]).with_tools(None).with_max_tokens(100);
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("tools").is_none());
        assert!(json.get("tool_choice").is_none());
        assert_eq!(json["max_tokens"], 100);
    }

    #[test]
    fn test_tool_turns_serialize_with_call_id() {
        let history = vec![
            Message::assistant(None, Some(vec![ToolCall::new("c1", "triage_issue", "{}")])),
            Message::tool_result("c1", "{\"priority\":\"P1\"}", false),
        ];
        let json = serde_json::to_value(ChatRequest::new("m", history)).unwrap();
        assert_eq!(json["messages"][0]["tool_calls"][0]["id"], "c1");
        assert_eq!(json["messages"][1]["role"], "tool");
        assert_eq!(json["messages"][1]["tool_call_id"], "c1");
    }

    // ========================================================================
    // Response
    // ========================================================================

    #[test]
    fn test_parse_simple_response() {
        let json = r#"{
            "choices": [{"message": {"content": "Hello, world!"}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        }"#;
        let result = parse_chat_response(json, "test-123", 100).unwrap();
        assert_eq!(result.request_id, "test-123");
        assert_eq!(result.content.as_deref(), Some("Hello, world!"));
        assert!(result.tool_calls.is_none());
        assert_eq!(result.usage.unwrap().total_tokens, 15);
        assert_eq!(result.duration_ms, 100);
    }

    #[test]
    fn test_parse_multiple_tool_calls() {
        let json = r#"{
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [
                        {"id": "call_1", "type": "function", "function": {"name": "detect_regression", "arguments": "{}"}},
                        {"id": "call_2", "type": "function", "function": {"name": "triage_issue", "arguments": "{\"severity\":\"high\"}"}}
                    ]
                }
            }],
            "usage": null
        }"#;
        let result = parse_chat_response(json, "test", 0).unwrap();
        let calls = result.tool_calls.unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].id, "call_1");
        assert_eq!(calls[1].function.name, "triage_issue");
        assert_eq!(calls[1].function.arguments, r#"{"severity":"high"}"#);
    }

    #[test]
    fn test_parse_empty_choices() {
        let result = parse_chat_response(r#"{"choices": [], "usage": null}"#, "test", 0).unwrap();
        assert!(result.content.is_none());
        assert!(result.tool_calls.is_none());
    }

    #[test]
    fn test_parse_invalid_json_is_transport_error() {
        let err = parse_chat_response("not json", "test", 0).unwrap_err();
        assert!(matches!(err, FixFastError::Transport(_)));
    }

    // ========================================================================
    // Client construction
    // ========================================================================

    #[test]
    fn test_deepseek_defaults() {
        let client = OpenAiCompatClient::new(Provider::DeepSeek, "key".into());
        assert_eq!(client.provider_type(), Provider::DeepSeek);
        assert_eq!(client.model_name(), "deepseek-chat");
        assert_eq!(client.url, "https://api.deepseek.com/chat/completions");
        assert_eq!(client.provider_name(), "DeepSeek");
    }

    #[test]
    fn test_custom_url_and_model() {
        let client = OpenAiCompatClient::with_model(Provider::OpenAi, "key".into(), "gpt-x".into())
            .with_url("http://localhost:8080/v1/chat/completions");
        assert_eq!(client.model_name(), "gpt-x");
        assert_eq!(client.url, "http://localhost:8080/v1/chat/completions");
    }
}
