// src/llm/anthropic.rs
// Anthropic Messages API client with tool use

use crate::error::{FixFastError, Result};
use crate::llm::http_client::LlmHttpClient;
use crate::llm::logging::{log_completion, log_tool_calls, log_usage};
use crate::llm::provider::{LlmClient, Provider};
use crate::llm::{ChatResult, Message, Tool, ToolCall, Usage};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;
use tracing::{Span, debug, info, instrument};
use uuid::Uuid;

const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const DEFAULT_MAX_TOKENS: u32 = 8192;

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
    /// Block types this client does not act on (e.g. thinking)
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnthropicMessage {
    pub role: String, // "user" | "assistant"
    pub content: Vec<ContentBlock>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnthropicTool {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolChoice {
    Auto,
    None,
}

#[derive(Debug, Serialize)]
pub struct MessagesRequest {
    pub model: String,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<AnthropicTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

// ============================================================================
// Conversion
// ============================================================================

/// Split the internal history into the system prompt and Anthropic turns.
///
/// Consecutive tool turns collapse into one user turn of tool_result blocks,
/// since the API wants every result for an assistant turn in the next message.
pub fn convert_messages(messages: &[Message]) -> (Option<String>, Vec<AnthropicMessage>) {
    let mut system: Vec<&str> = Vec::new();
    let mut out: Vec<AnthropicMessage> = Vec::new();

    for msg in messages {
        match msg.role.as_str() {
            "system" => {
                if let Some(ref content) = msg.content {
                    system.push(content);
                }
            }
            "assistant" => {
                let mut blocks = Vec::new();
                if let Some(ref content) = msg.content
                    && !content.is_empty()
                {
                    blocks.push(ContentBlock::Text {
                        text: content.clone(),
                    });
                }
                for tc in msg.calls() {
                    let input: Value = serde_json::from_str(&tc.function.arguments)
                        .unwrap_or(Value::Object(Default::default()));
                    blocks.push(ContentBlock::ToolUse {
                        id: tc.id.clone(),
                        name: tc.function.name.clone(),
                        input,
                    });
                }
                out.push(AnthropicMessage {
                    role: "assistant".into(),
                    content: blocks,
                });
            }
            "tool" => {
                let block = ContentBlock::ToolResult {
                    tool_use_id: msg.tool_call_id.clone().unwrap_or_default(),
                    content: msg.content.clone().unwrap_or_default(),
                    is_error: msg.is_error,
                };
                match out.last_mut() {
                    Some(last) if last.role == "user" && is_tool_result_turn(last) => {
                        last.content.push(block)
                    }
                    _ => out.push(AnthropicMessage {
                        role: "user".into(),
                        content: vec![block],
                    }),
                }
            }
            _ => out.push(AnthropicMessage {
                role: "user".into(),
                content: vec![ContentBlock::Text {
                    text: msg.content.clone().unwrap_or_default(),
                }],
            }),
        }
    }

    let system = (!system.is_empty()).then(|| system.join("\n\n"));
    (system, out)
}

fn is_tool_result_turn(msg: &AnthropicMessage) -> bool {
    msg.content
        .iter()
        .all(|b| matches!(b, ContentBlock::ToolResult { .. }))
}

pub fn convert_tools(tools: &[Tool]) -> Vec<AnthropicTool> {
    tools
        .iter()
        .map(|t| AnthropicTool {
            name: t.function.name.clone(),
            description: t.function.description.clone(),
            input_schema: t.function.parameters.clone(),
        })
        .collect()
}

/// Parse a Messages API response into a ChatResult
pub fn parse_messages_response(
    response_body: &str,
    request_id: &str,
    duration_ms: u64,
) -> Result<ChatResult> {
    let data: MessagesResponse = serde_json::from_str(response_body).map_err(|e| {
        FixFastError::Transport(format!("Failed to parse messages response: {}", e))
    })?;

    let mut text = String::new();
    let mut tool_calls = Vec::new();
    for block in data.content {
        match block {
            ContentBlock::Text { text: t } => text.push_str(&t),
            ContentBlock::ToolUse { id, name, input } => {
                tool_calls.push(ToolCall::new(id, name, input.to_string()))
            }
            _ => {}
        }
    }

    debug!(request_id = %request_id, stop_reason = ?data.stop_reason, "Anthropic stop reason");

    Ok(ChatResult {
        request_id: request_id.to_owned(),
        content: (!text.is_empty()).then_some(text),
        tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
        usage: data
            .usage
            .map(|u| Usage::new(u.input_tokens, u.output_tokens)),
        duration_ms,
    })
}

// ============================================================================
// Client
// ============================================================================

pub struct AnthropicClient {
    api_key: String,
    model: String,
    url: String,
    max_tokens: u32,
    http: LlmHttpClient,
}

impl AnthropicClient {
    pub fn new(api_key: String) -> Self {
        Self::with_model(api_key, Provider::Anthropic.default_model().into())
    }

    pub fn with_model(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            url: Provider::Anthropic.default_url().into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            http: LlmHttpClient::default(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_http(mut self, http: LlmHttpClient) -> Self {
        self.http = http;
        self
    }

    fn build_request(
        &self,
        messages: &[Message],
        tools: Option<&[Tool]>,
        choice: Option<ToolChoice>,
    ) -> MessagesRequest {
        let (system, messages) = convert_messages(messages);
        let tools = tools.map(convert_tools).unwrap_or_default();
        // tool_choice without tools is rejected by the API
        let tool_choice = choice.filter(|_| !tools.is_empty());
        MessagesRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            system,
            messages,
            tools,
            tool_choice,
        }
    }

    #[instrument(skip(self, messages, tools), fields(request_id, model = %self.model, message_count = messages.len()))]
    async fn complete(
        &self,
        messages: Vec<Message>,
        tools: Option<Vec<Tool>>,
        choice: Option<ToolChoice>,
    ) -> Result<ChatResult> {
        let request_id = Uuid::new_v4().to_string();
        let start_time = Instant::now();
        Span::current().record("request_id", &request_id);

        info!(
            request_id = %request_id,
            message_count = messages.len(),
            tool_count = tools.as_ref().map(|t| t.len()).unwrap_or(0),
            model = %self.model,
            tool_choice = ?choice,
            "Starting Anthropic chat request"
        );

        let request = self.build_request(&messages, tools.as_deref(), choice);
        let body = serde_json::to_string(&request)?;
        debug!(request_id = %request_id, "Anthropic request: {}", body);

        let response_body = self
            .http
            .execute_request_with_retry(&request_id, body, |client, body| {
                client
                    .post(&self.url)
                    .header("x-api-key", &self.api_key)
                    .header("anthropic-version", ANTHROPIC_VERSION)
                    .header("content-type", "application/json")
                    .body(body)
            })
            .await?;

        let duration_ms = start_time.elapsed().as_millis() as u64;
        let result = parse_messages_response(&response_body, &request_id, duration_ms)?;

        if let Some(ref u) = result.usage {
            log_usage(&request_id, "Anthropic", u);
        }
        if let Some(ref tcs) = result.tool_calls {
            log_tool_calls(&request_id, "Anthropic", tcs);
        }
        log_completion(
            &request_id,
            "Anthropic",
            duration_ms,
            result.content.as_ref().map(|c| c.len()).unwrap_or(0),
            result.tool_calls.as_ref().map(|t| t.len()).unwrap_or(0),
        );

        Ok(result)
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn chat(&self, messages: Vec<Message>, tools: Option<Vec<Tool>>) -> Result<ChatResult> {
        self.complete(messages, tools, Some(ToolChoice::Auto)).await
    }

    async fn chat_final(&self, messages: Vec<Message>, tools: Vec<Tool>) -> Result<ChatResult> {
        self.complete(messages, Some(tools), Some(ToolChoice::None)).await
    }

    fn provider_type(&self) -> Provider {
        Provider::Anthropic
    }

    fn model_name(&self) -> String {
        self.model.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn history() -> Vec<Message> {
        vec![
            Message::system("You are Fix Fast."),
            Message::user("checkout crashes"),
            Message::assistant(
                Some("Looking into it.".into()),
                Some(vec![
                    ToolCall::new("toolu_1", "detect_regression", r#"{"description":"crash"}"#),
                    ToolCall::new("toolu_2", "nope", "not json"),
                ]),
            ),
            Message::tool_result("toolu_1", r#"{"regression_type":"crash"}"#, false),
            Message::tool_result("toolu_2", "unknown tool: nope", true),
        ]
    }

    // ========================================================================
    // Conversion
    // ========================================================================

    #[test]
    fn test_system_goes_to_system_field() {
        let (system, messages) = convert_messages(&history());
        assert_eq!(system.as_deref(), Some("You are Fix Fast."));
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, "user");
    }

    #[test]
    fn test_assistant_tool_calls_become_tool_use() {
        let (_, messages) = convert_messages(&history());
        let assistant = &messages[1];
        assert_eq!(assistant.role, "assistant");
        assert_eq!(
            assistant.content[0],
            ContentBlock::Text {
                text: "Looking into it.".into()
            }
        );
        assert_eq!(
            assistant.content[1],
            ContentBlock::ToolUse {
                id: "toolu_1".into(),
                name: "detect_regression".into(),
                input: json!({"description": "crash"}),
            }
        );
        // Unparseable arguments still produce an object input
        assert!(matches!(
            &assistant.content[2],
            ContentBlock::ToolUse { input, .. } if input == &json!({})
        ));
    }

    #[test]
    fn test_consecutive_tool_results_merge() {
        let (_, messages) = convert_messages(&history());
        let results = &messages[2];
        assert_eq!(results.role, "user");
        assert_eq!(results.content.len(), 2);
        let json = serde_json::to_value(results).unwrap();
        assert_eq!(json["content"][0]["type"], "tool_result");
        assert_eq!(json["content"][0]["tool_use_id"], "toolu_1");
        assert!(json["content"][0].get("is_error").is_none());
        assert_eq!(json["content"][1]["is_error"], true);
    }

    #[test]
    fn test_request_shape() {
        let client = AnthropicClient::new("key".into());
        let tools = vec![Tool::function("detect_regression", "d", json!({"type": "object"}))];
        let req = client.build_request(&history(), Some(&tools), Some(ToolChoice::Auto));
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["max_tokens"], 8192);
        assert_eq!(json["system"], "You are Fix Fast.");
        assert_eq!(json["tools"][0]["name"], "detect_regression");
        assert_eq!(json["tools"][0]["input_schema"]["type"], "object");
        assert_eq!(json["tool_choice"], json!({"type": "auto"}));

        let bare = client.build_request(&[Message::user("hi")], None, Some(ToolChoice::Auto));
        let json = serde_json::to_value(&bare).unwrap();
        assert!(json.get("tools").is_none());
        assert!(json.get("system").is_none());
    }

    #[test]
    fn test_final_request_declares_tools_for_tool_history() {
        let client = AnthropicClient::new("key".into());
        let tools = vec![Tool::function("detect_regression", "d", json!({"type": "object"}))];
        let req = client.build_request(&history(), Some(&tools), Some(ToolChoice::None));
        let json = serde_json::to_value(&req).unwrap();

        let has_tool_blocks = json["messages"]
            .as_array()
            .unwrap()
            .iter()
            .flat_map(|m| m["content"].as_array().unwrap())
            .any(|b| b["type"] == "tool_use" || b["type"] == "tool_result");
        assert!(has_tool_blocks);
        assert_eq!(json["tools"].as_array().map(Vec::len), Some(1));
        assert_eq!(json["tool_choice"], json!({"type": "none"}));

        // No tools declared means no tool_choice either
        let bare = client.build_request(&[Message::user("hi")], None, Some(ToolChoice::None));
        let json = serde_json::to_value(&bare).unwrap();
        assert!(json.get("tool_choice").is_none());
    }

    // ========================================================================
    // Response
    // ========================================================================

    #[test]
    fn test_parse_text_and_tool_use() {
        let body = r#"{
            "id": "msg_1",
            "content": [
                {"type": "thinking", "thinking": "hmm"},
                {"type": "text", "text": "Running detection."},
                {"type": "tool_use", "id": "toolu_9", "name": "detect_regression", "input": {"description": "x", "environment": "ci"}}
            ],
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 100, "output_tokens": 20}
        }"#;
        let result = parse_messages_response(body, "req", 5).unwrap();
        assert_eq!(result.content.as_deref(), Some("Running detection."));
        let calls = result.tool_calls.unwrap();
        assert_eq!(calls[0].id, "toolu_9");
        let args: Value = serde_json::from_str(&calls[0].function.arguments).unwrap();
        assert_eq!(args["environment"], "ci");
        assert_eq!(result.usage.unwrap().total_tokens, 120);
    }

    #[test]
    fn test_parse_text_only() {
        let body = r#"{"content": [{"type": "text", "text": "Done."}], "stop_reason": "end_turn"}"#;
        let result = parse_messages_response(body, "req", 0).unwrap();
        assert!(result.tool_calls.is_none());
        assert!(result.usage.is_none());
    }

    #[test]
    fn test_parse_error_envelope() {
        let err = parse_messages_response("<html>502</html>", "req", 0).unwrap_err();
        assert!(matches!(err, FixFastError::Transport(_)));
    }
}
