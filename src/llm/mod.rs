// src/llm/mod.rs
// LLM inference clients (Anthropic, OpenAI, DeepSeek)

mod anthropic;
mod factory;
pub mod http_client;
mod logging;
mod openai_compat;
mod provider;
mod types;

pub use anthropic::AnthropicClient;
pub use factory::create_client;
pub use http_client::LlmHttpClient;
pub use openai_compat::{ChatRequest, OpenAiCompatClient, parse_chat_response};
pub use provider::{LlmClient, NormalizedUsage, Provider};
pub use types::{ChatResult, FunctionCall, FunctionDef, Message, Tool, ToolCall, Usage};
