// src/agent/orchestrator.rs
// Tool-calling loop between the model and the triage tools

use super::conversation::ConversationState;
use super::events::RunEvent;
use super::prompt::SYSTEM_PROMPT;
use crate::error::{FixFastError, Result};
use crate::llm::{ChatResult, LlmClient, Message, NormalizedUsage, Tool, ToolCall};
use crate::tools::{ToolRegistry, ToolResult};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_ROUNDS: u32 = 10;
pub const DEFAULT_CALL_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    /// Model calls allowed to request tools before a final text-only call
    /// is forced. Zero means no cap.
    pub max_rounds: u32,
    /// Upper bound on a single model call
    pub call_timeout: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_rounds: DEFAULT_MAX_ROUNDS,
            call_timeout: Duration::from_secs(DEFAULT_CALL_TIMEOUT_SECS),
        }
    }
}

/// Result of one end-to-end run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunOutcome {
    /// All assistant text, in arrival order
    pub text: String,
    /// Model calls made, including a forced final call
    pub rounds: u32,
    pub tool_calls: usize,
    pub usage: NormalizedUsage,
    pub hit_round_limit: bool,
}

pub struct Orchestrator {
    client: Arc<dyn LlmClient>,
    registry: ToolRegistry,
    config: AgentConfig,
}

impl Orchestrator {
    pub fn new(client: Arc<dyn LlmClient>, registry: ToolRegistry) -> Self {
        Self {
            client,
            registry,
            config: AgentConfig::default(),
        }
    }

    pub fn with_config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Drive the conversation until the model answers without tool calls.
    ///
    /// Tool failures go back to the model as error results. A failed model
    /// call ends the run with that error, as does cancellation or a model
    /// call exceeding the timeout.
    pub async fn run(
        &self,
        input: &str,
        events: Option<&UnboundedSender<RunEvent>>,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome> {
        let start = Instant::now();
        let tools = self.registry.tool_definitions();
        let mut state = ConversationState::new(SYSTEM_PROMPT, input);
        let mut outcome = RunOutcome::default();

        info!(
            provider = %self.client.provider_type(),
            model = %self.client.model_name(),
            max_rounds = self.config.max_rounds,
            input_len = input.len(),
            "Starting Fix Fast run"
        );
        emit(events, RunEvent::Started);

        loop {
            let capped = self.config.max_rounds > 0 && outcome.rounds >= self.config.max_rounds;
            if capped {
                warn!(
                    rounds = outcome.rounds,
                    "Hit max tool rounds ({}), forcing final response", self.config.max_rounds
                );
                emit(
                    events,
                    RunEvent::RoundLimitReached {
                        rounds: outcome.rounds,
                    },
                );
                outcome.hit_round_limit = true;
            }

            let round = outcome.rounds + 1;
            info!(round, history = state.messages().len(), "Model round starting");
            let result = self
                .call_model(state.messages().to_vec(), &tools, capped, cancel)
                .await?;
            outcome.rounds = round;
            outcome.usage.add(self.client.normalize_usage(&result));

            if cancel.is_cancelled() {
                return Err(FixFastError::Cancelled);
            }

            if let Some(text) = result.text() {
                outcome.text.push_str(text);
                emit(events, RunEvent::Text(text.to_string()));
            }

            let mut calls = result.tool_calls.unwrap_or_default();
            if capped && !calls.is_empty() {
                warn!(
                    ignored = calls.len(),
                    "Model requested tools on the forced final call"
                );
                calls.clear();
            }
            state.push_assistant(result.content, calls.clone());

            if calls.is_empty() {
                break;
            }

            info!(
                round,
                tools = ?calls.iter().map(|c| &c.function.name).collect::<Vec<_>>(),
                "Executing tool calls"
            );
            for call in &calls {
                // Lets a watcher that reacted to the previous tool cancel the rest
                tokio::task::yield_now().await;
                if cancel.is_cancelled() {
                    return Err(FixFastError::Cancelled);
                }
                let result = self.execute_tool(call, events);
                outcome.tool_calls += 1;
                state.push_tool_result(&result);
            }
            debug_assert!(state.unanswered_call_ids().is_empty());
        }

        info!(
            rounds = outcome.rounds,
            tool_calls = outcome.tool_calls,
            total_tokens = outcome.usage.total_tokens,
            duration_ms = start.elapsed().as_millis() as u64,
            hit_round_limit = outcome.hit_round_limit,
            "Fix Fast run complete"
        );
        emit(events, RunEvent::Completed);
        Ok(outcome)
    }

    /// One model call. The final call keeps the tools declared but forbids
    /// using them.
    async fn call_model(
        &self,
        messages: Vec<Message>,
        tools: &[Tool],
        final_answer: bool,
        cancel: &CancellationToken,
    ) -> Result<ChatResult> {
        let limit = self.config.call_timeout;
        let request = async {
            if final_answer {
                self.client.chat_final(messages, tools.to_vec()).await
            } else {
                self.client.chat(messages, Some(tools.to_vec())).await
            }
        };
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(FixFastError::Cancelled),
            res = tokio::time::timeout(limit, request) => match res {
                Ok(result) => result,
                Err(_) => Err(FixFastError::Timeout(limit.as_secs())),
            },
        }
    }

    fn execute_tool(
        &self,
        call: &ToolCall,
        events: Option<&UnboundedSender<RunEvent>>,
    ) -> ToolResult {
        emit(
            events,
            RunEvent::ToolStarted {
                id: call.id.clone(),
                name: call.function.name.clone(),
            },
        );
        debug!(
            tool = %call.function.name,
            call_id = %call.id,
            args = %call.function.arguments,
            "Tool call"
        );

        let result = self.registry.execute(call);
        info!(
            tool = %result.name,
            call_id = %call.id,
            is_error = result.is_error,
            "Tool call finished"
        );

        emit(
            events,
            RunEvent::ToolFinished {
                id: result.tool_call_id.clone(),
                name: result.name.clone(),
                output: result.content.clone(),
                is_error: result.is_error,
            },
        );
        result
    }
}

fn emit(events: Option<&UnboundedSender<RunEvent>>, event: RunEvent) {
    if let Some(tx) = events {
        // A dropped receiver only means nobody is watching
        let _ = tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = AgentConfig::default();
        assert_eq!(config.max_rounds, 10);
        assert_eq!(config.call_timeout, Duration::from_secs(300));
    }

    #[test]
    fn test_emit_without_receiver() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        drop(rx);
        emit(Some(&tx), RunEvent::Started);
        emit(None, RunEvent::Completed);
    }
}
