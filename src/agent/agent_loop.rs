//! Core agent loop implementation.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Local, Utc};
use uuid::Uuid;

use crate::api::types::{RunEvent, RunEventType, RunResponse, RunStatus};
use crate::handler::Conversational;
use crate::llm::{ChatMessage, LlmClient, ToolCall};
use crate::tools::ToolRegistry;

use super::prompt::{build_system_prompt, Persona};

const DEFAULT_MAX_ITERATIONS: usize = 25;

/// A conversational agent: one model, a set of tools and a persona.
///
/// Immutable once built, so a single instance can serve concurrent runs.
pub struct Agent {
    name: String,
    model: String,
    llm: Arc<dyn LlmClient>,
    tools: ToolRegistry,
    persona: Persona,
    add_datetime_to_context: bool,
    markdown: bool,
    max_iterations: usize,
}

impl Agent {
    pub fn new(
        name: impl Into<String>,
        model: impl Into<String>,
        llm: Arc<dyn LlmClient>,
        tools: ToolRegistry,
        persona: Persona,
    ) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            llm,
            tools,
            persona,
            add_datetime_to_context: false,
            markdown: false,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    pub fn with_datetime_context(mut self, enabled: bool) -> Self {
        self.add_datetime_to_context = enabled;
        self
    }

    pub fn with_markdown(mut self, enabled: bool) -> Self {
        self.markdown = enabled;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Run the agent on a conversation and return its final response.
    ///
    /// The persona's system prompt is prepended to the caller's messages; the
    /// model may call tools any number of times before answering.
    pub async fn run(&self, messages: &[ChatMessage]) -> anyhow::Result<RunResponse> {
        let run_id = Uuid::new_v4();
        let mut events = Vec::new();

        let now = self.add_datetime_to_context.then(Local::now);
        let system_prompt = build_system_prompt(&self.persona, &self.tools, now, self.markdown);

        let mut conversation = Vec::with_capacity(messages.len() + 1);
        conversation.push(ChatMessage::system(system_prompt));
        conversation.extend_from_slice(messages);

        let tool_schemas = self.tools.get_tool_schemas();
        let tools = (!tool_schemas.is_empty()).then_some(tool_schemas.as_slice());

        for iteration in 0..self.max_iterations {
            tracing::debug!(%run_id, "Agent iteration {}", iteration + 1);

            let response = self
                .llm
                .chat_completion(&self.model, &conversation, tools)
                .await?;

            if let Some(tool_calls) = response.tool_calls.filter(|calls| !calls.is_empty()) {
                conversation.push(ChatMessage::assistant_tool_calls(
                    response.content.clone(),
                    tool_calls.clone(),
                ));

                for tool_call in &tool_calls {
                    events.push(event(
                        RunEventType::ToolCall,
                        format!(
                            "Calling tool: {} with args: {}",
                            tool_call.function.name, tool_call.function.arguments
                        ),
                    ));

                    let result_str = match self.execute_tool_call(tool_call).await {
                        Ok(output) => output,
                        Err(e) => {
                            tracing::warn!(%run_id, "Tool {} failed: {}", tool_call.function.name, e);
                            format!("Error: {}", e)
                        }
                    };

                    events.push(event(
                        RunEventType::ToolResult,
                        truncate_for_log(&result_str, 1000),
                    ));
                    conversation.push(ChatMessage::tool_result(&tool_call.id, result_str));
                }

                continue;
            }

            let Some(content) = response.content else {
                return Err(anyhow::anyhow!("LLM returned empty response"));
            };

            events.push(event(
                RunEventType::Response,
                truncate_for_log(&content, 2000),
            ));
            tracing::info!(%run_id, "Run completed after {} iteration(s)", iteration + 1);

            return Ok(RunResponse {
                run_id,
                status: RunStatus::Completed,
                content,
                model: response.model.unwrap_or_else(|| self.model.clone()),
                events,
                created_at: Utc::now(),
            });
        }

        Err(anyhow::anyhow!(
            "Max iterations ({}) reached without completion",
            self.max_iterations
        ))
    }

    async fn execute_tool_call(&self, tool_call: &ToolCall) -> anyhow::Result<String> {
        let args: serde_json::Value = if tool_call.function.arguments.trim().is_empty() {
            serde_json::Value::Object(Default::default())
        } else {
            serde_json::from_str(&tool_call.function.arguments).map_err(|e| {
                anyhow::anyhow!("Invalid arguments for {}: {}", tool_call.function.name, e)
            })?
        };

        self.tools.execute(&tool_call.function.name, args).await
    }
}

#[async_trait]
impl Conversational for Agent {
    type Response = RunResponse;

    async fn arun(&self, messages: &[ChatMessage]) -> anyhow::Result<RunResponse> {
        self.run(messages).await
    }
}

fn event(event_type: RunEventType, content: String) -> RunEvent {
    RunEvent {
        timestamp: Utc::now(),
        event_type,
        content,
    }
}

/// Truncate a string for logging purposes, on a char boundary.
fn truncate_for_log(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... [truncated]", &s[..end])
}
