//! OpenAI-compatible chat completions client, used for both OpenAI and OpenRouter.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::error::LlmError;
use super::{ChatMessage, ChatOptions, ChatResponse, LlmClient, ToolCall, ToolDefinition};

const OPENAI_API_URL: &str = "https://api.openai.com/v1";
const OPENROUTER_API_URL: &str = "https://openrouter.ai/api/v1";
/// Completions kept by the response cache before the oldest is evicted.
const RESPONSE_CACHE_SIZE: usize = 64;

/// Which upstream provider a client talks to, with its provider-specific flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelProvider {
    OpenAi,
    OpenRouter {
        /// Serve identical requests from an in-memory cache.
        cache_response: bool,
        /// Forward `response_format` to the provider instead of dropping it.
        supports_native_structured_outputs: bool,
    },
}

impl ModelProvider {
    pub fn name(&self) -> &'static str {
        match self {
            ModelProvider::OpenAi => "openai",
            ModelProvider::OpenRouter { .. } => "openrouter",
        }
    }

    fn base_url(&self) -> &'static str {
        match self {
            ModelProvider::OpenAi => OPENAI_API_URL,
            ModelProvider::OpenRouter { .. } => OPENROUTER_API_URL,
        }
    }

    fn cache_response(&self) -> bool {
        matches!(
            self,
            ModelProvider::OpenRouter {
                cache_response: true,
                ..
            }
        )
    }

    fn supports_native_structured_outputs(&self) -> bool {
        match self {
            ModelProvider::OpenAi => true,
            ModelProvider::OpenRouter {
                supports_native_structured_outputs,
                ..
            } => *supports_native_structured_outputs,
        }
    }
}

/// Chat completions client for an OpenAI-compatible endpoint.
pub struct ChatCompletionsClient {
    client: Client,
    api_key: String,
    provider: ModelProvider,
    base_url: String,
    cache: Mutex<ResponseCache>,
}

/// Completions keyed by serialized request, evicted oldest-first.
struct ResponseCache {
    entries: HashMap<String, ChatResponse>,
    order: VecDeque<String>,
    capacity: usize,
}

impl ResponseCache {
    fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    fn get(&self, key: &str) -> Option<&ChatResponse> {
        self.entries.get(key)
    }

    fn insert(&mut self, key: String, response: ChatResponse) {
        if self.entries.insert(key.clone(), response).is_some() {
            return;
        }
        self.order.push_back(key);
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.len()
    }
}

impl ChatCompletionsClient {
    pub fn new(provider: ModelProvider, api_key: String) -> Self {
        let base_url = provider.base_url().to_string();
        Self::with_base_url(provider, api_key, base_url)
    }

    /// Point the client at a different endpoint (proxies, local gateways).
    pub fn with_base_url(provider: ModelProvider, api_key: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            provider,
            base_url: base_url.trim_end_matches('/').to_string(),
            cache: Mutex::new(ResponseCache::new(RESPONSE_CACHE_SIZE)),
        }
    }

    fn build_request(
        &self,
        model: &str,
        messages: &[ChatMessage],
        tools: Option<&[ToolDefinition]>,
        options: ChatOptions,
    ) -> CompletionRequest {
        let response_format = match options.response_format {
            Some(format) if self.provider.supports_native_structured_outputs() => Some(format),
            Some(_) => {
                tracing::debug!(
                    "Dropping response_format: {} model does not support native structured outputs",
                    self.provider.name()
                );
                None
            }
            None => None,
        };

        CompletionRequest {
            model: model.to_string(),
            messages: messages.to_vec(),
            tools: tools.map(|t| t.to_vec()),
            tool_choice: tools.map(|_| "auto".to_string()),
            response_format,
        }
    }

    async fn execute_request(&self, request: &CompletionRequest) -> Result<ChatResponse, LlmError> {
        let mut builder = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(request);

        if let ModelProvider::OpenRouter { .. } = self.provider {
            builder = builder
                .header("HTTP-Referer", "https://github.com/getbindu/Bindu")
                .header("X-Title", "Reddit Post Generator");
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::network(format!("Request timeout: {}", e))
            } else if e.is_connect() {
                LlmError::network(format!("Connection failed: {}", e))
            } else {
                LlmError::network(format!("Request failed: {}", e))
            }
        })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(LlmError::http(status.as_u16(), body));
        }

        parse_completion(&body, &request.model)
    }
}

/// Parse a chat completions response body.
fn parse_completion(body: &str, requested_model: &str) -> Result<ChatResponse, LlmError> {
    let parsed: CompletionResponse = serde_json::from_str(body).map_err(|e| {
        LlmError::parse(format!("Failed to parse response: {}, body: {}", e, body))
    })?;

    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::parse("No choices in response"))?;

    Ok(ChatResponse {
        content: choice.message.content,
        tool_calls: choice.message.tool_calls,
        model: parsed.model.or_else(|| Some(requested_model.to_string())),
    })
}

#[async_trait]
impl LlmClient for ChatCompletionsClient {
    async fn chat_completion(
        &self,
        model: &str,
        messages: &[ChatMessage],
        tools: Option<&[ToolDefinition]>,
    ) -> anyhow::Result<ChatResponse> {
        self.chat_completion_with_options(model, messages, tools, ChatOptions::default())
            .await
    }

    async fn chat_completion_with_options(
        &self,
        model: &str,
        messages: &[ChatMessage],
        tools: Option<&[ToolDefinition]>,
        options: ChatOptions,
    ) -> anyhow::Result<ChatResponse> {
        let request = self.build_request(model, messages, tools, options);

        let cache_key = if self.provider.cache_response() {
            let key = serde_json::to_string(&request)?;
            if let Some(hit) = self.cache.lock().await.get(&key) {
                tracing::debug!("Serving cached completion for model={}", model);
                return Ok(hit.clone());
            }
            Some(key)
        } else {
            None
        };

        tracing::debug!(
            "Sending request to {}: model={}",
            self.provider.name(),
            model
        );

        let response = self.execute_request(&request).await.map_err(|e| {
            tracing::error!("{} request failed: {}", self.provider.name(), e);
            anyhow::Error::new(e)
        })?;

        if let Some(key) = cache_key {
            self.cache.lock().await.insert(key, response.clone());
        }

        Ok(response)
    }
}

/// Chat completions request format.
#[derive(Debug, Serialize)]
struct CompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ToolDefinition>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ToolCall>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn openrouter(structured: bool) -> ChatCompletionsClient {
        ChatCompletionsClient::new(
            ModelProvider::OpenRouter {
                cache_response: true,
                supports_native_structured_outputs: structured,
            },
            "sk-or-test".to_string(),
        )
    }

    #[test]
    fn response_format_forwarded_only_with_native_support() {
        let options = || ChatOptions {
            response_format: Some(json!({"type": "json_object"})),
            ..Default::default()
        };
        let messages = [ChatMessage::user("hi")];

        let with = openrouter(true).build_request("openai/gpt-4o", &messages, None, options());
        assert!(with.response_format.is_some());

        let without = openrouter(false).build_request("openai/gpt-4o", &messages, None, options());
        assert!(without.response_format.is_none());
    }

    #[test]
    fn tool_choice_set_only_when_tools_given() {
        let client = ChatCompletionsClient::new(ModelProvider::OpenAi, "sk-test".to_string());
        let messages = [ChatMessage::user("hi")];
        let request = client.build_request("gpt-4o", &messages, None, ChatOptions::default());
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("tools").is_none());
        assert!(value.get("tool_choice").is_none());
    }

    #[test]
    fn parses_tool_call_response() {
        let body = json!({
            "model": "openai/gpt-4o",
            "choices": [{
                "finish_reason": "tool_calls",
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "duckduckgo_search", "arguments": "{\"query\":\"rust\"}"}
                    }]
                }
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        })
        .to_string();

        let response = parse_completion(&body, "fallback").unwrap();
        let calls = response.tool_calls.unwrap();
        assert_eq!(calls[0].function.name, "duckduckgo_search");
        assert_eq!(response.model.as_deref(), Some("openai/gpt-4o"));
    }

    #[test]
    fn empty_choices_is_parse_error() {
        let err = parse_completion(r#"{"choices": []}"#, "gpt-4o").unwrap_err();
        assert_eq!(err.kind, crate::llm::LlmErrorKind::Parse);
    }

    #[tokio::test]
    async fn cached_completion_is_served_without_upstream_call() {
        // Unroutable base URL: any real request would fail.
        let client = ChatCompletionsClient::with_base_url(
            ModelProvider::OpenRouter {
                cache_response: true,
                supports_native_structured_outputs: true,
            },
            "sk-or-test".to_string(),
            "http://127.0.0.1:9".to_string(),
        );
        let messages = [ChatMessage::user("cached please")];
        let request = client.build_request("openai/gpt-4o", &messages, None, ChatOptions::default());
        let key = serde_json::to_string(&request).unwrap();
        client.cache.lock().await.insert(
            key,
            ChatResponse {
                content: Some("from cache".to_string()),
                tool_calls: None,
                model: Some("openai/gpt-4o".to_string()),
            },
        );

        let response = client
            .chat_completion("openai/gpt-4o", &messages, None)
            .await
            .unwrap();
        assert_eq!(response.content.as_deref(), Some("from cache"));
    }

    fn answer(content: &str) -> ChatResponse {
        ChatResponse {
            content: Some(content.to_string()),
            tool_calls: None,
            model: None,
        }
    }

    #[test]
    fn cache_evicts_oldest_entries_past_capacity() {
        let mut cache = ResponseCache::new(3);
        for i in 0..5 {
            cache.insert(format!("request-{i}"), answer(&format!("answer-{i}")));
        }

        assert_eq!(cache.len(), 3);
        assert!(cache.get("request-0").is_none());
        assert!(cache.get("request-1").is_none());
        assert_eq!(
            cache.get("request-4").and_then(|r| r.content.as_deref()),
            Some("answer-4")
        );
    }

    #[test]
    fn cache_reinsert_does_not_grow() {
        let mut cache = ResponseCache::new(2);
        cache.insert("a".to_string(), answer("1"));
        cache.insert("a".to_string(), answer("2"));
        cache.insert("b".to_string(), answer("3"));

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a").and_then(|r| r.content.as_deref()), Some("2"));
    }

    #[tokio::test]
    async fn client_cache_is_bounded() {
        let client = openrouter(true);
        let mut cache = client.cache.lock().await;
        for i in 0..(RESPONSE_CACHE_SIZE * 4) {
            cache.insert(format!("request-{i}"), answer("x"));
        }
        assert_eq!(cache.len(), RESPONSE_CACHE_SIZE);
    }
}
