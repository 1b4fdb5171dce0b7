//! Builds the Reddit post generator agent from resolved configuration.

use std::sync::Arc;

use async_trait::async_trait;

use crate::agent::{Agent, Persona};
use crate::config::{Config, ConfigError, RedditSettings};
use crate::handler::AgentFactory;
use crate::llm::{ChatCompletionsClient, ModelProvider};
use crate::tools::{reddit, DuckDuckGoSearch, RedditClient, RedditCredentials, ToolRegistry};

pub const AGENT_NAME: &str = "Reddit Post Generator";
/// Model used when an OpenAI key is configured.
pub const OPENAI_MODEL: &str = "gpt-4o";

/// The provider, model and key chosen for the agent.
pub struct ModelChoice {
    pub provider: ModelProvider,
    pub model_id: String,
    api_key: String,
}

/// Pick the LLM provider: OpenAI if its key is set, else OpenRouter, else fail.
pub fn select_model(config: &Config) -> Result<ModelChoice, ConfigError> {
    if let Some(key) = &config.openai_api_key {
        tracing::info!("Using OpenAI {}", OPENAI_MODEL);
        return Ok(ModelChoice {
            provider: ModelProvider::OpenAi,
            model_id: OPENAI_MODEL.to_string(),
            api_key: key.clone(),
        });
    }

    if let Some(key) = &config.openrouter_api_key {
        tracing::info!("Using OpenRouter model: {}", config.model_name);
        return Ok(ModelChoice {
            provider: ModelProvider::OpenRouter {
                cache_response: true,
                supports_native_structured_outputs: true,
            },
            model_id: config.model_name.clone(),
            api_key: key.clone(),
        });
    }

    Err(ConfigError::MissingModelProvider)
}

/// All four of client id, secret, username and password must be present.
pub fn reddit_credentials(settings: &RedditSettings) -> Result<RedditCredentials, ConfigError> {
    match (
        &settings.client_id,
        &settings.client_secret,
        &settings.username,
        &settings.password,
    ) {
        (Some(client_id), Some(client_secret), Some(username), Some(password)) => {
            Ok(RedditCredentials {
                client_id: client_id.clone(),
                client_secret: client_secret.clone(),
                username: username.clone(),
                password: password.clone(),
                user_agent: settings.user_agent.clone(),
            })
        }
        _ => Err(ConfigError::MissingRedditCredentials),
    }
}

/// Assemble the agent: selected model, web search, Reddit tools and persona.
pub fn build_agent(config: &Config) -> Result<Agent, ConfigError> {
    let model = select_model(config)?;
    let credentials = reddit_credentials(&config.reddit)?;

    let search = DuckDuckGoSearch::new()
        .map_err(|e| ConfigError::Client("web search client", e.to_string()))?;
    let reddit_client = RedditClient::new(credentials)
        .map_err(|e| ConfigError::Client("Reddit client", e.to_string()))?;
    tracing::debug!("Reddit tools will post as u/{}", reddit_client.username());

    let mut tools = ToolRegistry::new().with(Arc::new(search));
    reddit::register_tools(&mut tools, Arc::new(reddit_client));

    let llm = Arc::new(ChatCompletionsClient::new(model.provider, model.api_key));

    Ok(Agent::new(
        AGENT_NAME,
        model.model_id,
        llm,
        tools,
        Persona::reddit_post_generator(),
    )
    .with_datetime_context(true)
    .with_markdown(true))
}

/// Factory handed to the request handler; builds from a fixed configuration.
pub struct RedditAgentFactory {
    config: Config,
}

impl RedditAgentFactory {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

#[async_trait]
impl AgentFactory for RedditAgentFactory {
    type Agent = Agent;

    async fn build(&self) -> Result<Agent, ConfigError> {
        build_agent(&self.config)
    }
}
