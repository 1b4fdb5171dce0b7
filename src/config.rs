//! Credential and model configuration.
//!
//! Each value is resolved in order: command-line flag, then environment
//! variable, then built-in default. A `.env` file in the working directory is
//! loaded into the environment before resolution.
//!
//! - `OPENAI_API_KEY` - OpenAI API key. Takes precedence over OpenRouter.
//! - `OPENROUTER_API_KEY` - OpenRouter API key.
//! - `MODEL_NAME` - OpenRouter model id. Defaults to `openai/gpt-4o`.
//! - `REDDIT_CLIENT_ID` - Required. Reddit script app client id.
//! - `REDDIT_CLIENT_SECRET` - Required. Reddit script app secret.
//! - `REDDIT_USERNAME` - Required. Account that posts.
//! - `REDDIT_PASSWORD` - Required. Password for that account.
//! - `REDDIT_USER_AGENT` - Optional. Defaults to `RedditPostGenerator/1.0 by ParasChamoli`.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::cli::Cli;

pub const DEFAULT_MODEL_NAME: &str = "openai/gpt-4o";
pub const DEFAULT_REDDIT_USER_AGENT: &str = "RedditPostGenerator/1.0 by ParasChamoli";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "No API key provided. Set OPENAI_API_KEY or OPENROUTER_API_KEY environment variable.\n\
         For OpenRouter: https://openrouter.ai/keys\n\
         For OpenAI: https://platform.openai.com/api-keys"
    )]
    MissingModelProvider,

    #[error(
        "Reddit API credentials missing. Set all required environment variables:\n\
         REDDIT_CLIENT_ID, REDDIT_CLIENT_SECRET, REDDIT_USERNAME, REDDIT_PASSWORD\n\
         Get credentials from: https://www.reddit.com/prefs/apps"
    )]
    MissingRedditCredentials,

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("Failed to construct {0}: {1}")]
    Client(&'static str, String),
}

/// Reddit credentials as supplied; presence is checked when the agent is built.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct RedditSettings {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub user_agent: String,
}

/// Resolved, immutable configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    pub openai_api_key: Option<String>,
    pub openrouter_api_key: Option<String>,
    pub model_name: String,
    pub reddit: RedditSettings,
    /// Explicit agent settings file, tried before the default locations.
    pub config_path: Option<PathBuf>,
}

impl Config {
    /// Resolve configuration from CLI flags over the process environment.
    pub fn from_cli_and_env(cli: &Cli) -> Self {
        Self::resolve(cli, |key| std::env::var(key).ok())
    }

    /// Resolve configuration from CLI flags over `env`.
    ///
    /// Empty strings count as unset at every layer.
    pub fn resolve<F>(cli: &Cli, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |flag: &Option<String>, key: &str| -> Option<String> {
            non_empty(flag.clone()).or_else(|| non_empty(env(key)))
        };

        Self {
            openai_api_key: pick(&cli.openai_api_key, "OPENAI_API_KEY"),
            openrouter_api_key: pick(&cli.openrouter_api_key, "OPENROUTER_API_KEY"),
            model_name: pick(&cli.model, "MODEL_NAME")
                .unwrap_or_else(|| DEFAULT_MODEL_NAME.to_string()),
            reddit: RedditSettings {
                client_id: pick(&cli.reddit_client_id, "REDDIT_CLIENT_ID"),
                client_secret: pick(&cli.reddit_client_secret, "REDDIT_CLIENT_SECRET"),
                username: pick(&cli.reddit_username, "REDDIT_USERNAME"),
                password: pick(&cli.reddit_password, "REDDIT_PASSWORD"),
                user_agent: pick(&cli.reddit_user_agent, "REDDIT_USER_AGENT")
                    .unwrap_or_else(|| DEFAULT_REDDIT_USER_AGENT.to_string()),
            },
            config_path: cli.config.clone(),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn redact(value: &Option<String>) -> &'static str {
    if value.is_some() {
        "<set>"
    } else {
        "<unset>"
    }
}

impl fmt::Debug for RedditSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedditSettings")
            .field("client_id", &redact(&self.client_id))
            .field("client_secret", &redact(&self.client_secret))
            .field("username", &self.username)
            .field("password", &redact(&self.password))
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("openai_api_key", &redact(&self.openai_api_key))
            .field("openrouter_api_key", &redact(&self.openrouter_api_key))
            .field("model_name", &self.model_name)
            .field("reddit", &self.reddit)
            .field("config_path", &self.config_path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_set() {
        let config = Config::resolve(&Cli::default(), env_of(&[]));
        assert_eq!(config.openai_api_key, None);
        assert_eq!(config.openrouter_api_key, None);
        assert_eq!(config.model_name, "openai/gpt-4o");
        assert_eq!(
            config.reddit.user_agent,
            "RedditPostGenerator/1.0 by ParasChamoli"
        );
        assert_eq!(config.reddit.client_id, None);
    }

    #[test]
    fn env_fills_values() {
        let config = Config::resolve(
            &Cli::default(),
            env_of(&[
                ("OPENROUTER_API_KEY", "sk-or"),
                ("MODEL_NAME", "anthropic/claude-sonnet-4"),
                ("REDDIT_USERNAME", "poster"),
            ]),
        );
        assert_eq!(config.openrouter_api_key.as_deref(), Some("sk-or"));
        assert_eq!(config.model_name, "anthropic/claude-sonnet-4");
        assert_eq!(config.reddit.username.as_deref(), Some("poster"));
    }

    #[test]
    fn cli_overrides_env() {
        let cli = Cli {
            model: Some("openai/gpt-4o-mini".to_string()),
            reddit_user_agent: Some("custom-agent/2.0".to_string()),
            ..Cli::default()
        };
        let config = Config::resolve(
            &cli,
            env_of(&[
                ("MODEL_NAME", "from-env"),
                ("REDDIT_USER_AGENT", "env-agent"),
            ]),
        );
        assert_eq!(config.model_name, "openai/gpt-4o-mini");
        assert_eq!(config.reddit.user_agent, "custom-agent/2.0");
    }

    #[test]
    fn empty_strings_are_unset() {
        let cli = Cli {
            openai_api_key: Some(String::new()),
            ..Cli::default()
        };
        let config = Config::resolve(
            &cli,
            env_of(&[("OPENAI_API_KEY", "sk-env"), ("MODEL_NAME", "  ")]),
        );
        assert_eq!(config.openai_api_key.as_deref(), Some("sk-env"));
        assert_eq!(config.model_name, DEFAULT_MODEL_NAME);
    }

    #[test]
    fn debug_never_prints_secrets() {
        let config = Config::resolve(
            &Cli::default(),
            env_of(&[("OPENAI_API_KEY", "sk-very-secret"), ("REDDIT_PASSWORD", "hunter2")]),
        );
        let printed = format!("{:?}", config);
        assert!(!printed.contains("sk-very-secret"));
        assert!(!printed.contains("hunter2"));
        assert!(printed.contains("<set>"));
    }

    #[test]
    fn error_messages_name_required_variables() {
        let provider = ConfigError::MissingModelProvider.to_string();
        assert!(provider.contains("OPENAI_API_KEY"));
        assert!(provider.contains("OPENROUTER_API_KEY"));

        let reddit = ConfigError::MissingRedditCredentials.to_string();
        for key in [
            "REDDIT_CLIENT_ID",
            "REDDIT_CLIENT_SECRET",
            "REDDIT_USERNAME",
            "REDDIT_PASSWORD",
        ] {
            assert!(reddit.contains(key));
        }
        assert!(reddit.contains("https://www.reddit.com/prefs/apps"));
    }
}
