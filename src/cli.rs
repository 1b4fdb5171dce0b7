//! Command-line flags. Every flag falls back to the environment variable named
//! in its help text; see [`crate::config::Config::resolve`].

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Clone, Default, Parser)]
#[command(
    name = "reddit-post-generator",
    version,
    about = "Agent that researches topics on the web and creates posts for Reddit"
)]
pub struct Cli {
    /// OpenAI API key (env: OPENAI_API_KEY)
    #[arg(long)]
    pub openai_api_key: Option<String>,

    /// OpenRouter API key (env: OPENROUTER_API_KEY)
    #[arg(long)]
    pub openrouter_api_key: Option<String>,

    /// Model ID for OpenRouter (env: MODEL_NAME)
    #[arg(long)]
    pub model: Option<String>,

    /// Reddit API client ID (env: REDDIT_CLIENT_ID)
    #[arg(long)]
    pub reddit_client_id: Option<String>,

    /// Reddit API client secret (env: REDDIT_CLIENT_SECRET)
    #[arg(long)]
    pub reddit_client_secret: Option<String>,

    /// Reddit account username (env: REDDIT_USERNAME)
    #[arg(long)]
    pub reddit_username: Option<String>,

    /// Reddit account password (env: REDDIT_PASSWORD)
    #[arg(long)]
    pub reddit_password: Option<String>,

    /// Reddit API user agent (env: REDDIT_USER_AGENT)
    #[arg(long)]
    pub reddit_user_agent: Option<String>,

    /// Path to agent_config.json
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_long_flags() {
        let cli = Cli::try_parse_from([
            "reddit-post-generator",
            "--openrouter-api-key",
            "sk-or",
            "--model",
            "openai/gpt-4o-mini",
            "--config",
            "/etc/agent_config.json",
        ])
        .unwrap();
        assert_eq!(cli.openrouter_api_key.as_deref(), Some("sk-or"));
        assert_eq!(cli.model.as_deref(), Some("openai/gpt-4o-mini"));
        assert_eq!(cli.config, Some(PathBuf::from("/etc/agent_config.json")));
        assert!(cli.openai_api_key.is_none());
    }
}
