//! Reddit Post Generator - HTTP Server Entry Point
//!
//! Resolves configuration, loads the agent settings and serves the agent API.

use clap::Parser;
use reddit_post_generator::{
    agent_config, api, builder::RedditAgentFactory, cli::Cli, config::Config, AgentHandler,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reddit_post_generator=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::from_cli_and_env(&cli);
    info!("Reddit Post Generator - web research and Reddit posting agent");
    info!("Resolved configuration: {:?}", config);

    let settings = agent_config::load(config.config_path.as_deref());
    info!(
        "Starting {} v{} on {}",
        settings.name, settings.version, settings.deployment.url
    );

    // The agent is built on the first request, not here.
    let handler = AgentHandler::new(RedditAgentFactory::new(config));
    if let Err(e) = api::serve(settings, handler).await {
        tracing::error!("Server error: {:#}", e);
        return Err(e);
    }

    info!("Reddit Post Generator stopped");
    Ok(())
}
