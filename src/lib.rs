//! # Reddit Post Generator
//!
//! An agent that researches topics on the web and creates posts for Reddit.
//!
//! This library provides:
//! - Layered configuration (CLI flags, environment, defaults) and agent settings
//! - An LLM-backed agent with a DuckDuckGo search tool and Reddit tools
//! - A request handler that builds the agent once, on first use
//! - An HTTP API that forwards conversations to the handler
//!
//! ## Architecture
//!
//! ```text
//!   POST /messages ──▶ AgentHandler ──(first call)──▶ RedditAgentFactory
//!                           │                              │
//!                           ▼                              ▼
//!                      Agent::arun ◀──────────────── Agent (LLM + tools)
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use reddit_post_generator::{builder::RedditAgentFactory, handler::AgentHandler, llm::ChatMessage};
//!
//! let handler = AgentHandler::new(RedditAgentFactory::new(config));
//! let response = handler.handle(&[ChatMessage::user("Post about Rust 2024 on r/rust")]).await?;
//! ```

pub mod agent;
pub mod agent_config;
pub mod api;
pub mod builder;
pub mod cli;
pub mod config;
pub mod handler;
pub mod llm;
pub mod tools;

pub use agent_config::AgentSettings;
pub use config::Config;
pub use handler::AgentHandler;
