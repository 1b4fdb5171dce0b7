//! Agent settings (`agent_config.json`): identity, deployment and declared
//! environment variables.
//!
//! The file is looked up in several places; the first one that exists and
//! parses wins. Unreadable or malformed candidates are logged and skipped, and
//! a built-in default is used when nothing usable is found.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::config::ConfigError;

pub const CONFIG_FILE_NAME: &str = "agent_config.json";

#[derive(Debug, Error)]
enum LoadError {
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Parse(#[from] serde_json::Error),
}

impl LoadError {
    fn kind(&self) -> &'static str {
        match self {
            LoadError::Io(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                "PermissionError"
            }
            LoadError::Io(_) => "IoError",
            LoadError::Parse(_) => "JSONDecodeError",
        }
    }
}

/// Typed view of `agent_config.json`. Missing fields take the built-in
/// defaults; unknown top-level keys are preserved in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    pub name: String,
    pub description: String,
    pub version: String,
    pub deployment: Deployment,
    pub environment_variables: Vec<EnvVarSpec>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Deployment {
    pub url: String,
    pub expose: bool,
    pub protocol_version: String,
    pub proxy_urls: Vec<String>,
    pub cors_origins: Vec<String>,
}

/// An environment variable the agent declares it reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVarSpec {
    pub key: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: bool,
}

impl EnvVarSpec {
    fn new(key: &str, description: &str, required: bool) -> Self {
        Self {
            key: key.to_string(),
            description: description.to_string(),
            required,
        }
    }
}

impl Default for Deployment {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:3776".to_string(),
            expose: true,
            protocol_version: "1.0.0".to_string(),
            proxy_urls: vec!["127.0.0.1".to_string()],
            cors_origins: vec!["*".to_string()],
        }
    }
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            name: "reddit-post-generator".to_string(),
            description:
                "Team of agents that research topics on the web and create posts for Reddit"
                    .to_string(),
            version: "1.0.0".to_string(),
            deployment: Deployment::default(),
            environment_variables: vec![
                EnvVarSpec::new("OPENAI_API_KEY", "OpenAI API key for LLM calls", false),
                EnvVarSpec::new("OPENROUTER_API_KEY", "OpenRouter API key for LLM calls", false),
                EnvVarSpec::new("REDDIT_CLIENT_ID", "Reddit API client ID", true),
                EnvVarSpec::new("REDDIT_CLIENT_SECRET", "Reddit API client secret", true),
                EnvVarSpec::new("REDDIT_USERNAME", "Reddit account username", true),
                EnvVarSpec::new("REDDIT_PASSWORD", "Reddit account password", true),
                EnvVarSpec::new("REDDIT_USER_AGENT", "Reddit API user agent string", true),
            ],
            extra: Map::new(),
        }
    }
}

impl Deployment {
    /// `host:port` to bind, taken from `url`.
    pub fn bind_address(&self) -> Result<String, ConfigError> {
        let invalid = |msg: String| ConfigError::InvalidValue("deployment.url".to_string(), msg);

        let url = url::Url::parse(&self.url).map_err(|e| invalid(e.to_string()))?;
        let host = url
            .host_str()
            .ok_or_else(|| invalid(format!("no host in {}", self.url)))?;
        let port = url
            .port_or_known_default()
            .ok_or_else(|| invalid(format!("no port in {}", self.url)))?;

        // IPv6 hosts come back bracketed from host_str().
        Ok(format!("{}:{}", host, port))
    }
}

/// Default lookup order: explicit path, project root next to the binary's
/// directory, the binary's directory, then the working directory.
pub fn candidate_paths(explicit: Option<&Path>) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(path) = explicit {
        paths.push(path.to_path_buf());
    }
    if let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        if let Some(root) = exe_dir.parent() {
            paths.push(root.join(CONFIG_FILE_NAME));
        }
        paths.push(exe_dir.join(CONFIG_FILE_NAME));
    }
    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join(CONFIG_FILE_NAME));
    }
    paths
}

/// Load settings from the default candidate locations.
pub fn load(explicit: Option<&Path>) -> AgentSettings {
    load_from_candidates(&candidate_paths(explicit))
}

/// Return the first candidate that exists and parses, or the default.
pub fn load_from_candidates(candidates: &[PathBuf]) -> AgentSettings {
    for path in candidates {
        if !path.exists() {
            continue;
        }
        match read_settings(path) {
            Ok(settings) => {
                tracing::info!("Loaded agent settings from {}", path.display());
                return settings;
            }
            Err(e) => {
                tracing::warn!("Error reading {}: {} ({})", path.display(), e.kind(), e);
            }
        }
    }

    tracing::warn!("No {} found, using default configuration", CONFIG_FILE_NAME);
    AgentSettings::default()
}

fn read_settings(path: &Path) -> Result<AgentSettings, LoadError> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}
