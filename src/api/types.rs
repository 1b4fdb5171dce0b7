//! API request and response types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::llm::ChatMessage;

/// Request carrying a conversation for the agent.
#[derive(Debug, Clone, Deserialize)]
pub struct MessagesRequest {
    /// Ordered role/content pairs
    pub messages: Vec<ChatMessage>,
}

/// Outcome of one agent run.
///
/// Always `COMPLETED`: failed runs surface as HTTP errors, never as a
/// `RunResponse`. Clients check `status == "COMPLETED"`, so the field stays
/// on the wire as a fixed marker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Completed,
}

/// What the agent returns for one conversation.
#[derive(Debug, Clone, Serialize)]
pub struct RunResponse {
    /// Unique run identifier
    pub run_id: Uuid,

    pub status: RunStatus,

    /// Final answer from the model
    pub content: String,

    /// Model that produced the answer
    pub model: String,

    /// Tool calls and results made during the run
    pub events: Vec<RunEvent>,

    pub created_at: DateTime<Utc>,
}

/// A single entry in the run's execution log.
#[derive(Debug, Clone, Serialize)]
pub struct RunEvent {
    pub timestamp: DateTime<Utc>,

    pub event_type: RunEventType,

    pub content: String,
}

/// Types of run events.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunEventType {
    /// Tool is being called
    ToolCall,
    /// Tool returned a result
    ToolResult,
    /// Agent produced final response
    Response,
}

/// Error body returned by the HTTP surface.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,

    /// Whether the agent has been built
    pub agent_ready: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_response_wire_format() {
        let response = RunResponse {
            run_id: Uuid::nil(),
            status: RunStatus::Completed,
            content: "Reddit post created successfully".to_string(),
            model: "gpt-4o".to_string(),
            events: vec![RunEvent {
                timestamp: Utc::now(),
                event_type: RunEventType::ToolCall,
                content: "create_post".to_string(),
            }],
            created_at: Utc::now(),
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["status"], "COMPLETED");
        assert_eq!(value["events"][0]["event_type"], "tool_call");
        assert_eq!(value["run_id"], "00000000-0000-0000-0000-000000000000");
    }

    #[test]
    fn messages_request_parses() {
        let req: MessagesRequest = serde_json::from_str(
            r#"{"messages": [{"role": "user", "content": "Create a Reddit post about AI"}]}"#,
        )
        .unwrap();
        assert_eq!(req.messages.len(), 1);
    }
}
