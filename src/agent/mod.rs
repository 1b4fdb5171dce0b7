//! Agent module - the conversational agent the handler delegates to.
//!
//! The agent follows a "tools in a loop" pattern:
//! 1. Prepend the persona's system prompt to the caller's conversation
//! 2. Call the LLM with the available tools
//! 3. If the LLM requests tool calls, execute them and feed the results back
//! 4. Repeat until the LLM produces a final response or max iterations is reached

mod agent_loop;
mod prompt;

pub use agent_loop::Agent;
pub use prompt::{build_system_prompt, Persona};
