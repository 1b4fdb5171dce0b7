//! HTTP surface for the agent.
//!
//! - `GET /health` - liveness plus whether the agent has been built
//! - `GET /.well-known/agent.json` - the loaded agent settings
//! - `POST /messages` - run the agent on `{ "messages": [...] }`

mod routes;
pub mod types;

pub use routes::{router, serve, AppState};
