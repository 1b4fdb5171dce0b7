//! HTTP route handlers.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::agent_config::AgentSettings;
use crate::handler::{AgentFactory, AgentHandler, HandlerError};

use super::types::{ErrorResponse, HealthResponse, MessagesRequest};

/// Shared application state.
pub struct AppState<F: AgentFactory> {
    pub settings: AgentSettings,
    pub handler: AgentHandler<F>,
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        let status = match &self {
            HandlerError::Build(_) => StatusCode::SERVICE_UNAVAILABLE,
            HandlerError::Agent(_) => StatusCode::BAD_GATEWAY,
        };
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Build the router for `state`.
pub fn router<F>(state: Arc<AppState<F>>) -> Router
where
    F: AgentFactory,
    <F::Agent as crate::handler::Conversational>::Response: serde::Serialize,
{
    let cors = cors_layer(&state.settings.deployment.cors_origins);

    Router::new()
        .route("/health", get(health::<F>))
        .route("/.well-known/agent.json", get(agent_card::<F>))
        .route("/messages", post(run_messages::<F>))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server and serve until Ctrl-C / SIGTERM.
pub async fn serve<F>(settings: AgentSettings, handler: AgentHandler<F>) -> anyhow::Result<()>
where
    F: AgentFactory,
    <F::Agent as crate::handler::Conversational>::Response: serde::Serialize,
{
    let addr = settings.deployment.bind_address()?;
    let state = Arc::new(AppState { settings, handler });
    let app = router(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Cleaning up {} resources", state.settings.name);
    Ok(())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", o);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(parsed))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, stopping server");
}

async fn health<F: AgentFactory>(State(state): State<Arc<AppState<F>>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: state.settings.version.clone(),
        agent_ready: state.handler.is_ready(),
    })
}

async fn agent_card<F: AgentFactory>(State(state): State<Arc<AppState<F>>>) -> Json<AgentSettings> {
    Json(state.settings.clone())
}

async fn run_messages<F>(
    State(state): State<Arc<AppState<F>>>,
    Json(request): Json<MessagesRequest>,
) -> Result<Response, HandlerError>
where
    F: AgentFactory,
    <F::Agent as crate::handler::Conversational>::Response: serde::Serialize,
{
    tracing::debug!("Received {} message(s)", request.messages.len());
    let response = state.handler.handle(&request.messages).await?;
    Ok(Json(response).into_response())
}
