//! Request handler with build-once agent initialization.
//!
//! The agent is built lazily by the first request. The build runs while an
//! async mutex is held, so concurrent first requests wait for a single build
//! and then share its result. A failed build leaves the handler uninitialized
//! and the error goes to the request that triggered it; the next request
//! tries again.
//!
//! ```text
//!   UNINITIALIZED ──lock──▶ INITIALIZING ──build ok──▶ READY
//!         ▲                      │
//!         └──────build err───────┘
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::config::ConfigError;
use crate::llm::ChatMessage;

/// Something that answers a conversation.
#[async_trait]
pub trait Conversational: Send + Sync + 'static {
    type Response: Send;

    async fn arun(&self, messages: &[ChatMessage]) -> anyhow::Result<Self::Response>;
}

/// Builds the agent the handler delegates to.
#[async_trait]
pub trait AgentFactory: Send + Sync + 'static {
    type Agent: Conversational;

    async fn build(&self) -> Result<Self::Agent, ConfigError>;
}

#[derive(Debug, Error)]
pub enum HandlerError {
    /// Building the agent failed; the next request retries the build.
    #[error(transparent)]
    Build(#[from] ConfigError),

    /// The agent failed while answering.
    #[error(transparent)]
    Agent(anyhow::Error),
}

/// Lazily builds one agent and forwards every conversation to it.
pub struct AgentHandler<F: AgentFactory> {
    factory: F,
    agent: Mutex<Option<Arc<F::Agent>>>,
    /// Set once the built agent is stored; read without taking the lock.
    ready: AtomicBool,
    build_attempts: AtomicU64,
}

impl<F: AgentFactory> AgentHandler<F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            agent: Mutex::new(None),
            ready: AtomicBool::new(false),
            build_attempts: AtomicU64::new(0),
        }
    }

    /// Forward `messages` to the agent, building it first if needed.
    ///
    /// The agent's response is returned unmodified.
    pub async fn handle(
        &self,
        messages: &[ChatMessage],
    ) -> Result<<F::Agent as Conversational>::Response, HandlerError> {
        let agent = self.ensure_agent().await?;
        agent.arun(messages).await.map_err(HandlerError::Agent)
    }

    /// Whether a build has completed. Never waits on a build in progress.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// Number of builds started so far, successful or not.
    pub fn build_attempts(&self) -> u64 {
        self.build_attempts.load(Ordering::SeqCst)
    }

    async fn ensure_agent(&self) -> Result<Arc<F::Agent>, ConfigError> {
        let mut slot = self.agent.lock().await;
        if let Some(agent) = slot.as_ref() {
            return Ok(Arc::clone(agent));
        }

        let attempt = self.build_attempts.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::info!("Initializing agent (attempt {})", attempt);

        match self.factory.build().await {
            Ok(agent) => {
                let agent = Arc::new(agent);
                *slot = Some(Arc::clone(&agent));
                self.ready.store(true, Ordering::SeqCst);
                tracing::info!("Agent initialized");
                Ok(agent)
            }
            Err(e) => {
                tracing::error!("Agent initialization failed (attempt {}): {}", attempt, e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Role;
    use futures::future::join_all;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio_test::{assert_err, assert_ok};

    /// Agent that returns a fixed sentinel and records what it was asked.
    struct StubAgent {
        id: usize,
        seen: std::sync::Mutex<Vec<Vec<ChatMessage>>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Sentinel {
        agent_id: usize,
        run_id: &'static str,
        content: String,
    }

    #[async_trait]
    impl Conversational for StubAgent {
        type Response = Sentinel;

        async fn arun(&self, messages: &[ChatMessage]) -> anyhow::Result<Sentinel> {
            self.seen.lock().unwrap().push(messages.to_vec());
            if messages.iter().any(|m| m.content.as_deref() == Some("fail")) {
                return Err(anyhow::anyhow!("provider unavailable"));
            }
            Ok(Sentinel {
                agent_id: self.id,
                run_id: "test-run-id",
                content: "Reddit post created successfully".to_string(),
            })
        }
    }

    /// Factory that counts builds and fails the first `failures` of them.
    struct StubFactory {
        builds: Arc<AtomicUsize>,
        failures: usize,
        delay: Duration,
    }

    impl StubFactory {
        fn new(failures: usize, delay: Duration) -> (Self, Arc<AtomicUsize>) {
            let builds = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    builds: Arc::clone(&builds),
                    failures,
                    delay,
                },
                builds,
            )
        }
    }

    #[async_trait]
    impl AgentFactory for StubFactory {
        type Agent = StubAgent;

        async fn build(&self) -> Result<StubAgent, ConfigError> {
            let n = self.builds.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if n < self.failures {
                return Err(ConfigError::MissingModelProvider);
            }
            Ok(StubAgent {
                id: n,
                seen: std::sync::Mutex::new(Vec::new()),
            })
        }
    }

    fn user(content: &str) -> Vec<ChatMessage> {
        vec![ChatMessage::user(content)]
    }

    #[tokio::test]
    async fn first_call_builds_then_passes_response_through() {
        let (factory, builds) = StubFactory::new(0, Duration::ZERO);
        let handler = AgentHandler::new(factory);
        assert!(!handler.is_ready());

        let response = assert_ok!(handler.handle(&user("Create a Reddit post about AI")).await);
        assert_eq!(
            response,
            Sentinel {
                agent_id: 0,
                run_id: "test-run-id",
                content: "Reddit post created successfully".to_string(),
            }
        );
        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert!(handler.is_ready());
    }

    #[tokio::test]
    async fn ready_handler_never_rebuilds() {
        let (factory, builds) = StubFactory::new(0, Duration::ZERO);
        let handler = AgentHandler::new(factory);

        assert_ok!(handler.handle(&user("one")).await);
        assert_ok!(handler.handle(&user("two")).await);
        assert_ok!(handler.handle(&user("three")).await);

        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert_eq!(handler.build_attempts(), 1);
    }

    #[tokio::test]
    async fn messages_are_forwarded_unchanged() {
        let (factory, _) = StubFactory::new(0, Duration::ZERO);
        let handler = AgentHandler::new(factory);
        let messages = vec![
            ChatMessage::system("You are a Reddit post generator."),
            ChatMessage::user("Create a post about web development for r/webdev"),
        ];

        assert_ok!(handler.handle(&messages).await);

        let agent = handler.agent.lock().await.clone().unwrap();
        let seen = agent.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], messages);
        assert_eq!(seen[0][0].role, Role::System);
    }

    #[tokio::test]
    async fn concurrent_first_calls_build_exactly_once() {
        let (factory, builds) = StubFactory::new(0, Duration::from_millis(50));
        let handler = Arc::new(AgentHandler::new(factory));

        let calls = (0..16).map(|i| {
            let handler = Arc::clone(&handler);
            tokio::spawn(async move { handler.handle(&user(&format!("caller {i}"))).await })
        });
        let results = join_all(calls).await;

        assert_eq!(builds.load(Ordering::SeqCst), 1);
        for result in results {
            let response = assert_ok!(result.unwrap());
            assert_eq!(response.agent_id, 0);
        }

        let agent = handler.agent.lock().await.clone().unwrap();
        assert_eq!(agent.seen.lock().unwrap().len(), 16);
    }

    #[tokio::test]
    async fn failed_build_stays_uninitialized_and_retries() {
        let (factory, builds) = StubFactory::new(1, Duration::ZERO);
        let handler = AgentHandler::new(factory);

        let err = assert_err!(handler.handle(&user("first")).await);
        assert!(matches!(
            err,
            HandlerError::Build(ConfigError::MissingModelProvider)
        ));
        assert!(!handler.is_ready());

        let response = assert_ok!(handler.handle(&user("second")).await);
        assert_eq!(response.agent_id, 1);
        assert_eq!(builds.load(Ordering::SeqCst), 2);
        assert!(handler.is_ready());
    }

    #[tokio::test]
    async fn queued_callers_retry_after_failed_build() {
        // The first build fails; callers waiting on the lock build again
        // themselves, and only one of those retries is needed to succeed.
        let (factory, builds) = StubFactory::new(1, Duration::from_millis(20));
        let handler = Arc::new(AgentHandler::new(factory));

        let calls = (0..4).map(|_| {
            let handler = Arc::clone(&handler);
            tokio::spawn(async move { handler.handle(&user("go")).await })
        });
        let results: Vec<_> = join_all(calls)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        let failures = results.iter().filter(|r| r.is_err()).count();
        assert_eq!(failures, 1);
        assert_eq!(builds.load(Ordering::SeqCst), 2);
        assert!(handler.is_ready());
    }

    #[tokio::test]
    async fn agent_errors_propagate_without_resetting() {
        let (factory, builds) = StubFactory::new(0, Duration::ZERO);
        let handler = AgentHandler::new(factory);

        let err = assert_err!(handler.handle(&user("fail")).await);
        assert!(matches!(err, HandlerError::Agent(_)));
        assert_eq!(err.to_string(), "provider unavailable");

        assert!(handler.is_ready());
        assert_ok!(handler.handle(&user("ok")).await);
        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancelled_build_leaves_handler_uninitialized() {
        let (factory, builds) = StubFactory::new(0, Duration::from_secs(60));
        let handler = AgentHandler::new(factory);

        let timed_out =
            tokio::time::timeout(Duration::from_millis(20), handler.handle(&user("slow"))).await;
        assert!(timed_out.is_err());
        assert!(!handler.is_ready());
        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn readiness_does_not_wait_for_build_in_progress() {
        let (factory, _) = StubFactory::new(0, Duration::from_millis(200));
        let handler = Arc::new(AgentHandler::new(factory));

        let building = {
            let handler = Arc::clone(&handler);
            tokio::spawn(async move { handler.handle(&user("first")).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(handler.build_attempts(), 1);
        assert!(!handler.is_ready());

        assert_ok!(building.await.unwrap());
        assert!(handler.is_ready());
    }
}
