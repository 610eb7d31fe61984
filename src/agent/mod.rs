pub mod config;
pub mod context;
pub mod core;

pub use config::{AgentConfig, RetrievalAugmentation};
pub use context::AgentContext;
pub use core::AgentCore;

use crate::message::{AgentRequest, AgentResponse, Message, MessagePayload};
use crate::provider::{CompletionError, RetrievalError};

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("agent `{agent}` output validation failed: {reason}")]
    Validation { agent: String, reason: String },
    #[error("agent `{agent}` could not parse model output as json: {reason}")]
    Parse { agent: String, reason: String },
    #[error("agent `{agent}` does not support action `{action}`")]
    UnsupportedAction { agent: String, action: String },
    #[error("agent `{agent}` request is missing required input `{field}`")]
    MissingInput { agent: String, field: String },
    #[error("agent `{agent}` has no route for intent `{intent}`")]
    NoRoute { agent: String, intent: String },
    #[error(transparent)]
    Completion(#[from] CompletionError),
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),
}

/// Capability contract every specialist satisfies. Shared mechanics (context
/// log, collaborator delegation, message composition) live on [`AgentCore`];
/// a specialist implements `handle` and optionally `on_initialize`.
pub trait Agent: Send + Sync {
    fn core(&self) -> &AgentCore;

    /// Action dispatch. Matched exhaustively over [`AgentRequest`]; actions
    /// outside the agent's contract are `UnsupportedAction` errors.
    fn handle(&self, request: AgentRequest) -> Result<AgentResponse, AgentError>;

    /// Idempotent setup hook invoked after the session context is bound.
    fn on_initialize(&self) -> Result<(), AgentError> {
        Ok(())
    }

    fn name(&self) -> &str {
        &self.core().config().name
    }

    /// Binds the per-run context (resets the message log and shared state).
    fn initialize(&self, session_id: &str, task_id: &str) -> Result<(), AgentError> {
        self.core().bind_context(session_id, task_id);
        self.on_initialize()
    }

    /// Direct synchronous entry point, used when no message round-trip is
    /// needed.
    fn execute(&self, request: AgentRequest) -> Result<AgentResponse, AgentError> {
        self.handle(request)
    }

    /// Appends the inbound message to the context log, dispatches requests to
    /// `handle`, and composes the response envelope (carrying the originating
    /// step id) for the directory to route. Non-request messages are logged
    /// only.
    fn receive_message(&self, message: Message) -> Result<Option<Message>, AgentError> {
        self.core().record_incoming(&message);
        match &message.content {
            MessagePayload::Request(request) => {
                let response = self.handle(request.clone())?;
                Ok(Some(self.core().compose_message(
                    &message.from,
                    MessagePayload::Response(response),
                    message.metadata.clone(),
                )))
            }
            _ => Ok(None),
        }
    }
}
