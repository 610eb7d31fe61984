use crate::agent::AgentError;
use crate::config::ConfigError;
use crate::directory::DirectoryError;
use crate::orchestration::workflow::{StepStatus, WorkflowStatus};

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Directory(#[from] DirectoryError),
    #[error(transparent)]
    Agent(#[from] AgentError),
    #[error("workflow `{workflow_id}` not found")]
    UnknownWorkflow { workflow_id: String },
    #[error("timed out after {timeout_seconds}s waiting for a response from agent `{agent}`")]
    ResponseTimeout { agent: String, timeout_seconds: u64 },
    #[error("agent `{agent}` replied to step `{step_id}` with a non-response payload")]
    UnexpectedReply { agent: String, step_id: String },
    #[error("workflow step status transition `{from}` -> `{to}` is invalid")]
    InvalidStepTransition { from: StepStatus, to: StepStatus },
    #[error("workflow status transition `{from}` -> `{to}` is invalid")]
    InvalidWorkflowTransition {
        from: WorkflowStatus,
        to: WorkflowStatus,
    },
    #[error("workflow `{workflow_id}` was cancelled before completion")]
    Cancelled { workflow_id: String },
    #[error("workflow `{workflow_id}` produced no terminal output")]
    MissingTerminalOutput { workflow_id: String },
    #[error("config error: {0}")]
    Config(String),
    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl From<ConfigError> for OrchestratorError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value.to_string())
    }
}
