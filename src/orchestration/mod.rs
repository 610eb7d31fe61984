pub mod engine;
pub mod error;
pub mod progress;
pub mod workflow;

pub use engine::{ExecutionLimits, Orchestrator, ORCHESTRATOR_AGENT_NAME};
pub use error::OrchestratorError;
pub use progress::{ProgressBroadcaster, ProgressUpdate};
pub use workflow::{
    DocumentationTask, StepStatus, WorkflowDefinition, WorkflowMetadata, WorkflowStatus,
    WorkflowStep,
};
