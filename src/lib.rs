pub mod agent;
pub mod agents;
pub mod config;
pub mod directory;
pub mod document;
pub mod message;
pub mod orchestration;
pub mod pipeline;
pub mod provider;
pub mod shared;

pub use agent::{Agent, AgentConfig, AgentContext, AgentCore, AgentError, RetrievalAugmentation};
pub use agents::{
    AnswerAgent, AnswerReply, CitedSource, ClassifiedIntent, CriticAgent, CritiqueReport,
    FixPriority, PriorityFix, QueryIntent, RegenerateAgent, RegenerationOutcome, RoutedRequest,
    RouterAgent, RouterInput, WriterAgent,
};
pub use config::{ConfigError, Settings};
pub use directory::{AgentDirectory, DirectoryError};
pub use document::{ColumnSpec, DocumentDraft, OutputTable, TableMetadata};
pub use message::{
    AgentRequest, AgentResponse, Message, MessageMetadata, MessagePayload, MessageType,
};
pub use orchestration::{
    DocumentationTask, ExecutionLimits, Orchestrator, OrchestratorError, ProgressUpdate,
    StepStatus, WorkflowDefinition, WorkflowMetadata, WorkflowStatus, WorkflowStep,
    ORCHESTRATOR_AGENT_NAME,
};
pub use pipeline::{build_pipeline, Pipeline};
pub use provider::{
    ChatMessage, ChatRole, CompletionClient, CompletionError, CompletionOptions,
    HttpCompletionClient, HttpRetrievalClient, RetrievalClient, RetrievalError, RetrievalOptions,
    SourceHit,
};
