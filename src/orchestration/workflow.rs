use crate::document::DocumentDraft;
use crate::message::{AgentRequest, AgentResponse};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl StepStatus {
    /// `completed -> pending` is the critique-refine reset; everything else
    /// follows the forward-only ladder.
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (StepStatus::Pending, StepStatus::InProgress)
                | (StepStatus::InProgress, StepStatus::Completed)
                | (StepStatus::InProgress, StepStatus::Failed)
                | (StepStatus::Completed, StepStatus::Pending)
                | (StepStatus::Failed, StepStatus::Pending)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, StepStatus::Completed | StepStatus::Failed)
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepStatus::Pending => write!(f, "pending"),
            StepStatus::InProgress => write!(f, "in_progress"),
            StepStatus::Completed => write!(f, "completed"),
            StepStatus::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl WorkflowStatus {
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (WorkflowStatus::Pending, WorkflowStatus::InProgress)
                | (WorkflowStatus::Pending, WorkflowStatus::Failed)
                | (WorkflowStatus::InProgress, WorkflowStatus::Completed)
                | (WorkflowStatus::InProgress, WorkflowStatus::Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, WorkflowStatus::Completed | WorkflowStatus::Failed)
    }
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkflowStatus::Pending => write!(f, "pending"),
            WorkflowStatus::InProgress => write!(f, "in_progress"),
            WorkflowStatus::Completed => write!(f, "completed"),
            WorkflowStatus::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStep {
    pub id: String,
    pub agent: String,
    pub action: String,
    pub input: AgentRequest,
    #[serde(default)]
    pub output: Option<AgentResponse>,
    pub status: StepStatus,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

impl WorkflowStep {
    pub fn new(id: impl Into<String>, agent: impl Into<String>, input: AgentRequest) -> Self {
        Self {
            id: id.into(),
            agent: agent.into(),
            action: input.action().to_string(),
            input,
            output: None,
            status: StepStatus::Pending,
            error: None,
            timestamp: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowMetadata {
    pub filename: String,
    pub start_time: i64,
    pub max_iterations: u32,
    pub current_iteration: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    pub steps: Vec<WorkflowStep>,
    pub current_step: usize,
    pub status: WorkflowStatus,
    pub metadata: WorkflowMetadata,
}

impl WorkflowDefinition {
    pub fn step_index_for_action(&self, action: &str) -> Option<usize> {
        self.steps.iter().position(|step| step.action == action)
    }

    /// `current_step == steps.len()` is the terminal position.
    pub fn at_terminal_position(&self) -> bool {
        self.current_step >= self.steps.len()
    }

    pub fn in_progress_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|step| step.status == StepStatus::InProgress)
            .count()
    }
}

/// Caller-facing task shape driving one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentationTask {
    pub python_code: String,
    pub filename: String,
    #[serde(default)]
    pub excel_context: Option<String>,
    #[serde(default)]
    pub existing_docs: Option<DocumentDraft>,
    #[serde(default)]
    pub user_preferences: Option<Map<String, Value>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_status_ladder_is_forward_only_except_refine_reset() {
        assert!(StepStatus::Pending.can_transition_to(StepStatus::InProgress));
        assert!(StepStatus::InProgress.can_transition_to(StepStatus::Completed));
        assert!(StepStatus::InProgress.can_transition_to(StepStatus::Failed));
        assert!(StepStatus::Completed.can_transition_to(StepStatus::Pending));

        assert!(!StepStatus::Pending.can_transition_to(StepStatus::Completed));
        assert!(!StepStatus::Completed.can_transition_to(StepStatus::InProgress));
        assert!(!StepStatus::Failed.can_transition_to(StepStatus::Completed));
        assert!(!StepStatus::Pending.can_transition_to(StepStatus::Failed));
    }

    #[test]
    fn workflow_status_reaches_terminal_once() {
        assert!(WorkflowStatus::Pending.can_transition_to(WorkflowStatus::InProgress));
        assert!(WorkflowStatus::InProgress.can_transition_to(WorkflowStatus::Completed));
        assert!(WorkflowStatus::InProgress.can_transition_to(WorkflowStatus::Failed));
        assert!(!WorkflowStatus::Completed.can_transition_to(WorkflowStatus::InProgress));
        assert!(!WorkflowStatus::Failed.can_transition_to(WorkflowStatus::Completed));
        assert!(WorkflowStatus::Completed.is_terminal());
    }

    #[test]
    fn step_new_denormalizes_the_action() {
        let step = WorkflowStep::new(
            "wf-1-5-final_review",
            "critic",
            AgentRequest::FinalReview {
                draft: None,
                filename: "pipeline.py".to_string(),
            },
        );
        assert_eq!(step.action, "final_review");
        assert_eq!(step.status, StepStatus::Pending);
        assert!(step.output.is_none());
    }
}
