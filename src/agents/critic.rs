use super::parse_model_json;
use super::prompts::CRITIQUE_TEMPLATE;
use crate::agent::{Agent, AgentConfig, AgentCore, AgentError};
use crate::document::DocumentDraft;
use crate::message::{AgentRequest, AgentResponse};
use crate::provider::{ChatMessage, CompletionClient, RetrievalClient};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FixPriority {
    High,
    Medium,
    Low,
}

impl std::fmt::Display for FixPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FixPriority::High => write!(f, "high"),
            FixPriority::Medium => write!(f, "medium"),
            FixPriority::Low => write!(f, "low"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorityFix {
    pub priority: FixPriority,
    pub description: String,
}

/// Review verdict. `needs_improvement` is the sole signal driving the
/// orchestrator's critique-refine loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CritiqueReport {
    pub overall_score: f64,
    pub needs_improvement: bool,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub suggestions: Vec<String>,
    pub specific_issues: Map<String, Value>,
    pub priority_fixes: Vec<PriorityFix>,
}

impl CritiqueReport {
    pub fn validate(&self) -> Result<(), String> {
        if !(1.0..=10.0).contains(&self.overall_score) {
            return Err(format!(
                "overallScore must be within [1, 10], got {}",
                self.overall_score
            ));
        }
        Ok(())
    }
}

/// Reviews drafts and scores them; never rewrites.
pub struct CriticAgent {
    core: AgentCore,
}

impl CriticAgent {
    pub fn new(
        config: AgentConfig,
        completion: Arc<dyn CompletionClient>,
        retrieval: Arc<dyn RetrievalClient>,
    ) -> Self {
        Self {
            core: AgentCore::new(config, completion, retrieval),
        }
    }

    pub fn review(
        &self,
        draft: &DocumentDraft,
        filename: &str,
    ) -> Result<CritiqueReport, AgentError> {
        let draft_json =
            serde_json::to_string_pretty(draft).map_err(|err| AgentError::Validation {
                agent: self.name().to_string(),
                reason: format!("failed to serialize draft for review: {err}"),
            })?;
        let prompt = format!(
            "{CRITIQUE_TEMPLATE}\n\nDocumented file: {filename}\n\nDocumentation draft:\n{draft_json}"
        );
        let messages = [
            ChatMessage::system(&self.core.config().system_prompt),
            ChatMessage::user(prompt),
        ];
        let raw = self.core.generate_completion(&messages, true)?;
        let report: CritiqueReport = parse_model_json(self.name(), &raw)?;
        report.validate().map_err(|reason| AgentError::Validation {
            agent: self.name().to_string(),
            reason,
        })?;
        Ok(report)
    }

    fn review_step(
        &self,
        draft: Option<DocumentDraft>,
        filename: &str,
    ) -> Result<AgentResponse, AgentError> {
        let draft = draft.ok_or_else(|| AgentError::MissingInput {
            agent: self.name().to_string(),
            field: "draft".to_string(),
        })?;
        let report = self.review(&draft, filename)?;
        Ok(AgentResponse::Review { report })
    }
}

impl Agent for CriticAgent {
    fn core(&self) -> &AgentCore {
        &self.core
    }

    fn handle(&self, request: AgentRequest) -> Result<AgentResponse, AgentError> {
        match request {
            AgentRequest::ReviewDraft { draft, filename } => self.review_step(draft, &filename),
            AgentRequest::FinalReview { draft, filename } => self.review_step(draft, &filename),
            other => Err(AgentError::UnsupportedAction {
                agent: self.name().to_string(),
                action: other.action().to_string(),
            }),
        }
    }
}
