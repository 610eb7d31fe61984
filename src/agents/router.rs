use super::parse_model_json;
use super::prompts::CLASSIFICATION_TEMPLATE;
use crate::agent::{Agent, AgentConfig, AgentCore, AgentError};
use crate::directory::{AgentDirectory, DirectoryError};
use crate::document::DocumentDraft;
use crate::message::{AgentRequest, AgentResponse};
use crate::provider::{ChatMessage, CompletionClient, RetrievalClient};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueryIntent {
    AskDoc,
    GenerateDoc,
    ImproveDoc,
    ManageKb,
    Unknown,
}

impl std::fmt::Display for QueryIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryIntent::AskDoc => write!(f, "ask-doc"),
            QueryIntent::GenerateDoc => write!(f, "generate-doc"),
            QueryIntent::ImproveDoc => write!(f, "improve-doc"),
            QueryIntent::ManageKb => write!(f, "manage-kb"),
            QueryIntent::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedIntent {
    pub intent: QueryIntent,
    pub confidence: f64,
    pub reasoning: String,
    pub entities: Vec<String>,
    pub suggested_agent: String,
    pub required_parameters: Vec<String>,
}

impl ClassifiedIntent {
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(format!(
                "confidence must be within [0, 1], got {}",
                self.confidence
            ));
        }
        if self.reasoning.trim().is_empty() {
            return Err("reasoning must be non-empty".to_string());
        }
        if self.suggested_agent.trim().is_empty() {
            return Err("suggestedAgent must be non-empty".to_string());
        }
        Ok(())
    }
}

/// Caller-side input the router reshapes for the target agent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouterInput {
    pub query: String,
    pub context: Option<String>,
    pub python_code: Option<String>,
    pub filename: Option<String>,
    pub existing_document: Option<DocumentDraft>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoutedRequest {
    pub agent: String,
    pub request: AgentRequest,
}

/// Classifies free-text input and dispatches it to the right specialist.
pub struct RouterAgent {
    core: AgentCore,
}

impl RouterAgent {
    pub fn new(
        config: AgentConfig,
        completion: Arc<dyn CompletionClient>,
        retrieval: Arc<dyn RetrievalClient>,
    ) -> Self {
        Self {
            core: AgentCore::new(config, completion, retrieval),
        }
    }

    pub fn classify_query(&self, query: &str) -> Result<ClassifiedIntent, AgentError> {
        let prompt = format!("{CLASSIFICATION_TEMPLATE}\n\nUser query:\n{query}");
        let messages = [
            ChatMessage::system(&self.core.config().system_prompt),
            ChatMessage::user(prompt),
        ];
        let raw = self.core.generate_completion(&messages, true)?;
        let intent: ClassifiedIntent = parse_model_json(self.name(), &raw)?;
        intent.validate().map_err(|reason| AgentError::Validation {
            agent: self.name().to_string(),
            reason,
        })?;
        Ok(intent)
    }

    /// Looks up the suggested agent and reshapes the caller's input into the
    /// request variant that agent expects for the classified intent.
    pub fn route_to_agent(
        &self,
        directory: &AgentDirectory,
        intent: &ClassifiedIntent,
        input: &RouterInput,
    ) -> Result<RoutedRequest, DirectoryError> {
        if directory.get(&intent.suggested_agent).is_none() {
            return Err(DirectoryError::AgentNotFound {
                agent: intent.suggested_agent.clone(),
            });
        }
        let request = match intent.intent {
            QueryIntent::AskDoc => AgentRequest::AnswerQuestion {
                question: input.query.clone(),
                context: input.context.clone(),
                entities: intent.entities.clone(),
            },
            QueryIntent::ImproveDoc => AgentRequest::RegenerateDocumentation {
                existing_document: input.existing_document.clone(),
                user_feedback: input.query.clone(),
                context: input.context.clone(),
                entities: intent.entities.clone(),
            },
            QueryIntent::GenerateDoc => {
                let python_code =
                    input
                        .python_code
                        .clone()
                        .ok_or_else(|| AgentError::MissingInput {
                            agent: self.name().to_string(),
                            field: "python_code".to_string(),
                        })?;
                AgentRequest::GenerateDraft {
                    python_code,
                    filename: input
                        .filename
                        .clone()
                        .unwrap_or_else(|| "uploaded.py".to_string()),
                    context: input.context.clone().unwrap_or_default(),
                    excel_context: None,
                    user_preferences: None,
                }
            }
            QueryIntent::ManageKb | QueryIntent::Unknown => {
                return Err(DirectoryError::Agent(AgentError::NoRoute {
                    agent: self.name().to_string(),
                    intent: intent.intent.to_string(),
                }));
            }
        };
        Ok(RoutedRequest {
            agent: intent.suggested_agent.clone(),
            request,
        })
    }
}

impl Agent for RouterAgent {
    fn core(&self) -> &AgentCore {
        &self.core
    }

    fn handle(&self, request: AgentRequest) -> Result<AgentResponse, AgentError> {
        match request {
            AgentRequest::ClassifyQuery { query } => {
                let intent = self.classify_query(&query)?;
                Ok(AgentResponse::Classification { intent })
            }
            other => Err(AgentError::UnsupportedAction {
                agent: self.name().to_string(),
                action: other.action().to_string(),
            }),
        }
    }
}
