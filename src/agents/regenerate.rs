use super::prompts::DOCUMENTATION_TEMPLATE;
use crate::agent::{Agent, AgentConfig, AgentCore, AgentError};
use crate::document::DocumentDraft;
use crate::message::{AgentRequest, AgentResponse};
use crate::provider::{ChatMessage, CompletionClient, RetrievalClient};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegenerationOutcome {
    pub success: bool,
    #[serde(default)]
    pub requires_file_upload: bool,
    #[serde(default)]
    pub document: Option<DocumentDraft>,
    #[serde(default)]
    pub improvement_note: Option<String>,
}

/// Feedback-only revision of an existing document. The existing document is
/// a hard capability gate: without it the agent reports that a file upload
/// is required instead of generating from nothing.
pub struct RegenerateAgent {
    core: AgentCore,
}

impl RegenerateAgent {
    pub fn new(
        config: AgentConfig,
        completion: Arc<dyn CompletionClient>,
        retrieval: Arc<dyn RetrievalClient>,
    ) -> Self {
        Self {
            core: AgentCore::new(config, completion, retrieval),
        }
    }

    pub fn regenerate(
        &self,
        existing_document: Option<DocumentDraft>,
        user_feedback: &str,
        context: Option<&str>,
        entities: &[String],
    ) -> Result<RegenerationOutcome, AgentError> {
        let Some(existing) = existing_document else {
            return Ok(RegenerationOutcome {
                success: false,
                requires_file_upload: true,
                document: None,
                improvement_note: None,
            });
        };

        let existing_json =
            serde_json::to_string_pretty(&existing).map_err(|err| AgentError::Validation {
                agent: self.name().to_string(),
                reason: format!("failed to serialize existing document: {err}"),
            })?;
        let mut prompt = format!(
            "{DOCUMENTATION_TEMPLATE}\n\nExisting documentation:\n{existing_json}\n\nUser feedback to apply:\n{user_feedback}\n"
        );
        if let Some(context) = context.filter(|value| !value.trim().is_empty()) {
            prompt.push_str(&format!("\nConversation context:\n{context}\n"));
        }
        if !entities.is_empty() {
            prompt.push_str(&format!("\nEntities mentioned: {}\n", entities.join(", ")));
        }
        prompt.push_str(
            "\nApply the feedback to the existing documentation and return the full revised document in the exact template format. Keep sections the feedback does not touch unchanged.",
        );

        let messages = [
            ChatMessage::system(&self.core.config().system_prompt),
            ChatMessage::user(prompt),
        ];
        let raw = self.core.generate_completion(&messages, true)?;

        match DocumentDraft::from_json_str(&raw) {
            Ok(document) => {
                document.validate().map_err(|reason| AgentError::Validation {
                    agent: self.name().to_string(),
                    reason,
                })?;
                Ok(RegenerationOutcome {
                    success: true,
                    requires_file_upload: false,
                    document: Some(document),
                    improvement_note: None,
                })
            }
            // Parse failure alone falls back to the unmodified document;
            // validation and completion failures still abort.
            Err(err) => Ok(RegenerationOutcome {
                success: true,
                requires_file_upload: false,
                document: Some(existing),
                improvement_note: Some(format!(
                    "model revision could not be parsed ({err}); returning the previous documentation unchanged with the feedback noted: {user_feedback}"
                )),
            }),
        }
    }
}

impl Agent for RegenerateAgent {
    fn core(&self) -> &AgentCore {
        &self.core
    }

    fn handle(&self, request: AgentRequest) -> Result<AgentResponse, AgentError> {
        match request {
            AgentRequest::RegenerateDocumentation {
                existing_document,
                user_feedback,
                context,
                entities,
            } => {
                let outcome = self.regenerate(
                    existing_document,
                    &user_feedback,
                    context.as_deref(),
                    &entities,
                )?;
                Ok(AgentResponse::Regeneration { outcome })
            }
            other => Err(AgentError::UnsupportedAction {
                agent: self.name().to_string(),
                action: other.action().to_string(),
            }),
        }
    }
}
