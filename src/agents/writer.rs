use super::critic::CritiqueReport;
use super::parse_model_json;
use super::prompts::DOCUMENTATION_TEMPLATE;
use crate::agent::{Agent, AgentConfig, AgentCore, AgentError};
use crate::document::DocumentDraft;
use crate::message::{AgentRequest, AgentResponse};
use crate::provider::{ChatMessage, CompletionClient, RetrievalClient};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Drafts and refines the structured documentation object. Output that
/// violates the template contract fails the step; nothing is coerced.
pub struct WriterAgent {
    core: AgentCore,
}

impl WriterAgent {
    pub fn new(
        config: AgentConfig,
        completion: Arc<dyn CompletionClient>,
        retrieval: Arc<dyn RetrievalClient>,
    ) -> Self {
        Self {
            core: AgentCore::new(config, completion, retrieval),
        }
    }

    fn draft_prompt(
        &self,
        python_code: &str,
        filename: &str,
        context: &str,
        excel_context: Option<&str>,
        user_preferences: Option<&Map<String, Value>>,
    ) -> String {
        let mut prompt = format!(
            "{DOCUMENTATION_TEMPLATE}\n\nPython file: {filename}\n\nPython Code:\n```python\n{python_code}\n```\n"
        );
        if !context.trim().is_empty() {
            prompt.push_str(&format!(
                "\nRelevant context from the knowledge base:\n{context}\n"
            ));
        }
        if let Some(excel_context) = excel_context.filter(|value| !value.trim().is_empty()) {
            prompt.push_str(&format!(
                "\nSpreadsheet context supplied by the user:\n{excel_context}\n"
            ));
        }
        if let Some(preferences) = user_preferences.filter(|map| !map.is_empty()) {
            prompt.push_str(&format!(
                "\nUser preferences (apply where they do not conflict with the template):\n{}\n",
                Value::Object(preferences.clone())
            ));
        }
        prompt.push_str(
            "\nPlease generate the documentation following the exact template format provided above.",
        );
        prompt
    }

    fn refine_prompt(
        &self,
        previous_draft: &DocumentDraft,
        feedback: &CritiqueReport,
        python_code: &str,
        filename: &str,
        context: &str,
    ) -> Result<String, AgentError> {
        let draft_json = self.to_json(previous_draft)?;
        let feedback_json = self.to_json(feedback)?;
        let mut prompt = format!(
            "{DOCUMENTATION_TEMPLATE}\n\nPython file: {filename}\n\nPython Code:\n```python\n{python_code}\n```\n\nPrevious documentation draft:\n{draft_json}\n\nReviewer feedback to address:\n{feedback_json}\n"
        );
        if !context.trim().is_empty() {
            prompt.push_str(&format!(
                "\nRelevant context from the knowledge base:\n{context}\n"
            ));
        }
        prompt.push_str(
            "\nRevise the draft so every weakness and priority fix is resolved. Keep sections the feedback does not mention unchanged. Return the full document in the exact template format.",
        );
        Ok(prompt)
    }

    fn to_json<T: serde::Serialize>(&self, value: &T) -> Result<String, AgentError> {
        serde_json::to_string_pretty(value).map_err(|err| AgentError::Validation {
            agent: self.name().to_string(),
            reason: format!("failed to serialize prompt payload: {err}"),
        })
    }

    fn complete_document(&self, prompt: String) -> Result<DocumentDraft, AgentError> {
        let messages = [
            ChatMessage::system(&self.core.config().system_prompt),
            ChatMessage::user(prompt),
        ];
        let raw = self.core.generate_completion(&messages, true)?;
        self.parse_document(&raw)
    }

    /// Streaming entry point for interactive callers; the workflow path uses
    /// the blocking variant.
    pub fn stream_document(
        &self,
        prompt: String,
        on_token: &mut dyn FnMut(&str),
    ) -> Result<DocumentDraft, AgentError> {
        let messages = [
            ChatMessage::system(&self.core.config().system_prompt),
            ChatMessage::user(prompt),
        ];
        let raw = self
            .core
            .generate_streaming_completion(&messages, true, on_token)?;
        self.parse_document(&raw)
    }

    fn parse_document(&self, raw: &str) -> Result<DocumentDraft, AgentError> {
        let document: DocumentDraft = parse_model_json(self.name(), raw)?;
        document.validate().map_err(|reason| AgentError::Validation {
            agent: self.name().to_string(),
            reason,
        })?;
        Ok(document)
    }

    pub fn draft(
        &self,
        python_code: &str,
        filename: &str,
        context: &str,
        excel_context: Option<&str>,
        user_preferences: Option<&Map<String, Value>>,
    ) -> Result<DocumentDraft, AgentError> {
        let prompt =
            self.draft_prompt(python_code, filename, context, excel_context, user_preferences);
        self.complete_document(prompt)
    }

    pub fn refine(
        &self,
        previous_draft: &DocumentDraft,
        feedback: &CritiqueReport,
        python_code: &str,
        filename: &str,
        context: &str,
    ) -> Result<DocumentDraft, AgentError> {
        let prompt =
            self.refine_prompt(previous_draft, feedback, python_code, filename, context)?;
        self.complete_document(prompt)
    }
}

impl Agent for WriterAgent {
    fn core(&self) -> &AgentCore {
        &self.core
    }

    fn handle(&self, request: AgentRequest) -> Result<AgentResponse, AgentError> {
        match request {
            AgentRequest::GenerateDraft {
                python_code,
                filename,
                context,
                excel_context,
                user_preferences,
            } => {
                let document = self.draft(
                    &python_code,
                    &filename,
                    &context,
                    excel_context.as_deref(),
                    user_preferences.as_ref(),
                )?;
                Ok(AgentResponse::Draft { document })
            }
            AgentRequest::RefineDocumentation {
                previous_draft,
                feedback,
                python_code,
                filename,
                context,
            } => {
                let previous_draft =
                    previous_draft.ok_or_else(|| AgentError::MissingInput {
                        agent: self.name().to_string(),
                        field: "previous_draft".to_string(),
                    })?;
                let feedback = feedback.ok_or_else(|| AgentError::MissingInput {
                    agent: self.name().to_string(),
                    field: "feedback".to_string(),
                })?;
                let document = self.refine(
                    &previous_draft,
                    &feedback,
                    &python_code,
                    &filename,
                    &context,
                )?;
                Ok(AgentResponse::Draft { document })
            }
            other => Err(AgentError::UnsupportedAction {
                agent: self.name().to_string(),
                action: other.action().to_string(),
            }),
        }
    }
}
