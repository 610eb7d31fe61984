use super::parse_model_json;
use super::prompts::ANSWER_TEMPLATE;
use crate::agent::{Agent, AgentConfig, AgentCore, AgentError};
use crate::message::{AgentRequest, AgentResponse};
use crate::provider::{ChatMessage, CompletionClient, RetrievalClient, SourceHit};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Confidence reported when no sources cover the question and the agent
/// answers with a clarification request instead of calling the model.
pub const NO_SOURCE_CONFIDENCE: f64 = 0.2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CitedSource {
    pub title: String,
    pub snippet: String,
    pub score: f64,
}

impl From<SourceHit> for CitedSource {
    fn from(hit: SourceHit) -> Self {
        Self {
            title: hit.title,
            snippet: hit.snippet,
            score: hit.score,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerReply {
    pub answer: String,
    pub sources: Vec<CitedSource>,
    pub confidence: f64,
    #[serde(default)]
    pub follow_up_suggestions: Vec<String>,
    #[serde(default)]
    pub clarifying_questions: Vec<String>,
}

/// Model-side answer shape; sources are attached from the retrieval hits,
/// not echoed back by the model.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelAnswer {
    answer: String,
    confidence: f64,
    #[serde(default)]
    follow_up_suggestions: Vec<String>,
    #[serde(default)]
    clarifying_questions: Vec<String>,
}

/// Q&A over documented pipelines, grounded in ranked retrieval sources.
pub struct AnswerAgent {
    core: AgentCore,
}

impl AnswerAgent {
    pub fn new(
        config: AgentConfig,
        completion: Arc<dyn CompletionClient>,
        retrieval: Arc<dyn RetrievalClient>,
    ) -> Self {
        Self {
            core: AgentCore::new(config, completion, retrieval),
        }
    }

    fn clarification_reply(question: &str) -> AnswerReply {
        AnswerReply {
            answer: format!(
                "I could not find any documentation covering \"{question}\". Could you point me at the pipeline or table you mean, or upload the script so I can document it first?"
            ),
            sources: Vec::new(),
            confidence: NO_SOURCE_CONFIDENCE,
            follow_up_suggestions: Vec::new(),
            clarifying_questions: vec![
                "Which pipeline or output table is this question about?".to_string(),
            ],
        }
    }

    pub fn answer(
        &self,
        question: &str,
        context: Option<&str>,
        entities: &[String],
    ) -> Result<AnswerReply, AgentError> {
        let sources = self.core.search_sources(question)?;
        if sources.is_empty() {
            return Ok(Self::clarification_reply(question));
        }

        let mut numbered = String::new();
        for (idx, hit) in sources.iter().enumerate() {
            numbered.push_str(&format!(
                "[{}] {} (score {:.2})\n{}\n\n",
                idx + 1,
                hit.title,
                hit.score,
                hit.snippet
            ));
        }
        let mut prompt = format!("{ANSWER_TEMPLATE}\n\nSources:\n{numbered}Question:\n{question}");
        if let Some(context) = context.filter(|value| !value.trim().is_empty()) {
            prompt.push_str(&format!("\n\nConversation context:\n{context}"));
        }
        if !entities.is_empty() {
            prompt.push_str(&format!("\n\nEntities of interest: {}", entities.join(", ")));
        }

        let messages = [
            ChatMessage::system(&self.core.config().system_prompt),
            ChatMessage::user(prompt),
        ];
        let raw = self.core.generate_completion(&messages, true)?;
        let model_answer: ModelAnswer = parse_model_json(self.name(), &raw)?;
        if !(0.0..=1.0).contains(&model_answer.confidence) {
            return Err(AgentError::Validation {
                agent: self.name().to_string(),
                reason: format!(
                    "confidence must be within [0, 1], got {}",
                    model_answer.confidence
                ),
            });
        }

        Ok(AnswerReply {
            answer: model_answer.answer,
            sources: sources.into_iter().map(CitedSource::from).collect(),
            confidence: model_answer.confidence,
            follow_up_suggestions: model_answer.follow_up_suggestions,
            clarifying_questions: model_answer.clarifying_questions,
        })
    }
}

impl Agent for AnswerAgent {
    fn core(&self) -> &AgentCore {
        &self.core
    }

    fn handle(&self, request: AgentRequest) -> Result<AgentResponse, AgentError> {
        match request {
            AgentRequest::AnswerQuestion {
                question,
                context,
                entities,
            } => {
                let reply = self.answer(&question, context.as_deref(), &entities)?;
                Ok(AgentResponse::Answer { reply })
            }
            other => Err(AgentError::UnsupportedAction {
                agent: self.name().to_string(),
                action: other.action().to_string(),
            }),
        }
    }
}
