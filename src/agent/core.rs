use super::config::AgentConfig;
use super::context::AgentContext;
use super::AgentError;
use crate::message::{Message, MessageMetadata, MessagePayload};
use crate::provider::{
    ChatMessage, CompletionClient, CompletionOptions, RetrievalClient, RetrievalOptions, SourceHit,
};
use serde_json::Value;
use std::sync::{Arc, Mutex};

/// Shared mechanics behind every specialist: configuration, the per-session
/// context, and the two external collaborators.
pub struct AgentCore {
    config: AgentConfig,
    context: Mutex<AgentContext>,
    completion: Arc<dyn CompletionClient>,
    retrieval: Arc<dyn RetrievalClient>,
}

impl AgentCore {
    pub fn new(
        config: AgentConfig,
        completion: Arc<dyn CompletionClient>,
        retrieval: Arc<dyn RetrievalClient>,
    ) -> Self {
        Self {
            config,
            context: Mutex::new(AgentContext::default()),
            completion,
            retrieval,
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn bind_context(&self, session_id: &str, task_id: &str) {
        let mut context = self.context.lock().expect("agent context poisoned");
        *context = AgentContext::new(session_id, task_id);
    }

    pub fn record_incoming(&self, message: &Message) {
        let mut context = self.context.lock().expect("agent context poisoned");
        context.message_log.push(message.clone());
    }

    /// Builds an outgoing envelope, appends it to the context log and returns
    /// it for the directory to route.
    pub fn compose_message(
        &self,
        to: &str,
        payload: MessagePayload,
        metadata: MessageMetadata,
    ) -> Message {
        let message = Message::new(self.config.name.clone(), to, payload, metadata);
        let mut context = self.context.lock().expect("agent context poisoned");
        context.message_log.push(message.clone());
        message
    }

    pub fn message_log_snapshot(&self) -> Vec<Message> {
        self.context
            .lock()
            .expect("agent context poisoned")
            .message_log
            .clone()
    }

    pub fn context_snapshot(&self) -> AgentContext {
        self.context.lock().expect("agent context poisoned").clone()
    }

    pub fn set_shared_value(&self, key: &str, value: Value) {
        let mut context = self.context.lock().expect("agent context poisoned");
        context.shared_state.insert(key.to_string(), value);
    }

    pub fn shared_value(&self, key: &str) -> Option<Value> {
        self.context
            .lock()
            .expect("agent context poisoned")
            .shared_state
            .get(key)
            .cloned()
    }

    /// Pre-ranked context for the given query, or an empty string when
    /// retrieval augmentation is disabled for this agent.
    pub fn rag_context(&self, query: &str) -> Result<String, AgentError> {
        if !self.config.retrieval.enabled {
            return Ok(String::new());
        }
        let options = RetrievalOptions::from(&self.config.retrieval);
        Ok(self.retrieval.relevant_context(
            query,
            self.config.retrieval.max_context_tokens,
            &options,
        )?)
    }

    /// Ranked sources for the given query; empty when retrieval augmentation
    /// is disabled.
    pub fn search_sources(&self, query: &str) -> Result<Vec<SourceHit>, AgentError> {
        if !self.config.retrieval.enabled {
            return Ok(Vec::new());
        }
        let options = RetrievalOptions::from(&self.config.retrieval);
        Ok(self.retrieval.search(query, &options)?)
    }

    fn completion_options(&self, json_mode: bool) -> CompletionOptions {
        CompletionOptions {
            model: self.config.model.clone(),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            json_mode,
        }
    }

    /// One outstanding completion call per invocation, no multiplexing.
    pub fn generate_completion(
        &self,
        messages: &[ChatMessage],
        json_mode: bool,
    ) -> Result<String, AgentError> {
        Ok(self
            .completion
            .generate(messages, &self.completion_options(json_mode))?)
    }

    pub fn generate_streaming_completion(
        &self,
        messages: &[ChatMessage],
        json_mode: bool,
        on_token: &mut dyn FnMut(&str),
    ) -> Result<String, AgentError> {
        Ok(self.completion.generate_streaming(
            messages,
            &self.completion_options(json_mode),
            on_token,
        )?)
    }
}
