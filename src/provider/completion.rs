use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("completion api key environment variable `{env}` is not set")]
    MissingApiKey { env: String },
    #[error("completion request failed with status {status}: {body}")]
    Api { status: u16, body: String },
    #[error("completion transport failure: {0}")]
    Transport(String),
    #[error("completion response decode failure: {0}")]
    Decode(String),
    #[error("completion response contained no message content")]
    EmptyResponse,
    #[error("completion stream parse failure: {0}")]
    Stream(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionOptions {
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    /// Ask the endpoint for structured JSON output. The caller still parses
    /// the returned string; parse failure is the calling agent's to handle.
    pub json_mode: bool,
}

/// Completion collaborator. One outstanding call per invocation, no
/// multiplexing; implementations block until the full message is available.
pub trait CompletionClient: Send + Sync {
    fn generate(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<String, CompletionError>;

    /// Streaming variant: `on_token` observes each delta as it arrives; the
    /// accumulated text is returned once the stream closes.
    fn generate_streaming(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
        on_token: &mut dyn FnMut(&str),
    ) -> Result<String, CompletionError>;
}
