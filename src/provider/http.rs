use super::completion::{
    ChatMessage, CompletionClient, CompletionError, CompletionOptions,
};
use super::retrieval::{RetrievalClient, RetrievalError, RetrievalOptions, SourceHit};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader};

const STREAM_DATA_PREFIX: &str = "data:";
const STREAM_DONE_MARKER: &str = "[DONE]";

#[derive(Debug, Clone, Serialize)]
struct ChatRequestBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f64,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionData {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Chat-completions client over an OpenAI-style endpoint.
#[derive(Debug, Clone)]
pub struct HttpCompletionClient {
    base_url: String,
    api_key: String,
}

impl HttpCompletionClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    pub fn from_env(base_url: &str, api_key_env: &str) -> Result<Self, CompletionError> {
        let api_key = std::env::var(api_key_env)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| CompletionError::MissingApiKey {
                env: api_key_env.to_string(),
            })?;
        Ok(Self::new(base_url, api_key))
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn post(
        &self,
        body: &ChatRequestBody<'_>,
    ) -> Result<ureq::Response, CompletionError> {
        ureq::post(&self.endpoint())
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .set("Content-Type", "application/json")
            .send_json(body)
            .map_err(|err| match err {
                ureq::Error::Status(status, response) => CompletionError::Api {
                    status,
                    body: response.into_string().unwrap_or_default(),
                },
                other => CompletionError::Transport(other.to_string()),
            })
    }

    fn request_body<'a>(
        messages: &'a [ChatMessage],
        options: &'a CompletionOptions,
        stream: bool,
    ) -> ChatRequestBody<'a> {
        ChatRequestBody {
            model: &options.model,
            messages,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            response_format: options.json_mode.then_some(ResponseFormat {
                format_type: "json_object",
            }),
            stream: stream.then_some(true),
        }
    }
}

/// Extracts the delta content carried by one SSE line, if any. Returns
/// `Ok(None)` for keep-alives, non-data lines and the done marker.
fn parse_stream_line(line: &str) -> Result<Option<String>, CompletionError> {
    let Some(data) = line.trim().strip_prefix(STREAM_DATA_PREFIX) else {
        return Ok(None);
    };
    let data = data.trim();
    if data.is_empty() || data == STREAM_DONE_MARKER {
        return Ok(None);
    }
    let chunk: StreamChunk =
        serde_json::from_str(data).map_err(|err| CompletionError::Stream(err.to_string()))?;
    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .filter(|content| !content.is_empty()))
}

impl CompletionClient for HttpCompletionClient {
    fn generate(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<String, CompletionError> {
        let body = Self::request_body(messages, options, false);
        let response = self.post(&body)?;
        let data: ChatCompletionData = response
            .into_json()
            .map_err(|err| CompletionError::Decode(err.to_string()))?;
        data.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.is_empty())
            .ok_or(CompletionError::EmptyResponse)
    }

    fn generate_streaming(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
        on_token: &mut dyn FnMut(&str),
    ) -> Result<String, CompletionError> {
        let body = Self::request_body(messages, options, true);
        let response = self.post(&body)?;
        let reader = BufReader::new(response.into_reader());
        let mut accumulated = String::new();
        for line in reader.lines() {
            let line = line.map_err(|err| CompletionError::Transport(err.to_string()))?;
            if let Some(token) = parse_stream_line(&line)? {
                on_token(&token);
                accumulated.push_str(&token);
            }
        }
        if accumulated.is_empty() {
            return Err(CompletionError::EmptyResponse);
        }
        Ok(accumulated)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct ContextRequestBody<'a> {
    query: &'a str,
    max_tokens: u32,
    include_documents: bool,
    include_code: bool,
    include_qa: bool,
    min_score: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContextData {
    #[serde(default)]
    context: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequestBody<'a> {
    query: &'a str,
    include_documents: bool,
    include_code: bool,
    include_qa: bool,
    min_score: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchData {
    #[serde(default)]
    results: Vec<SourceHit>,
}

/// Client for the external context service that owns ranking and token
/// budgeting.
#[derive(Debug, Clone)]
pub struct HttpRetrievalClient {
    base_url: String,
    api_key: Option<String>,
}

impl HttpRetrievalClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    fn post<T: Serialize>(&self, path: &str, body: &T) -> Result<ureq::Response, RetrievalError> {
        let mut request = ureq::post(&self.endpoint(path)).set("Content-Type", "application/json");
        if let Some(api_key) = self.api_key.as_deref() {
            request = request.set("Authorization", &format!("Bearer {api_key}"));
        }
        request.send_json(body).map_err(|err| match err {
            ureq::Error::Status(status, response) => RetrievalError::Api {
                status,
                body: response.into_string().unwrap_or_default(),
            },
            other => RetrievalError::Transport(other.to_string()),
        })
    }
}

impl RetrievalClient for HttpRetrievalClient {
    fn relevant_context(
        &self,
        query: &str,
        max_tokens: u32,
        options: &RetrievalOptions,
    ) -> Result<String, RetrievalError> {
        let body = ContextRequestBody {
            query,
            max_tokens,
            include_documents: options.include_documents,
            include_code: options.include_code,
            include_qa: options.include_qa,
            min_score: options.min_score,
        };
        let response = self.post("context", &body)?;
        let data: ContextData = response
            .into_json()
            .map_err(|err| RetrievalError::Decode(err.to_string()))?;
        Ok(data.context)
    }

    fn search(
        &self,
        query: &str,
        options: &RetrievalOptions,
    ) -> Result<Vec<SourceHit>, RetrievalError> {
        let body = SearchRequestBody {
            query,
            include_documents: options.include_documents,
            include_code: options.include_code,
            include_qa: options.include_qa,
            min_score: options.min_score,
        };
        let response = self.post("search", &body)?;
        let data: SearchData = response
            .into_json()
            .map_err(|err| RetrievalError::Decode(err.to_string()))?;
        Ok(data.results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::completion::ChatRole;

    #[test]
    fn request_body_sets_json_mode_and_stream_flags() {
        let messages = vec![ChatMessage::system("s"), ChatMessage::user("u")];
        let options = CompletionOptions {
            model: "o3-2025-04-16".to_string(),
            temperature: 0.2,
            max_tokens: 4096,
            json_mode: true,
        };
        let body = HttpCompletionClient::request_body(&messages, &options, true);
        let value = serde_json::to_value(&body).expect("serialize body");
        assert_eq!(value["response_format"]["type"], "json_object");
        assert_eq!(value["stream"], true);
        assert_eq!(value["messages"][0]["role"], "system");

        let plain = HttpCompletionClient::request_body(&messages, &options, false);
        let value = serde_json::to_value(&plain).expect("serialize body");
        assert!(value.get("stream").is_none());
    }

    #[test]
    fn stream_lines_yield_deltas_and_skip_markers() {
        let delta = parse_stream_line(
            r#"data: {"choices":[{"delta":{"content":"hel"}}]}"#,
        )
        .expect("parse delta");
        assert_eq!(delta.as_deref(), Some("hel"));

        assert!(parse_stream_line("data: [DONE]").expect("done").is_none());
        assert!(parse_stream_line("").expect("blank").is_none());
        assert!(parse_stream_line(": keep-alive").expect("comment").is_none());
        assert!(parse_stream_line("data: {not json}").is_err());
    }

    #[test]
    fn chat_message_constructors_set_roles() {
        assert_eq!(ChatMessage::system("x").role, ChatRole::System);
        assert_eq!(ChatMessage::user("x").role, ChatRole::User);
        assert_eq!(ChatMessage::assistant("x").role, ChatRole::Assistant);
    }
}
