use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("retrieval request failed with status {status}: {body}")]
    Api { status: u16, body: String },
    #[error("retrieval transport failure: {0}")]
    Transport(String),
    #[error("retrieval response decode failure: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalOptions {
    pub include_documents: bool,
    pub include_code: bool,
    pub include_qa: bool,
    pub min_score: f64,
}

impl Default for RetrievalOptions {
    fn default() -> Self {
        Self {
            include_documents: true,
            include_code: true,
            include_qa: false,
            min_score: 0.4,
        }
    }
}

/// One pre-ranked source returned by the retrieval service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceHit {
    pub title: String,
    pub snippet: String,
    pub score: f64,
}

/// Retrieval collaborator. The service ranks and truncates; the core never
/// performs ranking or token budgeting itself.
pub trait RetrievalClient: Send + Sync {
    fn relevant_context(
        &self,
        query: &str,
        max_tokens: u32,
        options: &RetrievalOptions,
    ) -> Result<String, RetrievalError>;

    fn search(
        &self,
        query: &str,
        options: &RetrievalOptions,
    ) -> Result<Vec<SourceHit>, RetrievalError>;
}
