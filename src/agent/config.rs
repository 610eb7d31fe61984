use crate::provider::RetrievalOptions;
use serde::{Deserialize, Serialize};

/// Static per-instance configuration. Built once when the pipeline is wired;
/// `name` is the agent's unique key in the directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentConfig {
    pub name: String,
    pub system_prompt: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    #[serde(default)]
    pub retrieval: RetrievalAugmentation,
}

/// Retrieval-augmentation flags: whether the agent grounds its prompts in
/// retrieved context, and the per-call options forwarded to the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalAugmentation {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub include_documents: bool,
    #[serde(default = "default_true")]
    pub include_code: bool,
    #[serde(default)]
    pub include_qa: bool,
    #[serde(default = "default_min_score")]
    pub min_score: f64,
    #[serde(default = "default_max_context_tokens")]
    pub max_context_tokens: u32,
}

fn default_true() -> bool {
    true
}

fn default_min_score() -> f64 {
    0.4
}

fn default_max_context_tokens() -> u32 {
    2000
}

impl Default for RetrievalAugmentation {
    fn default() -> Self {
        Self {
            enabled: false,
            include_documents: true,
            include_code: true,
            include_qa: false,
            min_score: default_min_score(),
            max_context_tokens: default_max_context_tokens(),
        }
    }
}

impl From<&RetrievalAugmentation> for RetrievalOptions {
    fn from(value: &RetrievalAugmentation) -> Self {
        Self {
            include_documents: value.include_documents,
            include_code: value.include_code,
            include_qa: value.include_qa,
            min_score: value.min_score,
        }
    }
}
