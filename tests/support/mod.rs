#![allow(dead_code)]

use docpilot::agent::{AgentConfig, RetrievalAugmentation};
use docpilot::agents::{CritiqueReport, FixPriority, PriorityFix};
use docpilot::directory::AgentDirectory;
use docpilot::document::{ColumnSpec, DocumentDraft, OutputTable, TableMetadata};
use docpilot::orchestration::{ExecutionLimits, Orchestrator};
use docpilot::provider::{
    ChatMessage, CompletionClient, CompletionError, CompletionOptions, RetrievalClient,
    RetrievalError, RetrievalOptions, SourceHit,
};
use docpilot::shared::EngineLog;
use docpilot::{Agent, CriticAgent, WriterAgent};
use serde_json::Map;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Replays canned model replies in order and records every prompt it saw.
pub struct ScriptedCompletion {
    replies: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedCompletion {
    pub fn new(replies: Vec<String>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().expect("prompts poisoned").len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompts poisoned").clone()
    }
}

impl CompletionClient for ScriptedCompletion {
    fn generate(
        &self,
        messages: &[ChatMessage],
        _options: &CompletionOptions,
    ) -> Result<String, CompletionError> {
        let prompt = messages
            .last()
            .map(|message| message.content.clone())
            .unwrap_or_default();
        self.prompts.lock().expect("prompts poisoned").push(prompt);
        self.replies
            .lock()
            .expect("replies poisoned")
            .pop_front()
            .ok_or_else(|| CompletionError::Transport("no scripted reply left".to_string()))
    }

    fn generate_streaming(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
        on_token: &mut dyn FnMut(&str),
    ) -> Result<String, CompletionError> {
        let reply = self.generate(messages, options)?;
        on_token(&reply);
        Ok(reply)
    }
}

/// Fixed context blob and ranked hits.
pub struct StaticRetrieval {
    pub context: String,
    pub hits: Vec<SourceHit>,
}

impl StaticRetrieval {
    pub fn with_context(context: &str) -> Self {
        Self {
            context: context.to_string(),
            hits: Vec::new(),
        }
    }

    pub fn with_hits(hits: Vec<SourceHit>) -> Self {
        Self {
            context: String::new(),
            hits,
        }
    }
}

impl RetrievalClient for StaticRetrieval {
    fn relevant_context(
        &self,
        _query: &str,
        _max_tokens: u32,
        _options: &RetrievalOptions,
    ) -> Result<String, RetrievalError> {
        Ok(self.context.clone())
    }

    fn search(
        &self,
        _query: &str,
        _options: &RetrievalOptions,
    ) -> Result<Vec<SourceHit>, RetrievalError> {
        Ok(self.hits.clone())
    }
}

pub fn agent_config(name: &str) -> AgentConfig {
    AgentConfig {
        name: name.to_string(),
        system_prompt: format!("{name} system prompt"),
        model: "test-model".to_string(),
        temperature: 0.0,
        max_tokens: 512,
        retrieval: RetrievalAugmentation::default(),
    }
}

pub fn rag_enabled_config(name: &str) -> AgentConfig {
    AgentConfig {
        retrieval: RetrievalAugmentation {
            enabled: true,
            ..RetrievalAugmentation::default()
        },
        ..agent_config(name)
    }
}

pub fn sample_draft(description: &str) -> DocumentDraft {
    DocumentDraft {
        description: description.to_string(),
        table_grain: "one row per account_id and visit_month".to_string(),
        data_sources: vec!["raw.crm_visits".to_string()],
        databricks_tables: vec![OutputTable {
            table_name: "gold.visit_summary".to_string(),
            description: "Monthly visit rollup".to_string(),
        }],
        table_metadata: vec![TableMetadata {
            table_name: "gold.visit_summary".to_string(),
            columns: vec![ColumnSpec {
                column_name: "account_id".to_string(),
                data_type: "string".to_string(),
                description: "CRM account key".to_string(),
                sample_values: "A-1001".to_string(),
                source_table: "raw.accounts".to_string(),
                source_column: "id".to_string(),
            }],
        }],
        integrated_rules: vec!["Visits are deduplicated by (account_id, date)".to_string()],
    }
}

pub fn draft_reply(description: &str) -> String {
    serde_json::to_string(&sample_draft(description)).expect("serialize draft")
}

pub fn sample_report(needs_improvement: bool, score: f64) -> CritiqueReport {
    CritiqueReport {
        overall_score: score,
        needs_improvement,
        strengths: vec!["grain is explicit".to_string()],
        weaknesses: if needs_improvement {
            vec!["integrated rules skip the dedup step".to_string()]
        } else {
            vec![]
        },
        suggestions: vec![],
        specific_issues: Map::new(),
        priority_fixes: vec![PriorityFix {
            priority: FixPriority::Medium,
            description: "spell out the dedup rule".to_string(),
        }],
    }
}

pub fn review_reply(needs_improvement: bool, score: f64) -> String {
    serde_json::to_string(&sample_report(needs_improvement, score)).expect("serialize report")
}

/// A registered agent that logs inbound traffic and never replies, so a
/// delegated step waits out its full response timeout.
pub struct SilentAgent {
    core: docpilot::AgentCore,
}

impl SilentAgent {
    pub fn new(
        name: &str,
        completion: Arc<dyn CompletionClient>,
        retrieval: Arc<dyn RetrievalClient>,
    ) -> Self {
        Self {
            core: docpilot::AgentCore::new(agent_config(name), completion, retrieval),
        }
    }
}

impl Agent for SilentAgent {
    fn core(&self) -> &docpilot::AgentCore {
        &self.core
    }

    fn handle(
        &self,
        request: docpilot::AgentRequest,
    ) -> Result<docpilot::AgentResponse, docpilot::AgentError> {
        Err(docpilot::AgentError::UnsupportedAction {
            agent: self.name().to_string(),
            action: request.action().to_string(),
        })
    }

    fn receive_message(
        &self,
        message: docpilot::Message,
    ) -> Result<Option<docpilot::Message>, docpilot::AgentError> {
        self.core.record_incoming(&message);
        Ok(None)
    }
}

pub struct ScriptedPipeline {
    pub directory: AgentDirectory,
    pub orchestrator: Orchestrator,
    pub completion: Arc<ScriptedCompletion>,
}

/// Writer + critic wired against scripted completions, orchestrator with
/// retrieval-augmented context lookup.
pub fn scripted_pipeline(replies: Vec<String>, limits: ExecutionLimits) -> ScriptedPipeline {
    let completion = Arc::new(ScriptedCompletion::new(replies));
    let retrieval = Arc::new(StaticRetrieval::with_context(
        "prior documentation for related pipelines",
    ));
    let directory = AgentDirectory::new();
    directory
        .register(Arc::new(WriterAgent::new(
            agent_config("writer"),
            completion.clone(),
            retrieval.clone(),
        )))
        .expect("register writer");
    directory
        .register(Arc::new(CriticAgent::new(
            agent_config("critic"),
            completion.clone(),
            retrieval.clone(),
        )))
        .expect("register critic");
    let orchestrator = Orchestrator::new(
        directory.clone(),
        rag_enabled_config("orchestrator"),
        completion.clone(),
        retrieval,
        limits,
        EngineLog::default(),
    )
    .expect("orchestrator");
    ScriptedPipeline {
        directory,
        orchestrator,
        completion,
    }
}
