mod support;

use docpilot::agents::answer::NO_SOURCE_CONFIDENCE;
use docpilot::message::AgentRequest;
use docpilot::provider::SourceHit;
use docpilot::{Agent, AgentError, AnswerAgent, RegenerateAgent};
use serde_json::json;
use std::sync::Arc;
use support::{
    agent_config, draft_reply, rag_enabled_config, sample_draft, ScriptedCompletion,
    StaticRetrieval,
};

fn answer_agent(
    replies: Vec<String>,
    hits: Vec<SourceHit>,
) -> (AnswerAgent, Arc<ScriptedCompletion>) {
    let completion = Arc::new(ScriptedCompletion::new(replies));
    let retrieval = Arc::new(StaticRetrieval::with_hits(hits));
    (
        AnswerAgent::new(rag_enabled_config("answer"), completion.clone(), retrieval),
        completion,
    )
}

fn regenerate_agent(replies: Vec<String>) -> (RegenerateAgent, Arc<ScriptedCompletion>) {
    let completion = Arc::new(ScriptedCompletion::new(replies));
    let retrieval = Arc::new(StaticRetrieval::with_context(""));
    (
        RegenerateAgent::new(agent_config("regenerate"), completion.clone(), retrieval),
        completion,
    )
}

fn hit(title: &str, score: f64) -> SourceHit {
    SourceHit {
        title: title.to_string(),
        snippet: format!("{title} snippet"),
        score,
    }
}

#[test]
fn zero_sources_short_circuits_without_a_model_call() {
    let (agent, completion) = answer_agent(vec![], vec![]);
    let response = agent
        .handle(AgentRequest::AnswerQuestion {
            question: "what feeds gold.visit_summary?".to_string(),
            context: None,
            entities: vec![],
        })
        .expect("clarification reply");
    let reply = match response {
        docpilot::AgentResponse::Answer { reply } => reply,
        other => panic!("expected answer, got {}", other.kind()),
    };
    assert_eq!(reply.confidence, NO_SOURCE_CONFIDENCE);
    assert!(reply.sources.is_empty());
    assert!(!reply.clarifying_questions.is_empty());
    assert_eq!(completion.call_count(), 0);
}

#[test]
fn answers_cite_the_ranked_sources() {
    let reply = json!({
        "answer": "gold.visit_summary is fed by raw.crm_visits [1].",
        "confidence": 0.84,
        "followUpSuggestions": ["ask about the dedup rule"],
        "clarifyingQuestions": []
    });
    let (agent, completion) = answer_agent(
        vec![reply.to_string()],
        vec![hit("visit_summary docs", 0.92), hit("crm ingestion docs", 0.71)],
    );
    let response = agent
        .handle(AgentRequest::AnswerQuestion {
            question: "what feeds gold.visit_summary?".to_string(),
            context: Some("user is auditing lineage".to_string()),
            entities: vec!["gold.visit_summary".to_string()],
        })
        .expect("grounded answer");
    let reply = match response {
        docpilot::AgentResponse::Answer { reply } => reply,
        other => panic!("expected answer, got {}", other.kind()),
    };
    assert_eq!(reply.sources.len(), 2);
    assert_eq!(reply.sources[0].title, "visit_summary docs");
    assert_eq!(reply.confidence, 0.84);

    let prompt = &completion.prompts()[0];
    assert!(prompt.contains("[1] visit_summary docs"));
    assert!(prompt.contains("user is auditing lineage"));
    assert!(prompt.contains("gold.visit_summary"));
}

#[test]
fn answer_confidence_outside_unit_interval_rejects() {
    let reply = json!({
        "answer": "a",
        "confidence": 1.4,
        "followUpSuggestions": [],
        "clarifyingQuestions": []
    });
    let (agent, _) = answer_agent(vec![reply.to_string()], vec![hit("doc", 0.9)]);
    let err = agent
        .handle(AgentRequest::AnswerQuestion {
            question: "q".to_string(),
            context: None,
            entities: vec![],
        })
        .expect_err("confidence out of range");
    assert!(matches!(err, AgentError::Validation { .. }));
}

#[test]
fn regenerate_gates_on_the_existing_document() {
    let (agent, completion) = regenerate_agent(vec![]);
    let response = agent
        .handle(AgentRequest::RegenerateDocumentation {
            existing_document: None,
            user_feedback: "fix the grain section".to_string(),
            context: None,
            entities: vec![],
        })
        .expect("capability gate");
    let outcome = match response {
        docpilot::AgentResponse::Regeneration { outcome } => outcome,
        other => panic!("expected regeneration, got {}", other.kind()),
    };
    assert!(!outcome.success);
    assert!(outcome.requires_file_upload);
    assert!(outcome.document.is_none());
    assert_eq!(completion.call_count(), 0);
}

#[test]
fn regenerate_applies_feedback_when_the_model_cooperates() {
    let (agent, completion) = regenerate_agent(vec![draft_reply("revised per feedback")]);
    let response = agent
        .handle(AgentRequest::RegenerateDocumentation {
            existing_document: Some(sample_draft("original")),
            user_feedback: "fix the grain section".to_string(),
            context: Some("thread about lineage".to_string()),
            entities: vec!["gold.visit_summary".to_string()],
        })
        .expect("revised document");
    let outcome = match response {
        docpilot::AgentResponse::Regeneration { outcome } => outcome,
        other => panic!("expected regeneration, got {}", other.kind()),
    };
    assert!(outcome.success);
    assert_eq!(
        outcome.document.expect("document").description,
        "revised per feedback"
    );
    assert!(outcome.improvement_note.is_none());

    let prompt = &completion.prompts()[0];
    assert!(prompt.contains("original"));
    assert!(prompt.contains("fix the grain section"));
    assert!(prompt.contains("thread about lineage"));
}

#[test]
fn regenerate_falls_back_to_the_prior_document_on_parse_failure() {
    let (agent, _) = regenerate_agent(vec!["``` not json ```".to_string()]);
    let response = agent
        .handle(AgentRequest::RegenerateDocumentation {
            existing_document: Some(sample_draft("original")),
            user_feedback: "fix the grain section".to_string(),
            context: None,
            entities: vec![],
        })
        .expect("fallback instead of failure");
    let outcome = match response {
        docpilot::AgentResponse::Regeneration { outcome } => outcome,
        other => panic!("expected regeneration, got {}", other.kind()),
    };
    assert!(outcome.success);
    assert_eq!(outcome.document.expect("document").description, "original");
    let note = outcome.improvement_note.expect("note recorded");
    assert!(note.contains("fix the grain section"));
}

#[test]
fn regenerate_still_fails_on_contract_violations() {
    let mut bad = sample_draft("revised");
    bad.table_grain = String::new();
    let (agent, _) = regenerate_agent(vec![serde_json::to_string(&bad).expect("serialize")]);
    let err = agent
        .handle(AgentRequest::RegenerateDocumentation {
            existing_document: Some(sample_draft("original")),
            user_feedback: "feedback".to_string(),
            context: None,
            entities: vec![],
        })
        .expect_err("validation is not the fallback path");
    assert!(matches!(err, AgentError::Validation { .. }));
}
