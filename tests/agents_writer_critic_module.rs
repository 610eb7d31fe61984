mod support;

use docpilot::message::AgentRequest;
use docpilot::{Agent, AgentError, CriticAgent, WriterAgent};
use std::sync::Arc;
use support::{
    agent_config, draft_reply, review_reply, sample_draft, sample_report, ScriptedCompletion,
    StaticRetrieval,
};

fn writer_with_replies(replies: Vec<String>) -> (WriterAgent, Arc<ScriptedCompletion>) {
    let completion = Arc::new(ScriptedCompletion::new(replies));
    let retrieval = Arc::new(StaticRetrieval::with_context(""));
    (
        WriterAgent::new(agent_config("writer"), completion.clone(), retrieval),
        completion,
    )
}

fn critic_with_replies(replies: Vec<String>) -> (CriticAgent, Arc<ScriptedCompletion>) {
    let completion = Arc::new(ScriptedCompletion::new(replies));
    let retrieval = Arc::new(StaticRetrieval::with_context(""));
    (
        CriticAgent::new(agent_config("critic"), completion.clone(), retrieval),
        completion,
    )
}

fn generate_request() -> AgentRequest {
    AgentRequest::GenerateDraft {
        python_code: "df = spark.table('raw.crm_visits')".to_string(),
        filename: "visit_summary.py".to_string(),
        context: "related pipeline docs".to_string(),
        excel_context: Some("sheet: monthly targets".to_string()),
        user_preferences: None,
    }
}

#[test]
fn writer_drafts_a_valid_document() {
    let (writer, completion) = writer_with_replies(vec![draft_reply("generated")]);
    let response = writer.handle(generate_request()).expect("draft");
    assert_eq!(
        response.as_draft().expect("draft payload").description,
        "generated"
    );

    let prompt = &completion.prompts()[0];
    assert!(prompt.contains("JSON FORMAT"));
    assert!(prompt.contains("visit_summary.py"));
    assert!(prompt.contains("related pipeline docs"));
    assert!(prompt.contains("sheet: monthly targets"));
}

#[test]
fn writer_rejects_unparseable_model_output() {
    let (writer, _) = writer_with_replies(vec!["not json at all".to_string()]);
    let err = writer.handle(generate_request()).expect_err("parse failure");
    assert!(matches!(err, AgentError::Parse { .. }));
}

#[test]
fn writer_rejects_contract_violations_without_coercing() {
    let mut draft = sample_draft("bad");
    draft.description = String::new();
    let reply = serde_json::to_string(&draft).expect("serialize");
    let (writer, _) = writer_with_replies(vec![reply]);
    let err = writer
        .handle(generate_request())
        .expect_err("validation failure");
    match &err {
        AgentError::Validation { agent, reason } => {
            assert_eq!(agent, "writer");
            assert!(reason.contains("description"));
        }
        other => panic!("expected validation error, got {other}"),
    }
}

#[test]
fn writer_refinement_requires_feedback_and_prior_draft() {
    let (writer, _) = writer_with_replies(vec![]);
    let err = writer
        .handle(AgentRequest::RefineDocumentation {
            previous_draft: None,
            feedback: None,
            python_code: "print(1)".to_string(),
            filename: "a.py".to_string(),
            context: String::new(),
        })
        .expect_err("missing inputs");
    assert!(matches!(err, AgentError::MissingInput { .. }));
}

#[test]
fn writer_refinement_feeds_feedback_into_the_prompt() {
    let (writer, completion) = writer_with_replies(vec![draft_reply("refined")]);
    let response = writer
        .handle(AgentRequest::RefineDocumentation {
            previous_draft: Some(sample_draft("previous")),
            feedback: Some(sample_report(true, 4.0)),
            python_code: "print(1)".to_string(),
            filename: "a.py".to_string(),
            context: String::new(),
        })
        .expect("refined draft");
    assert_eq!(response.as_draft().expect("draft").description, "refined");

    let prompt = &completion.prompts()[0];
    assert!(prompt.contains("previous"));
    assert!(prompt.contains("integrated rules skip the dedup step"));
}

#[test]
fn writer_declines_foreign_actions() {
    let (writer, _) = writer_with_replies(vec![]);
    let err = writer
        .handle(AgentRequest::ClassifyQuery {
            query: "q".to_string(),
        })
        .expect_err("not the writer's action");
    assert!(matches!(err, AgentError::UnsupportedAction { .. }));
    assert!(err.to_string().contains("classify_query"));
}

#[test]
fn writer_streams_tokens_and_still_validates() {
    let (writer, _) = writer_with_replies(vec![draft_reply("streamed")]);
    let mut tokens = Vec::new();
    let document = writer
        .stream_document("prompt".to_string(), &mut |token| {
            tokens.push(token.to_string());
        })
        .expect("streamed document");
    assert_eq!(document.description, "streamed");
    assert!(!tokens.is_empty());
}

#[test]
fn critic_reviews_both_review_actions() {
    let (critic, completion) =
        critic_with_replies(vec![review_reply(true, 4.0), review_reply(false, 9.0)]);
    let first = critic
        .handle(AgentRequest::ReviewDraft {
            draft: Some(sample_draft("draft")),
            filename: "a.py".to_string(),
        })
        .expect("review");
    assert!(first.as_review().expect("report").needs_improvement);

    let second = critic
        .handle(AgentRequest::FinalReview {
            draft: Some(sample_draft("draft")),
            filename: "a.py".to_string(),
        })
        .expect("final review");
    assert!(!second.as_review().expect("report").needs_improvement);
    assert_eq!(completion.call_count(), 2);
}

#[test]
fn critic_requires_a_draft() {
    let (critic, _) = critic_with_replies(vec![]);
    let err = critic
        .handle(AgentRequest::ReviewDraft {
            draft: None,
            filename: "a.py".to_string(),
        })
        .expect_err("no draft supplied");
    assert!(matches!(err, AgentError::MissingInput { .. }));
}

#[test]
fn critic_rejects_scores_outside_range() {
    let (critic, _) = critic_with_replies(vec![review_reply(false, 11.0)]);
    let err = critic
        .handle(AgentRequest::ReviewDraft {
            draft: Some(sample_draft("draft")),
            filename: "a.py".to_string(),
        })
        .expect_err("score out of range");
    match &err {
        AgentError::Validation { reason, .. } => assert!(reason.contains("overallScore")),
        other => panic!("expected validation error, got {other}"),
    }
}

#[test]
fn critic_rejects_illegal_priority_at_parse() {
    let reply = r#"{
        "overallScore": 6.0,
        "needsImprovement": true,
        "strengths": [],
        "weaknesses": ["w"],
        "suggestions": [],
        "specificIssues": {},
        "priorityFixes": [{"priority": "urgent", "description": "d"}]
    }"#;
    let (critic, _) = critic_with_replies(vec![reply.to_string()]);
    let err = critic
        .handle(AgentRequest::ReviewDraft {
            draft: Some(sample_draft("draft")),
            filename: "a.py".to_string(),
        })
        .expect_err("illegal priority");
    assert!(matches!(err, AgentError::Parse { .. }));
}
