use crate::agents::answer::AnswerReply;
use crate::agents::critic::CritiqueReport;
use crate::agents::regenerate::RegenerationOutcome;
use crate::agents::router::ClassifiedIntent;
use crate::document::DocumentDraft;
use crate::orchestration::progress::ProgressUpdate;
use crate::shared::{new_id, unix_timestamp};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Request,
    Response,
    Feedback,
    Status,
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageType::Request => write!(f, "request"),
            MessageType::Response => write!(f, "response"),
            MessageType::Feedback => write!(f, "feedback"),
            MessageType::Status => write!(f, "status"),
        }
    }
}

/// Step correlation travels here, never through message-id references. A
/// response that satisfies a workflow step carries the originating step id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageMetadata {
    #[serde(default)]
    pub workflow_id: Option<String>,
    #[serde(default)]
    pub step_id: Option<String>,
}

impl MessageMetadata {
    pub fn for_step(workflow_id: &str, step_id: &str) -> Self {
        Self {
            workflow_id: Some(workflow_id.to_string()),
            step_id: Some(step_id.to_string()),
        }
    }
}

/// Every request an agent can receive, tagged by action. Handlers match this
/// enum exhaustively; an action outside an agent's contract is an
/// `UnsupportedAction` error, not a silent ignore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AgentRequest {
    RetrieveRelevantContext {
        query: String,
    },
    GenerateDraft {
        python_code: String,
        filename: String,
        #[serde(default)]
        context: String,
        #[serde(default)]
        excel_context: Option<String>,
        #[serde(default)]
        user_preferences: Option<Map<String, Value>>,
    },
    ReviewDraft {
        #[serde(default)]
        draft: Option<DocumentDraft>,
        filename: String,
    },
    RefineDocumentation {
        #[serde(default)]
        previous_draft: Option<DocumentDraft>,
        #[serde(default)]
        feedback: Option<CritiqueReport>,
        python_code: String,
        filename: String,
        #[serde(default)]
        context: String,
    },
    FinalReview {
        #[serde(default)]
        draft: Option<DocumentDraft>,
        filename: String,
    },
    ClassifyQuery {
        query: String,
    },
    AnswerQuestion {
        question: String,
        #[serde(default)]
        context: Option<String>,
        #[serde(default)]
        entities: Vec<String>,
    },
    RegenerateDocumentation {
        #[serde(default)]
        existing_document: Option<DocumentDraft>,
        user_feedback: String,
        #[serde(default)]
        context: Option<String>,
        #[serde(default)]
        entities: Vec<String>,
    },
}

impl AgentRequest {
    pub fn action(&self) -> &'static str {
        match self {
            AgentRequest::RetrieveRelevantContext { .. } => "retrieve_relevant_context",
            AgentRequest::GenerateDraft { .. } => "generate_draft",
            AgentRequest::ReviewDraft { .. } => "review_draft",
            AgentRequest::RefineDocumentation { .. } => "refine_documentation",
            AgentRequest::FinalReview { .. } => "final_review",
            AgentRequest::ClassifyQuery { .. } => "classify_query",
            AgentRequest::AnswerQuestion { .. } => "answer_question",
            AgentRequest::RegenerateDocumentation { .. } => "regenerate_documentation",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AgentResponse {
    Context { content: String },
    Draft { document: DocumentDraft },
    Review { report: CritiqueReport },
    Classification { intent: ClassifiedIntent },
    Answer { reply: AnswerReply },
    Regeneration { outcome: RegenerationOutcome },
}

impl AgentResponse {
    pub fn kind(&self) -> &'static str {
        match self {
            AgentResponse::Context { .. } => "context",
            AgentResponse::Draft { .. } => "draft",
            AgentResponse::Review { .. } => "review",
            AgentResponse::Classification { .. } => "classification",
            AgentResponse::Answer { .. } => "answer",
            AgentResponse::Regeneration { .. } => "regeneration",
        }
    }

    pub fn as_draft(&self) -> Option<&DocumentDraft> {
        match self {
            AgentResponse::Draft { document } => Some(document),
            _ => None,
        }
    }

    pub fn as_review(&self) -> Option<&CritiqueReport> {
        match self {
            AgentResponse::Review { report } => Some(report),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessagePayload {
    Request(AgentRequest),
    Response(AgentResponse),
    Status(ProgressUpdate),
    Feedback(CritiqueReport),
}

impl MessagePayload {
    pub fn message_type(&self) -> MessageType {
        match self {
            MessagePayload::Request(_) => MessageType::Request,
            MessagePayload::Response(_) => MessageType::Response,
            MessagePayload::Status(_) => MessageType::Status,
            MessagePayload::Feedback(_) => MessageType::Feedback,
        }
    }
}

/// Immutable envelope exchanged between agents. `message_type` is derived
/// from the payload at construction so the two can never disagree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub from: String,
    pub to: String,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub content: MessagePayload,
    pub timestamp: i64,
    #[serde(default)]
    pub metadata: MessageMetadata,
}

impl Message {
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        content: MessagePayload,
        metadata: MessageMetadata,
    ) -> Self {
        Self {
            id: new_id("msg"),
            from: from.into(),
            to: to.into(),
            message_type: content.message_type(),
            content,
            timestamp: unix_timestamp(),
            metadata,
        }
    }

    pub fn request(
        from: impl Into<String>,
        to: impl Into<String>,
        request: AgentRequest,
        metadata: MessageMetadata,
    ) -> Self {
        Self::new(from, to, MessagePayload::Request(request), metadata)
    }

    pub fn response(
        from: impl Into<String>,
        to: impl Into<String>,
        response: AgentResponse,
        metadata: MessageMetadata,
    ) -> Self {
        Self::new(from, to, MessagePayload::Response(response), metadata)
    }

    pub fn status(
        from: impl Into<String>,
        to: impl Into<String>,
        update: ProgressUpdate,
        metadata: MessageMetadata,
    ) -> Self {
        Self::new(from, to, MessagePayload::Status(update), metadata)
    }

    pub fn satisfies_step(&self, step_id: &str) -> bool {
        self.message_type == MessageType::Response
            && self.metadata.step_id.as_deref() == Some(step_id)
    }
}
