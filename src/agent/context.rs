use crate::message::Message;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Per-session mutable state. Owned exclusively by the agent instance it
/// belongs to — agents exchange data through the directory, never by reading
/// another agent's context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentContext {
    pub session_id: String,
    pub task_id: String,
    /// Append-only ordered log of every message seen by this instance.
    #[serde(default)]
    pub message_log: Vec<Message>,
    /// Free-form scratch space.
    #[serde(default)]
    pub shared_state: BTreeMap<String, Value>,
}

impl AgentContext {
    pub fn new(session_id: impl Into<String>, task_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            task_id: task_id.into(),
            message_log: Vec::new(),
            shared_state: BTreeMap::new(),
        }
    }
}
