pub mod answer;
pub mod critic;
pub mod prompts;
pub mod regenerate;
pub mod router;
pub mod writer;

pub use answer::{AnswerAgent, AnswerReply, CitedSource};
pub use critic::{CriticAgent, CritiqueReport, FixPriority, PriorityFix};
pub use regenerate::{RegenerateAgent, RegenerationOutcome};
pub use router::{ClassifiedIntent, QueryIntent, RoutedRequest, RouterAgent, RouterInput};
pub use writer::WriterAgent;

use crate::agent::AgentError;
use serde::de::DeserializeOwned;

/// Parses a model reply as JSON, attributing the failure to the agent that
/// asked for it.
pub(crate) fn parse_model_json<T: DeserializeOwned>(
    agent: &str,
    raw: &str,
) -> Result<T, AgentError> {
    serde_json::from_str(raw).map_err(|err| AgentError::Parse {
        agent: agent.to_string(),
        reason: err.to_string(),
    })
}
