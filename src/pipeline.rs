use crate::agent::Agent;
use crate::agents::prompts::{
    ANSWER_SYSTEM_PROMPT, CRITIC_SYSTEM_PROMPT, REGENERATE_SYSTEM_PROMPT, ROUTER_SYSTEM_PROMPT,
    WRITER_SYSTEM_PROMPT,
};
use crate::agents::{AnswerAgent, CriticAgent, RegenerateAgent, RouterAgent, WriterAgent};
use crate::config::Settings;
use crate::directory::AgentDirectory;
use crate::orchestration::{
    ExecutionLimits, Orchestrator, OrchestratorError, ORCHESTRATOR_AGENT_NAME,
};
use crate::provider::{CompletionClient, RetrievalClient};
use crate::shared::{new_id, EngineLog};
use std::sync::Arc;

pub const ROUTER_AGENT_NAME: &str = "router";
pub const ANSWER_AGENT_NAME: &str = "answer";
pub const REGENERATE_AGENT_NAME: &str = "regenerate";

/// The fully wired documentation pipeline: one directory, five registered
/// specialists plus the orchestrator's endpoint.
pub struct Pipeline {
    pub directory: AgentDirectory,
    pub orchestrator: Orchestrator,
}

/// Registers every specialist from settings and wires the orchestrator with
/// its injected dependencies. All agents share one session binding; each
/// workflow correlates its own traffic by step id.
pub fn build_pipeline(
    settings: &Settings,
    completion: Arc<dyn CompletionClient>,
    retrieval: Arc<dyn RetrievalClient>,
) -> Result<Pipeline, OrchestratorError> {
    settings.validate()?;
    let directory = AgentDirectory::new();
    let session_id = new_id("session");

    let specialists: Vec<Arc<dyn Agent>> = vec![
        Arc::new(WriterAgent::new(
            settings.agent_config(&settings.orchestration.writer_agent, WRITER_SYSTEM_PROMPT),
            Arc::clone(&completion),
            Arc::clone(&retrieval),
        )),
        Arc::new(CriticAgent::new(
            settings.agent_config(&settings.orchestration.critic_agent, CRITIC_SYSTEM_PROMPT),
            Arc::clone(&completion),
            Arc::clone(&retrieval),
        )),
        Arc::new(RouterAgent::new(
            settings.agent_config(ROUTER_AGENT_NAME, ROUTER_SYSTEM_PROMPT),
            Arc::clone(&completion),
            Arc::clone(&retrieval),
        )),
        Arc::new(AnswerAgent::new(
            settings.agent_config(ANSWER_AGENT_NAME, ANSWER_SYSTEM_PROMPT),
            Arc::clone(&completion),
            Arc::clone(&retrieval),
        )),
        Arc::new(RegenerateAgent::new(
            settings.agent_config(REGENERATE_AGENT_NAME, REGENERATE_SYSTEM_PROMPT),
            Arc::clone(&completion),
            Arc::clone(&retrieval),
        )),
    ];
    for specialist in specialists {
        specialist.initialize(&session_id, "")?;
        directory.register(specialist)?;
    }

    let orchestrator = Orchestrator::new(
        directory.clone(),
        settings.agent_config(ORCHESTRATOR_AGENT_NAME, ""),
        completion,
        retrieval,
        ExecutionLimits::from_settings(&settings.orchestration),
        EngineLog::new(settings.orchestration.log_root.clone()),
    )?
    .with_delegation_targets(
        settings.orchestration.writer_agent.clone(),
        settings.orchestration.critic_agent.clone(),
    );
    if let Some(endpoint) = directory.get(ORCHESTRATOR_AGENT_NAME) {
        endpoint.initialize(&session_id, "")?;
    }

    Ok(Pipeline {
        directory,
        orchestrator,
    })
}
