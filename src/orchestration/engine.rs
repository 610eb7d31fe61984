use crate::agent::{Agent, AgentConfig, AgentCore, AgentError};
use crate::agents::critic::CritiqueReport;
use crate::config::OrchestrationSettings;
use crate::directory::AgentDirectory;
use crate::document::DocumentDraft;
use crate::message::{
    AgentRequest, AgentResponse, Message, MessageMetadata, MessagePayload,
};
use crate::orchestration::error::OrchestratorError;
use crate::orchestration::progress::{ProgressBroadcaster, ProgressUpdate};
use crate::orchestration::workflow::{
    DocumentationTask, StepStatus, WorkflowDefinition, WorkflowMetadata, WorkflowStatus,
    WorkflowStep,
};
use crate::provider::{CompletionClient, RetrievalClient};
use crate::shared::{new_id, unix_timestamp, EngineLog};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const ORCHESTRATOR_AGENT_NAME: &str = "orchestrator";

/// Status messages are appended to the orchestrator's own log under this
/// recipient; they are observed through the progress subscription, not
/// routed.
const PROGRESS_RECIPIENT: &str = "caller";

const ACTION_GENERATE_DRAFT: &str = "generate_draft";
const ACTION_REVIEW_DRAFT: &str = "review_draft";
const ACTION_REFINE_DOCUMENTATION: &str = "refine_documentation";
const ACTION_FINAL_REVIEW: &str = "final_review";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionLimits {
    pub max_iterations: u32,
    pub response_timeout: Duration,
    pub max_step_retries: u32,
    pub max_retained_workflows: usize,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            max_iterations: 3,
            response_timeout: Duration::from_secs(30),
            max_step_retries: 0,
            max_retained_workflows: 256,
        }
    }
}

impl ExecutionLimits {
    pub fn from_settings(settings: &OrchestrationSettings) -> Self {
        Self {
            max_iterations: settings.max_iterations,
            response_timeout: Duration::from_secs(settings.response_timeout_seconds),
            max_step_retries: settings.max_step_retries,
            max_retained_workflows: settings.max_retained_workflows,
        }
    }
}

/// The orchestrator's registered mailbox. Responses and status traffic land
/// in its context log; the only request it serves is local context
/// retrieval.
pub struct OrchestratorEndpoint {
    core: AgentCore,
}

impl Agent for OrchestratorEndpoint {
    fn core(&self) -> &AgentCore {
        &self.core
    }

    fn handle(&self, request: AgentRequest) -> Result<AgentResponse, AgentError> {
        match request {
            AgentRequest::RetrieveRelevantContext { query } => Ok(AgentResponse::Context {
                content: self.core.rag_context(&query)?,
            }),
            other => Err(AgentError::UnsupportedAction {
                agent: self.name().to_string(),
                action: other.action().to_string(),
            }),
        }
    }
}

struct PreparedStep {
    index: usize,
    step_id: String,
    agent: String,
    action: String,
    request: AgentRequest,
    progress: f64,
}

/// Builds the fixed five-step documentation pipeline and drives it, looping
/// back from review feedback until the critic passes the draft or the
/// iteration budget clamps. Sole mutator of every workflow it creates.
pub struct Orchestrator {
    directory: AgentDirectory,
    endpoint: Arc<OrchestratorEndpoint>,
    limits: ExecutionLimits,
    writer_agent: String,
    critic_agent: String,
    workflows: Mutex<BTreeMap<String, WorkflowDefinition>>,
    active: Mutex<BTreeSet<String>>,
    /// Terminal workflows in the order they finished; the front is evicted
    /// first once the retention cap is exceeded.
    terminal_order: Mutex<Vec<String>>,
    progress: ProgressBroadcaster,
    engine_log: EngineLog,
}

impl Orchestrator {
    pub fn new(
        directory: AgentDirectory,
        mut config: AgentConfig,
        completion: Arc<dyn CompletionClient>,
        retrieval: Arc<dyn RetrievalClient>,
        limits: ExecutionLimits,
        engine_log: EngineLog,
    ) -> Result<Self, OrchestratorError> {
        config.name = ORCHESTRATOR_AGENT_NAME.to_string();
        let endpoint = Arc::new(OrchestratorEndpoint {
            core: AgentCore::new(config, completion, retrieval),
        });
        directory.register(endpoint.clone())?;
        Ok(Self {
            directory,
            endpoint,
            limits,
            writer_agent: crate::config::DEFAULT_WRITER_AGENT.to_string(),
            critic_agent: crate::config::DEFAULT_CRITIC_AGENT.to_string(),
            workflows: Mutex::new(BTreeMap::new()),
            active: Mutex::new(BTreeSet::new()),
            terminal_order: Mutex::new(Vec::new()),
            progress: ProgressBroadcaster::new(),
            engine_log,
        })
    }

    /// Names of the agents the delegated steps are addressed to.
    pub fn with_delegation_targets(
        mut self,
        writer_agent: impl Into<String>,
        critic_agent: impl Into<String>,
    ) -> Self {
        self.writer_agent = writer_agent.into();
        self.critic_agent = critic_agent.into();
        self
    }

    pub fn on_progress(&self, callback: impl Fn(&ProgressUpdate) + Send + Sync + 'static) {
        self.progress.subscribe(callback);
    }

    pub fn limits(&self) -> ExecutionLimits {
        self.limits
    }

    /// The orchestrator's own message log: outgoing requests, incoming
    /// responses and the status messages emitted per step.
    pub fn message_log(&self) -> Vec<Message> {
        self.endpoint.core().message_log_snapshot()
    }

    pub fn create_workflow(&self, task: &DocumentationTask) -> String {
        let workflow_id = new_id("wf");
        let query = format!(
            "Data pipeline documentation conventions and prior documentation relevant to {}",
            task.filename
        );
        let steps = vec![
            WorkflowStep::new(
                step_id(&workflow_id, 1, "retrieve_context"),
                ORCHESTRATOR_AGENT_NAME,
                AgentRequest::RetrieveRelevantContext { query },
            ),
            WorkflowStep::new(
                step_id(&workflow_id, 2, ACTION_GENERATE_DRAFT),
                self.writer_agent.clone(),
                AgentRequest::GenerateDraft {
                    python_code: task.python_code.clone(),
                    filename: task.filename.clone(),
                    context: String::new(),
                    excel_context: task.excel_context.clone(),
                    user_preferences: task.user_preferences.clone(),
                },
            ),
            WorkflowStep::new(
                step_id(&workflow_id, 3, ACTION_REVIEW_DRAFT),
                self.critic_agent.clone(),
                AgentRequest::ReviewDraft {
                    draft: None,
                    filename: task.filename.clone(),
                },
            ),
            WorkflowStep::new(
                step_id(&workflow_id, 4, ACTION_REFINE_DOCUMENTATION),
                self.writer_agent.clone(),
                AgentRequest::RefineDocumentation {
                    previous_draft: None,
                    feedback: None,
                    python_code: task.python_code.clone(),
                    filename: task.filename.clone(),
                    context: String::new(),
                },
            ),
            WorkflowStep::new(
                step_id(&workflow_id, 5, ACTION_FINAL_REVIEW),
                self.critic_agent.clone(),
                AgentRequest::FinalReview {
                    draft: None,
                    filename: task.filename.clone(),
                },
            ),
        ];
        let workflow = WorkflowDefinition {
            id: workflow_id.clone(),
            name: "documentation_pipeline".to_string(),
            description: format!(
                "Generate and iteratively refine documentation for {}",
                task.filename
            ),
            steps,
            current_step: 0,
            status: WorkflowStatus::Pending,
            metadata: WorkflowMetadata {
                filename: task.filename.clone(),
                start_time: unix_timestamp(),
                max_iterations: self.limits.max_iterations,
                current_iteration: 1,
            },
        };
        self.workflows
            .lock()
            .expect("workflow map poisoned")
            .insert(workflow_id.clone(), workflow);
        self.active
            .lock()
            .expect("active set poisoned")
            .insert(workflow_id.clone());
        workflow_id
    }

    pub fn execute(&self, task: &DocumentationTask) -> Result<AgentResponse, OrchestratorError> {
        let workflow_id = self.create_workflow(task);
        self.execute_workflow(&workflow_id)
    }

    pub fn execute_workflow(
        &self,
        workflow_id: &str,
    ) -> Result<AgentResponse, OrchestratorError> {
        self.begin_workflow(workflow_id)?;
        self.log_line(
            unix_timestamp(),
            format!("workflow_id={workflow_id} decision=start state=in_progress"),
        )?;

        let mut iteration_count: u32 = 0;
        let mut retries_used: BTreeMap<usize, u32> = BTreeMap::new();
        let mut context_blob: Option<String> = None;
        let mut current_draft: Option<DocumentDraft> = None;
        let mut last_output: Option<AgentResponse> = None;

        loop {
            if iteration_count >= self.limits.max_iterations {
                break;
            }
            let Some(prepared) =
                self.prepare_next_step(workflow_id, context_blob.as_deref(), current_draft.as_ref())?
            else {
                break;
            };

            match self.execute_step(workflow_id, &prepared) {
                Ok(response) => {
                    match &response {
                        AgentResponse::Context { content } => {
                            context_blob = Some(content.clone());
                        }
                        AgentResponse::Draft { document } => {
                            current_draft = Some(document.clone());
                        }
                        _ => {}
                    }
                    last_output = Some(response.clone());
                    self.apply_step_success(
                        workflow_id,
                        &prepared,
                        response,
                        current_draft.as_ref(),
                        &mut iteration_count,
                    )?;
                }
                Err(err) => {
                    let retry =
                        self.apply_step_failure(workflow_id, &prepared, &err, &mut retries_used)?;
                    if retry {
                        continue;
                    }
                    self.finish_workflow(workflow_id, WorkflowStatus::Failed)?;
                    return Err(err);
                }
            }
        }

        self.finish_workflow(workflow_id, WorkflowStatus::Completed)?;
        self.log_line(
            unix_timestamp(),
            format!("workflow_id={workflow_id} decision=finish state=completed"),
        )?;
        last_output.ok_or_else(|| OrchestratorError::MissingTerminalOutput {
            workflow_id: workflow_id.to_string(),
        })
    }

    pub fn get_workflow_status(&self, workflow_id: &str) -> Option<WorkflowDefinition> {
        self.workflows
            .lock()
            .expect("workflow map poisoned")
            .get(workflow_id)
            .cloned()
    }

    pub fn get_active_workflows(&self) -> Vec<String> {
        self.active
            .lock()
            .expect("active set poisoned")
            .iter()
            .cloned()
            .collect()
    }

    /// Cooperative cancellation: marks the workflow failed and removes it
    /// from the active set. An in-flight response wait is not interrupted;
    /// it runs to its own timeout.
    pub fn cancel_workflow(&self, workflow_id: &str) -> Result<(), OrchestratorError> {
        {
            let mut workflows = self.workflows.lock().expect("workflow map poisoned");
            let workflow =
                workflows
                    .get_mut(workflow_id)
                    .ok_or_else(|| OrchestratorError::UnknownWorkflow {
                        workflow_id: workflow_id.to_string(),
                    })?;
            if !workflow.status.is_terminal() {
                workflow.status = WorkflowStatus::Failed;
            }
        }
        self.active
            .lock()
            .expect("active set poisoned")
            .remove(workflow_id);
        self.mark_terminal(workflow_id);
        self.prune_retained();
        Ok(())
    }

    fn prepare_next_step(
        &self,
        workflow_id: &str,
        context_blob: Option<&str>,
        current_draft: Option<&DocumentDraft>,
    ) -> Result<Option<PreparedStep>, OrchestratorError> {
        let mut workflows = self.workflows.lock().expect("workflow map poisoned");
        let workflow =
            workflows
                .get_mut(workflow_id)
                .ok_or_else(|| OrchestratorError::UnknownWorkflow {
                    workflow_id: workflow_id.to_string(),
                })?;
        if workflow.status == WorkflowStatus::Failed {
            return Err(OrchestratorError::Cancelled {
                workflow_id: workflow_id.to_string(),
            });
        }
        if workflow.at_terminal_position() {
            return Ok(None);
        }

        let index = workflow.current_step;
        let total = workflow.steps.len();
        let step = &mut workflow.steps[index];
        match &mut step.input {
            AgentRequest::GenerateDraft { context, .. }
            | AgentRequest::RefineDocumentation { context, .. } => {
                if let Some(blob) = context_blob {
                    *context = blob.to_string();
                }
            }
            AgentRequest::ReviewDraft { draft, .. } | AgentRequest::FinalReview { draft, .. } => {
                *draft = current_draft.cloned();
            }
            _ => {}
        }
        transition_step(step, StepStatus::InProgress)?;
        step.timestamp = Some(unix_timestamp());
        let prepared = PreparedStep {
            index,
            step_id: step.id.clone(),
            agent: step.agent.clone(),
            action: step.action.clone(),
            request: step.input.clone(),
            progress: (index + 1) as f64 / total as f64,
        };
        debug_assert_eq!(workflow.in_progress_count(), 1);
        Ok(Some(prepared))
    }

    fn execute_step(
        &self,
        workflow_id: &str,
        prepared: &PreparedStep,
    ) -> Result<AgentResponse, OrchestratorError> {
        self.emit_progress(&ProgressUpdate {
            workflow_id: workflow_id.to_string(),
            step_id: prepared.step_id.clone(),
            status: StepStatus::InProgress,
            progress: prepared.progress,
        });
        self.log_line(
            unix_timestamp(),
            format!(
                "workflow_id={workflow_id} step_id={} agent={} action={} decision=execute",
                prepared.step_id, prepared.agent, prepared.action
            ),
        )?;

        if prepared.agent == ORCHESTRATOR_AGENT_NAME {
            return self.execute_local_step(prepared);
        }

        let receiver = self.directory.register_step_waiter(&prepared.step_id);
        let message = self.endpoint.core().compose_message(
            &prepared.agent,
            MessagePayload::Request(prepared.request.clone()),
            MessageMetadata::for_step(workflow_id, &prepared.step_id),
        );
        if let Err(err) = self.directory.route_message(message) {
            self.directory.clear_step_waiter(&prepared.step_id);
            // Specialist failures bubble unchanged; only routing failures
            // are the directory's own.
            return Err(match err {
                crate::directory::DirectoryError::Agent(agent_err) => {
                    OrchestratorError::Agent(agent_err)
                }
                other => OrchestratorError::Directory(other),
            });
        }
        self.wait_for_agent_response(&prepared.agent, &prepared.step_id, receiver)
    }

    fn execute_local_step(
        &self,
        prepared: &PreparedStep,
    ) -> Result<AgentResponse, OrchestratorError> {
        match &prepared.request {
            AgentRequest::RetrieveRelevantContext { query } => Ok(AgentResponse::Context {
                content: self.endpoint.core().rag_context(query)?,
            }),
            other => Err(AgentError::UnsupportedAction {
                agent: ORCHESTRATOR_AGENT_NAME.to_string(),
                action: other.action().to_string(),
            }
            .into()),
        }
    }

    /// Bounded wait on the step waiter the directory fulfills at delivery
    /// time.
    fn wait_for_agent_response(
        &self,
        agent: &str,
        step_id: &str,
        receiver: mpsc::Receiver<Message>,
    ) -> Result<AgentResponse, OrchestratorError> {
        match receiver.recv_timeout(self.limits.response_timeout) {
            Ok(message) => match message.content {
                MessagePayload::Response(response) => Ok(response),
                _ => Err(OrchestratorError::UnexpectedReply {
                    agent: agent.to_string(),
                    step_id: step_id.to_string(),
                }),
            },
            Err(_) => {
                self.directory.clear_step_waiter(step_id);
                Err(OrchestratorError::ResponseTimeout {
                    agent: agent.to_string(),
                    timeout_seconds: self.limits.response_timeout.as_secs(),
                })
            }
        }
    }

    fn apply_step_success(
        &self,
        workflow_id: &str,
        prepared: &PreparedStep,
        response: AgentResponse,
        current_draft: Option<&DocumentDraft>,
        iteration_count: &mut u32,
    ) -> Result<(), OrchestratorError> {
        let now = unix_timestamp();
        let review_feedback = match (&prepared.action[..], &response) {
            (ACTION_REVIEW_DRAFT, AgentResponse::Review { report })
            | (ACTION_FINAL_REVIEW, AgentResponse::Review { report }) => Some(report.clone()),
            _ => None,
        };

        let mut workflows = self.workflows.lock().expect("workflow map poisoned");
        let workflow =
            workflows
                .get_mut(workflow_id)
                .ok_or_else(|| OrchestratorError::UnknownWorkflow {
                    workflow_id: workflow_id.to_string(),
                })?;
        {
            let step = &mut workflow.steps[prepared.index];
            transition_step(step, StepStatus::Completed)?;
            step.output = Some(response);
            step.timestamp = Some(now);
        }

        let jumped = match review_feedback {
            Some(report)
                if report.needs_improvement
                    && *iteration_count < workflow.metadata.max_iterations.saturating_sub(1) =>
            {
                self.jump_to_refine(workflow, report, current_draft)?;
                *iteration_count += 1;
                workflow.metadata.current_iteration += 1;
                true
            }
            _ => false,
        };
        if !jumped {
            workflow.current_step = if prepared.action == ACTION_REVIEW_DRAFT {
                // A passing first review skips straight to the final review;
                // the refine step only runs via the critique jump.
                workflow
                    .step_index_for_action(ACTION_FINAL_REVIEW)
                    .unwrap_or(prepared.index + 1)
            } else {
                prepared.index + 1
            };
        }
        let next_step = workflow
            .steps
            .get(workflow.current_step)
            .map(|step| step.id.clone())
            .unwrap_or_else(|| "terminal".to_string());
        drop(workflows);

        self.emit_progress(&ProgressUpdate {
            workflow_id: workflow_id.to_string(),
            step_id: prepared.step_id.clone(),
            status: StepStatus::Completed,
            progress: prepared.progress,
        });
        self.log_line(
            now,
            format!(
                "workflow_id={workflow_id} step_id={} transition=completed next={next_step}",
                prepared.step_id
            ),
        )
    }

    /// The critique-refine rule: reset the refine step, seed it with the
    /// reviewed draft and the critic's feedback, and move the cursor back
    /// without advancing.
    fn jump_to_refine(
        &self,
        workflow: &mut WorkflowDefinition,
        report: CritiqueReport,
        current_draft: Option<&DocumentDraft>,
    ) -> Result<(), OrchestratorError> {
        let Some(refine_index) = workflow.step_index_for_action(ACTION_REFINE_DOCUMENTATION)
        else {
            return Ok(());
        };
        let step = &mut workflow.steps[refine_index];
        if step.status.is_terminal() {
            transition_step(step, StepStatus::Pending)?;
        }
        if let AgentRequest::RefineDocumentation {
            previous_draft,
            feedback,
            ..
        } = &mut step.input
        {
            *previous_draft = current_draft.cloned();
            *feedback = Some(report);
        }
        step.output = None;
        step.error = None;
        workflow.current_step = refine_index;
        Ok(())
    }

    /// Marks the step failed and decides whether the retry budget covers
    /// another attempt. The default budget is zero, so no retry ever occurs
    /// unless a deployment opts in.
    fn apply_step_failure(
        &self,
        workflow_id: &str,
        prepared: &PreparedStep,
        err: &OrchestratorError,
        retries_used: &mut BTreeMap<usize, u32>,
    ) -> Result<bool, OrchestratorError> {
        let now = unix_timestamp();
        {
            let mut workflows = self.workflows.lock().expect("workflow map poisoned");
            let workflow = workflows.get_mut(workflow_id).ok_or_else(|| {
                OrchestratorError::UnknownWorkflow {
                    workflow_id: workflow_id.to_string(),
                }
            })?;
            let step = &mut workflow.steps[prepared.index];
            transition_step(step, StepStatus::Failed)?;
            step.error = Some(err.to_string());
            step.timestamp = Some(now);
        }
        self.emit_progress(&ProgressUpdate {
            workflow_id: workflow_id.to_string(),
            step_id: prepared.step_id.clone(),
            status: StepStatus::Failed,
            progress: prepared.progress,
        });

        let attempts = retries_used.entry(prepared.index).or_insert(0);
        let retry = self.should_retry_step(*attempts);
        self.log_line(
            now,
            format!(
                "workflow_id={workflow_id} step_id={} transition=failed retry={retry} error={err}",
                prepared.step_id
            ),
        )?;
        if !retry {
            return Ok(false);
        }
        *attempts += 1;

        let mut workflows = self.workflows.lock().expect("workflow map poisoned");
        let workflow =
            workflows
                .get_mut(workflow_id)
                .ok_or_else(|| OrchestratorError::UnknownWorkflow {
                    workflow_id: workflow_id.to_string(),
                })?;
        let step = &mut workflow.steps[prepared.index];
        transition_step(step, StepStatus::Pending)?;
        step.error = None;
        Ok(true)
    }

    fn should_retry_step(&self, attempts_used: u32) -> bool {
        attempts_used < self.limits.max_step_retries
    }

    /// Starts driving: `pending -> in_progress`. A workflow already marked
    /// failed (cancelled before driving began) is reported as cancelled.
    fn begin_workflow(&self, workflow_id: &str) -> Result<(), OrchestratorError> {
        let mut workflows = self.workflows.lock().expect("workflow map poisoned");
        let workflow =
            workflows
                .get_mut(workflow_id)
                .ok_or_else(|| OrchestratorError::UnknownWorkflow {
                    workflow_id: workflow_id.to_string(),
                })?;
        match workflow.status {
            WorkflowStatus::Failed => Err(OrchestratorError::Cancelled {
                workflow_id: workflow_id.to_string(),
            }),
            WorkflowStatus::Pending => {
                workflow.status = WorkflowStatus::InProgress;
                Ok(())
            }
            from => Err(OrchestratorError::InvalidWorkflowTransition {
                from,
                to: WorkflowStatus::InProgress,
            }),
        }
    }

    /// Terminal bookkeeping: transition, drop from the active set, evict the
    /// oldest terminal workflows beyond the retention cap.
    fn finish_workflow(
        &self,
        workflow_id: &str,
        terminal: WorkflowStatus,
    ) -> Result<(), OrchestratorError> {
        {
            let mut workflows = self.workflows.lock().expect("workflow map poisoned");
            if let Some(workflow) = workflows.get_mut(workflow_id) {
                // A concurrent cancel may have marked it failed already.
                if !workflow.status.is_terminal() {
                    if !workflow.status.can_transition_to(terminal) {
                        return Err(OrchestratorError::InvalidWorkflowTransition {
                            from: workflow.status,
                            to: terminal,
                        });
                    }
                    workflow.status = terminal;
                }
            }
        }
        self.active
            .lock()
            .expect("active set poisoned")
            .remove(workflow_id);
        self.mark_terminal(workflow_id);
        self.prune_retained();
        Ok(())
    }

    fn mark_terminal(&self, workflow_id: &str) {
        let mut order = self.terminal_order.lock().expect("terminal order poisoned");
        if !order.iter().any(|id| id == workflow_id) {
            order.push(workflow_id.to_string());
        }
    }

    fn prune_retained(&self) {
        let mut order = self.terminal_order.lock().expect("terminal order poisoned");
        if order.len() <= self.limits.max_retained_workflows {
            return;
        }
        let excess = order.len() - self.limits.max_retained_workflows;
        let mut workflows = self.workflows.lock().expect("workflow map poisoned");
        for workflow_id in order.drain(..excess) {
            workflows.remove(&workflow_id);
        }
    }

    fn emit_progress(&self, update: &ProgressUpdate) {
        self.endpoint.core().compose_message(
            PROGRESS_RECIPIENT,
            MessagePayload::Status(update.clone()),
            MessageMetadata::for_step(&update.workflow_id, &update.step_id),
        );
        self.progress.emit(update);
    }

    fn log_line(&self, now: i64, line: String) -> Result<(), OrchestratorError> {
        self.engine_log
            .append(now, &line)
            .map_err(|source| OrchestratorError::Io {
                path: "logs/engine.log".to_string(),
                source,
            })
    }
}

fn step_id(workflow_id: &str, position: usize, name: &str) -> String {
    format!("{workflow_id}-{position}-{name}")
}

fn transition_step(step: &mut WorkflowStep, next: StepStatus) -> Result<(), OrchestratorError> {
    if !step.status.can_transition_to(next) {
        return Err(OrchestratorError::InvalidStepTransition {
            from: step.status,
            to: next,
        });
    }
    step.status = next;
    Ok(())
}
