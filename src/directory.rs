use crate::agent::{Agent, AgentError};
use crate::message::{Message, MessageType};
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::{mpsc, Arc, Mutex};

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("agent `{agent}` not found")]
    AgentNotFound { agent: String },
    #[error("agent `{agent}` is already registered")]
    DuplicateAgent { agent: String },
    #[error(transparent)]
    Agent(#[from] AgentError),
}

struct DirectoryInner {
    agents: Mutex<BTreeMap<String, Arc<dyn Agent>>>,
    step_waiters: Mutex<BTreeMap<String, mpsc::Sender<Message>>>,
    queued: Mutex<VecDeque<Message>>,
    draining: AtomicBool,
}

/// Name-keyed agent registry and message router. An explicit dependency:
/// handles are cheap clones of one shared registry, injected into the
/// orchestrator and every specialist that needs to route.
#[derive(Clone)]
pub struct AgentDirectory {
    inner: Arc<DirectoryInner>,
}

impl Default for AgentDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentDirectory {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(DirectoryInner {
                agents: Mutex::new(BTreeMap::new()),
                step_waiters: Mutex::new(BTreeMap::new()),
                queued: Mutex::new(VecDeque::new()),
                draining: AtomicBool::new(false),
            }),
        }
    }

    /// Registering a name twice is a conflict, not a silent overwrite: the
    /// overwritten agent would keep running with an unreachable mailbox.
    pub fn register(&self, agent: Arc<dyn Agent>) -> Result<(), DirectoryError> {
        let name = agent.name().to_string();
        let mut agents = self.inner.agents.lock().expect("agent registry poisoned");
        if agents.contains_key(&name) {
            return Err(DirectoryError::DuplicateAgent { agent: name });
        }
        agents.insert(name, agent);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Agent>> {
        self.inner
            .agents
            .lock()
            .expect("agent registry poisoned")
            .get(name)
            .cloned()
    }

    pub fn agent_names(&self) -> Vec<String> {
        self.inner
            .agents
            .lock()
            .expect("agent registry poisoned")
            .keys()
            .cloned()
            .collect()
    }

    /// Synchronous delivery. The recipient logs the message and may produce a
    /// reply, which is routed in turn until no reply remains. After a
    /// `response` message is delivered, the waiter registered for its step id
    /// (if any) is fulfilled.
    pub fn route_message(&self, message: Message) -> Result<(), DirectoryError> {
        let mut pending = Some(message);
        while let Some(message) = pending.take() {
            let agent = self
                .get(&message.to)
                .ok_or_else(|| DirectoryError::AgentNotFound {
                    agent: message.to.clone(),
                })?;
            let reply = agent.receive_message(message.clone())?;
            self.fulfill_step_waiter(&message);
            pending = reply;
        }
        Ok(())
    }

    /// Registers interest in the response that will satisfy `step_id`. The
    /// returned receiver resolves at delivery time; the caller bounds its own
    /// wait and clears the waiter on timeout.
    pub fn register_step_waiter(&self, step_id: &str) -> mpsc::Receiver<Message> {
        let (sender, receiver) = mpsc::channel();
        self.inner
            .step_waiters
            .lock()
            .expect("step waiters poisoned")
            .insert(step_id.to_string(), sender);
        receiver
    }

    pub fn clear_step_waiter(&self, step_id: &str) {
        self.inner
            .step_waiters
            .lock()
            .expect("step waiters poisoned")
            .remove(step_id);
    }

    fn fulfill_step_waiter(&self, message: &Message) {
        if message.message_type != MessageType::Response {
            return;
        }
        let Some(step_id) = message.metadata.step_id.as_deref() else {
            return;
        };
        let sender = self
            .inner
            .step_waiters
            .lock()
            .expect("step waiters poisoned")
            .remove(step_id);
        if let Some(sender) = sender {
            // Receiver may already be gone (timed-out waiter); nothing to do.
            let _ = sender.send(message.clone());
        }
    }

    /// Alternate queued delivery path; not used by the primary synchronous
    /// workflow path.
    pub fn queue_message(&self, message: Message) {
        self.inner
            .queued
            .lock()
            .expect("message queue poisoned")
            .push_back(message);
    }

    pub fn queued_len(&self) -> usize {
        self.inner
            .queued
            .lock()
            .expect("message queue poisoned")
            .len()
    }

    /// Drains the queue behind a single in-flight flag so a delivery that
    /// enqueues further messages cannot re-enter the drain. Returns the
    /// number of messages delivered; zero when a drain is already running.
    pub fn process_messages(&self) -> Result<usize, DirectoryError> {
        if self
            .inner
            .draining
            .compare_exchange(
                false,
                true,
                AtomicOrdering::SeqCst,
                AtomicOrdering::SeqCst,
            )
            .is_err()
        {
            return Ok(0);
        }
        let result = self.drain_queue();
        self.inner.draining.store(false, AtomicOrdering::SeqCst);
        result
    }

    fn drain_queue(&self) -> Result<usize, DirectoryError> {
        let mut delivered = 0_usize;
        loop {
            let next = self
                .inner
                .queued
                .lock()
                .expect("message queue poisoned")
                .pop_front();
            let Some(message) = next else {
                return Ok(delivered);
            };
            self.route_message(message)?;
            delivered += 1;
        }
    }
}
