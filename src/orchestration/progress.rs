use crate::orchestration::workflow::StepStatus;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// The only externally observable progress signal. Emitted once per step
/// status change; `progress` is `(current_step + 1) / steps.len()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    pub workflow_id: String,
    pub step_id: String,
    pub status: StepStatus,
    pub progress: f64,
}

type ProgressCallback = Box<dyn Fn(&ProgressUpdate) + Send + Sync>;

/// First-class progress subscription: callers register callbacks instead of
/// intercepting an agent's outgoing messages.
#[derive(Default)]
pub struct ProgressBroadcaster {
    subscribers: Mutex<Vec<ProgressCallback>>,
}

impl ProgressBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, callback: impl Fn(&ProgressUpdate) + Send + Sync + 'static) {
        self.subscribers
            .lock()
            .expect("progress subscribers poisoned")
            .push(Box::new(callback));
    }

    pub fn emit(&self, update: &ProgressUpdate) {
        let subscribers = self
            .subscribers
            .lock()
            .expect("progress subscribers poisoned");
        for subscriber in subscribers.iter() {
            subscriber(update);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn every_subscriber_sees_every_update() {
        let broadcaster = ProgressBroadcaster::new();
        let seen = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let seen = Arc::clone(&seen);
            broadcaster.subscribe(move |_| {
                seen.fetch_add(1, Ordering::SeqCst);
            });
        }
        broadcaster.emit(&ProgressUpdate {
            workflow_id: "wf-1".to_string(),
            step_id: "wf-1-1-generate_draft".to_string(),
            status: StepStatus::InProgress,
            progress: 0.4,
        });
        assert_eq!(seen.load(Ordering::SeqCst), 3);
    }
}
