//! Progress events emitted while a crawl runs
//!
//! The crawler reports one event when a phase starts and one per finished
//! task. Rendering is left to the observer.

use tokio::sync::mpsc::UnboundedSender;

/// The two fan-out phases of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Listing pages
    Page,
    /// Item detail pages
    Detail,
}

/// How a task ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Succeeded { attempts: u32 },
    Failed { attempts: u32, reason: String },
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Succeeded { .. })
    }
}

/// A progress notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// A phase is about to dispatch `total` tasks
    PhaseStarted { phase: Phase, total: usize },

    /// One task of a phase finished
    TaskFinished {
        phase: Phase,
        /// Page number for pages, item identifier for details
        key: String,
        outcome: TaskOutcome,
    },
}

/// Receives progress events; called from worker tasks
pub trait ProgressObserver: Send + Sync {
    fn on_event(&self, event: &ProgressEvent);
}

/// Discards every event
impl ProgressObserver for () {
    fn on_event(&self, _event: &ProgressEvent) {}
}

/// Forwards events into a channel; a closed receiver is ignored
impl ProgressObserver for UnboundedSender<ProgressEvent> {
    fn on_event(&self, event: &ProgressEvent) {
        let _ = self.send(event.clone());
    }
}

impl<F> ProgressObserver for F
where
    F: Fn(&ProgressEvent) + Send + Sync,
{
    fn on_event(&self, event: &ProgressEvent) {
        self(event)
    }
}
