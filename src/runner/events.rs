//! Run lifecycle and progress events.
//!
//! The orchestrator emits [`RunEvent`]s to every subscriber registered on an
//! [`Events`] hub. Subscribers are invoked on whichever thread produced the
//! event (the caller, the worker, or the watchdog); moving work onto a UI
//! thread is the subscriber's job.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use tracing::error;

use crate::steps::step::panic_message;
use crate::steps::{StepSnapshot, WorkflowMask};

use super::outcome::RunState;

/// Which workflow a run belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    Configure,
    Remove,
}

impl fmt::Display for RunKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunKind::Configure => write!(f, "configure"),
            RunKind::Remove => write!(f, "remove"),
        }
    }
}

/// Kind of a free-form status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Waiting,
    Error,
}

/// Events emitted during a run.
#[derive(Debug, Clone)]
pub enum RunEvent {
    /// A run began.
    RunStarted {
        kind: RunKind,
        workflow: WorkflowMask,
    },
    /// A run reached its terminal state. Emitted exactly once per run.
    RunEnded { kind: RunKind, state: RunState },
    /// A step is about to execute; the snapshot shows it `Started`.
    StepStarting(StepSnapshot),
    /// A step finished; the snapshot carries its resulting status.
    StepFinished(StepSnapshot),
    /// Free-form progress text from a step body.
    StatusMessage { kind: StatusKind, text: String },
    /// The run has exceeded its time budget. Advisory only.
    RunTimedOut {
        elapsed: Duration,
        budget: Duration,
        current_step: Option<String>,
    },
}

/// Callback invoked for every event.
pub type EventCallback = Arc<dyn Fn(&RunEvent) + Send + Sync>;

/// Fan-out of run events to subscribers.
#[derive(Clone, Default)]
pub struct Events {
    subscribers: Vec<EventCallback>,
}

impl Events {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback.
    pub fn subscribe<F>(&mut self, callback: F)
    where
        F: Fn(&RunEvent) + Send + Sync + 'static,
    {
        self.subscribers.push(Arc::new(callback));
    }

    /// Register a channel and return its receiving end.
    pub fn channel(&mut self) -> mpsc::Receiver<RunEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribe(move |event| {
            // Receiver may be gone; that subscriber simply stops listening.
            let _ = tx.send(event.clone());
        });
        rx
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Deliver an event to every subscriber.
    ///
    /// A panicking subscriber is logged and skipped so it cannot take the
    /// worker or the watchdog down with it.
    pub fn emit(&self, event: &RunEvent) {
        for subscriber in &self.subscribers {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| subscriber(event))) {
                error!(
                    "Event subscriber panicked: {}",
                    panic_message(payload.as_ref())
                );
            }
        }
    }
}

impl fmt::Debug for Events {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Events")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn emit_reaches_every_subscriber() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut events = Events::new();
        for id in 0..2 {
            let seen = Arc::clone(&seen);
            events.subscribe(move |_| seen.lock().unwrap().push(id));
        }

        events.emit(&RunEvent::RunEnded {
            kind: RunKind::Configure,
            state: RunState::Complete,
        });

        assert_eq!(*seen.lock().unwrap(), vec![0, 1]);
    }

    #[test]
    fn channel_receives_clones() {
        let mut events = Events::new();
        let rx = events.channel();

        events.emit(&RunEvent::StatusMessage {
            kind: StatusKind::Waiting,
            text: "service starting".to_string(),
        });

        match rx.try_recv().unwrap() {
            RunEvent::StatusMessage { kind, text } => {
                assert_eq!(kind, StatusKind::Waiting);
                assert_eq!(text, "service starting");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn panicking_subscriber_does_not_stop_others() {
        let seen = Arc::new(Mutex::new(0));
        let mut events = Events::new();
        events.subscribe(|_| panic!("bad subscriber"));
        let counter = Arc::clone(&seen);
        events.subscribe(move |_| *counter.lock().unwrap() += 1);

        events.emit(&RunEvent::RunStarted {
            kind: RunKind::Remove,
            workflow: WorkflowMask::ALL,
        });

        assert_eq!(*seen.lock().unwrap(), 1);
    }

    #[test]
    fn dropped_receiver_is_ignored() {
        let mut events = Events::new();
        drop(events.channel());

        events.emit(&RunEvent::RunEnded {
            kind: RunKind::Remove,
            state: RunState::Cancelled,
        });
    }

    #[test]
    fn run_kind_display() {
        assert_eq!(RunKind::Configure.to_string(), "configure");
        assert_eq!(RunKind::Remove.to_string(), "remove");
    }
}
