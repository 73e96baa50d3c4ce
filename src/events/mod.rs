//! Named deferred tasks
//!
//! Three debounced task lines drive the engine: translate, rescan and the
//! compile window. Each task has a single timer slot; rescheduling an armed
//! task aborts its running timer and starts a fresh one, so a burst of
//! triggers collapses into one firing after the last trigger's delay. A
//! fired task sends its kind to the coordinator loop over an unbounded
//! channel.

use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::trace;

const SLOT_COUNT: usize = 3;

/// The engine's deferred task lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// Drain the queue and run one translation cycle
    Translate,
    /// Run one merge pass over the locale tree
    Rescan,
    /// Close the current compilation burst window
    CompileWindow,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Translate => "translate",
            TaskKind::Rescan => "rescan",
            TaskKind::CompileWindow => "compile-window",
        }
    }

    fn slot(&self) -> usize {
        match self {
            TaskKind::Translate => 0,
            TaskKind::Rescan => 1,
            TaskKind::CompileWindow => 2,
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Debounce scheduler with one timer slot per task kind
pub struct TaskScheduler {
    sender: mpsc::UnboundedSender<TaskKind>,
    slots: Mutex<[Option<JoinHandle<()>>; SLOT_COUNT]>,
}

impl TaskScheduler {
    /// Create a scheduler and the signal receiver for the coordinator loop
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TaskKind>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let scheduler = Self {
            sender,
            slots: Mutex::new([None, None, None]),
        };
        (scheduler, receiver)
    }

    /// Arm a task to fire after `delay`, restarting any armed timer
    pub async fn reschedule(&self, kind: TaskKind, delay: Duration) {
        let sender = self.sender.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            trace!(task = kind.as_str(), "Deferred task fired");
            let _ = sender.send(kind);
        });

        let mut slots = self.slots.lock().await;
        if let Some(old) = slots[kind.slot()].replace(handle) {
            old.abort();
        }
    }

    /// Disarm a task; a timer that already fired is unaffected
    pub async fn cancel(&self, kind: TaskKind) {
        let mut slots = self.slots.lock().await;
        if let Some(handle) = slots[kind.slot()].take() {
            handle.abort();
        }
    }

    /// True while a timer for this task is armed and has not fired
    pub async fn is_armed(&self, kind: TaskKind) -> bool {
        let slots = self.slots.lock().await;
        slots[kind.slot()]
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}
