//! SubtaskExecutor capability (consumed, spec §6).

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::domain::context::TaskContext;
use crate::domain::subtask::{Subtask, SubtaskResult};

/// Cooperative cancellation flag shared between the caller and the executor.
#[derive(Clone, Default)]
pub struct CancelSignal(Arc<AtomicBool>);

impl CancelSignal {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// The core treats this opaquely: it is where actual LM calls, file writes,
/// and shell commands happen.
#[async_trait]
pub trait SubtaskExecutor: Send + Sync {
    async fn execute(&self, subtask: &Subtask, task_context: &TaskContext, cancel: &CancelSignal) -> SubtaskResult;

    /// Best-effort request to stop an in-flight subtask; the executor capability
    /// decides how (process signal, future abort, no-op).
    async fn request_cancel(&self, _subtask_id: &str) {}
}
