//! Fire-and-forget persistence of column changes.
//!
//! The local board is already updated when `push` is called. The remote
//! request runs on the runtime in the background; a failure is logged and
//! otherwise ignored, so the board may drift from the backend until the next
//! fetch.

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::api::TaskGateway;
use crate::task::{Task, TaskUpdate};

/// Sends task status changes to the backend without blocking the caller.
pub struct RemoteSync {
    gateway: Arc<dyn TaskGateway>,
    handle: Handle,
    in_flight: Vec<JoinHandle<()>>,
}

impl RemoteSync {
    pub fn new(gateway: Arc<dyn TaskGateway>, handle: Handle) -> Self {
        Self {
            gateway,
            handle,
            in_flight: Vec::new(),
        }
    }

    /// Queue an update carrying the task's current fields and column.
    pub fn push(&mut self, task: &Task) {
        self.in_flight.retain(|h| !h.is_finished());

        let gateway = Arc::clone(&self.gateway);
        let id = task.id.clone();
        let update = TaskUpdate::from(task);
        let handle = self.handle.spawn(async move {
            match gateway.update_task(&id, &update).await {
                Ok(()) => debug!(task_id = %id, status_id = %update.status_id, "task status synced"),
                Err(e) => error!(task_id = %id, error = %e, "failed to sync task status"),
            }
        });
        self.in_flight.push(handle);
    }

    /// Hand over requests that have not finished yet, for callers that must
    /// wait before exiting.
    pub fn take_in_flight(&mut self) -> Vec<JoinHandle<()>> {
        std::mem::take(&mut self.in_flight)
    }
}
