//! The coordinator: a single authority over the task registry.
//!
//! Every registry access, including lease expiry, goes through one mutex,
//! so task requests, completion reports and timer firings are linearized.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::Error;
use crate::registry::{Lease, Progress, TaskRegistry};
use crate::task::{TaskDescriptor, TaskRef};

pub mod service;

/// How long a worker may hold a task before it is handed to someone else.
pub const DEFAULT_LEASE: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct Coordinator {
    registry: Arc<Mutex<TaskRegistry>>,
    lease: Duration,
}

impl Coordinator {
    /// Creates the job: one map task per input and `n_reduce` reduce tasks.
    pub fn new<S: Into<String>>(
        inputs: impl IntoIterator<Item = S>,
        n_reduce: u32,
        lease: Duration,
    ) -> Result<Self, Error> {
        let registry = TaskRegistry::new(inputs, n_reduce)?;
        let progress = registry.progress();
        info!(
            maps = progress.map.total(),
            reduces = progress.reduce.total(),
            lease_ms = lease.as_millis() as u64,
            "job created"
        );
        Ok(Self {
            registry: Arc::new(Mutex::new(registry)),
            lease,
        })
    }

    fn lock(&self) -> MutexGuard<'_, TaskRegistry> {
        lock(&self.registry)
    }

    /// Hands out the next task, or [`Error::NoTask`].
    ///
    /// Assigning a map or reduce task starts its lease timer, so this must be
    /// called from within a Tokio runtime.
    pub fn request_task(&self) -> Result<TaskDescriptor, Error> {
        let (descriptor, lease) = self.lock().assign()?;
        match lease {
            Some(lease) => {
                info!(task = %lease.task, attempt = lease.attempt, "assigned");
                self.start_lease(lease);
            }
            None => debug!("mapping in flight, worker told to wait"),
        }
        Ok(descriptor)
    }

    fn start_lease(&self, lease: Lease) {
        let registry = Arc::clone(&self.registry);
        let duration = self.lease;
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            // Status is re-read under the lock; the task may have completed
            // or been reassigned since the timer started.
            if lock(&registry).expire(lease) {
                warn!(task = %lease.task, attempt = lease.attempt, "lease expired, task returned to idle");
            }
        });
    }

    /// Marks a task completed. Duplicate reports are acknowledged.
    pub fn report_completion(&self, task: TaskRef) -> Result<(), Error> {
        let mut registry = self.lock();
        let mapping_was_complete = registry.is_mapping_complete();
        if !registry.complete(task)? {
            debug!(task = %task, "duplicate completion report");
            return Ok(());
        }
        info!(task = %task, "completed");
        if !mapping_was_complete && registry.is_mapping_complete() {
            info!("map phase finished, reduce tasks open");
        }
        if registry.is_done() {
            info!("job done");
        }
        Ok(())
    }

    /// True iff every map and reduce task has completed.
    pub fn is_done(&self) -> bool {
        self.lock().is_done()
    }

    pub fn progress(&self) -> Progress {
        self.lock().progress()
    }
}

// A panic while holding the lock leaves the registry consistent: every
// mutation is a single field store.
fn lock(registry: &Mutex<TaskRegistry>) -> MutexGuard<'_, TaskRegistry> {
    registry.lock().unwrap_or_else(|e| e.into_inner())
}
