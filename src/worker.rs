//! The worker loop: ask for a task, run it, report it, repeat.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use bytes::Bytes;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::coordinator::Coordinator;
use crate::engine::{perform_map, perform_reduce};
use crate::error::Error;
use crate::store::IntermediateStore;
use crate::task::{TaskDescriptor, TaskRef};
use crate::Workload;

/// Where a worker gets its tasks from.
#[tonic::async_trait]
pub trait TaskSource: Send {
    /// The next task, or `None` once the coordinator has no task left.
    async fn request_task(&mut self) -> Result<Option<TaskDescriptor>>;

    async fn report_completion(&mut self, task: TaskRef) -> Result<()>;
}

/// In-process access to a coordinator, used by tests and local runs.
#[tonic::async_trait]
impl TaskSource for Coordinator {
    async fn request_task(&mut self) -> Result<Option<TaskDescriptor>> {
        match Coordinator::request_task(self) {
            Ok(task) => Ok(Some(task)),
            Err(Error::NoTask) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn report_completion(&mut self, task: TaskRef) -> Result<()> {
        Ok(Coordinator::report_completion(self, task)?)
    }
}

/// Exponential backoff between polls while the map phase is in flight.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    pub initial: Duration,
    pub max: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(100),
            max: Duration::from_secs(1),
        }
    }
}

impl Backoff {
    fn next(&self, current: Duration) -> Duration {
        (current * 2).min(self.max)
    }
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Directory holding intermediate and output files.
    pub dir: PathBuf,
    /// Auxiliary argument passed to the map and reduce functions.
    pub aux: Bytes,
    pub backoff: Backoff,
}

impl WorkerConfig {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            aux: Bytes::from_static(b"[]"),
            backoff: Backoff::default(),
        }
    }
}

/// What a worker did before leaving its loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub maps: u32,
    pub reduces: u32,
    pub waits: u32,
}

/// Polls `source` until it runs out of tasks.
///
/// An I/O or application failure while running a task ends the worker with
/// that error; the task's lease then expires and someone else retries it.
/// A failed completion report is logged and not retried.
pub async fn run<S: TaskSource>(
    source: &mut S,
    workload: &Workload,
    config: &WorkerConfig,
) -> Result<WorkerStats> {
    let store = IntermediateStore::new(&config.dir);
    let mut stats = WorkerStats::default();
    let mut delay = config.backoff.initial;

    loop {
        let task = match source.request_task().await {
            Ok(Some(task)) => task,
            Ok(None) => {
                info!(?stats, "no task left, exiting");
                break;
            }
            Err(err) => {
                warn!("coordinator unreachable, assuming the job is over: {err:#}");
                break;
            }
        };

        match &task {
            TaskDescriptor::Map {
                id,
                input,
                n_reduce,
            } => {
                info!(id, input = %input, "map");
                perform_map(&store, *id, input, *n_reduce, workload, &config.aux)?;
                stats.maps += 1;
            }
            TaskDescriptor::Reduce { id, n_map } => {
                info!(id, n_map, "reduce");
                perform_reduce(&store, *id, *n_map, workload, &config.aux)?;
                stats.reduces += 1;
            }
            TaskDescriptor::Wait => {
                debug!(?delay, "waiting for the map phase");
                stats.waits += 1;
                sleep(delay).await;
                delay = config.backoff.next(delay);
                continue;
            }
        }
        delay = config.backoff.initial;

        let task_ref = task.task_ref();
        if let Err(err) = source.report_completion(task_ref).await {
            warn!(task = %task_ref, "completion report failed, leaving it to the lease: {err:#}");
        }
    }
    Ok(stats)
}
