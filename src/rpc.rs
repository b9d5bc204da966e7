//! Wire types for the coordinator service and the worker-side client.

use anyhow::{anyhow, Context, Result};
use tonic::transport::Channel;
use tonic::{Code, Request};
use tracing::warn;

use crate::registry::{Progress, StatusCounts};
use crate::task::{TaskDescriptor, TaskKind, TaskRef};
use crate::worker::TaskSource;

pub mod mapreduce {
    tonic::include_proto!("mapreduce");
}

use mapreduce::coordinator_client::CoordinatorClient;

impl From<TaskKind> for mapreduce::TaskKind {
    fn from(kind: TaskKind) -> Self {
        match kind {
            TaskKind::Map => mapreduce::TaskKind::Map,
            TaskKind::Reduce => mapreduce::TaskKind::Reduce,
            TaskKind::Wait => mapreduce::TaskKind::Wait,
        }
    }
}

impl From<mapreduce::TaskKind> for TaskKind {
    fn from(kind: mapreduce::TaskKind) -> Self {
        match kind {
            mapreduce::TaskKind::Map => TaskKind::Map,
            mapreduce::TaskKind::Reduce => TaskKind::Reduce,
            mapreduce::TaskKind::Wait => TaskKind::Wait,
        }
    }
}

fn decode_kind(value: i32) -> Result<TaskKind> {
    let kind = mapreduce::TaskKind::try_from(value)
        .map_err(|_| anyhow!("unknown task kind {value}"))?;
    Ok(kind.into())
}

impl From<TaskDescriptor> for mapreduce::TaskDescriptor {
    fn from(task: TaskDescriptor) -> Self {
        let kind = mapreduce::TaskKind::from(task.kind()) as i32;
        match task {
            TaskDescriptor::Map {
                id,
                input,
                n_reduce,
            } => Self {
                kind,
                id,
                input,
                n_reduce,
                ..Default::default()
            },
            TaskDescriptor::Reduce { id, n_map } => Self {
                kind,
                id,
                n_map,
                ..Default::default()
            },
            TaskDescriptor::Wait => Self {
                kind,
                ..Default::default()
            },
        }
    }
}

impl TryFrom<mapreduce::TaskDescriptor> for TaskDescriptor {
    type Error = anyhow::Error;

    fn try_from(task: mapreduce::TaskDescriptor) -> Result<Self> {
        Ok(match decode_kind(task.kind)? {
            TaskKind::Map => TaskDescriptor::Map {
                id: task.id,
                input: task.input,
                n_reduce: task.n_reduce,
            },
            TaskKind::Reduce => TaskDescriptor::Reduce {
                id: task.id,
                n_map: task.n_map,
            },
            TaskKind::Wait => TaskDescriptor::Wait,
        })
    }
}

impl From<TaskRef> for mapreduce::TaskRef {
    fn from(task: TaskRef) -> Self {
        Self {
            kind: mapreduce::TaskKind::from(task.kind) as i32,
            id: task.id,
        }
    }
}

impl TryFrom<mapreduce::TaskRef> for TaskRef {
    type Error = anyhow::Error;

    fn try_from(task: mapreduce::TaskRef) -> Result<Self> {
        Ok(TaskRef::new(decode_kind(task.kind)?, task.id))
    }
}

impl From<StatusCounts> for mapreduce::StatusCounts {
    fn from(counts: StatusCounts) -> Self {
        Self {
            idle: counts.idle,
            assigned: counts.assigned,
            completed: counts.completed,
        }
    }
}

impl From<mapreduce::StatusCounts> for StatusCounts {
    fn from(counts: mapreduce::StatusCounts) -> Self {
        Self {
            idle: counts.idle,
            assigned: counts.assigned,
            completed: counts.completed,
        }
    }
}

impl From<Progress> for mapreduce::JobStatusReply {
    fn from(progress: Progress) -> Self {
        Self {
            done: progress.is_done(),
            map: Some(progress.map.into()),
            reduce: Some(progress.reduce.into()),
        }
    }
}

impl From<mapreduce::JobStatusReply> for Progress {
    fn from(reply: mapreduce::JobStatusReply) -> Self {
        Self {
            map: reply.map.map(Into::into).unwrap_or_default(),
            reduce: reply.reduce.map(Into::into).unwrap_or_default(),
        }
    }
}

/// A coordinator reached over gRPC.
pub struct RemoteCoordinator {
    client: CoordinatorClient<Channel>,
    worker: String,
}

impl RemoteCoordinator {
    /// Connects to a coordinator at `addr` (`host:port`).
    pub async fn connect(addr: &str, worker: impl Into<String>) -> Result<Self> {
        let client = CoordinatorClient::connect(format!("http://{}", addr))
            .await
            .with_context(|| format!("connecting to coordinator at {addr}"))?;
        Ok(Self {
            client,
            worker: worker.into(),
        })
    }

    pub async fn job_status(&mut self) -> Result<Progress> {
        let reply = self.client.job_status(Request::new(mapreduce::Empty {})).await?;
        Ok(reply.into_inner().into())
    }
}

#[tonic::async_trait]
impl TaskSource for RemoteCoordinator {
    async fn request_task(&mut self) -> Result<Option<TaskDescriptor>> {
        let request = Request::new(mapreduce::TaskRequest {
            worker: self.worker.clone(),
        });
        match self.client.request_task(request).await {
            Ok(response) => Ok(Some(TaskDescriptor::try_from(response.into_inner())?)),
            Err(status) if status.code() == Code::NotFound => Ok(None),
            Err(status) => Err(anyhow!("request_task failed: {status}")),
        }
    }

    async fn report_completion(&mut self, task: TaskRef) -> Result<()> {
        match self.client.report_completion(Request::new(mapreduce::TaskRef::from(task))).await {
            Ok(_) => Ok(()),
            Err(status) => {
                if status.code() == Code::NotFound {
                    warn!(%task, "coordinator does not know this task");
                }
                Err(anyhow!("report_completion failed: {status}"))
            }
        }
    }
}
