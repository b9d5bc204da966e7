//! gRPC front end for the [`Coordinator`].

use tonic::{Request, Response, Status};
use tracing::{debug, warn};

use super::Coordinator;
use crate::error::Error;
use crate::rpc::mapreduce::coordinator_server::{Coordinator as CoordinatorRpc, CoordinatorServer};
use crate::rpc::mapreduce::{Ack, Empty, JobStatusReply, TaskDescriptor, TaskRef, TaskRequest};

pub struct CoordinatorService {
    coordinator: Coordinator,
}

impl CoordinatorService {
    pub fn new(coordinator: Coordinator) -> Self {
        Self { coordinator }
    }

    pub fn into_server(self) -> CoordinatorServer<Self> {
        CoordinatorServer::new(self)
    }
}

impl From<Error> for Status {
    fn from(err: Error) -> Self {
        match err {
            Error::NoTask | Error::TaskNotFound(_) => Status::not_found(err.to_string()),
            Error::InvalidReduceCount => Status::invalid_argument(err.to_string()),
        }
    }
}

#[tonic::async_trait]
impl CoordinatorRpc for CoordinatorService {
    async fn request_task(
        &self,
        request: Request<TaskRequest>,
    ) -> Result<Response<TaskDescriptor>, Status> {
        let worker = request.into_inner().worker;
        let task = self.coordinator.request_task()?;
        debug!(%worker, ?task, "handing out");
        Ok(Response::new(task.into()))
    }

    async fn report_completion(&self, request: Request<TaskRef>) -> Result<Response<Ack>, Status> {
        let task = crate::task::TaskRef::try_from(request.into_inner())
            .map_err(|e| Status::invalid_argument(e.to_string()))?;
        if let Err(err) = self.coordinator.report_completion(task) {
            warn!(%task, "completion report rejected: {err}");
            return Err(err.into());
        }
        Ok(Response::new(Ack { ack: true }))
    }

    async fn job_status(&self, _request: Request<Empty>) -> Result<Response<JobStatusReply>, Status> {
        Ok(Response::new(self.coordinator.progress().into()))
    }
}
