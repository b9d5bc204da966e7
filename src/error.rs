use thiserror::Error;

use crate::task::TaskRef;

/// Errors raised by the task registry and surfaced through the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// No idle task remains; the job is done or every remaining task is in
    /// flight. Not a fault: workers leave their poll loop on it.
    #[error("no task")]
    NoTask,
    /// A completion report named a task the registry does not know.
    #[error("task not found: {0}")]
    TaskNotFound(TaskRef),
    #[error("n_reduce must be greater than 0")]
    InvalidReduceCount,
}
