//! The task registry: every map and reduce task of a job and their states.
//!
//! Pure data and invariants. Locking and timers live in the
//! [`Coordinator`](crate::coordinator::Coordinator).

use crate::error::Error;
use crate::task::{Task, TaskDescriptor, TaskKind, TaskRef, TaskStatus};

/// A running lease: the task and the attempt it was granted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lease {
    pub task: TaskRef,
    pub attempt: u32,
}

/// Number of tasks of one kind in each status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub idle: u32,
    pub assigned: u32,
    pub completed: u32,
}

impl StatusCounts {
    fn count<'a>(tasks: impl Iterator<Item = &'a Task>) -> Self {
        let mut counts = Self::default();
        for task in tasks {
            match task.status {
                TaskStatus::Idle => counts.idle += 1,
                TaskStatus::Assigned => counts.assigned += 1,
                TaskStatus::Completed => counts.completed += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> u32 {
        self.idle + self.assigned + self.completed
    }
}

/// Per-kind progress of the job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    pub map: StatusCounts,
    pub reduce: StatusCounts,
}

impl Progress {
    pub fn is_done(&self) -> bool {
        self.map.completed == self.map.total() && self.reduce.completed == self.reduce.total()
    }
}

#[derive(Debug, Clone)]
pub struct TaskRegistry {
    tasks: Vec<Task>,
}

impl TaskRegistry {
    /// Creates one map task per input file (ids in input order) and exactly
    /// `n_reduce` reduce tasks. The task set never changes afterwards.
    pub fn new<S: Into<String>>(inputs: impl IntoIterator<Item = S>, n_reduce: u32) -> Result<Self, Error> {
        if n_reduce < 1 {
            return Err(Error::InvalidReduceCount);
        }
        let inputs: Vec<String> = inputs.into_iter().map(Into::into).collect();
        let n_map = inputs.len() as u32;
        let mut tasks: Vec<Task> = inputs
            .into_iter()
            .enumerate()
            .map(|(id, file)| Task::map(id as u32, file, n_map, n_reduce))
            .collect();
        tasks.extend((0..n_reduce).map(|id| Task::reduce(id, n_map, n_reduce)));
        Ok(Self { tasks })
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, task: TaskRef) -> Option<&Task> {
        self.tasks.iter().find(|t| t.task_ref() == task)
    }

    fn of_kind(&self, kind: TaskKind) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(move |t| t.kind == kind)
    }

    fn next_idle(&self, kind: TaskKind) -> Option<usize> {
        self.tasks
            .iter()
            .position(|t| t.kind == kind && t.status == TaskStatus::Idle)
    }

    /// True once every map task has completed. Reduce work is only handed
    /// out past this point.
    pub fn is_mapping_complete(&self) -> bool {
        self.of_kind(TaskKind::Map).all(Task::is_completed)
    }

    /// Picks the next task for a worker.
    ///
    /// Idle map tasks go first. While mapping is unfinished and nothing is
    /// left to map, workers are told to wait. Once every map task is
    /// completed, idle reduce tasks are handed out. With no idle task of
    /// either kind left this returns [`Error::NoTask`].
    ///
    /// A returned map or reduce task is now Assigned; the caller must start
    /// a timer for the returned [`Lease`].
    pub fn assign(&mut self) -> Result<(TaskDescriptor, Option<Lease>), Error> {
        if let Some(index) = self.next_idle(TaskKind::Map) {
            return Ok(self.assign_at(index));
        }
        if !self.is_mapping_complete() {
            return if self.next_idle(TaskKind::Reduce).is_some() {
                Ok((TaskDescriptor::Wait, None))
            } else {
                Err(Error::NoTask)
            };
        }
        match self.next_idle(TaskKind::Reduce) {
            Some(index) => Ok(self.assign_at(index)),
            None => Err(Error::NoTask),
        }
    }

    fn assign_at(&mut self, index: usize) -> (TaskDescriptor, Option<Lease>) {
        let task = &mut self.tasks[index];
        task.status = TaskStatus::Assigned;
        task.attempt += 1;
        let lease = Lease {
            task: task.task_ref(),
            attempt: task.attempt,
        };
        (task.descriptor(), Some(lease))
    }

    /// Marks a task completed and returns whether its status changed.
    ///
    /// Reporting an already completed task, or the wait signal, is an
    /// acknowledged no-op.
    pub fn complete(&mut self, task: TaskRef) -> Result<bool, Error> {
        if task.kind == TaskKind::Wait {
            return Ok(false);
        }
        let record = self
            .tasks
            .iter_mut()
            .find(|t| t.task_ref() == task)
            .ok_or(Error::TaskNotFound(task))?;
        if record.is_completed() {
            return Ok(false);
        }
        record.status = TaskStatus::Completed;
        Ok(true)
    }

    /// Returns the leased task to Idle if it is still Assigned under the
    /// same attempt. Returns whether the task was reverted.
    pub fn expire(&mut self, lease: Lease) -> bool {
        match self.tasks.iter_mut().find(|t| t.task_ref() == lease.task) {
            Some(task) if task.status == TaskStatus::Assigned && task.attempt == lease.attempt => {
                task.status = TaskStatus::Idle;
                true
            }
            _ => false,
        }
    }

    pub fn progress(&self) -> Progress {
        Progress {
            map: StatusCounts::count(self.of_kind(TaskKind::Map)),
            reduce: StatusCounts::count(self.of_kind(TaskKind::Reduce)),
        }
    }

    /// True iff every task of both kinds has completed.
    pub fn is_done(&self) -> bool {
        self.tasks.iter().all(Task::is_completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map_ref(id: u32) -> TaskRef {
        TaskRef::new(TaskKind::Map, id)
    }

    fn reduce_ref(id: u32) -> TaskRef {
        TaskRef::new(TaskKind::Reduce, id)
    }

    fn assign_task(registry: &mut TaskRegistry) -> (TaskDescriptor, Lease) {
        let (descriptor, lease) = registry.assign().unwrap();
        (descriptor, lease.expect("expected a real task"))
    }

    #[test]
    fn rejects_zero_reduce_tasks() {
        assert_eq!(
            TaskRegistry::new(["a"], 0).unwrap_err(),
            Error::InvalidReduceCount
        );
    }

    #[test]
    fn creates_map_and_reduce_tasks() {
        let registry = TaskRegistry::new(["a.txt", "b.txt"], 3).unwrap();
        let progress = registry.progress();
        assert_eq!(progress.map.idle, 2);
        assert_eq!(progress.reduce.idle, 3);
        assert!(!registry.is_done());
        assert_eq!(
            registry.get(map_ref(1)).unwrap().input,
            crate::task::TaskInput::File("b.txt".into())
        );
    }

    #[test]
    fn reduce_tasks_know_how_many_maps_ran() {
        let mut registry = TaskRegistry::new(["a", "b", "c"], 2).unwrap();
        for _ in 0..3 {
            let (map, _) = assign_task(&mut registry);
            registry.complete(map.task_ref()).unwrap();
        }
        let (reduce, _) = assign_task(&mut registry);
        assert_eq!(reduce, TaskDescriptor::Reduce { id: 0, n_map: 3 });
    }

    #[test]
    fn hands_out_maps_then_waits_for_the_barrier() {
        let mut registry = TaskRegistry::new(["a.txt", "b.txt"], 2).unwrap();

        let (first, _) = assign_task(&mut registry);
        let (second, _) = assign_task(&mut registry);
        assert_eq!(first.kind(), TaskKind::Map);
        assert_eq!(second.kind(), TaskKind::Map);
        assert_ne!(first.task_ref(), second.task_ref());

        // Every map is in flight: reduce work must not leak out.
        assert_eq!(registry.assign().unwrap(), (TaskDescriptor::Wait, None));

        registry.complete(first.task_ref()).unwrap();
        assert_eq!(registry.assign().unwrap(), (TaskDescriptor::Wait, None));

        registry.complete(second.task_ref()).unwrap();
        let (reduce, _) = assign_task(&mut registry);
        assert_eq!(reduce.kind(), TaskKind::Reduce);
        assert!(registry.is_mapping_complete());
    }

    #[test]
    fn reduce_is_only_assigned_after_every_map_completed() {
        let mut registry = TaskRegistry::new(["a", "b", "c"], 2).unwrap();
        let mut leases = Vec::new();
        let mut waits = 0;
        loop {
            match registry.assign() {
                Ok((TaskDescriptor::Reduce { .. }, _)) => {
                    assert!(registry
                        .tasks()
                        .iter()
                        .filter(|t| t.kind == TaskKind::Map)
                        .all(Task::is_completed));
                }
                Ok((TaskDescriptor::Map { id, .. }, Some(lease))) => {
                    leases.push(lease);
                    if id % 2 == 0 {
                        registry.complete(map_ref(id)).unwrap();
                    }
                }
                Ok((TaskDescriptor::Wait, _)) => {
                    // First stall: let the leases run out. Afterwards: finish the stragglers.
                    if waits == 0 {
                        for lease in leases.drain(..) {
                            registry.expire(lease);
                        }
                    } else {
                        for id in 0..3 {
                            if registry.get(map_ref(id)).unwrap().status == TaskStatus::Assigned {
                                registry.complete(map_ref(id)).unwrap();
                            }
                        }
                    }
                    waits += 1;
                }
                Ok(other) => panic!("unexpected assignment {other:?}"),
                Err(Error::NoTask) => break,
                Err(e) => panic!("unexpected error {e}"),
            }
        }
        assert_eq!(registry.progress().reduce.assigned, 2);
    }

    #[test]
    fn no_task_once_everything_is_in_flight_or_done() {
        let mut registry = TaskRegistry::new(["a"], 1).unwrap();
        let (map, _) = assign_task(&mut registry);
        registry.complete(map.task_ref()).unwrap();
        let (reduce, _) = assign_task(&mut registry);
        assert_eq!(registry.assign().unwrap_err(), Error::NoTask);

        registry.complete(reduce.task_ref()).unwrap();
        assert_eq!(registry.assign().unwrap_err(), Error::NoTask);
        assert!(registry.is_done());
    }

    #[test]
    fn completion_is_idempotent() {
        let mut registry = TaskRegistry::new(["a"], 1).unwrap();
        let (map, _) = assign_task(&mut registry);

        assert!(registry.complete(map.task_ref()).unwrap());
        let after_first = registry.tasks().to_vec();
        assert!(!registry.complete(map.task_ref()).unwrap());
        assert_eq!(registry.tasks(), after_first.as_slice());
    }

    #[test]
    fn completion_of_unknown_task_is_not_found() {
        let mut registry = TaskRegistry::new(["a"], 2).unwrap();
        assert_eq!(
            registry.complete(map_ref(5)).unwrap_err(),
            Error::TaskNotFound(map_ref(5))
        );
        assert_eq!(
            registry.complete(reduce_ref(2)).unwrap_err(),
            Error::TaskNotFound(reduce_ref(2))
        );
    }

    #[test]
    fn wait_signal_completion_is_a_no_op() {
        let mut registry = TaskRegistry::new(["a"], 1).unwrap();
        let before = registry.tasks().to_vec();
        assert!(!registry.complete(TaskDescriptor::Wait.task_ref()).unwrap());
        assert_eq!(registry.tasks(), before.as_slice());
    }

    #[test]
    fn expired_lease_returns_task_to_idle() {
        let mut registry = TaskRegistry::new(["a"], 1).unwrap();
        let (map, lease) = assign_task(&mut registry);

        assert!(registry.expire(lease));
        assert_eq!(registry.get(map.task_ref()).unwrap().status, TaskStatus::Idle);

        // The same task is handed out again under a new attempt.
        let (again, second) = assign_task(&mut registry);
        assert_eq!(again, map);
        assert_eq!(second.attempt, lease.attempt + 1);
    }

    #[test]
    fn expiry_never_reverts_a_completed_task() {
        let mut registry = TaskRegistry::new(["a"], 1).unwrap();
        let (map, lease) = assign_task(&mut registry);
        registry.complete(map.task_ref()).unwrap();

        assert!(!registry.expire(lease));
        assert_eq!(
            registry.get(map.task_ref()).unwrap().status,
            TaskStatus::Completed
        );
    }

    #[test]
    fn stale_lease_does_not_cut_a_newer_attempt_short() {
        let mut registry = TaskRegistry::new(["a"], 1).unwrap();
        let (_, first) = assign_task(&mut registry);
        assert!(registry.expire(first));
        let (map, second) = assign_task(&mut registry);

        assert!(!registry.expire(first));
        assert_eq!(
            registry.get(map.task_ref()).unwrap().status,
            TaskStatus::Assigned
        );
        assert!(registry.expire(second));
    }

    #[test]
    fn late_report_from_an_expired_attempt_still_completes() {
        let mut registry = TaskRegistry::new(["a"], 1).unwrap();
        let (map, lease) = assign_task(&mut registry);
        assert!(registry.expire(lease));

        registry.complete(map.task_ref()).unwrap();
        assert!(registry.is_mapping_complete());
    }

    #[test]
    fn job_without_inputs_only_reduces() {
        let mut registry = TaskRegistry::new(Vec::<String>::new(), 2).unwrap();
        assert!(registry.is_mapping_complete());
        let (task, _) = assign_task(&mut registry);
        assert_eq!(task.kind(), TaskKind::Reduce);
    }

    #[test]
    fn progress_counts_each_status() {
        let mut registry = TaskRegistry::new(["a", "b"], 1).unwrap();
        let (map, _) = assign_task(&mut registry);
        registry.complete(map.task_ref()).unwrap();
        assign_task(&mut registry);

        let progress = registry.progress();
        assert_eq!(
            progress.map,
            StatusCounts {
                idle: 0,
                assigned: 1,
                completed: 1
            }
        );
        assert_eq!(progress.reduce.idle, 1);
        assert!(!progress.is_done());
    }
}
