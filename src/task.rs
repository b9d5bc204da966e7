//! Task records and the descriptors handed to workers.

use std::fmt;

/// What a task does. `Wait` is never stored in the registry; it only tags
/// the transient signal telling a worker to come back later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Map,
    Reduce,
    Wait,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskKind::Map => "map",
            TaskKind::Reduce => "reduce",
            TaskKind::Wait => "wait",
        };
        f.write_str(name)
    }
}

/// Idle -> Assigned -> Completed. Assigned goes back to Idle only when a
/// lease expires; Completed is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    Idle,
    Assigned,
    Completed,
}

/// What a task works on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskInput {
    /// The source file of a map task.
    File(String),
    /// The bucket a reduce task merges.
    Bucket(u32),
}

/// A schedulable unit of work, owned by the [`TaskRegistry`](crate::registry::TaskRegistry).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: u32,
    pub kind: TaskKind,
    pub status: TaskStatus,
    pub input: TaskInput,
    /// Shape of the job: number of map and reduce tasks.
    pub n_map: u32,
    pub n_reduce: u32,
    /// Bumped on every assignment so that lease timers can tell attempts apart.
    pub attempt: u32,
}

impl Task {
    pub fn map(id: u32, file: impl Into<String>, n_map: u32, n_reduce: u32) -> Self {
        Self {
            id,
            kind: TaskKind::Map,
            status: TaskStatus::Idle,
            input: TaskInput::File(file.into()),
            n_map,
            n_reduce,
            attempt: 0,
        }
    }

    pub fn reduce(id: u32, n_map: u32, n_reduce: u32) -> Self {
        Self {
            id,
            kind: TaskKind::Reduce,
            status: TaskStatus::Idle,
            input: TaskInput::Bucket(id),
            n_map,
            n_reduce,
            attempt: 0,
        }
    }

    pub fn task_ref(&self) -> TaskRef {
        TaskRef::new(self.kind, self.id)
    }

    /// The copy of this task a worker receives.
    pub fn descriptor(&self) -> TaskDescriptor {
        match &self.input {
            TaskInput::File(input) => TaskDescriptor::Map {
                id: self.id,
                input: input.clone(),
                n_reduce: self.n_reduce,
            },
            TaskInput::Bucket(bucket) => TaskDescriptor::Reduce {
                id: *bucket,
                n_map: self.n_map,
            },
        }
    }

    #[inline]
    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }
}

/// Identifies a task by kind and id. Map and reduce ids are separate namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskRef {
    pub kind: TaskKind,
    pub id: u32,
}

impl TaskRef {
    pub fn new(kind: TaskKind, id: u32) -> Self {
        Self { kind, id }
    }
}

impl fmt::Display for TaskRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} task {}", self.kind, self.id)
    }
}

/// The answer to a task request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskDescriptor {
    /// Apply the map function to `input` and partition into `n_reduce` buckets.
    Map { id: u32, input: String, n_reduce: u32 },
    /// Merge bucket `id` from map tasks `0..n_map`.
    Reduce { id: u32, n_map: u32 },
    /// Mapping is still in flight; ask again later.
    Wait,
}

impl TaskDescriptor {
    pub fn kind(&self) -> TaskKind {
        match self {
            TaskDescriptor::Map { .. } => TaskKind::Map,
            TaskDescriptor::Reduce { .. } => TaskKind::Reduce,
            TaskDescriptor::Wait => TaskKind::Wait,
        }
    }

    /// The reference to report on completion.
    pub fn task_ref(&self) -> TaskRef {
        match self {
            TaskDescriptor::Map { id, .. } => TaskRef::new(TaskKind::Map, *id),
            TaskDescriptor::Reduce { id, .. } => TaskRef::new(TaskKind::Reduce, *id),
            TaskDescriptor::Wait => TaskRef::new(TaskKind::Wait, 0),
        }
    }
}
