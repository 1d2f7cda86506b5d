//! Deferred computations.
//!
//! A `Deferred<T>` is a description of work whose result is produced the
//! first time somebody asks for it and then shared by every clone. The
//! `TaskTable` hands out one deferred value per `TaskKey`, which is what makes
//! identical sub-requests collapse to a single execution.
use super::error::ComputationError;
use rayon::prelude::*;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock};

/// Memoization identity of a generation call: `(node name, start, count)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskKey {
    pub name: String,
    pub start: usize,
    pub n: usize,
}

impl TaskKey {
    pub fn new(name: impl Into<String>, start: usize, n: usize) -> Self {
        Self { name: name.into(), start, n }
    }
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "('{}', {}, {})", self.name, self.start, self.n)
    }
}

type Job<T> = Box<dyn FnOnce() -> Result<T, ComputationError> + Send>;

struct Thunk<T> {
    key: Option<TaskKey>,
    value: OnceLock<Result<T, ComputationError>>,
    job: Mutex<Option<Job<T>>>,
}

pub struct Deferred<T> {
    thunk: Arc<Thunk<T>>,
}

impl<T> Clone for Deferred<T> {
    fn clone(&self) -> Self {
        Self { thunk: Arc::clone(&self.thunk) }
    }
}

impl<T> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("key", &self.thunk.key)
            .field("ready", &self.thunk.value.get().is_some())
            .finish()
    }
}

impl<T> Deferred<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new<F>(key: Option<TaskKey>, job: F) -> Self
    where
        F: FnOnce() -> Result<T, ComputationError> + Send + 'static,
    {
        Self {
            thunk: Arc::new(Thunk {
                key,
                value: OnceLock::new(),
                job: Mutex::new(Some(Box::new(job))),
            }),
        }
    }

    /// An already evaluated value.
    pub fn ready(value: T) -> Self {
        let cell = OnceLock::new();
        let _ = cell.set(Ok(value));
        Self {
            thunk: Arc::new(Thunk { key: None, value: cell, job: Mutex::new(None) }),
        }
    }

    pub fn key(&self) -> Option<&TaskKey> { self.thunk.key.as_ref() }

    pub fn is_ready(&self) -> bool { self.thunk.value.get().is_some() }

    /// Both handles refer to the same computation.
    pub fn ptr_eq(&self, other: &Self) -> bool { Arc::ptr_eq(&self.thunk, &other.thunk) }

    /// Forces the value. The job runs at most once; later calls, from any
    /// clone or thread, get the memoized result.
    pub fn compute(&self) -> Result<T, ComputationError> {
        self.thunk.value.get_or_init(|| self.run()).clone()
    }

    fn run(&self) -> Result<T, ComputationError> {
        let job = self.thunk.job.lock().ok().and_then(|mut slot| slot.take());
        match job {
            Some(job) => job(),
            None => Err(ComputationError::Abandoned(
                self.thunk.key.as_ref().map_or_else(|| "anonymous task".to_string(), |k| k.to_string()),
            )),
        }
    }

    /// A new deferred value applying `f` to this one's result.
    pub fn map<U, F>(&self, key: Option<TaskKey>, f: F) -> Deferred<U>
    where
        U: Clone + Send + Sync + 'static,
        F: FnOnce(T) -> Result<U, ComputationError> + Send + 'static,
    {
        let source = self.clone();
        Deferred::new(key, move || f(source.compute()?))
    }
}

/// Forces several deferred values, in parallel when `parallel` is set.
///
/// Jobs force their own inputs sequentially, so a worker that is filling a
/// memo slot never waits on stolen work. That only holds while jobs stay off
/// the rayon pool: a job that calls into rayon itself can, while blocked,
/// steal another item forcing the slot it is filling, which never returns.
/// Models whose functions use rayon internally must force with
/// `parallel = false`.
pub fn compute_all<T>(values: &[Deferred<T>], parallel: bool) -> Result<Vec<T>, ComputationError>
where
    T: Clone + Send + Sync + 'static,
{
    if parallel {
        values.par_iter().map(Deferred::compute).collect()
    } else {
        values.iter().map(Deferred::compute).collect()
    }
}

/// One deferred value per key for the lifetime of the table.
pub struct TaskTable<T> {
    tasks: HashMap<TaskKey, Deferred<T>>,
}

impl<T> Default for TaskTable<T> {
    fn default() -> Self {
        Self { tasks: HashMap::new() }
    }
}

impl<T> fmt::Debug for TaskTable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskTable").field("tasks", &self.tasks.len()).finish()
    }
}

impl<T> TaskTable<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self { Self::default() }
    pub fn len(&self) -> usize { self.tasks.len() }
    pub fn is_empty(&self) -> bool { self.tasks.is_empty() }

    pub fn get(&self, key: &TaskKey) -> Option<Deferred<T>> {
        self.tasks.get(key).cloned()
    }

    /// Returns the deferred value registered under `key`, creating it from
    /// `job` only if the key has not been seen before.
    pub fn delayed<F>(&mut self, key: TaskKey, job: F) -> Deferred<T>
    where
        F: FnOnce() -> Result<T, ComputationError> + Send + 'static,
    {
        self.tasks
            .entry(key.clone())
            .or_insert_with(|| Deferred::new(Some(key), job))
            .clone()
    }
}
