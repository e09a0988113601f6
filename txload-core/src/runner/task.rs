use std::future::Future;
use std::pin::Pin;

use rand::Rng;
use rand::distr::Distribution as _;
use rand::distr::weighted::WeightedIndex;

use super::error::{Error, Result};
use super::user::UserContext;

pub type TaskFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// Task body: receives the user's private session state and its context.
pub type TaskFn<S> = for<'a> fn(&'a mut S, &'a mut UserContext) -> TaskFuture<'a>;

pub struct Task<S> {
    name: &'static str,
    weight: u32,
    handler: TaskFn<S>,
}

impl<S> Task<S> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn weight(&self) -> u32 {
        self.weight
    }

    pub fn handler(&self) -> TaskFn<S> {
        self.handler
    }
}

impl<S> std::fmt::Debug for Task<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("weight", &self.weight)
            .finish_non_exhaustive()
    }
}

/// Weighted task registry for one kind of simulated user.
pub struct TaskSet<S> {
    tasks: Vec<Task<S>>,
}

impl<S> Default for TaskSet<S> {
    fn default() -> Self {
        Self { tasks: Vec::new() }
    }
}

impl<S> std::fmt::Debug for TaskSet<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(&self.tasks).finish()
    }
}

impl<S> TaskSet<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task. A weight of 0 leaves the task out of the registry.
    #[must_use]
    pub fn register(mut self, name: &'static str, weight: u32, handler: TaskFn<S>) -> Self {
        if weight > 0 {
            self.tasks.push(Task {
                name,
                weight,
                handler,
            });
        }
        self
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Task<S>> {
        self.tasks.get(idx)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.tasks.iter().map(|t| t.name).collect()
    }

    pub fn weight_of(&self, name: &str) -> Option<u32> {
        self.tasks.iter().find(|t| t.name == name).map(Task::weight)
    }

    pub fn picker(&self) -> Result<TaskPicker> {
        TaskPicker::new(self.tasks.iter().map(Task::weight))
    }
}

/// Weighted random selection over a [`TaskSet`], by index.
#[derive(Debug, Clone)]
pub struct TaskPicker {
    index: WeightedIndex<u32>,
}

impl TaskPicker {
    pub fn new(weights: impl IntoIterator<Item = u32>) -> Result<Self> {
        let index = WeightedIndex::new(weights).map_err(|_| Error::NoTasks)?;
        Ok(Self { index })
    }

    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        self.index.sample(rng)
    }
}
