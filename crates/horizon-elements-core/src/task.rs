//! Microtask queue for work deferred until the current dispatch finishes.
//!
//! The document drains this queue at every microtask checkpoint: after a
//! top-level event dispatch and after each batch of fired timers.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

/// A unique identifier for a queued microtask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

impl TaskId {
    /// Get the raw u64 value of this task ID.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

fn next_task_id() -> TaskId {
    TaskId(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed))
}

/// A boxed microtask closure.
pub type BoxedTask = Box<dyn FnOnce() + Send + 'static>;

struct TaskData {
    id: TaskId,
    task: BoxedTask,
}

/// FIFO queue of pending microtasks.
///
/// The queue only stores tasks; running them is the caller's job so that no
/// lock around the queue is held while a task executes.
#[derive(Default)]
pub struct TaskQueue {
    tasks: VecDeque<TaskData>,
}

impl TaskQueue {
    /// Create an empty task queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a task.
    ///
    /// Returns the task ID that can be used to cancel the task.
    pub fn post<F>(&mut self, task: F) -> TaskId
    where
        F: FnOnce() + Send + 'static,
    {
        let id = next_task_id();
        self.tasks.push_back(TaskData {
            id,
            task: Box::new(task),
        });
        id
    }

    /// Cancel a pending task.
    ///
    /// Returns `true` if the task was found and cancelled.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        if let Some(pos) = self.tasks.iter().position(|t| t.id == id) {
            self.tasks.remove(pos);
            true
        } else {
            false
        }
    }

    /// Remove and return the oldest pending task.
    pub fn pop(&mut self) -> Option<BoxedTask> {
        self.tasks.pop_front().map(|data| data.task)
    }

    /// Check if there are any pending tasks.
    pub fn has_pending(&self) -> bool {
        !self.tasks.is_empty()
    }

    /// Get the number of pending tasks.
    pub fn pending_count(&self) -> usize {
        self.tasks.len()
    }
}

impl std::fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskQueue")
            .field("pending", &self.tasks.len())
            .finish()
    }
}
