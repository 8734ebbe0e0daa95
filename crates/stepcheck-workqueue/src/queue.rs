//! FIFO evaluation queue.

use std::collections::VecDeque;

use tracing::debug;

use crate::task::{ComponentTask, TaskStatus};

/// Tasks waiting for the browser, oldest first. Re-queued tasks go to the
/// back so a retry never jumps ahead of an untested component.
#[derive(Debug, Default)]
pub struct EvaluationQueue {
    tasks: VecDeque<ComponentTask>,
}

impl EvaluationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, mut task: ComponentTask) {
        task.status = TaskStatus::Queued;
        debug!(component = %task.id, attempt = task.attempt, "Enqueueing task");
        self.tasks.push_back(task);
    }

    pub fn dequeue(&mut self) -> Option<ComponentTask> {
        self.tasks.pop_front()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl FromIterator<ComponentTask> for EvaluationQueue {
    fn from_iter<I: IntoIterator<Item = ComponentTask>>(iter: I) -> Self {
        let mut queue = Self::new();
        for task in iter {
            queue.enqueue(task);
        }
        queue
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
