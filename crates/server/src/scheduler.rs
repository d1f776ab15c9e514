//! Deadline-ordered task queue with cancellation.
//!
//! Tasks are not run by the scheduler: the owner polls [`Scheduler::drain_due`]
//! from its tick and acts on the returned payloads.

use std::collections::BTreeMap;

/// Handle for cancelling a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

#[derive(Debug)]
pub struct Scheduler<T> {
    next_id: u64,
    /// Keyed by (deadline, id) so iteration order is deadline order.
    tasks: BTreeMap<(u64, TaskId), T>,
    deadlines: BTreeMap<TaskId, u64>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            tasks: BTreeMap::new(),
            deadlines: BTreeMap::new(),
        }
    }

    /// Schedule `payload` to become due at `deadline_ms`.
    pub fn schedule(&mut self, deadline_ms: u64, payload: T) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.tasks.insert((deadline_ms, id), payload);
        self.deadlines.insert(id, deadline_ms);
        id
    }

    /// Cancel a pending task, returning its payload if it had not fired.
    pub fn cancel(&mut self, id: TaskId) -> Option<T> {
        let deadline = self.deadlines.remove(&id)?;
        self.tasks.remove(&(deadline, id))
    }

    /// Remove and return every task whose deadline is `<= now_ms`, in
    /// deadline order.
    pub fn drain_due(&mut self, now_ms: u64) -> Vec<(TaskId, T)> {
        let mut due = Vec::new();
        while let Some(entry) = self.tasks.first_entry() {
            let (deadline, id) = *entry.key();
            if deadline > now_ms {
                break;
            }
            let payload = entry.remove();
            self.deadlines.remove(&id);
            due.push((id, payload));
        }
        due
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
