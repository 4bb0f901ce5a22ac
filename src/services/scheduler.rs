//! Deferred-task scheduling.
//!
//! Every wait in the shell core is expressed as "run this task after a
//! delay" — creation polls, theme-color retries, the engine work pump.
//! [`TaskScheduler`] is the collaborator interface; [`TaskQueue`] is the
//! due-time-ordered implementation the GUI loop, the console demo and the
//! tests all drive. Nothing here blocks: the owner of the queue decides
//! when time advances.

use crate::types::engine::DeferredTask;

/// Schedules a deferred task to run after `delay_ms`.
pub trait TaskScheduler {
    fn schedule(&mut self, delay_ms: u64, task: DeferredTask);
}

/// A manually-clocked task queue.
///
/// Tasks fire in (due time, insertion order). The clock only moves when
/// [`advance`](TaskQueue::advance) is called, which makes retry timing
/// fully deterministic under test.
pub struct TaskQueue {
    now_ms: u64,
    seq: u64,
    entries: Vec<Entry>,
}

struct Entry {
    due_ms: u64,
    seq: u64,
    task: DeferredTask,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self {
            now_ms: 0,
            seq: 0,
            entries: Vec::new(),
        }
    }

    /// Current queue clock in milliseconds.
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Number of tasks waiting to fire.
    pub fn pending(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Due time of the earliest pending task, if any.
    pub fn next_due_ms(&self) -> Option<u64> {
        self.entries.iter().map(|e| e.due_ms).min()
    }

    /// Advance the clock by `delta_ms` and drain every task that came due,
    /// in firing order.
    pub fn advance(&mut self, delta_ms: u64) -> Vec<DeferredTask> {
        self.now_ms += delta_ms;
        let now = self.now_ms;

        let mut due: Vec<Entry> = Vec::new();
        let mut remaining: Vec<Entry> = Vec::new();
        for entry in self.entries.drain(..) {
            if entry.due_ms <= now {
                due.push(entry);
            } else {
                remaining.push(entry);
            }
        }
        self.entries = remaining;

        due.sort_by_key(|e| (e.due_ms, e.seq));
        due.into_iter().map(|e| e.task).collect()
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskScheduler for TaskQueue {
    fn schedule(&mut self, delay_ms: u64, task: DeferredTask) {
        let entry = Entry {
            due_ms: self.now_ms + delay_ms,
            seq: self.seq,
            task,
        };
        self.seq += 1;
        self.entries.push(entry);
    }
}
