//! Named task scheduling
//!
//! The scheduler does not run anything itself. The owner asks it which tasks are
//! due at a given instant and dispatches them by name:
//!
//! ```text
//!   owner.tick(now) ──► scheduler.due(now) ──► ["poll:BTC", "metrics", ...]
//!                                │
//!                                └── repeating tasks are re-armed at due + interval
//! ```

use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Duration;
use log::debug;
use meridian_core::Timestamp;
use priority_queue::PriorityQueue;

/// Shared cancellation flag handed out for every scheduled task
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// How a task recurs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Once,
    Repeating(Duration),
}

#[derive(Debug)]
struct ScheduledTask {
    kind: TaskKind,
    token: CancellationToken,
}

/// Earliest due first; equal due times fire in scheduling order
type DueKey = Reverse<(Timestamp, u64)>;

/// Queue of named one-shot and repeating tasks ordered by due time
#[derive(Debug, Default)]
pub struct Scheduler {
    queue: PriorityQueue<String, DueKey>,
    tasks: HashMap<String, ScheduledTask>,
    seq: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a task to fire once at `at`
    ///
    /// Scheduling a name that already exists replaces (and cancels) the old task.
    pub fn schedule_once(&mut self, name: impl Into<String>, at: Timestamp) -> CancellationToken {
        self.insert(name.into(), TaskKind::Once, at)
    }

    /// Schedule a task to fire at `first_due` and then every `interval`
    ///
    /// Non-positive intervals are treated as one-shot tasks.
    pub fn schedule_repeating(
        &mut self,
        name: impl Into<String>,
        interval: Duration,
        first_due: Timestamp,
    ) -> CancellationToken {
        let kind = if interval > Duration::zero() {
            TaskKind::Repeating(interval)
        } else {
            TaskKind::Once
        };
        self.insert(name.into(), kind, first_due)
    }

    fn insert(&mut self, name: String, kind: TaskKind, due: Timestamp) -> CancellationToken {
        if let Some(old) = self.tasks.remove(&name) {
            old.token.cancel();
        }
        let token = CancellationToken::new();
        self.seq += 1;
        self.queue.push(name.clone(), Reverse((due, self.seq)));
        debug!("[SCHED] Scheduled '{}' ({:?}) at {}", name, kind, due);
        self.tasks.insert(
            name,
            ScheduledTask {
                kind,
                token: token.clone(),
            },
        );
        token
    }

    /// Cancel a task by name. Returns false if no such task exists.
    pub fn cancel(&mut self, name: &str) -> bool {
        match self.tasks.remove(name) {
            Some(task) => {
                task.token.cancel();
                self.queue.remove(name);
                debug!("[SCHED] Cancelled '{}'", name);
                true
            }
            None => false,
        }
    }

    /// Cancel every task
    pub fn clear(&mut self) {
        for task in self.tasks.values() {
            task.token.cancel();
        }
        self.tasks.clear();
        self.queue.clear();
    }

    /// Pop every task due at or before `now`, in due order
    ///
    /// Repeating tasks fire at most once per call and are re-armed at the first
    /// interval boundary after `now`. Tasks whose token was cancelled externally
    /// are dropped without firing.
    pub fn due(&mut self, now: Timestamp) -> Vec<String> {
        let mut fired = Vec::new();
        let mut rearm = Vec::new();

        while let Some((_, Reverse((due, _)))) = self.queue.peek() {
            if *due > now {
                break;
            }
            let Some((name, Reverse((due, _)))) = self.queue.pop() else {
                break;
            };
            let Some(task) = self.tasks.get(&name) else {
                continue;
            };
            if task.token.is_cancelled() {
                self.tasks.remove(&name);
                continue;
            }
            match task.kind {
                TaskKind::Once => {
                    self.tasks.remove(&name);
                }
                TaskKind::Repeating(interval) => {
                    let mut next = due + interval;
                    while next <= now {
                        next += interval;
                    }
                    rearm.push((name.clone(), next));
                }
            }
            fired.push(name);
        }

        for (name, next) in rearm {
            self.seq += 1;
            self.queue.push(name, Reverse((next, self.seq)));
        }
        fired
    }

    pub fn is_scheduled(&self, name: &str) -> bool {
        self.tasks
            .get(name)
            .is_some_and(|task| !task.token.is_cancelled())
    }

    /// Due time of the earliest task
    pub fn next_due(&self) -> Option<Timestamp> {
        self.queue.peek().map(|(_, Reverse((due, _)))| *due)
    }

    pub fn task_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tasks.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
