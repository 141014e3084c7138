//! Deadline-ordered one-shot timers owned by the loop thread.

use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

use super::LocalTask;

/// Identifies a scheduled timer so it can be cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Default)]
pub(crate) struct TimerQueue {
    next_id: u64,
    entries: BTreeMap<(Instant, TimerId), LocalTask>,
    deadlines: HashMap<TimerId, Instant>,
}

impl TimerQueue {
    pub(crate) fn schedule(&mut self, delay: Duration, task: LocalTask) -> TimerId {
        self.schedule_at(Instant::now() + delay, task)
    }

    pub(crate) fn schedule_at(&mut self, deadline: Instant, task: LocalTask) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        self.entries.insert((deadline, id), task);
        self.deadlines.insert(id, deadline);
        id
    }

    /// Removes a pending timer; returns false when it already fired.
    pub(crate) fn cancel(&mut self, id: TimerId) -> bool {
        self.deadlines
            .remove(&id)
            .and_then(|deadline| self.entries.remove(&(deadline, id)))
            .is_some()
    }

    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        self.entries.keys().next().map(|(deadline, _)| *deadline)
    }

    /// Takes the earliest timer whose deadline is at or before `now`.
    pub(crate) fn pop_due(&mut self, now: Instant) -> Option<LocalTask> {
        let key = *self.entries.keys().next()?;
        if key.0 > now {
            return None;
        }
        self.deadlines.remove(&key.1);
        self.entries.remove(&key)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_pending(&self, id: TimerId) -> bool {
        self.deadlines.contains_key(&id)
    }
}
