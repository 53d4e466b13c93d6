//! Cancellable deadline queue.
//!
//! Holds every pending wake-up the frame driver has requested. Cancelling
//! a timer removes it from the queue outright, so a stale deadline can
//! never fire into state that has since been reset.

use std::collections::{BTreeMap, HashMap};

/// Handle returned by [`TimerQueue::schedule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Debug, Clone)]
pub struct TimerQueue<T> {
    next_id: u64,
    /// Ordered by (due, id) so equal deadlines fire in scheduling order.
    entries: BTreeMap<(u64, u64), T>,
    due_by_id: HashMap<u64, u64>,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            entries: BTreeMap::new(),
            due_by_id: HashMap::new(),
        }
    }

    pub fn schedule(&mut self, due_ms: u64, payload: T) -> TimerId {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.insert((due_ms, id), payload);
        self.due_by_id.insert(id, due_ms);
        TimerId(id)
    }

    /// Remove a pending timer. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        match self.due_by_id.remove(&id.0) {
            Some(due) => self.entries.remove(&(due, id.0)).is_some(),
            None => false,
        }
    }

    pub fn next_due(&self) -> Option<u64> {
        self.entries.keys().next().map(|(due, _)| *due)
    }

    /// Remove and return the earliest timer due at or before `now_ms`.
    pub fn pop_due(&mut self, now_ms: u64) -> Option<(TimerId, T)> {
        let (&(due, id), _) = self.entries.iter().next()?;
        if due > now_ms {
            return None;
        }
        self.due_by_id.remove(&id);
        self.entries
            .remove(&(due, id))
            .map(|payload| (TimerId(id), payload))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_in_deadline_order() {
        let mut q = TimerQueue::new();
        q.schedule(30, "c");
        q.schedule(10, "a");
        q.schedule(20, "b");
        assert_eq!(q.next_due(), Some(10));
        assert!(q.pop_due(5).is_none());

        let popped: Vec<&str> = std::iter::from_fn(|| q.pop_due(25).map(|(_, p)| p)).collect();
        assert_eq!(popped, vec!["a", "b"]);
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn equal_deadlines_keep_scheduling_order() {
        let mut q = TimerQueue::new();
        q.schedule(10, 1);
        q.schedule(10, 2);
        assert_eq!(q.pop_due(10).map(|(_, p)| p), Some(1));
        assert_eq!(q.pop_due(10).map(|(_, p)| p), Some(2));
    }

    #[test]
    fn cancelled_timers_never_fire() {
        let mut q = TimerQueue::new();
        let a = q.schedule(10, "a");
        let b = q.schedule(20, "b");
        assert!(q.cancel(a));
        assert!(!q.cancel(a));
        assert_eq!(q.len(), 1);
        assert_eq!(q.next_due(), Some(20));

        let (id, payload) = q.pop_due(100).unwrap();
        assert_eq!((id, payload), (b, "b"));
        assert!(!q.cancel(b));
        assert!(q.is_empty());
    }
}
