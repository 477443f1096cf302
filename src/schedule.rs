//! Tick-indexed deferred events.

use serde::Serialize;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduledEvent {
    RespawnSpider,
}

/// Min-heap of events keyed by due tick. Events due on the same tick come out in
/// scheduling order.
#[derive(Clone, Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<Reverse<(u64, u64, ScheduledEvent)>>,
    next_seq: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, due: u64, event: ScheduledEvent) {
        self.heap.push(Reverse((due, self.next_seq, event)));
        self.next_seq += 1;
    }

    /// Pop every event due at or before `now`.
    pub fn drain_due(&mut self, now: u64) -> Vec<ScheduledEvent> {
        let mut due = Vec::new();
        while let Some(Reverse((tick, _, event))) = self.heap.peek().copied() {
            if tick > now {
                break;
            }
            self.heap.pop();
            due.push(event);
        }
        due
    }

    /// Outstanding events as `(due_tick, event)`, soonest first.
    pub fn pending(&self) -> Vec<(u64, ScheduledEvent)> {
        let mut entries: Vec<(u64, u64, ScheduledEvent)> =
            self.heap.iter().map(|Reverse(entry)| *entry).collect();
        entries.sort_unstable();
        entries
            .into_iter()
            .map(|(tick, _, event)| (tick, event))
            .collect()
    }

    pub fn cancel_all(&mut self) {
        self.heap.clear();
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drains_only_due_events_in_order() {
        let mut queue = EventQueue::new();
        queue.schedule(30, ScheduledEvent::RespawnSpider);
        queue.schedule(10, ScheduledEvent::RespawnSpider);
        queue.schedule(20, ScheduledEvent::RespawnSpider);

        assert!(queue.drain_due(9).is_empty());
        assert_eq!(queue.drain_due(20).len(), 2);
        assert_eq!(queue.pending(), vec![(30, ScheduledEvent::RespawnSpider)]);
        assert_eq!(queue.drain_due(100).len(), 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn cancel_all_discards_everything() {
        let mut queue = EventQueue::new();
        queue.schedule(5, ScheduledEvent::RespawnSpider);
        queue.schedule(6, ScheduledEvent::RespawnSpider);
        assert_eq!(queue.len(), 2);
        queue.cancel_all();
        assert!(queue.drain_due(u64::MAX).is_empty());
    }
}
