//! Min-ordered queue of regrowth ticks shared by every node.

use std::{cmp::Reverse, collections::BinaryHeap, time::Duration};

use hearthvale_core::NodeKey;

/// One pending regrowth increment.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct ScheduledTick {
    /// Clock reading at which the increment fires.
    pub(crate) due: Duration,
    /// Insertion order, so ties fire first-in first-out.
    pub(crate) sequence: u64,
    /// Node receiving the increment.
    pub(crate) key: NodeKey,
    /// Schedule generation the tick belongs to; stale generations are skipped.
    pub(crate) generation: u64,
}

/// Single scheduler driving regrowth for all nodes from one clock.
#[derive(Debug, Default)]
pub(crate) struct RegrowthScheduler {
    queue: BinaryHeap<Reverse<ScheduledTick>>,
    next_sequence: u64,
}

impl RegrowthScheduler {
    pub(crate) fn schedule(&mut self, due: Duration, key: NodeKey, generation: u64) {
        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.wrapping_add(1);
        self.queue.push(Reverse(ScheduledTick {
            due,
            sequence,
            key,
            generation,
        }));
    }

    /// Removes and returns the earliest tick due at or before `now`.
    pub(crate) fn pop_due(&mut self, now: Duration) -> Option<ScheduledTick> {
        let Reverse(head) = self.queue.peek()?;
        if head.due > now {
            return None;
        }
        self.queue.pop().map(|Reverse(tick)| tick)
    }
}

#[cfg(test)]
mod tests {
    use hearthvale_core::{NodeKind, Tile};

    use super::*;

    fn key(x: u32) -> NodeKey {
        NodeKey::new(NodeKind::new("tree"), Tile::new(x, 0))
    }

    #[test]
    fn pops_in_due_order_then_insertion_order() {
        let mut scheduler = RegrowthScheduler::default();
        scheduler.schedule(Duration::from_secs(5), key(1), 0);
        scheduler.schedule(Duration::from_secs(2), key(2), 0);
        scheduler.schedule(Duration::from_secs(2), key(3), 0);

        assert!(scheduler.pop_due(Duration::from_secs(1)).is_none());

        let now = Duration::from_secs(10);
        let order: Vec<u32> = std::iter::from_fn(|| scheduler.pop_due(now))
            .map(|tick| tick.key.tile.x())
            .collect();
        assert_eq!(order, vec![2, 3, 1]);
        assert!(scheduler.pop_due(Duration::MAX).is_none());
    }
}
