use std::collections::VecDeque;

use crate::models::Snapshot;

/// Bounded append-only log of presence snapshots, kept for trend display.
/// Oldest entries are evicted once the capacity is reached.
#[derive(Debug)]
pub struct HistoryBuffer {
    entries: VecDeque<Snapshot>,
    capacity: usize,
}

impl HistoryBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, snapshot: Snapshot) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(snapshot);
    }

    /// The last `limit` snapshots in chronological order.
    pub fn recent(&self, limit: usize) -> Vec<Snapshot> {
        let skip = self.entries.len().saturating_sub(limit);
        self.entries.iter().skip(skip).copied().collect()
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
    use crate::models::Item;

    fn only(item: Item) -> Snapshot {
        Snapshot::from_fn(|candidate| candidate == item)
    }

    #[test]
    fn keeps_only_the_most_recent_entries() {
        let mut history = HistoryBuffer::new(2);
        history.push(only(Item::Helmet));
        history.push(only(Item::Goggle));
        history.push(only(Item::Vest));

        assert_eq!(history.len(), 2);
        assert_eq!(history.recent(10), vec![only(Item::Goggle), only(Item::Vest)]);
    }

    #[test]
    fn recent_returns_the_tail_in_chronological_order() {
        let mut history = HistoryBuffer::new(10);
        history.push(only(Item::Helmet));
        history.push(only(Item::Goggle));
        history.push(only(Item::Vest));

        assert_eq!(history.recent(2), vec![only(Item::Goggle), only(Item::Vest)]);
    }

    #[test]
    fn empty_buffer_has_no_recent_entries() {
        let history = HistoryBuffer::new(4);
        assert!(history.is_empty());
        assert!(history.recent(5).is_empty());
    }
}
