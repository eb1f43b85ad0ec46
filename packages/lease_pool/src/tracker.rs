use std::collections::BTreeSet;

use crate::SlotId;

/// Classifies the slots of a pool as either free or busy.
///
/// The two sets are always disjoint. Between a successful `fill()` and the next `clear()`, their
/// union covers every slot of the pool. Outside that window both sets are empty.
///
/// The tracker is plain data; the pool keeps it behind its mutex.
#[derive(Debug, Default)]
pub(crate) struct Tracker {
    free: BTreeSet<SlotId>,
    busy: BTreeSet<SlotId>,
}

impl Tracker {
    /// Marks the first `count` slots as free, forgetting any earlier classification.
    pub(crate) fn fill(&mut self, count: usize) {
        self.busy.clear();
        self.free = (0..count).map(SlotId::new).collect();
    }

    /// Forgets every slot.
    pub(crate) fn clear(&mut self) {
        self.free.clear();
        self.busy.clear();
    }

    /// Moves the lowest free slot to the busy set and returns it.
    pub(crate) fn reserve(&mut self) -> Option<SlotId> {
        let id = self.free.pop_first()?;

        let inserted = self.busy.insert(id);
        debug_assert!(inserted, "slot {id} was free and busy at the same time");

        Some(id)
    }

    /// Moves a busy slot back to the free set.
    ///
    /// Returns `false` and changes nothing if the slot is not busy.
    pub(crate) fn release(&mut self, id: SlotId) -> bool {
        if !self.busy.remove(&id) {
            return false;
        }

        let inserted = self.free.insert(id);
        debug_assert!(inserted, "slot {id} was free and busy at the same time");

        true
    }

    #[must_use]
    pub(crate) fn is_busy(&self, id: SlotId) -> bool {
        self.busy.contains(&id)
    }

    #[must_use]
    pub(crate) fn free_len(&self) -> usize {
        self.free.len()
    }

    #[must_use]
    pub(crate) fn busy_len(&self) -> usize {
        self.busy.len()
    }

    #[must_use]
    pub(crate) fn has_free(&self) -> bool {
        !self.free.is_empty()
    }

    #[cfg(test)]
    fn is_disjoint(&self) -> bool {
        self.free.is_disjoint(&self.busy)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn default_is_empty() {
        let mut tracker = Tracker::default();

        assert_eq!(tracker.free_len(), 0);
        assert_eq!(tracker.busy_len(), 0);
        assert!(!tracker.has_free());
        assert!(tracker.reserve().is_none());
    }

    #[test]
    fn fill_marks_everything_free() {
        let mut tracker = Tracker::default();
        tracker.fill(3);

        assert_eq!(tracker.free_len(), 3);
        assert_eq!(tracker.busy_len(), 0);
        assert!(tracker.has_free());
    }

    #[test]
    fn reserve_takes_lowest_first() {
        let mut tracker = Tracker::default();
        tracker.fill(3);

        assert_eq!(tracker.reserve(), Some(SlotId::new(0)));
        assert_eq!(tracker.reserve(), Some(SlotId::new(1)));

        assert!(tracker.release(SlotId::new(0)));

        // 0 is lower than 2, so it wins even though 2 has been free for longer.
        assert_eq!(tracker.reserve(), Some(SlotId::new(0)));
        assert_eq!(tracker.reserve(), Some(SlotId::new(2)));
        assert_eq!(tracker.reserve(), None);

        assert_eq!(tracker.free_len(), 0);
        assert_eq!(tracker.busy_len(), 3);
        assert!(tracker.is_disjoint());
    }

    #[test]
    fn release_of_non_busy_slot_changes_nothing() {
        let mut tracker = Tracker::default();
        tracker.fill(2);

        let id = tracker.reserve().unwrap();
        assert!(tracker.release(id));

        // Double release.
        assert!(!tracker.release(id));
        // Never tracked at all.
        assert!(!tracker.release(SlotId::new(99)));

        assert_eq!(tracker.free_len(), 2);
        assert_eq!(tracker.busy_len(), 0);
        assert!(tracker.is_disjoint());
    }

    #[test]
    fn partition_holds_through_churn() {
        let mut tracker = Tracker::default();
        tracker.fill(5);

        let mut held = Vec::new();

        for round in 0..20_usize {
            if round % 3 == 2 {
                if let Some(id) = held.pop() {
                    assert!(tracker.release(id));
                }
            } else if let Some(id) = tracker.reserve() {
                assert!(tracker.is_busy(id));
                held.push(id);
            }

            assert_eq!(tracker.free_len() + tracker.busy_len(), 5);
            assert_eq!(tracker.busy_len(), held.len());
            assert!(tracker.is_disjoint());
        }
    }

    #[test]
    fn clear_forgets_busy_slots() {
        let mut tracker = Tracker::default();
        tracker.fill(2);
        let id = tracker.reserve().unwrap();

        tracker.clear();

        assert!(!tracker.is_busy(id));
        assert_eq!(tracker.free_len(), 0);
        assert_eq!(tracker.busy_len(), 0);
        assert!(!tracker.release(id));
    }

    #[test]
    fn fill_after_use_resets_classification() {
        let mut tracker = Tracker::default();
        tracker.fill(2);
        _ = tracker.reserve();

        tracker.fill(2);

        assert_eq!(tracker.free_len(), 2);
        assert_eq!(tracker.busy_len(), 0);
    }
}
