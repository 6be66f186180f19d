//! Per-token exit priority queue.

use std::collections::BTreeSet;

use plasma_primitives::Age;

use crate::claim::ExitId;

/// Unresolved exits of one root token ordered by `(age, exit_id)`
#[derive(Debug, Clone, Default)]
pub struct ExitQueue {
    entries: BTreeSet<(Age, ExitId)>,
}

impl ExitQueue {
    pub fn insert(&mut self, age: Age, exit_id: ExitId) -> bool {
        self.entries.insert((age, exit_id))
    }

    pub fn remove(&mut self, age: Age, exit_id: ExitId) -> bool {
        self.entries.remove(&(age, exit_id))
    }

    /// Highest priority entry
    pub fn head(&self) -> Option<(Age, ExitId)> {
        self.entries.first().copied()
    }

    /// First entry ordered strictly before `(age, exit_id)`, if any
    pub fn ahead_of(&self, age: Age, exit_id: ExitId) -> Option<ExitId> {
        self.head()
            .filter(|head| *head < (age, exit_id))
            .map(|(_, id)| id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Age, ExitId)> {
        self.entries.iter()
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
    use plasma_predicates::ExitOutput;
    use proptest::prelude::*;

    fn entry(block: u64, burn: bool) -> (Age, ExitId) {
        let age = Age::pack(10_000, block, 0, 0).unwrap();
        (age, ExitId::derive(age, ExitOutput::Transferred, burn))
    }

    #[test]
    fn test_ahead_of() {
        let mut queue = ExitQueue::default();
        let (old_age, old_id) = entry(1, false);
        let (new_age, new_id) = entry(2, false);
        queue.insert(new_age, new_id);
        assert_eq!(queue.ahead_of(new_age, new_id), None);

        queue.insert(old_age, old_id);
        assert_eq!(queue.ahead_of(new_age, new_id), Some(old_id));
        assert_eq!(queue.ahead_of(old_age, old_id), None);

        assert!(queue.remove(old_age, old_id));
        assert!(!queue.remove(old_age, old_id));
        assert_eq!(queue.head(), Some((new_age, new_id)));
    }

    #[test]
    fn test_equal_age_orders_by_id() {
        let mut queue = ExitQueue::default();
        let (age, burn_id) = entry(4, true);
        let (_, plain_id) = entry(4, false);
        queue.insert(age, burn_id);
        queue.insert(age, plain_id);
        assert_eq!(queue.head(), Some((age, plain_id)));
        assert_eq!(queue.len(), 2);
    }

    proptest! {
        #[test]
        fn test_head_is_minimum(blocks in prop::collection::vec((0u64..1_000, any::<bool>()), 1..40)) {
            let mut queue = ExitQueue::default();
            for (block, burn) in &blocks {
                let (age, id) = entry(*block, *burn);
                queue.insert(age, id);
            }
            let minimum = blocks.iter().map(|(block, burn)| entry(*block, *burn)).min();
            prop_assert_eq!(queue.head(), minimum);

            let mut drained = Vec::new();
            while let Some((age, id)) = queue.head() {
                prop_assert!(queue.remove(age, id));
                drained.push((age, id));
            }
            prop_assert!(drained.windows(2).all(|pair| pair[0] < pair[1]));
        }
    }
}
