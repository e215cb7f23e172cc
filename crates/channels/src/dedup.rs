use std::collections::{HashSet, VecDeque};

/// Default ring capacity; sized for a few minutes of redelivery window on a
/// busy channel without unbounded growth.
pub const DEFAULT_DEDUP_CAPACITY: usize = 2048;

/// Fixed-capacity set of recently seen message identifiers with strict FIFO
/// eviction, used to suppress redelivered platform events.
///
/// Instance-owned: each adapter constructs its own ring so independent
/// adapter instances (and tests) never share state. No guarantee survives a
/// process restart.
#[derive(Debug)]
pub struct DedupRing {
    order: VecDeque<String>,
    seen: HashSet<String>,
    capacity: usize,
}

impl Default for DedupRing {
    fn default() -> Self {
        Self::new(DEFAULT_DEDUP_CAPACITY)
    }
}

impl DedupRing {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            order: VecDeque::with_capacity(capacity),
            seen: HashSet::with_capacity(capacity),
            capacity,
        }
    }

    /// Test-and-insert: returns `true` if `id` was already recorded,
    /// otherwise records it and returns `false`.
    ///
    /// Empty ids mean "no id available" and are never deduplicated.
    pub fn is_duplicate(&mut self, id: &str) -> bool {
        if id.is_empty() {
            return false;
        }
        if self.seen.contains(id) {
            return true;
        }
        if self.order.len() == self.capacity
            && let Some(oldest) = self.order.pop_front()
        {
            self.seen.remove(&oldest);
        }
        self.order.push_back(id.to_owned());
        self.seen.insert(id.to_owned());
        false
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
