use crate::score::{ItemKey, Score, TrackedItem};

/// Outcome of offering one activation to the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Admission {
    /// Already tracked; score increased by one.
    Incremented,
    /// Free slot available; inserted with score one.
    Inserted,
    /// Store full; the lowest scorer fell below one and was replaced.
    Evicted { evicted: ItemKey },
    /// Store full and every tracked score is at least one; activation dropped.
    Rejected,
}

/// Capacity-bounded set of tracked items in insertion order.
///
/// Iteration order is insertion order, with a replacement appended at the
/// end. Eviction picks the first minimum in that order, so among equal
/// minima the oldest entry loses its slot. This tie-break is arbitrary but
/// stable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TopKStore {
    items: Vec<TrackedItem>,
    capacity: usize,
}

impl TopKStore {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    pub fn items(&self) -> &[TrackedItem] {
        &self.items
    }

    pub(crate) fn items_mut(&mut self) -> &mut [TrackedItem] {
        &mut self.items
    }

    pub fn score_of(&self, id: &ItemKey) -> Option<Score> {
        self.items.iter().find(|i| &i.id == id).map(|i| i.score)
    }

    pub fn contains(&self, id: &ItemKey) -> bool {
        self.items.iter().any(|i| &i.id == id)
    }

    /// Apply one fresh activation of `id`, assuming scores are already decayed.
    pub fn admit(&mut self, id: &ItemKey) -> Admission {
        if let Some(item) = self.items.iter_mut().find(|i| &i.id == id) {
            item.score.increment();
            return Admission::Incremented;
        }

        if !self.is_full() {
            self.items.push(TrackedItem {
                id: id.clone(),
                score: Score::ONE,
            });
            return Admission::Inserted;
        }

        let Some(idx) = self.min_index() else {
            return Admission::Rejected;
        };
        if !self.items[idx].score.is_evictable() {
            return Admission::Rejected;
        }

        let evicted = self.items.remove(idx).id;
        self.items.push(TrackedItem {
            id: id.clone(),
            score: Score::ONE,
        });
        Admission::Evicted { evicted }
    }

    /// Index of the lowest score; earliest wins ties.
    fn min_index(&self) -> Option<usize> {
        let mut best: Option<(usize, Score)> = None;
        for (idx, item) in self.items.iter().enumerate() {
            match best {
                Some((_, min)) if item.score >= min => {}
                _ => best = Some((idx, item.score)),
            }
        }
        best.map(|(idx, _)| idx)
    }

    /// Replace contents verbatim; extra entries past capacity are dropped.
    pub(crate) fn restore(&mut self, items: Vec<TrackedItem>) {
        self.items = items;
        self.items.truncate(self.capacity);
    }
}
