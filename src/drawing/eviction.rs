use std::cmp::Ordering;

use crate::drawing::item::ItemId;

/// Cache candidate gathered during an update pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CacheRecord {
    /// Candidate item.
    pub item: ItemId,
    /// Estimated benefit of caching the item.
    pub score: f64,
    /// Bytes its cache surface would take.
    pub cost: usize,
    /// Persistent items sort ahead of every scored item.
    pub persistent: bool,
}

impl Eq for CacheRecord {}

impl Ord for CacheRecord {
    /// Best candidate first: persistent, then higher score, then lower handle.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .persistent
            .cmp(&self.persistent)
            .then_with(|| other.score.total_cmp(&self.score))
            .then_with(|| self.item.cmp(&other.item))
    }
}

impl PartialOrd for CacheRecord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Greedy budgeted selection: the longest best-first prefix whose total cost fits `budget`.
///
/// Stops at the first candidate that would overshoot, even if a cheaper one further down
/// would still fit.
pub fn pick_items_for_caching(
    candidates: impl IntoIterator<Item = CacheRecord>,
    budget: usize,
) -> Vec<ItemId> {
    let mut sorted: Vec<CacheRecord> = candidates.into_iter().collect();
    sorted.sort();

    let mut used = 0usize;
    let mut picked = Vec::new();
    for record in sorted {
        match used.checked_add(record.cost) {
            Some(total) if total <= budget => {
                used = total;
                picked.push(record.item);
            }
            _ => break,
        }
    }
    picked
}

#[cfg(test)]
#[path = "../../tests/unit/drawing/eviction.rs"]
mod tests;
