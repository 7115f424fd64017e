use std::collections::HashSet;

use super::path::CachePath;

/// Insertion-ordered set of paths waiting for the next flush.
///
/// The collector has no internal locking. `BatchScheduler` keeps it behind the
/// same lock as its timer state so that `add` and `drain_all` are never
/// interleaved.
#[derive(Debug, Default)]
pub struct PathCollector {
    order: Vec<CachePath>,
    seen: HashSet<CachePath>,
}

impl PathCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add paths, skipping any already pending.
    ///
    /// Returns how many were actually inserted.
    pub fn add<I>(&mut self, paths: I) -> usize
    where
        I: IntoIterator<Item = CachePath>,
    {
        let mut inserted = 0;
        for path in paths {
            if self.seen.insert(path.clone()) {
                self.order.push(path);
                inserted += 1;
            }
        }
        inserted
    }

    /// Take every pending path, leaving the collector empty.
    pub fn drain_all(&mut self) -> Vec<CachePath> {
        self.seen.clear();
        std::mem::take(&mut self.order)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
