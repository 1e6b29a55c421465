use crate::graph::EdgeId;
use ahash::AHashSet;
use std::hash::Hash;

/// Pass-scoped "already handled" marks, kept beside the graph rather than on it.
#[derive(Debug)]
pub struct Processed<K> {
    marked: AHashSet<K>,
}

impl<K: Copy + Eq + Hash> Processed<K> {
    pub fn new() -> Self {
        Self {
            marked: AHashSet::new(),
        }
    }

    /// Returns true if `key` was not marked before.
    pub fn mark(&mut self, key: K) -> bool {
        self.marked.insert(key)
    }

    pub fn contains(&self, key: K) -> bool {
        self.marked.contains(&key)
    }

    pub fn len(&self) -> usize {
        self.marked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marked.is_empty()
    }
}

impl<K: Copy + Eq + Hash> Default for Processed<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Unordered edge pairs seen in a pass, so (a, b) and (b, a) count once.
#[derive(Debug, Default)]
pub struct ProcessedPairs {
    pairs: AHashSet<(EdgeId, EdgeId)>,
}

impl ProcessedPairs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(&mut self, a: EdgeId, b: EdgeId) -> bool {
        self.pairs.insert(if a <= b { (a, b) } else { (b, a) })
    }

    pub fn contains(&self, a: EdgeId, b: EdgeId) -> bool {
        self.pairs.contains(&if a <= b { (a, b) } else { (b, a) })
    }
}
