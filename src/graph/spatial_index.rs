use crate::geometry::Envelope;
use rstar::RTree;
use rstar::primitives::{GeomWithData, Rectangle};

type Entry<K> = GeomWithData<Rectangle<[f64; 2]>, K>;

/// Bounding-box index over keys, backed by an R-tree.
///
/// Queries return every key whose box intersects the query box, in no
/// particular order. Removal needs the exact box the key was inserted with.
pub struct SpatialIndex<K> {
    tree: RTree<Entry<K>>,
}

impl<K: Copy + PartialEq> SpatialIndex<K> {
    pub fn new() -> Self {
        Self { tree: RTree::new() }
    }

    pub fn insert(&mut self, bbox: Envelope, key: K) {
        self.tree
            .insert(GeomWithData::new(Rectangle::from_aabb(bbox), key));
    }

    /// Returns false when the key was not present under that box.
    pub fn remove(&mut self, bbox: Envelope, key: K) -> bool {
        self.tree
            .remove(&GeomWithData::new(Rectangle::from_aabb(bbox), key))
            .is_some()
    }

    pub fn query(&self, bbox: &Envelope) -> Vec<K> {
        self.tree
            .locate_in_envelope_intersecting(bbox)
            .map(|entry| entry.data)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

impl<K: Copy + PartialEq> Default for SpatialIndex<K> {
    fn default() -> Self {
        Self::new()
    }
}
