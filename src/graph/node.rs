use super::EdgeId;
use crate::precision::Coordinate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable arena index of a node. Never reused within one graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// A graph vertex at a snapped coordinate.
#[derive(Debug, Clone)]
pub struct Node {
    pub(super) id: NodeId,
    pub(super) coordinate: Coordinate,
    // A self-loop edge appears twice, once per endpoint
    pub(super) incident: Vec<EdgeId>,
}

impl Node {
    pub(super) fn new(id: NodeId, coordinate: Coordinate) -> Self {
        Self {
            id,
            coordinate,
            incident: Vec::new(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn coordinate(&self) -> &Coordinate {
        &self.coordinate
    }

    pub fn incident_edges(&self) -> &[EdgeId] {
        &self.incident
    }

    pub fn degree(&self) -> usize {
        self.incident.len()
    }

    /// Drop one occurrence of `edge` from the incidence list.
    pub(super) fn detach(&mut self, edge: EdgeId) -> bool {
        match self.incident.iter().position(|&e| e == edge) {
            Some(pos) => {
                self.incident.remove(pos);
                true
            }
            None => false,
        }
    }
}
