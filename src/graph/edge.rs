use super::NodeId;
use crate::geometry::{Envelope, line_envelope};
use crate::precision::Coordinate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable arena index of an edge. Never reused within one graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeId(pub usize);

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// How an edge meets a node it is incident to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Incidence {
    /// The edge starts at the node.
    Outgoing,
    /// The edge ends at the node.
    Incoming,
    /// Both ends sit on the node.
    Loop,
}

/// A directed arc over a line geometry, carrying the feature payload.
///
/// Removed edges stay in the arena as tombstones so a pass holding an id
/// snapshot can still read them, but they are in no index or incidence list.
#[derive(Debug, Clone)]
pub struct Edge<T> {
    pub(super) id: EdgeId,
    pub(super) line: Vec<Coordinate>,
    pub(super) payload: T,
    pub(super) from: NodeId,
    pub(super) to: NodeId,
    pub(super) envelope: Envelope,
    pub(super) removed: bool,
}

impl<T> Edge<T> {
    pub(super) fn new(id: EdgeId, line: Vec<Coordinate>, payload: T, from: NodeId, to: NodeId) -> Self {
        let envelope = line_envelope(&line);
        Self {
            id,
            line,
            payload,
            from,
            to,
            envelope,
            removed: false,
        }
    }

    pub fn id(&self) -> EdgeId {
        self.id
    }

    pub fn line(&self) -> &[Coordinate] {
        &self.line
    }

    pub fn payload(&self) -> &T {
        &self.payload
    }

    pub fn from_node(&self) -> NodeId {
        self.from
    }

    pub fn to_node(&self) -> NodeId {
        self.to
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    pub fn is_removed(&self) -> bool {
        self.removed
    }

    pub fn is_loop(&self) -> bool {
        self.from == self.to
    }

    pub fn first(&self) -> &Coordinate {
        &self.line[0]
    }

    pub fn last(&self) -> &Coordinate {
        &self.line[self.line.len() - 1]
    }

    pub fn incidence_at(&self, node: NodeId) -> Option<Incidence> {
        match (self.from == node, self.to == node) {
            (true, true) => Some(Incidence::Loop),
            (true, false) => Some(Incidence::Outgoing),
            (false, true) => Some(Incidence::Incoming),
            (false, false) => None,
        }
    }

    /// The endpoint opposite `node`, or None if the edge does not touch it.
    pub fn other_node(&self, node: NodeId) -> Option<NodeId> {
        if self.from == node {
            Some(self.to)
        } else if self.to == node {
            Some(self.from)
        } else {
            None
        }
    }

    /// The line oriented so that it starts at `node`.
    pub fn line_from(&self, node: NodeId) -> Option<Vec<Coordinate>> {
        if self.from == node {
            Some(self.line.clone())
        } else if self.to == node {
            Some(self.line.iter().rev().copied().collect())
        } else {
            None
        }
    }

    pub(super) fn refresh_envelope(&mut self) {
        self.envelope = line_envelope(&self.line);
    }
}
