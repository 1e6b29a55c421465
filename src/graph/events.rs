use super::{EdgeId, NodeId};
use crate::precision::Coordinate;
use serde::Serialize;

/// A structural change made by one of the graph's mutation primitives.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GraphEvent {
    EdgeAdded { id: EdgeId },
    EdgeRemoved { id: EdgeId },
    /// One edge replaced by zero or more new ones (replace, split).
    EdgeChanged { old: EdgeId, new: Vec<EdgeId> },
    EdgesMerged { old: [EdgeId; 2], new: EdgeId, at: NodeId },
    NodeMoved { node: NodeId, from: Coordinate, to: Coordinate },
    /// A moved node landed on an existing node and was folded into it.
    NodesCoalesced { removed: NodeId, kept: NodeId },
}
