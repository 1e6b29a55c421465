use crate::graph::{EdgeId, NodeId};
use crate::precision::PrecisionModel;
use std::path::PathBuf;
use thiserror::Error;

/// Failure of a single graph mutation. The graph is left as it was.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("unknown node {0}")]
    UnknownNode(NodeId),
    #[error("unknown edge {0}")]
    UnknownEdge(EdgeId),
    #[error("edge {0} has already been removed")]
    EdgeRemoved(EdgeId),
    #[error("line needs at least 2 points, got {points}")]
    DegenerateLine { points: usize },
    #[error("cannot merge {first} and {second} at {node}: {reason}")]
    InvalidMerge {
        node: NodeId,
        first: EdgeId,
        second: EdgeId,
        reason: &'static str,
    },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error reading config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConflationError {
    #[error("graphs use different precision models: {left:?} and {right:?}")]
    PrecisionMismatch {
        left: PrecisionModel,
        right: PrecisionModel,
    },
}
