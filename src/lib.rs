// Copyright: Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Removal of the attribution is not allowed, as covered under the AGPL license

#![deny(
    clippy::mutable_key_type,
    clippy::map_entry,
    clippy::boxed_local,
    clippy::let_unit_value,
    clippy::redundant_allocation,
    clippy::bool_comparison,
    clippy::bind_instead_of_map,
    clippy::vec_box,
    clippy::while_let_loop,
    clippy::useless_asref,
    clippy::repeat_once,
    clippy::deref_addrof,
    clippy::suspicious_map,
    clippy::single_char_pattern,
    clippy::for_kv_map,
    clippy::let_and_return,
    clippy::iter_nth,
    clippy::iter_cloned_collect,
    clippy::match_result_ok,
    clippy::cmp_owned,
    clippy::cmp_null,
    clippy::op_ref
)]

//! Planar topology graph for cleaning line and polygon feature geometry.
//!
//! Features become edges of a [`graph::Graph`] whose nodes are unique per
//! precision-snapped coordinate. The passes in [`cleanup`] then remove
//! redundant vertices, duplicate lines and pseudo nodes, snap small gaps and
//! node crossings, reporting anything they cannot resolve as diagnostics.

pub mod cleanup;
pub mod conflation;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod geometry;
pub mod graph;
pub mod payload;
pub mod precision;

pub use cleanup::{CleanupPass, CleanupPipeline, PassContext, PassStats, PipelineReport};
pub use config::CleanupConfig;
pub use diagnostics::{Diagnostic, DiagnosticSink, Severity};
pub use error::{ConfigError, GraphError};
pub use graph::{Edge, EdgeId, Graph, Node, NodeId};
pub use payload::{AttributeMatcher, FieldSet, Payload, Record};
pub use precision::{Coordinate, PrecisionModel};
