// ===========================================================================
// Cleanup Passes
// ===========================================================================
//
// Every pass walks a snapshot of node or edge ids taken before it starts and
// mutates the graph only through the graph's primitives. Nothing a pass finds
// aborts it: conflicts and ambiguities become diagnostics, failed primitives
// become `invalid-operation` errors, and the walk moves on.
// ===========================================================================

mod crossing_split;
mod equal_lines;
mod linear_overlap;
mod near_parallel;
mod point_dedup;
mod polygon_nodes;
mod pseudo_nodes;
mod redundant_vertices;
pub mod traversal;


pub use crossing_split::{CrossingEdgeSplitter, split_edges_near_node};
pub use equal_lines::EqualLineDedup;
pub use linear_overlap::{LinearOverlapCleanup, Precedence};
pub use near_parallel::{NearParallelFinder, NearParallelMatch, NearParallelReport};
pub use point_dedup::{PointDedup, dedup_points};
pub use polygon_nodes::PolygonNodeRemoval;
pub use pseudo_nodes::PseudoNodeRemoval;
pub use redundant_vertices::RedundantVertexRemoval;

use crate::config::{CleanupConfig, PassKind};
use crate::diagnostics::{Category, Diagnostic, DiagnosticSink, Subject};
use crate::error::GraphError;
use crate::graph::{EdgeId, Graph, NodeId};
use crate::payload::{AttributeMatcher, Payload};
use log::info;
use serde::Serialize;
use std::time::Instant;

/// What a pass shares with the caller: the attribute predicate and the
/// diagnostic sink.
pub struct PassContext<'a, T> {
    pub matcher: &'a AttributeMatcher<T>,
    sink: &'a mut dyn DiagnosticSink,
    emitted: usize,
}

impl<'a, T: Payload> PassContext<'a, T> {
    pub fn new(matcher: &'a AttributeMatcher<T>, sink: &'a mut dyn DiagnosticSink) -> Self {
        Self {
            matcher,
            sink,
            emitted: 0,
        }
    }

    pub fn emit(&mut self, diagnostic: Diagnostic) {
        self.emitted += 1;
        self.sink.emit(diagnostic);
    }

    /// Number of diagnostics emitted through this context so far.
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    /// Report a primitive that refused to run. The graph is unchanged.
    pub fn operation_failed(&mut self, subject: Subject, err: &GraphError) {
        self.emit(Diagnostic::error(Category::InvalidOperation, subject, err.to_string()));
    }
}

pub(crate) fn edge_subject<T: Payload>(graph: &Graph<T>, id: EdgeId) -> Subject {
    Subject::Edge {
        id,
        label: graph
            .edge(id)
            .map(|e| e.payload().label())
            .unwrap_or_else(|| id.to_string()),
    }
}

pub(crate) fn node_subject<T: Payload>(graph: &Graph<T>, id: NodeId) -> Subject {
    match graph.node(id) {
        Some(node) => Subject::Node {
            id,
            at: *node.coordinate(),
        },
        None => Subject::Feature { label: id.to_string() },
    }
}

/// Counters one pass reports back.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PassStats {
    pub pass: &'static str,
    pub visited: usize,
    pub merged: usize,
    pub removed: usize,
    pub changed: usize,
    pub split: usize,
    pub reported: usize,
}

impl PassStats {
    pub fn new(pass: &'static str) -> Self {
        Self {
            pass,
            ..Default::default()
        }
    }
}

pub trait CleanupPass<T> {
    fn name(&self) -> &'static str;

    fn run(&self, graph: &mut Graph<T>, ctx: &mut PassContext<'_, T>) -> PassStats;
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct PipelineReport {
    pub passes: Vec<PassStats>,
}

impl PipelineReport {
    pub fn diagnostics(&self) -> usize {
        self.passes.iter().map(|p| p.reported).sum()
    }
}

/// An ordered list of passes run one after another over the same graph.
pub struct CleanupPipeline<T> {
    passes: Vec<Box<dyn CleanupPass<T>>>,
}

impl<T: Payload + 'static> CleanupPipeline<T> {
    pub fn new() -> Self {
        Self { passes: Vec::new() }
    }

    pub fn with_pass(mut self, pass: impl CleanupPass<T> + 'static) -> Self {
        self.passes.push(Box::new(pass));
        self
    }

    pub fn push(&mut self, pass: Box<dyn CleanupPass<T>>) {
        self.passes.push(pass);
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    pub fn from_config(config: &CleanupConfig) -> Self {
        let mut pipeline = Self::new();
        for kind in &config.passes {
            let pass: Box<dyn CleanupPass<T>> = match kind {
                PassKind::RedundantVertices => Box::new(RedundantVertexRemoval {
                    drop_collinear: config.drop_collinear,
                }),
                PassKind::EqualLines => Box::new(EqualLineDedup),
                PassKind::LinearOverlap => Box::new(LinearOverlapCleanup::new(
                    config.snap_tolerance,
                    Precedence::from(config.overlap_rule),
                )),
                PassKind::PseudoNodes => Box::new(PseudoNodeRemoval),
                PassKind::PolygonNodes => Box::new(PolygonNodeRemoval),
                PassKind::CrossingSplit => Box::new(CrossingEdgeSplitter {
                    tolerance: config.split_tolerance,
                }),
                PassKind::NearParallel => Box::new(NearParallelReport {
                    finder: NearParallelFinder::new(config.near_parallel_distance)
                        .with_max_angle(config.near_parallel_max_angle()),
                }),
            };
            pipeline.push(pass);
        }
        pipeline
    }

    pub fn run(
        &self,
        graph: &mut Graph<T>,
        matcher: &AttributeMatcher<T>,
        sink: &mut dyn DiagnosticSink,
    ) -> PipelineReport {
        let mut ctx = PassContext::new(matcher, sink);
        let mut report = PipelineReport::default();
        for pass in &self.passes {
            let start = Instant::now();
            let before = ctx.emitted();
            let mut stats = pass.run(graph, &mut ctx);
            stats.reported = ctx.emitted() - before;
            info!(
                "{}: visited {}, merged {}, removed {}, changed {}, split {}, {} diagnostics in {:?} ({} nodes, {} edges)",
                stats.pass,
                stats.visited,
                stats.merged,
                stats.removed,
                stats.changed,
                stats.split,
                stats.reported,
                start.elapsed(),
                graph.node_count(),
                graph.edge_count()
            );
            report.passes.push(stats);
        }
        report
    }
}

impl<T: Payload + 'static> Default for CleanupPipeline<T> {
    fn default() -> Self {
        Self::new()
    }
}
