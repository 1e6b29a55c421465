use super::traversal::{Processed, ProcessedPairs};
use super::{CleanupPass, PassContext, PassStats, edge_subject};
use crate::config::OverlapRule;
use crate::diagnostics::{Category, Diagnostic};
use crate::geometry::line_length;
use crate::geometry::predicates::{interior_correspondence, linear_overlap, lines_equal};
use crate::graph::{Edge, EdgeId, Graph, NodeId};
use crate::payload::Payload;
use crate::precision::Coordinate;
use ordered_float::OrderedFloat;
use std::cmp::Ordering;
use std::fmt;

pub type EdgeComparator<T> = dyn Fn(&Edge<T>, &Edge<T>) -> Ordering;

/// Decides which of two overlapping edges is the one to drop. The edge that
/// orders first is the removal candidate.
pub enum Precedence<T> {
    RemoveShorter,
    RemoveLonger,
    Custom(Box<EdgeComparator<T>>),
}

impl<T> Precedence<T> {
    fn compare(&self, a: &Edge<T>, b: &Edge<T>) -> Ordering {
        let len = |e: &Edge<T>| OrderedFloat(line_length(e.line()));
        match self {
            Precedence::RemoveShorter => len(a).cmp(&len(b)),
            Precedence::RemoveLonger => len(b).cmp(&len(a)),
            Precedence::Custom(cmp) => cmp(a, b),
        }
    }

    /// The edge of the two that should go.
    pub fn removal_side<'e>(&self, a: &'e Edge<T>, b: &'e Edge<T>) -> &'e Edge<T> {
        match self.compare(a, b) {
            Ordering::Greater => b,
            _ => a,
        }
    }
}

impl<T> From<OverlapRule> for Precedence<T> {
    fn from(rule: OverlapRule) -> Self {
        match rule {
            OverlapRule::RemoveShorter => Precedence::RemoveShorter,
            OverlapRule::RemoveLonger => Precedence::RemoveLonger,
        }
    }
}

impl<T> fmt::Debug for Precedence<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Precedence::RemoveShorter => f.write_str("RemoveShorter"),
            Precedence::RemoveLonger => f.write_str("RemoveLonger"),
            Precedence::Custom(_) => f.write_str("Custom"),
        }
    }
}

/// Handles same-kind edges that share a stretch of line without being equal.
///
/// The only case fixed automatically is an undershoot or overshoot: two edges
/// overlapping each other and nothing else, every interior vertex shared, and
/// the mismatched endpoints within `snap_tolerance` of each other. Those
/// endpoint nodes are moved together onto their midpoint. Every other
/// overlapping pair is reported once.
#[derive(Debug)]
pub struct LinearOverlapCleanup<T> {
    pub snap_tolerance: f64,
    pub precedence: Precedence<T>,
}

impl<T> LinearOverlapCleanup<T> {
    pub fn new(snap_tolerance: f64, precedence: Precedence<T>) -> Self {
        Self {
            snap_tolerance,
            precedence,
        }
    }
}

impl<T> Default for LinearOverlapCleanup<T> {
    fn default() -> Self {
        Self::new(2.0, Precedence::RemoveShorter)
    }
}

/// Endpoint nodes to pull together, as (node on a, node on b, meeting point).
fn endpoint_snaps<T>(a: &Edge<T>, b: &Edge<T>, tolerance: f64) -> Option<Vec<(NodeId, NodeId, Coordinate)>> {
    let reversed = interior_correspondence(a.line(), b.line())?;
    let (b_first, b_last) = if reversed {
        ((b.to_node(), b.last()), (b.from_node(), b.first()))
    } else {
        ((b.from_node(), b.first()), (b.to_node(), b.last()))
    };
    let mut snaps = Vec::new();
    for ((na, ca), (nb, cb)) in [
        ((a.from_node(), a.first()), b_first),
        ((a.to_node(), a.last()), b_last),
    ] {
        if na == nb {
            continue;
        }
        if ca.distance_2d(cb) > tolerance {
            return None;
        }
        snaps.push((na, nb, ca.midpoint(cb)));
    }
    (!snaps.is_empty()).then_some(snaps)
}

/// Live same-kind edges sharing a stretch of line with `id` without being equal to it.
fn overlapping_edges<T: Payload>(graph: &Graph<T>, id: EdgeId) -> Vec<EdgeId> {
    let Some(edge) = graph.live_edge(id) else {
        return Vec::new();
    };
    graph
        .edges_in(edge.envelope())
        .into_iter()
        .filter(|&c| c != id)
        .filter(|&c| {
            graph.live_edge(c).is_some_and(|other| {
                other.payload().kind() == edge.payload().kind()
                    && !lines_equal(edge.line(), other.line())
                    && linear_overlap(edge.line(), other.line())
            })
        })
        .collect()
}

impl<T: Payload> LinearOverlapCleanup<T> {
    /// Snap or report one pair where each edge overlaps only the other.
    fn resolve_pair(
        &self,
        graph: &mut Graph<T>,
        ctx: &mut PassContext<'_, T>,
        stats: &mut PassStats,
        a: EdgeId,
        b: EdgeId,
    ) {
        let (Some(edge), Some(other)) = (graph.live_edge(a), graph.live_edge(b)) else {
            return;
        };
        if let Some(snaps) = endpoint_snaps(edge, other, self.snap_tolerance) {
            for (na, nb, at) in snaps {
                let moved = graph.move_node(na, &at).and_then(|_| graph.move_node(nb, &at));
                match moved {
                    Ok(_) => stats.changed += 1,
                    Err(err) => ctx.operation_failed(edge_subject(graph, a), &err),
                }
            }
            return;
        }
        let loser = self.precedence.removal_side(edge, other);
        let keep = if loser.id() == a { other } else { edge };
        ctx.emit(Diagnostic::review(
            Category::IntersectingEdges,
            edge_subject(graph, loser.id()),
            format!(
                "overlaps {} ({}) along part of its length",
                keep.payload().label(),
                keep.id()
            ),
        ));
    }
}

impl<T: Payload> CleanupPass<T> for LinearOverlapCleanup<T> {
    fn name(&self) -> &'static str {
        "linear-overlap"
    }

    fn run(&self, graph: &mut Graph<T>, ctx: &mut PassContext<'_, T>) -> PassStats {
        let mut stats = PassStats::new("linear-overlap");
        let mut visited: Processed<EdgeId> = Processed::new();
        let mut pairs = ProcessedPairs::new();

        for id in graph.edge_ids() {
            if graph.live_edge(id).is_none() || !visited.mark(id) {
                continue;
            }
            stats.visited += 1;

            let overlapping = overlapping_edges(graph, id);
            for &other in &overlapping {
                if !pairs.mark(id, other) {
                    continue;
                }
                let other_overlaps = overlapping_edges(graph, other);
                if overlapping.len() == 1 && other_overlaps.len() == 1 {
                    self.resolve_pair(graph, ctx, &mut stats, id, other);
                    continue;
                }

                // Part of a wider overlap, never auto-resolved
                let (subject, partner, count) = if other_overlaps.len() > overlapping.len() {
                    (other, id, other_overlaps.len())
                } else {
                    (id, other, overlapping.len())
                };
                let partner_label = graph
                    .edge(partner)
                    .map(|e| e.payload().label())
                    .unwrap_or_else(|| partner.to_string());
                ctx.emit(Diagnostic::review(
                    Category::IntersectingEdges,
                    edge_subject(graph, subject),
                    format!(
                        "overlaps {} ({}), one of {} overlapping edges",
                        partner_label, partner, count
                    ),
                ));
            }
        }
        stats
    }
}
