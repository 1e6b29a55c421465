use super::{CleanupPass, PassContext, PassStats, node_subject};
use crate::diagnostics::{Category, Diagnostic};
use crate::graph::{EdgeId, Graph, Incidence, NodeId};
use crate::payload::Payload;
use itertools::Itertools;

/// Continuation candidates found at one node.
#[derive(Debug, Default, PartialEq)]
pub(super) struct Pairing {
    /// (incoming, outgoing) pairs whose match is unique on both sides.
    pub pairs: Vec<(EdgeId, EdgeId)>,
    /// Edges with more than one equally valid partner.
    pub ambiguous: Vec<EdgeId>,
}

/// Pair up the edges at `node` that continue each other: opposite incidence
/// and matching attributes. Loops never pair.
pub(super) fn pair_edges<T: Payload>(graph: &Graph<T>, node: NodeId, ctx: &PassContext<'_, T>) -> Pairing {
    let Some(n) = graph.node(node) else {
        return Pairing::default();
    };
    let ends: Vec<(EdgeId, Incidence)> = n
        .incident_edges()
        .iter()
        .copied()
        .unique()
        .filter_map(|id| {
            let edge = graph.live_edge(id)?;
            match edge.incidence_at(node)? {
                Incidence::Loop => None,
                inc => Some((id, inc)),
            }
        })
        .collect();

    let partners: Vec<Vec<usize>> = (0..ends.len())
        .map(|i| {
            (0..ends.len())
                .filter(|&j| j != i && ends[i].1 != ends[j].1)
                .filter(|&j| {
                    match (graph.live_edge(ends[i].0), graph.live_edge(ends[j].0)) {
                        (Some(a), Some(b)) => ctx.matcher.matches(a.payload(), b.payload()),
                        _ => false,
                    }
                })
                .collect()
        })
        .collect();

    let mut pairing = Pairing::default();
    for (i, found) in partners.iter().enumerate() {
        match found.as_slice() {
            [] => {}
            &[j] => {
                if i < j && partners[j] == [i] {
                    let (a, b) = (ends[i], ends[j]);
                    pairing.pairs.push(if a.1 == Incidence::Incoming {
                        (a.0, b.0)
                    } else {
                        (b.0, a.0)
                    });
                }
            }
            _ => pairing.ambiguous.push(ends[i].0),
        }
    }
    pairing
}

pub(super) fn merge_pairs<T: Payload>(
    graph: &mut Graph<T>,
    node: NodeId,
    pairs: &[(EdgeId, EdgeId)],
    ctx: &mut PassContext<'_, T>,
    stats: &mut PassStats,
) {
    for &(incoming, outgoing) in pairs {
        // Incoming first keeps the direction of both halves
        match graph.merge(node, incoming, outgoing) {
            Ok(_) => stats.merged += 1,
            Err(err) => ctx.operation_failed(node_subject(graph, node), &err),
        }
    }
}

/// Merges the two halves of a feature split at an artificial vertex. Nodes
/// where any edge could continue into more than one other edge are left
/// alone for review.
#[derive(Clone, Copy, Debug, Default)]
pub struct PseudoNodeRemoval;

impl<T: Payload> CleanupPass<T> for PseudoNodeRemoval {
    fn name(&self) -> &'static str {
        "pseudo-nodes"
    }

    fn run(&self, graph: &mut Graph<T>, ctx: &mut PassContext<'_, T>) -> PassStats {
        let mut stats = PassStats::new(CleanupPass::<T>::name(self));
        for node in graph.node_ids() {
            if graph.node(node).is_none_or(|n| n.degree() <= 1) {
                continue;
            }
            stats.visited += 1;
            let pairing = pair_edges(graph, node, ctx);
            if !pairing.ambiguous.is_empty() {
                ctx.emit(Diagnostic::review(
                    Category::AmbiguousMerge,
                    node_subject(graph, node),
                    format!(
                        "edges {} each have more than one matching continuation",
                        pairing.ambiguous.iter().join(", ")
                    ),
                ));
                continue;
            }
            merge_pairs(graph, node, &pairing.pairs, ctx, &mut stats);
        }
        stats
    }
}
